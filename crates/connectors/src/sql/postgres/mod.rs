pub mod cursor;
pub mod data_type;
pub mod pool;
pub mod strategy;
pub mod temporal;
pub mod text;
pub mod utils;
