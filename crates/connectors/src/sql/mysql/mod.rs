pub mod cursor;
pub mod data_type;
pub mod strategy;
