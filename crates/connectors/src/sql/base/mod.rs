pub mod cursor;
pub mod dialect;
pub mod query;
pub mod row;
pub mod strategy;
