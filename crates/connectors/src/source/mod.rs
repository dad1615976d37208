pub mod config;
pub mod lease;
pub mod pool;
pub mod provider;
