pub mod channel;
pub mod error;
pub mod metrics;
pub mod progress;
