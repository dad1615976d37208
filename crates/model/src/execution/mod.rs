pub mod dump_task;
pub mod errors;
pub mod state;
