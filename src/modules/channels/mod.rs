pub mod commands;
pub mod confirm;
pub mod task;

pub use commands::{create_channels, delete_channels, list_channels};
