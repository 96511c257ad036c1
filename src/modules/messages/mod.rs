pub mod commands;

pub use commands::{announce, bulk_message, spam_message};
