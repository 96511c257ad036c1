pub mod channels;
pub mod messages;
pub mod router;
pub mod system;
