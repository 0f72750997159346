pub mod chat;
pub mod message;
pub mod user;

pub use chat::*;
pub use message::*;
pub use user::*;
