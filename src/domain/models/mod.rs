mod chat;
mod event;
mod message;
pub mod prompts;
mod role;
mod slash_commands;

pub use chat::*;
pub use event::*;
pub use message::*;
pub use role::*;
pub use slash_commands::*;
