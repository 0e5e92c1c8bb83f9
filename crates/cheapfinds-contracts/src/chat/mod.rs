mod command_registry;
mod intent_parser;
mod session;

pub use command_registry::SHELL_HELP_COMMANDS;
pub use intent_parser::{parse_intent, Intent};
pub use session::{ChatMessage, ChatRole, ChatSession, CHAT_ERROR_REPLY};
