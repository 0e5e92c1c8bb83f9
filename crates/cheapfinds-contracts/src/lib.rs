pub mod chat;
pub mod error;
pub mod events;
pub mod history;
pub mod identity;
pub mod prompts;
pub mod regions;
pub mod results;
pub mod search;
pub mod share;

pub use error::{PipelineError, TransportError};
