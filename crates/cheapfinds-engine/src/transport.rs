use cheapfinds_contracts::chat::ChatSession;
use cheapfinds_contracts::results::SearchResult;
use cheapfinds_contracts::PipelineError;

use crate::provider::SearchProvider;
use crate::query::{ChatRequest, ProviderRequest};
use crate::retry::{with_retry, RetryPolicy};

pub const NO_TEXT_FALLBACK: &str = "No text description found.";
pub const CHAT_NO_TEXT_FALLBACK: &str =
    "I'm having trouble connecting to the shopping network right now.";

/// Outcome of one chat turn. The session is always handed back: on success it
/// holds the new exchange, on failure the user's text and the stock apology.
#[derive(Debug)]
pub struct ChatTurn {
    pub session: ChatSession,
    pub reply: Result<String, PipelineError>,
}

/// Runs a one-shot request with retries. Configuration problems fail before
/// the first attempt.
pub async fn execute(
    provider: &dyn SearchProvider,
    policy: &RetryPolicy,
    request: &ProviderRequest,
) -> Result<SearchResult, PipelineError> {
    provider.check_configured()?;
    let answer = with_retry(policy, |_| provider.generate(request)).await?;
    Ok(SearchResult::new(
        answer
            .text
            .unwrap_or_else(|| NO_TEXT_FALLBACK.to_string()),
        answer.citations,
    ))
}

/// Sends `text` with the whole session as context and returns the successor
/// session. Blank input is rejected and leaves the session as it was.
pub async fn advance(
    provider: &dyn SearchProvider,
    policy: &RetryPolicy,
    session: ChatSession,
    text: &str,
) -> ChatTurn {
    let message = text.trim();
    if message.is_empty() {
        return ChatTurn {
            session,
            reply: Err(PipelineError::invalid("Type a message to continue the chat.")),
        };
    }

    let outcome = match provider.check_configured() {
        Err(err) => Err(err),
        Ok(()) => {
            let request = ChatRequest {
                system_instruction: &session.system_directive,
                history: session.messages(),
                message,
            };
            with_retry(policy, |_| provider.converse(&request))
                .await
                .map(|answer| {
                    answer
                        .text
                        .unwrap_or_else(|| CHAT_NO_TEXT_FALLBACK.to_string())
                })
                .map_err(PipelineError::from)
        }
    };

    match outcome {
        Ok(reply) => ChatTurn {
            session: session.with_turn(message, reply.clone()),
            reply: Ok(reply),
        },
        Err(err) => ChatTurn {
            session: session.record_failed_turn(message),
            reply: Err(err),
        },
    }
}
