pub mod codec;
pub mod config;
pub mod provider;
pub mod query;
pub mod retry;
#[cfg(test)]
mod testing;
pub mod transport;

use std::sync::Arc;

use cheapfinds_contracts::chat::ChatSession;
use cheapfinds_contracts::events::{EventWriter, PipelineEvent};
use cheapfinds_contracts::history::HistoryStore;
use cheapfinds_contracts::results::SearchResult;
use cheapfinds_contracts::search::SearchRequest;
use cheapfinds_contracts::PipelineError;

pub use config::EngineConfig;
pub use provider::{default_provider_registry, ProviderRegistry, SearchProvider};
pub use retry::RetryPolicy;
pub use transport::ChatTurn;

/// One search slot: a provider, its retry policy and the history of what it
/// found. Operations take `&mut self`, so a slot never has two requests in
/// flight.
pub struct SearchPipeline {
    provider: Arc<dyn SearchProvider>,
    retry: RetryPolicy,
    max_image_dim: Option<u32>,
    events: Option<EventWriter>,
    history: HistoryStore,
}

impl SearchPipeline {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            max_image_dim: None,
            events: None,
            history: HistoryStore::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_image_dim(mut self, max_image_dim: Option<u32>) -> Self {
        self.max_image_dim = max_image_dim;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    /// Builds, sends and records a single- or multi-product search. The
    /// request is consumed; a successful result is also stored in history.
    pub async fn search(&mut self, request: SearchRequest) -> Result<SearchResult, PipelineError> {
        self.emit(PipelineEvent::SearchStarted {
            mode: request.mode,
            region: request.region.clone(),
            images: request.effective_images().len(),
            has_description: request.has_description(),
        });

        let outcome = match query::assemble(&request, self.max_image_dim) {
            Ok(assembled) => {
                transport::execute(self.provider.as_ref(), &self.retry, &assembled).await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => {
                self.emit(PipelineEvent::SearchFinished {
                    mode: request.mode,
                    answer_chars: result.text.chars().count(),
                    citations: result.citations.len(),
                    offers: result.interpret().offers().len(),
                });
                self.history.record(&request, result.clone());
                Ok(result)
            }
            Err(err) => {
                self.emit(PipelineEvent::SearchFailed {
                    mode: request.mode,
                    error_kind: err.kind().to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Advances a chat session by one turn. Chat turns are not recorded in
    /// history.
    pub async fn advance(&mut self, session: ChatSession, text: &str) -> ChatTurn {
        let turn = transport::advance(self.provider.as_ref(), &self.retry, session, text).await;
        let event = match &turn.reply {
            Ok(reply) => PipelineEvent::ChatTurnFinished {
                turns: turn.session.len() / 2,
                reply_chars: reply.chars().count(),
            },
            Err(err) => PipelineEvent::ChatTurnFailed {
                turns: turn.session.len() / 2,
                error_kind: err.kind().to_string(),
                message: err.to_string(),
            },
        };
        self.emit(event);
        turn
    }

    fn emit(&self, event: PipelineEvent) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.record(&event) {
            tracing::warn!(path = %events.path().display(), "failed to write event: {err:#}");
        }
    }
}
