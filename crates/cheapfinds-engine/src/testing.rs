use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cheapfinds_contracts::chat::ChatRole;
use cheapfinds_contracts::{PipelineError, TransportError};

use crate::provider::{ProviderAnswer, SearchProvider};
use crate::query::{ChatRequest, ProviderRequest};

/// Scripted provider: fails the first `fail_first` calls, then answers.
/// Records every chat context it is sent.
pub(crate) struct FakeProvider {
    answer: ProviderAnswer,
    fail_first: u32,
    configured: bool,
    calls: AtomicU32,
    chats: Mutex<Vec<Vec<(ChatRole, String)>>>,
    instructions: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub(crate) fn answering(answer: ProviderAnswer) -> Self {
        Self {
            answer,
            fail_first: 0,
            configured: true,
            calls: AtomicU32::new(0),
            chats: Mutex::new(Vec::new()),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_first(mut self, count: u32) -> Self {
        self.fail_first = count;
        self
    }

    pub(crate) fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn chats(&self) -> Vec<Vec<(ChatRole, String)>> {
        self.chats.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    pub(crate) fn instructions(&self) -> Vec<String> {
        self.instructions
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    fn next(&self) -> Result<ProviderAnswer, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(TransportError::with_status(
                503,
                format!("UNAVAILABLE: attempt {}", call + 1),
            ));
        }
        Ok(self.answer.clone())
    }
}

#[async_trait]
impl SearchProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn check_configured(&self) -> Result<(), PipelineError> {
        if self.configured {
            Ok(())
        } else {
            Err(PipelineError::Configuration("FAKE_API_KEY not set".to_string()))
        }
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderAnswer, TransportError> {
        if let Ok(mut rows) = self.instructions.lock() {
            rows.push(request.instruction.clone());
        }
        self.next()
    }

    async fn converse(&self, request: &ChatRequest<'_>) -> Result<ProviderAnswer, TransportError> {
        let mut context: Vec<(ChatRole, String)> = request
            .history
            .iter()
            .map(|message| (message.role, message.text.clone()))
            .collect();
        context.push((ChatRole::User, request.message.to_string()));
        if let Ok(mut rows) = self.chats.lock() {
            rows.push(context);
        }
        self.next()
    }
}
