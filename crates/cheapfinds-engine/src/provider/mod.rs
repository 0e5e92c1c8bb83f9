mod dryrun;
mod gemini;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use cheapfinds_contracts::results::CitationLink;
use cheapfinds_contracts::{PipelineError, TransportError};

use crate::config::EngineConfig;
use crate::query::{ChatRequest, ProviderRequest};

pub use dryrun::DryrunProvider;
pub use gemini::GeminiProvider;

/// What a provider said, before fallbacks are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderAnswer {
    pub text: Option<String>,
    pub citations: Vec<CitationLink>,
}

impl ProviderAnswer {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<CitationLink>) -> Self {
        self.citations = citations;
        self
    }
}

/// A remote generative-search backend. Implementations are stateless per
/// call: chat context arrives in full with every turn.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fails with `Configuration` when the provider cannot be called at all.
    /// Checked once per operation, before any attempt.
    fn check_configured(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderAnswer, TransportError>;

    async fn converse(&self, request: &ChatRequest<'_>) -> Result<ProviderAnswer, TransportError>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SearchProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: SearchProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SearchProvider>> {
        self.providers.get(name.trim()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_provider_registry(config: &EngineConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(GeminiProvider::new(config));
    registry.register(DryrunProvider);
    registry
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;

    use super::default_provider_registry;

    #[test]
    fn default_registry_knows_gemini_and_dryrun() {
        let registry = default_provider_registry(&EngineConfig::default());
        assert_eq!(registry.names(), vec!["dryrun", "gemini"]);
        assert_eq!(
            registry.get(" gemini ").map(|p| p.name().to_string()).as_deref(),
            Some("gemini")
        );
        assert!(registry.get("openai").is_none());
    }
}
