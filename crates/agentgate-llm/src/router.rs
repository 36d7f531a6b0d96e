//! LLM Router - owns the configured provider

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::providers::*;
use crate::types::*;

/// Shared handle to the inference backend used by handlers, guards and classifiers
#[derive(Clone)]
pub struct LLMRouter {
    provider: Arc<dyn LLMProvider>,
    kind: ProviderKind,
    model: Option<String>,
}

impl std::fmt::Debug for LLMRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMRouter")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LLMRouter {
    /// Create a router with a specific provider
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        let kind = provider.kind();
        Self {
            provider,
            kind,
            model: None,
        }
    }

    /// Create a router for `kind` from the process environment
    ///
    /// Fails with `LLMError::ConfigurationError` when the credential is missing.
    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        Self::from_config(BackendConfig::from_env(kind)?)
    }

    pub fn from_config(config: BackendConfig) -> Result<Self> {
        let model = config.model.clone();
        let provider = OpenAICompatProvider::new(config)?;
        tracing::info!(provider = provider.name(), model = %model, "inference backend configured");
        Ok(Self {
            kind: provider.kind(),
            provider: Arc::new(provider),
            model: Some(model),
        })
    }

    /// Get the current provider
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Get the provider kind
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Default model, if the router was built from configuration
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Complete a request using the configured provider
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        tracing::debug!(
            provider = self.provider.name(),
            tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            structured = request.response_schema.is_some(),
            "sending completion request"
        );
        let result = self.provider.complete(request).await;
        match &result {
            Ok(response) => tracing::debug!(
                tool_calls = response.tool_calls.len(),
                total_tokens = response.usage.total_tokens,
                "completion received"
            ),
            Err(e) => tracing::warn!(provider = self.provider.name(), error = %e, "completion failed"),
        }
        result
    }
}
