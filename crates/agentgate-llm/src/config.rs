//! Backend configuration from the process environment

use std::time::Duration;

use crate::types::*;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENROUTER_DEFAULT_MODEL: &str = "google/gemini-2.0-flash-exp:free";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where and how to reach the inference backend
#[derive(Clone)]
pub struct BackendConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendConfig {
    /// Build the configuration for `kind` from the process environment
    ///
    /// Loads `.env` first (ignoring a missing file). Reads:
    /// - `OPENROUTER_API_KEY` / `GEMINI_API_KEY` / `AGENTGATE_API_KEY` (required, by kind)
    /// - `AGENTGATE_BASE_URL` (required for `openai_compat`, optional override otherwise)
    /// - `AGENTGATE_MODEL`
    /// - `AGENTGATE_TIMEOUT_SECS`
    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(kind: ProviderKind, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (key_var, default_base, default_model) = match kind {
            ProviderKind::OpenRouter => (
                "OPENROUTER_API_KEY",
                Some(OPENROUTER_BASE_URL),
                OPENROUTER_DEFAULT_MODEL,
            ),
            ProviderKind::Gemini => ("GEMINI_API_KEY", Some(GEMINI_BASE_URL), GEMINI_DEFAULT_MODEL),
            ProviderKind::OpenAICompat => ("AGENTGATE_API_KEY", None, "default"),
            ProviderKind::Scripted => {
                return Err(LLMError::ConfigurationError {
                    message: "the scripted provider is not configured from the environment"
                        .to_string(),
                })
            }
        };

        let api_key = read(key_var).ok_or_else(|| LLMError::ConfigurationError {
            message: format!(
                "{} is not set. Please ensure it is defined in your .env file.",
                key_var
            ),
        })?;

        let base_url = read("AGENTGATE_BASE_URL")
            .or_else(|| default_base.map(str::to_string))
            .ok_or_else(|| LLMError::ConfigurationError {
                message: "AGENTGATE_BASE_URL is required for the openai_compat provider"
                    .to_string(),
            })?;

        let model = read("AGENTGATE_MODEL").unwrap_or_else(|| default_model.to_string());

        let timeout_secs = match read("AGENTGATE_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| LLMError::ConfigurationError {
                message: format!("AGENTGATE_TIMEOUT_SECS must be a whole number, got '{}'", raw),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
