//! CLI command implementations

pub mod assist;
pub mod bank;
pub mod support;

use agentgate_core::{Context, Request};
use agentgate_kernel::{Dispatch, DispatchGate};
use agentgate_llm::{BackendConfig, LLMRouter, ProviderKind};
use anyhow::anyhow;
use dialoguer::Input;

use crate::display;

/// Backend selection shared by every command
pub struct Session {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub show_trace: bool,
}

impl Session {
    /// Build the inference backend, failing fast on missing credentials
    pub fn backend(&self, default: ProviderKind) -> anyhow::Result<LLMRouter> {
        let kind = match self.provider.as_deref() {
            Some(name) => ProviderKind::from_str(name).ok_or_else(|| {
                anyhow!("Unknown provider '{}'. Use openrouter, gemini or openai_compat.", name)
            })?,
            None => default,
        };

        let mut config = BackendConfig::from_env(kind)?;
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        Ok(LLMRouter::from_config(config)?)
    }

    /// Dispatch one message and print the outcome
    pub async fn run(
        &self,
        gate: &DispatchGate,
        message: &str,
        context: Option<Context>,
    ) -> anyhow::Result<Dispatch> {
        let dispatch = gate.dispatch(Request::new(message), context).await?;
        display::outcome(&dispatch.outcome);
        if self.show_trace {
            display::trace(&dispatch);
        }
        Ok(dispatch)
    }
}

/// Use the given text, or ask for it on stdin
pub fn text_or_prompt(given: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(text) = given.filter(|t| !t.trim().is_empty()) {
        return Ok(text);
    }
    let text: String = Input::new().with_prompt(prompt).interact_text()?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(anyhow!("Nothing to send: the input was empty."));
    }
    Ok(text)
}
