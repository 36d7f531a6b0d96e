//! Tools and the tool-backed handler

use std::sync::Arc;

use agentgate_core::{Context, Reply, Request};
use agentgate_kernel::{Enablement, Handler, HandlerError};
use agentgate_llm::{CompletionRequest, LLMRouter, Message, ToolCall, ToolSpec};
use async_trait::async_trait;

/// An operation the inference backend may ask for
///
/// `call` never fails: bad arguments are answered with a sentence that says
/// what was wrong.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> serde_json::Value;

    async fn call(&self, args: &serde_json::Value, context: &Context) -> String;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// String argument, accepting numbers as their decimal text
pub(crate) fn string_arg(args: &serde_json::Value, key: &str) -> Option<String> {
    match args.get(key)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn missing_arg(key: &str) -> String {
    format!("Missing required argument '{}'.", key)
}

struct ToolEntry {
    tool: Arc<dyn Tool>,
    enablement: Option<Enablement>,
}

impl ToolEntry {
    fn is_enabled(&self, context: &Context) -> bool {
        self.enablement
            .as_ref()
            .map(|e| e.evaluate(context))
            .unwrap_or(true)
    }
}

/// Ordered set of tools, each with an optional enablement predicate
#[derive(Default)]
pub struct ToolBox {
    entries: Vec<ToolEntry>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.entries.push(ToolEntry {
            tool: Arc::new(tool),
            enablement: None,
        });
        self
    }

    pub fn with_gated(mut self, tool: impl Tool + 'static, enablement: Enablement) -> Self {
        self.entries.push(ToolEntry {
            tool: Arc::new(tool),
            enablement: Some(enablement),
        });
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tool.name()).collect()
    }

    /// Specs of the tools enabled for this caller, in registration order
    pub fn specs(&self, context: &Context) -> Vec<ToolSpec> {
        self.entries
            .iter()
            .filter(|e| e.is_enabled(context))
            .map(|e| e.tool.spec())
            .collect()
    }

    pub async fn execute(&self, call: &ToolCall, context: &Context) -> String {
        let Some(entry) = self.entries.iter().find(|e| e.tool.name() == call.name) else {
            tracing::warn!(tool = %call.name, "backend requested an unknown tool");
            return format!("Tool '{}' is not available.", call.name);
        };
        if !entry.is_enabled(context) {
            tracing::warn!(tool = %call.name, "backend requested a disabled tool");
            return format!("Tool '{}' is not enabled for this user.", call.name);
        }
        tracing::debug!(tool = %call.name, "executing tool");
        entry.tool.call(&call.arguments, context).await
    }
}

/// Handler that offers tools to the backend and runs the ones it picks
///
/// Exactly one backend round trip. Tool outputs are joined with newlines to
/// form the reply; without tool calls the completion text is the reply.
pub struct ToolHandler {
    name: String,
    description: String,
    instructions: String,
    llm: LLMRouter,
    tools: ToolBox,
}

impl ToolHandler {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        llm: LLMRouter,
        tools: ToolBox,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            llm,
            tools,
        }
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }
}

#[async_trait]
impl Handler for ToolHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, request: &Request, context: &Context) -> Result<Reply, HandlerError> {
        let completion = CompletionRequest::new(vec![Message::user(request.message())])
            .with_system(self.instructions.clone())
            .with_tools(self.tools.specs(context));
        let response = self.llm.complete(completion).await?;

        if response.tool_calls.is_empty() {
            return Ok(Reply::text(&self.name, response.content));
        }

        let mut outputs = Vec::with_capacity(response.tool_calls.len());
        let mut calls = Vec::with_capacity(response.tool_calls.len());
        for call in &response.tool_calls {
            let output = self.tools.execute(call, context).await;
            calls.push(serde_json::json!({
                "name": call.name,
                "arguments": call.arguments,
                "output": output,
            }));
            outputs.push(output);
        }

        Ok(Reply::text(&self.name, outputs.join("\n"))
            .with_data(serde_json::json!({ "tool_calls": calls })))
    }
}
