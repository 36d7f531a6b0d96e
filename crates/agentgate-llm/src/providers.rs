//! LLM Provider implementations

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::types::*;

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Get the provider kind
    fn kind(&self) -> ProviderKind;

    /// Complete a conversation in a single round trip
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

// ============================================================================
// OpenAI-Compatible Provider (OpenRouter, Gemini, ...)
// ============================================================================

/// Chat-completions client for any OpenAI-compatible endpoint
pub struct OpenAICompatProvider {
    config: BackendConfig,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LLMError::ConfigurationError {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { config, client })
    }

    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        Self::new(BackendConfig::from_env(kind)?)
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn build_request(&self, request: CompletionRequest) -> ChatRequest {
        let mut messages: Vec<ChatMessage> = vec![];

        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
                name: None,
                tool_call_id: None,
            });
        }

        for msg in request.messages {
            messages.push(ChatMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content,
                name: msg.name,
                tool_call_id: msg.tool_call_id,
            });
        }

        let tools = request.tools.map(|tools| {
            tools
                .into_iter()
                .map(|t| ChatTool {
                    tool_type: "function",
                    function: ChatFunction {
                        name: t.name,
                        description: t.description,
                        parameters: t.parameters,
                    },
                })
                .collect::<Vec<_>>()
        });

        let response_format = if let Some(schema) = request.response_schema {
            Some(serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                }
            }))
        } else if request.json_mode {
            Some(serde_json::json!({"type": "json_object"}))
        } else {
            None
        };

        ChatRequest {
            model: request.model.unwrap_or_else(|| self.config.model.clone()),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            tool_choice: tools
                .as_ref()
                .map(|_| request.tool_choice.unwrap_or_default().as_str().to_string()),
            tools,
            response_format,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> LLMError {
        if e.is_timeout() {
            LLMError::Timeout {
                seconds: self.config.timeout.as_secs(),
            }
        } else {
            LLMError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunction,
}

#[derive(Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: String,
    function: ChatFunctionCall,
}

#[derive(Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    fn name(&self) -> &'static str {
        match self.config.kind {
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::Gemini => "Gemini",
            _ => "OpenAI-Compatible",
        }
    }

    fn kind(&self) -> ProviderKind {
        self.config.kind
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let chat_request = self.build_request(request);

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::RateLimited { message: body });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::RequestFailed {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| LLMError::InvalidResponse {
                message: e.to_string(),
            })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::InvalidResponse {
                message: "No choices in response".to_string(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, call)| {
                // Malformed arguments go through as a string; the tool reports it.
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::String(call.function.arguments));
                ToolCall {
                    id: if call.id.is_empty() {
                        format!("call_{}", index)
                    } else {
                        call.id
                    },
                    name: call.function.name,
                    arguments,
                }
            })
            .collect();

        let usage = chat_response.usage.unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default().trim().to_string(),
            tool_calls,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            model: Some(chat_response.model.unwrap_or_else(|| chat_request.model.clone())),
        })
    }
}

// ============================================================================
// Scripted Provider (offline)
// ============================================================================

/// Answers from a queue of canned responses and records every request
///
/// Useful for exercising handlers and guards without a network.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text answer
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.push(Ok(CompletionResponse::new(content)));
        self
    }

    /// Queue a JSON answer (for structured-output callers)
    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.push(Ok(CompletionResponse::new(value.to_string())));
        self
    }

    pub fn with_response(self, response: CompletionResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn with_error(self, error: LLMError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<CompletionResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Scripted
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(LLMError::ProviderNotAvailable {
                    provider: "scripted (no responses left)".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> BackendConfig {
        BackendConfig {
            kind: ProviderKind::Gemini,
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_text_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gemini-2.0-flash",
                "messages": [
                    {"role": "system", "content": "You are a helpful writer agent."},
                    {"role": "user", "content": "Write a poem"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  Roses are red  "}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
            })))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let request = CompletionRequest::new(vec![Message::user("Write a poem")])
            .with_system("You are a helpful writer agent.");
        let response = provider.complete(request).await.unwrap();

        assert_eq!(response.content, "Roses are red");
        assert_eq!(response.usage.total_tokens, 14);
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_tool_calls_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "tool_choice": "auto",
                "tools": [{"type": "function", "function": {"name": "get_capital"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "abc", "type": "function",
                         "function": {"name": "get_capital", "arguments": "{\"country\":\"Pakistan\"}"}},
                        {"id": "", "type": "function",
                         "function": {"name": "get_capital", "arguments": "not json"}}
                    ]
                }}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let request = CompletionRequest::new(vec![Message::user("Tell me about Pakistan")])
            .with_tools(vec![ToolSpec {
                name: "get_capital".to_string(),
                description: "Fetch the capital".to_string(),
                parameters: serde_json::json!({"type": "object"}),
            }]);
        let response = provider.complete(request).await.unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].id, "abc");
        assert_eq!(response.tool_calls[0].arguments["country"], "Pakistan");
        assert_eq!(response.tool_calls[1].id, "call_1");
        assert_eq!(response.tool_calls[1].arguments, serde_json::json!("not json"));
    }

    #[tokio::test]
    async fn test_structured_output_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_schema", "json_schema": {"name": "verdict"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"tripwire\": false}"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let request = CompletionRequest::new(vec![Message::user("check")]).with_response_schema(
            ResponseSchema::new("verdict", serde_json::json!({"type": "object"})),
        );
        let response = provider.complete(request).await.unwrap();
        assert_eq!(response.json().unwrap()["tripwire"], false);
    }

    #[tokio::test]
    async fn test_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let err = provider
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        match err {
            LLMError::RequestFailed { message } => assert!(message.contains("bad key")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let err = provider
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let err = provider
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_scripted_provider() {
        let provider = ScriptedProvider::new()
            .with_text("first")
            .with_error(LLMError::NetworkError {
                message: "down".to_string(),
            });

        let first = provider
            .complete(CompletionRequest::new(vec![Message::user("a")]))
            .await
            .unwrap();
        assert_eq!(first.content, "first");

        let second = provider
            .complete(CompletionRequest::new(vec![Message::user("b")]))
            .await;
        assert!(matches!(second, Err(LLMError::NetworkError { .. })));

        let third = provider
            .complete(CompletionRequest::new(vec![Message::user("c")]))
            .await;
        assert!(matches!(third, Err(LLMError::ProviderNotAvailable { .. })));

        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.requests()[1].messages[0].content, "b");
    }
}
