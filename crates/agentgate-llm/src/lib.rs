//! agentgate LLM - Inference backend abstraction
//!
//! Every assistant talks to a remote chat-completion endpoint that speaks the
//! OpenAI wire format. Two endpoint families are supported out of the box:
//!
//! - OpenRouter: `https://openrouter.ai/api/v1` (`OPENROUTER_API_KEY`)
//! - Gemini: `https://generativelanguage.googleapis.com/v1beta/openai` (`GEMINI_API_KEY`)
//!
//! Any other OpenAI-compatible server can be used through `AGENTGATE_BASE_URL`.
//!
//! ## Key Design Principles
//!
//! 1. The backend is opaque: callers only see `CompletionRequest` / `CompletionResponse`
//! 2. One request, one round trip. Nothing is retried
//! 3. A missing credential is a configuration error, never a silent fallback
//! 4. Structured output is requested with a JSON schema and validated by the caller

pub mod config;
pub mod providers;
pub mod router;
pub mod types;

pub use config::*;
pub use providers::*;
pub use router::*;
pub use types::*;
