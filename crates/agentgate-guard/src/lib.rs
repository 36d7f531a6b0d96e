//! agentgate Guard - request and reply validation
//!
//! A guard is a pure predicate over either the incoming request (pre-check)
//! or the candidate reply (post-check). It answers with a `Decision`:
//! allowed or denied, plus an explanation.
//!
//! # Key Principle
//!
//! **Guards observe, they never act.** A guard may ask the inference backend
//! for a verdict, but it never mutates shared state.
//!
//! Everything a backend says about a subject is treated as untrusted and is
//! parsed into the typed `Decision` contract before the gate relies on it.

use agentgate_core::{Context, Reply, Request};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod classifier;

pub use classifier::*;

/// Notice shown instead of a reply that failed a post-check
pub const DEFAULT_REJECTION_NOTICE: &str =
    "This response was withheld because it did not pass the output policy.";

/// Errors that can occur while evaluating a guard
#[derive(Error, Debug, Clone)]
pub enum GuardError {
    #[error("Guard backend failed: {0}")]
    Backend(#[from] agentgate_llm::LLMError),

    #[error("Invalid verdict: {message}")]
    InvalidVerdict { message: String },
}

pub type Result<T> = std::result::Result<T, GuardError>;

/// Outcome of a single guard evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub explanation: String,
}

impl Decision {
    pub fn allow(explanation: impl Into<String>) -> Self {
        Self {
            allowed: true,
            explanation: explanation.into(),
        }
    }

    pub fn deny(explanation: impl Into<String>) -> Self {
        Self {
            allowed: false,
            explanation: explanation.into(),
        }
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

/// Text view of something a guard can inspect
pub trait GuardSubject {
    fn subject_text(&self) -> &str;
}

impl GuardSubject for Request {
    fn subject_text(&self) -> &str {
        self.message()
    }
}

impl GuardSubject for Reply {
    fn subject_text(&self) -> &str {
        &self.text
    }
}

impl GuardSubject for str {
    fn subject_text(&self) -> &str {
        self
    }
}

/// A predicate over a request (`Guard<Request>`) or a reply (`Guard<Reply>`)
#[async_trait]
pub trait Guard<S: GuardSubject + Sync + ?Sized>: Send + Sync {
    /// Name used in traces and rejections
    fn name(&self) -> &str;

    /// Evaluate the subject
    async fn check(&self, subject: &S, context: &Context) -> Result<Decision>;

    /// Fixed text shown to the caller when this guard withholds a reply
    fn rejection_notice(&self) -> &str {
        DEFAULT_REJECTION_NOTICE
    }
}

// ============================================================================
// Keyword Guard
// ============================================================================

/// Denies subjects containing any banned keyword
///
/// Single words match whole tokens, case-insensitively ("pin" does not match
/// "spinning"). Keywords with spaces match as substrings.
#[derive(Debug, Clone)]
pub struct KeywordGuard {
    name: String,
    keywords: Vec<String>,
    explanation: String,
}

impl KeywordGuard {
    pub fn new(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.into().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            explanation: explanation.into(),
        }
    }

    /// Withholds replies that mention internal account data
    pub fn sensitive_data() -> Self {
        Self::new(
            "sensitive_data",
            ["accounts", "pin"],
            "Sorry, I cannot share sensitive internal data.",
        )
    }

    /// First banned keyword present in `text`
    pub fn find_match(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        self.keywords
            .iter()
            .find(|k| {
                if k.contains(char::is_whitespace) {
                    lower.contains(k.as_str())
                } else {
                    tokens.contains(&k.as_str())
                }
            })
            .map(|k| k.as_str())
    }
}

#[async_trait]
impl<S: GuardSubject + Sync + ?Sized> Guard<S> for KeywordGuard {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, subject: &S, _context: &Context) -> Result<Decision> {
        match self.find_match(subject.subject_text()) {
            Some(keyword) => {
                tracing::debug!(guard = %self.name, keyword, "banned keyword found");
                Ok(Decision::deny(self.explanation.clone()))
            }
            None => Ok(Decision::allow("no banned keywords")),
        }
    }

    fn rejection_notice(&self) -> &str {
        &self.explanation
    }
}

// ============================================================================
// Injection Guard
// ============================================================================

/// Denies requests that look like prompt injection
#[derive(Debug, Clone)]
pub struct InjectionGuard {
    patterns: Vec<String>,
}

impl InjectionGuard {
    pub fn new() -> Self {
        Self::with_patterns([
            "ignore previous",
            "ignore all previous",
            "ignore your instructions",
            "disregard",
            "bypass",
            "override",
            "skip validation",
            "system prompt",
            "you are now",
        ])
    }

    pub fn with_patterns(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
        }
    }

    /// Check for prompt injection patterns in a string
    pub fn detect(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.patterns
            .iter()
            .find(|p| lower.contains(p.as_str()))
            .map(|p| p.as_str())
    }
}

impl Default for InjectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: GuardSubject + Sync + ?Sized> Guard<S> for InjectionGuard {
    fn name(&self) -> &str {
        "injection"
    }

    async fn check(&self, subject: &S, _context: &Context) -> Result<Decision> {
        match self.detect(subject.subject_text()) {
            Some(pattern) => Ok(Decision::deny(format!(
                "Potential prompt injection detected ('{}'). Please rephrase your request.",
                pattern
            ))),
            None => Ok(Decision::allow("no injection patterns")),
        }
    }
}
