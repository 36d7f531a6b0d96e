//! agentgate Core - Canonical types for single-turn agent dispatch
//!
//! Every crate in the workspace speaks these types:
//! - Request: one free-text user message, immutable once received
//! - Context: caller attributes (identity, tier) plus the routing category
//! - Reply: the terminal answer produced by exactly one handler
//!
//! # Invariants
//!
//! 1. A Request is never mutated after construction
//! 2. A Context category is written at most once per Request
//! 3. A Reply is never revised after it is returned

pub mod context;
pub mod error;
pub mod types;

pub use context::*;
pub use error::*;
pub use types::*;
