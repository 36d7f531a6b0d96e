//! agentgate Agents - handlers and ready-made gates
//!
//! This crate provides the concrete handlers that sit behind a `DispatchGate`:
//!
//! - **Responder**: one completion, text out
//! - **ToolHandler**: one completion with tools, tool outputs out
//!
//! and the assistants assembled from them (bank, support desk, country info,
//! writer, smart store, tutor, mood).
//!
//! # Design
//!
//! Handlers only talk to the inference backend through `LLMRouter`.
//! Tools validate their own arguments and answer with plain sentences; a bad
//! account number or amount is reported in text, never raised as an error.

pub mod assistants;
pub mod bank;
pub mod classifier;
pub mod countries;
pub mod responder;
pub mod support;
pub mod tools;

pub use assistants::*;
pub use bank::{balance_gate, bank_gate, transfer_gate, CheckBalanceTool, TransferFundsTool};
pub use classifier::LlmClassifier;
pub use countries::{
    country_gate, CapitalTool, CountryDirectory, CountryError, LanguageTool, PopulationTool,
    RestCountriesClient,
};
pub use responder::Responder;
pub use support::support_gate;
pub use tools::{Tool, ToolBox, ToolHandler};
