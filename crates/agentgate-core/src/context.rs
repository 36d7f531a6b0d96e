//! Caller context attached to a request

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Service tier of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Standard,
    Premium,
}

impl Tier {
    /// Interpret a yes/no console answer ("yes" means premium)
    pub fn from_answer(answer: &str) -> Self {
        if answer.trim().eq_ignore_ascii_case("yes") {
            Self::Premium
        } else {
            Self::Standard
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Premium)
    }
}

/// Who is calling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<u32>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pin: None,
        }
    }

    pub fn with_pin(mut self, pin: u32) -> Self {
        self.pin = Some(pin);
        self
    }
}

/// Routing category assigned to a request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Category(String);

impl Category {
    pub const GENERAL: &'static str = "general";
    pub const BILLING: &'static str = "billing";
    pub const TECHNICAL: &'static str = "technical";
    pub const MATH: &'static str = "math";
    pub const ENGLISH: &'static str = "english";
    pub const MOOD: &'static str = "mood";
    pub const ACTIVITY: &'static str = "activity";
    pub const BALANCE: &'static str = "balance";
    pub const TRANSFER: &'static str = "transfer";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn general() -> Self {
        Self::new(Self::GENERAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Per-request caller attributes
///
/// The category is private: only `assign_category` may set it, and only once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Context whose category was decided before dispatch
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.name.as_str())
    }

    /// Record the routing category. Fails if one is already set.
    pub fn assign_category(&mut self, category: Category) -> Result<(), ContextError> {
        if let Some(existing) = &self.category {
            return Err(ContextError::CategoryAlreadyAssigned {
                existing: existing.clone(),
                attempted: category,
            });
        }
        self.category = Some(category);
        Ok(())
    }
}
