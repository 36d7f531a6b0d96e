//! Handlers and their enablement predicates

use std::collections::BTreeMap;
use std::sync::Arc;

use agentgate_core::{Category, Context, Reply, Request};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Backend error: {0}")]
    Backend(#[from] agentgate_llm::LLMError),
    #[error("Handler failed: {0}")]
    Failed(String),
}

/// A statically registered operation that can serve one request
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    /// What this handler is for (shown to classifiers and in listings)
    fn description(&self) -> &str;

    async fn invoke(&self, request: &Request, context: &Context) -> Result<Reply, HandlerError>;
}

/// Predicate over the caller context deciding whether something is reachable
#[derive(Clone)]
pub struct Enablement(Arc<dyn Fn(&Context) -> bool + Send + Sync>);

impl Enablement {
    pub fn new(predicate: impl Fn(&Context) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn premium_only() -> Self {
        Self::new(|ctx| ctx.tier.is_premium())
    }

    pub fn category_is(category: impl Into<Category>) -> Self {
        let category = category.into();
        Self::new(move |ctx| ctx.category() == Some(&category))
    }

    /// Caller identity must match `name` and `pin` exactly
    pub fn authenticated(name: impl Into<String>, pin: u32) -> Self {
        let name = name.into();
        Self::new(move |ctx| {
            ctx.identity
                .as_ref()
                .map(|id| id.name == name && id.pin == Some(pin))
                .unwrap_or(false)
        })
    }

    pub fn evaluate(&self, context: &Context) -> bool {
        (self.0)(context)
    }
}

impl std::fmt::Debug for Enablement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Enablement(..)")
    }
}

#[derive(Clone)]
pub struct HandlerEntry {
    pub handler: Arc<dyn Handler>,
    pub enablement: Option<Enablement>,
}

impl HandlerEntry {
    pub fn is_enabled(&self, context: &Context) -> bool {
        self.enablement
            .as_ref()
            .map(|e| e.evaluate(context))
            .unwrap_or(true)
    }
}

/// Static registry of handlers, ordered by name
#[derive(Clone, Default)]
pub struct HandlerSet {
    entries: BTreeMap<String, HandlerEntry>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; returns false if the name is already taken
    pub fn insert(&mut self, handler: Arc<dyn Handler>, enablement: Option<Enablement>) -> bool {
        let name = handler.name().to_string();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, HandlerEntry { handler, enablement });
        true
    }

    pub fn get(&self, name: &str) -> Option<&HandlerEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered and enabled for this context
    pub fn is_enabled(&self, name: &str, context: &Context) -> bool {
        self.entries
            .get(name)
            .map(|e| e.is_enabled(context))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_core::{Identity, Tier};

    struct Echo(&'static str);

    #[async_trait]
    impl Handler for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "echoes the request"
        }

        async fn invoke(&self, request: &Request, _context: &Context) -> Result<Reply, HandlerError> {
            Ok(Reply::text(self.0, request.message()))
        }
    }

    #[test]
    fn test_premium_only() {
        let gate = Enablement::premium_only();
        assert!(!gate.evaluate(&Context::new()));
        assert!(gate.evaluate(&Context::new().with_tier(Tier::Premium)));
    }

    #[test]
    fn test_category_is() {
        let gate = Enablement::category_is("technical");
        assert!(!gate.evaluate(&Context::new()));
        assert!(gate.evaluate(&Context::new().with_category(Category::new("technical"))));
        assert!(!gate.evaluate(&Context::new().with_category(Category::new("billing"))));
    }

    #[test]
    fn test_authenticated() {
        let gate = Enablement::authenticated("Arisha", 1234);
        let good = Context::new().with_identity(Identity::new("Arisha").with_pin(1234));
        let wrong_pin = Context::new().with_identity(Identity::new("Arisha").with_pin(4321));
        let no_pin = Context::new().with_identity(Identity::new("Arisha"));
        assert!(gate.evaluate(&good));
        assert!(!gate.evaluate(&wrong_pin));
        assert!(!gate.evaluate(&no_pin));
        assert!(!gate.evaluate(&Context::new()));
    }

    #[test]
    fn test_handler_set() {
        let mut set = HandlerSet::new();
        assert!(set.insert(Arc::new(Echo("general")), None));
        assert!(set.insert(Arc::new(Echo("billing")), Some(Enablement::premium_only())));
        assert!(!set.insert(Arc::new(Echo("general")), None));

        assert_eq!(set.names(), vec!["billing", "general"]);
        assert!(set.is_enabled("general", &Context::new()));
        assert!(!set.is_enabled("billing", &Context::new()));
        assert!(!set.is_enabled("missing", &Context::new()));
    }
}
