//! Route selection: static targets and category-based classification

use std::collections::BTreeMap;
use std::sync::Arc;

use agentgate_core::{Category, Context, ContextError, Request};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handler::HandlerSet;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Classifier backend failed: {0}")]
    Backend(#[from] agentgate_llm::LLMError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Handler '{handler}' is not enabled for this caller")]
    HandlerDisabled { handler: String },

    #[error("No enabled handler for category '{category}'")]
    NoEnabledHandler { category: String },

    #[error("Handler not registered: {handler}")]
    UnknownHandler { handler: String },

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Assigns a category to a request
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, request: &Request, context: &Context) -> Result<Category, ClassifyError>;
}

/// Ordered keyword rules; first matching rule wins, otherwise the default category
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    name: String,
    rules: Vec<(Category, Vec<String>)>,
    default: Category,
}

impl KeywordClassifier {
    pub fn new(name: impl Into<String>, default: Category) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            default,
        }
    }

    pub fn rule(
        mut self,
        category: impl Into<Category>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self.rules.push((category.into(), keywords));
        self
    }

    pub fn categorize(&self, text: &str) -> Category {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, request: &Request, _context: &Context) -> Result<Category, ClassifyError> {
        Ok(self.categorize(request.message()))
    }
}

/// What happens when the mapped handler is missing or disabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Handler(String),
    Fail,
}

#[derive(Clone)]
pub struct ClassifyingRoute {
    pub classifier: Arc<dyn Classifier>,
    pub routes: BTreeMap<Category, String>,
    pub fallback: Fallback,
}

impl ClassifyingRoute {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            routes: BTreeMap::new(),
            fallback: Fallback::Fail,
        }
    }

    pub fn map(mut self, category: impl Into<Category>, handler: impl Into<String>) -> Self {
        self.routes.insert(category.into(), handler.into());
        self
    }

    pub fn fallback_to(mut self, handler: impl Into<String>) -> Self {
        self.fallback = Fallback::Handler(handler.into());
        self
    }

    /// Every handler name this route can select
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.routes.values().map(|h| h.as_str()).collect();
        if let Fallback::Handler(h) = &self.fallback {
            targets.push(h.as_str());
        }
        targets
    }
}

#[derive(Clone)]
pub enum Route {
    Static { handler: String },
    Classifying(ClassifyingRoute),
}

impl Route {
    pub fn fixed(handler: impl Into<String>) -> Self {
        Route::Static {
            handler: handler.into(),
        }
    }

    pub fn classifying(route: ClassifyingRoute) -> Self {
        Route::Classifying(route)
    }

    pub fn targets(&self) -> Vec<&str> {
        match self {
            Route::Static { handler } => vec![handler.as_str()],
            Route::Classifying(route) => route.targets(),
        }
    }
}

/// Which handler was selected and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub handler: String,
    pub category: Option<Category>,
    pub fell_back: bool,
    /// Category came with the caller context instead of the classifier
    pub preassigned: bool,
}

impl ClassifyingRoute {
    /// Pick an enabled handler for an already-classified context
    pub fn select(&self, category: &Category, handlers: &HandlerSet, context: &Context) -> Result<RouteDecision, RoutingError> {
        if let Some(mapped) = self.routes.get(category) {
            if handlers.is_enabled(mapped, context) {
                return Ok(RouteDecision {
                    handler: mapped.clone(),
                    category: Some(category.clone()),
                    fell_back: false,
                    preassigned: false,
                });
            }
        }

        match &self.fallback {
            Fallback::Handler(fallback) if handlers.is_enabled(fallback, context) => Ok(RouteDecision {
                handler: fallback.clone(),
                category: Some(category.clone()),
                fell_back: true,
                preassigned: false,
            }),
            Fallback::Handler(fallback) => Err(RoutingError::HandlerDisabled {
                handler: fallback.clone(),
            }),
            Fallback::Fail => match self.routes.get(category) {
                Some(mapped) => Err(RoutingError::HandlerDisabled {
                    handler: mapped.clone(),
                }),
                None => Err(RoutingError::NoEnabledHandler {
                    category: category.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Enablement, Handler, HandlerError};
    use agentgate_core::{Reply, Tier};

    struct Named(&'static str);

    #[async_trait]
    impl Handler for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test handler"
        }

        async fn invoke(&self, _request: &Request, _context: &Context) -> Result<Reply, HandlerError> {
            Ok(Reply::text(self.0, "ok"))
        }
    }

    fn support_handlers() -> HandlerSet {
        let mut set = HandlerSet::new();
        set.insert(Arc::new(Named("general")), None);
        set.insert(Arc::new(Named("billing")), Some(Enablement::premium_only()));
        set
    }

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new("triage", Category::general())
            .rule("billing", ["refund", "bill"])
            .rule("technical", ["restart", "not working"])
    }

    #[test]
    fn test_keyword_first_rule_wins() {
        let c = classifier();
        assert_eq!(c.categorize("I need a REFUND"), Category::new("billing"));
        assert_eq!(c.categorize("refund, my app is not working"), Category::new("billing"));
        assert_eq!(c.categorize("please restart my service"), Category::new("technical"));
        assert_eq!(c.categorize("hello"), Category::general());
    }

    #[test]
    fn test_select_mapped_handler() {
        let route = ClassifyingRoute::new(Arc::new(classifier()))
            .map("billing", "billing")
            .fallback_to("general");
        let ctx = Context::new().with_tier(Tier::Premium);

        let decision = route.select(&Category::new("billing"), &support_handlers(), &ctx).unwrap();
        assert_eq!(decision.handler, "billing");
        assert!(!decision.fell_back);
    }

    #[test]
    fn test_disabled_handler_falls_back() {
        let route = ClassifyingRoute::new(Arc::new(classifier()))
            .map("billing", "billing")
            .fallback_to("general");

        let decision = route
            .select(&Category::new("billing"), &support_handlers(), &Context::new())
            .unwrap();
        assert_eq!(decision.handler, "general");
        assert!(decision.fell_back);
    }

    #[test]
    fn test_no_fallback_is_routing_error() {
        let route = ClassifyingRoute::new(Arc::new(classifier())).map("billing", "billing");

        let err = route
            .select(&Category::new("billing"), &support_handlers(), &Context::new())
            .unwrap_err();
        assert_eq!(err, RoutingError::HandlerDisabled { handler: "billing".to_string() });

        let err = route
            .select(&Category::new("weather"), &support_handlers(), &Context::new())
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoEnabledHandler { .. }));
    }
}
