//! DispatchGate: guard, route, invoke, post-check

use std::sync::Arc;

use agentgate_core::{Context, Reply, Request};
use agentgate_guard::{Guard, GuardError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Instrument;

use crate::handler::{Enablement, Handler, HandlerError, HandlerSet};
use crate::route::{ClassifyError, Route, RouteDecision, RoutingError};
use crate::trace::{DispatchTrace, TraceStep};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Guard '{guard}' failed: {source}")]
    Guard {
        guard: String,
        #[source]
        source: GuardError,
    },

    #[error("Classification failed: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Routing failed: {0}")]
    Routing(#[from] RoutingError),

    #[error("Handler '{handler}' failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// The inference backend was unreachable or answered badly
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            DispatchError::Guard { source: GuardError::Backend(_), .. }
                | DispatchError::Classify(ClassifyError::Backend(_))
                | DispatchError::Handler { source: HandlerError::Backend(_), .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateBuildError {
    #[error("Handler registered twice: {name}")]
    DuplicateHandler { name: String },

    #[error("Gate '{gate}' has no route")]
    MissingRoute { gate: String },

    #[error("Route targets unregistered handler: {handler}")]
    UnknownRouteTarget { handler: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardStage {
    Input,
    Output,
}

/// A guard said no
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub stage: GuardStage,
    pub guard: String,
    /// Text safe to show the caller
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Reply(Reply),
    Rejected(Rejection),
}

impl Outcome {
    /// What the caller gets to read
    pub fn text(&self) -> &str {
        match self {
            Outcome::Reply(reply) => &reply.text,
            Outcome::Rejected(rejection) => &rejection.explanation,
        }
    }

    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Outcome::Reply(reply) => Some(reply),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Reply(_) => None,
            Outcome::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

/// Result of one dispatch
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub outcome: Outcome,
    /// Caller context after routing (category assigned if classified)
    pub context: Context,
    pub route: Option<RouteDecision>,
    pub trace: DispatchTrace,
}

pub struct DispatchGate {
    name: String,
    input_guards: Vec<Arc<dyn Guard<Request>>>,
    output_guards: Vec<Arc<dyn Guard<Reply>>>,
    handlers: HandlerSet,
    route: Route,
    trace_max_entries: Option<usize>,
}

pub struct DispatchGateBuilder {
    name: String,
    input_guards: Vec<Arc<dyn Guard<Request>>>,
    output_guards: Vec<Arc<dyn Guard<Reply>>>,
    handlers: Vec<(Arc<dyn Handler>, Option<Enablement>)>,
    route: Option<Route>,
    trace_max_entries: Option<usize>,
}

impl DispatchGateBuilder {
    pub fn input_guard(mut self, guard: impl Guard<Request> + 'static) -> Self {
        self.input_guards.push(Arc::new(guard));
        self
    }

    pub fn output_guard(mut self, guard: impl Guard<Reply> + 'static) -> Self {
        self.output_guards.push(Arc::new(guard));
        self
    }

    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push((Arc::new(handler), None));
        self
    }

    pub fn gated_handler(mut self, handler: impl Handler + 'static, enablement: Enablement) -> Self {
        self.handlers.push((Arc::new(handler), Some(enablement)));
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    pub fn trace_max_entries(mut self, max: usize) -> Self {
        self.trace_max_entries = Some(max);
        self
    }

    pub fn build(self) -> Result<DispatchGate, GateBuildError> {
        let mut handlers = HandlerSet::new();
        for (handler, enablement) in self.handlers {
            let name = handler.name().to_string();
            if !handlers.insert(handler, enablement) {
                return Err(GateBuildError::DuplicateHandler { name });
            }
        }

        let route = self
            .route
            .ok_or_else(|| GateBuildError::MissingRoute { gate: self.name.clone() })?;
        if let Some(missing) = route.targets().into_iter().find(|t| !handlers.contains(t)) {
            return Err(GateBuildError::UnknownRouteTarget {
                handler: missing.to_string(),
            });
        }

        Ok(DispatchGate {
            name: self.name,
            input_guards: self.input_guards,
            output_guards: self.output_guards,
            handlers,
            route,
            trace_max_entries: self.trace_max_entries,
        })
    }
}

impl DispatchGate {
    pub fn builder(name: impl Into<String>) -> DispatchGateBuilder {
        DispatchGateBuilder {
            name: name.into(),
            input_guards: Vec::new(),
            output_guards: Vec::new(),
            handlers: Vec::new(),
            route: None,
            trace_max_entries: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    /// Run one request through the gate
    pub async fn dispatch(&self, request: Request, context: Option<Context>) -> Result<Dispatch, DispatchError> {
        let span = tracing::info_span!("dispatch", gate = %self.name, request_id = %request.id());
        self.run(request, context.unwrap_or_default())
            .instrument(span)
            .await
    }

    async fn run(&self, request: Request, mut context: Context) -> Result<Dispatch, DispatchError> {
        let mut trace = DispatchTrace::new(&self.name, request.id().to_string(), self.trace_max_entries);

        for guard in &self.input_guards {
            let decision = guard
                .check(&request, &context)
                .await
                .map_err(|source| DispatchError::Guard {
                    guard: guard.name().to_string(),
                    source,
                })?;
            trace.push(TraceStep::InputGuard {
                guard: guard.name().to_string(),
                allowed: decision.allowed,
                explanation: decision.explanation.clone(),
            });
            if decision.is_denied() {
                tracing::warn!(guard = guard.name(), "request rejected by input guard");
                return Ok(Dispatch {
                    outcome: Outcome::Rejected(Rejection {
                        stage: GuardStage::Input,
                        guard: guard.name().to_string(),
                        explanation: decision.explanation,
                    }),
                    context,
                    route: None,
                    trace,
                });
            }
        }

        let decision = self.select(&request, &mut context).await?;
        trace.push(TraceStep::Route(decision.clone()));
        tracing::info!(handler = %decision.handler, fell_back = decision.fell_back, "handler selected");

        let entry = self
            .handlers
            .get(&decision.handler)
            .ok_or_else(|| RoutingError::UnknownHandler {
                handler: decision.handler.clone(),
            })?;
        if !entry.is_enabled(&context) {
            return Err(RoutingError::HandlerDisabled {
                handler: decision.handler.clone(),
            }
            .into());
        }

        let reply = entry
            .handler
            .invoke(&request, &context)
            .await
            .map_err(|source| DispatchError::Handler {
                handler: decision.handler.clone(),
                source,
            })?;
        trace.push(TraceStep::Invoke {
            handler: reply.handler.clone(),
            has_data: reply.data.is_some(),
        });

        for guard in &self.output_guards {
            let verdict = guard
                .check(&reply, &context)
                .await
                .map_err(|source| DispatchError::Guard {
                    guard: guard.name().to_string(),
                    source,
                })?;
            trace.push(TraceStep::OutputGuard {
                guard: guard.name().to_string(),
                allowed: verdict.allowed,
                explanation: verdict.explanation.clone(),
            });
            if verdict.is_denied() {
                tracing::warn!(guard = guard.name(), "reply withheld by output guard");
                return Ok(Dispatch {
                    outcome: Outcome::Rejected(Rejection {
                        stage: GuardStage::Output,
                        guard: guard.name().to_string(),
                        explanation: guard.rejection_notice().to_string(),
                    }),
                    context,
                    route: Some(decision),
                    trace,
                });
            }
        }

        Ok(Dispatch {
            outcome: Outcome::Reply(reply),
            context,
            route: Some(decision),
            trace,
        })
    }

    async fn select(&self, request: &Request, context: &mut Context) -> Result<RouteDecision, DispatchError> {
        match &self.route {
            Route::Static { handler } => {
                if !self.handlers.is_enabled(handler, context) {
                    return Err(RoutingError::HandlerDisabled {
                        handler: handler.clone(),
                    }
                    .into());
                }
                Ok(RouteDecision {
                    handler: handler.clone(),
                    category: context.category().cloned(),
                    fell_back: false,
                    preassigned: false,
                })
            }
            Route::Classifying(route) => {
                let preassigned = context.category().is_some();
                if !preassigned {
                    let category = route.classifier.classify(request, context).await?;
                    tracing::debug!(classifier = route.classifier.name(), %category, "request classified");
                    context.assign_category(category).map_err(RoutingError::from)?;
                }
                let category = context
                    .category()
                    .cloned()
                    .ok_or_else(|| RoutingError::NoEnabledHandler {
                        category: String::new(),
                    })?;
                let mut decision = route.select(&category, &self.handlers, context)?;
                decision.preassigned = preassigned;
                Ok(decision)
            }
        }
    }
}
