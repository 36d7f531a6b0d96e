//! agentgate Kernel - the dispatch gate
//!
//! One request in, one reply or one rejection out:
//!
//! 1. **Pre-check**: input guards run in registration order; the first denial stops everything
//! 2. **Route**: a static target, or a classifier that writes the request category once
//! 3. **Invoke**: exactly one enabled handler, exactly once
//! 4. **Post-check**: output guards may withhold the reply behind a fixed notice
//!
//! Enablement predicates are evaluated here, never inside handlers.

pub mod gate;
pub mod handler;
pub mod route;
pub mod trace;

pub use gate::{
    Dispatch, DispatchError, DispatchGate, DispatchGateBuilder, GateBuildError, GuardStage,
    Outcome, Rejection,
};
pub use handler::{Enablement, Handler, HandlerEntry, HandlerError, HandlerSet};
pub use route::{
    Classifier, ClassifyError, ClassifyingRoute, Fallback, KeywordClassifier, Route,
    RouteDecision, RoutingError,
};
pub use trace::{DispatchStage, DispatchTrace, DispatchTraceEvent, TraceStep};
