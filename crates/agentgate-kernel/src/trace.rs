//! Per-dispatch audit trail

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::route::RouteDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStage {
    Guard,
    Route,
    Invoke,
    Output,
}

/// One thing the gate did, with the facts needed to audit it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceStep {
    InputGuard {
        guard: String,
        allowed: bool,
        explanation: String,
    },
    Route(RouteDecision),
    Invoke {
        handler: String,
        has_data: bool,
    },
    /// The explanation stays here even when the caller only sees a notice
    OutputGuard {
        guard: String,
        allowed: bool,
        explanation: String,
    },
}

impl TraceStep {
    pub fn stage(&self) -> DispatchStage {
        match self {
            TraceStep::InputGuard { .. } => DispatchStage::Guard,
            TraceStep::Route(_) => DispatchStage::Route,
            TraceStep::Invoke { .. } => DispatchStage::Invoke,
            TraceStep::OutputGuard { .. } => DispatchStage::Output,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchTraceEvent {
    pub at: DateTime<Utc>,
    pub step: TraceStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchTrace {
    pub gate: String,
    pub request_id: String,
    pub started_at: DateTime<Utc>,
    pub events: VecDeque<DispatchTraceEvent>,
    /// Oldest events dropped to stay within `capacity`
    #[serde(default)]
    pub evicted: usize,
    #[serde(skip)]
    capacity: Option<usize>,
}

impl DispatchTrace {
    pub fn new(gate: impl Into<String>, request_id: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            gate: gate.into(),
            request_id: request_id.into(),
            started_at: Utc::now(),
            events: VecDeque::new(),
            evicted: 0,
            capacity,
        }
    }

    pub fn push(&mut self, step: TraceStep) {
        if self.capacity == Some(0) {
            self.evicted += 1;
            return;
        }
        if let Some(capacity) = self.capacity {
            while self.events.len() >= capacity {
                self.events.pop_front();
                self.evicted += 1;
            }
        }
        self.events.push_back(DispatchTraceEvent {
            at: Utc::now(),
            step,
        });
    }

    pub fn steps(&self) -> impl Iterator<Item = &TraceStep> {
        self.events.iter().map(|e| &e.step)
    }

    pub fn stages(&self) -> Vec<DispatchStage> {
        self.steps().map(TraceStep::stage).collect()
    }

    /// The route decision, unless it was evicted or routing never happened
    pub fn route(&self) -> Option<&RouteDecision> {
        self.steps().find_map(|step| match step {
            TraceStep::Route(decision) => Some(decision),
            _ => None,
        })
    }

    /// Two dispatches took the same steps; timestamps and request ids are ignored
    pub fn is_replayable_with(&self, other: &DispatchTrace) -> bool {
        self.evicted == other.evicted && self.steps().eq(other.steps())
    }
}
