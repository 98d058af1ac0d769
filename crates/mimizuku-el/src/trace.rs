//! 完備化イベントのトレースフック

use crate::model::ConceptExpr;
use crate::rules::RuleKind;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// What a rule changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    ConceptAdded(ConceptExpr),
    RoleAdded { relation: String, successor: String },
    IndividualCreated { initial_concept: ConceptExpr },
}

/// One change made by one rule to one individual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub rule: RuleKind,
    pub individual: String,
    pub change: Change,
}

/// Subscriber for completion events
pub trait CompletionObserver: Send + Sync {
    fn on_event(&self, event: &CompletionEvent);
}

/// Forwards every event to `tracing` at TRACE level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CompletionObserver for TracingObserver {
    fn on_event(&self, event: &CompletionEvent) {
        match &event.change {
            Change::ConceptAdded(expr) => {
                tracing::trace!(rule = %event.rule, individual = %event.individual, concept = %expr, "concept added");
            }
            Change::RoleAdded { relation, successor } => {
                tracing::trace!(rule = %event.rule, individual = %event.individual, %relation, %successor, "role added");
            }
            Change::IndividualCreated { initial_concept } => {
                tracing::trace!(rule = %event.rule, individual = %event.individual, initial = %initial_concept, "individual created");
            }
        }
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<CompletionEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<CompletionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl CompletionObserver for EventLog {
    fn on_event(&self, event: &CompletionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
