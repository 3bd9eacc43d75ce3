//! # Transition Observer
//!
//! The engines never log. Every committed state change is reported to an
//! injected [`TransitionObserver`]; the branch crate decides whether that
//! becomes a `tracing` event, an in-memory audit row, or both.
//!
//! ```text
//!  ReservationBook / OrderBook / Floor
//!          │  on_transition(&TransitionEvent)
//!          │  on_failure(&FailureEvent)      (payment partial failures)
//!          ▼
//!  ┌─────────────────────────┐
//!  │ dyn TransitionObserver  │── NoopObserver (default)
//!  └─────────────────────────┘── TracingObserver / AuditTrail (meeple-branch)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::EntityKind;

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransitionEvent {
    pub entity: EntityKind,
    pub id: String,
    /// `None` when the entity was just created.
    pub from: Option<String>,
    pub to: String,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
    /// Extra context (penalty amount, table id, points credited).
    pub detail: Option<String>,
}

impl TransitionEvent {
    pub fn new(
        entity: EntityKind,
        id: impl Into<String>,
        from: Option<String>,
        to: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity,
            id: id.into(),
            from,
            to: to.into(),
            at,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A failure that left earlier side effects in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FailureEvent {
    pub entity: EntityKind,
    pub id: String,
    /// Which step failed ("close order", "credit member").
    pub step: String,
    pub cause: String,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
}

/// Receives committed transitions from the engines.
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, event: &TransitionEvent);

    fn on_failure(&self, _event: &FailureEvent) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TransitionObserver for NoopObserver {
    fn on_transition(&self, _event: &TransitionEvent) {}
}
