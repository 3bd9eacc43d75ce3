//! # Audit Observers
//!
//! Where the core engines' transition events end up.
//!
//! ```text
//!  ReservationBook / OrderBook / Floor
//!          │ on_transition / on_failure
//!          ▼
//!  ┌────────────────────┐   record   ┌──────────────────────────┐
//!  │  AuditTrail        │──────────► │ Vec<AuditEntry> (memory) │
//!  └─────────┬──────────┘            └──────────────────────────┘
//!            │ forward
//!            ▼
//!  ┌────────────────────┐
//!  │  TracingObserver   │── info!  state transition
//!  └────────────────────┘── warn!  partial failure
//! ```
//!
//! The trail lives for the operating session only.

use meeple_core::{EntityKind, FailureEvent, TransitionEvent, TransitionObserver};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

// =============================================================================
// Tracing Observer
// =============================================================================

/// Turns engine events into structured `tracing` events.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    branch_id: String,
}

impl TracingObserver {
    pub fn new(branch_id: impl Into<String>) -> Self {
        Self {
            branch_id: branch_id.into(),
        }
    }
}

impl TransitionObserver for TracingObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        info!(
            branch = %self.branch_id,
            entity = %event.entity,
            id = %event.id,
            from = event.from.as_deref().unwrap_or("-"),
            to = %event.to,
            detail = event.detail.as_deref().unwrap_or(""),
            "State transition"
        );
    }

    fn on_failure(&self, event: &FailureEvent) {
        warn!(
            branch = %self.branch_id,
            entity = %event.entity,
            id = %event.id,
            step = %event.step,
            cause = %event.cause,
            "Partial failure, earlier steps kept"
        );
    }
}

// =============================================================================
// Audit Trail
// =============================================================================

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEntry {
    Transition(TransitionEvent),
    Failure(FailureEvent),
}

impl AuditEntry {
    pub fn entity(&self) -> EntityKind {
        match self {
            AuditEntry::Transition(e) => e.entity,
            AuditEntry::Failure(e) => e.entity,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AuditEntry::Transition(e) => &e.id,
            AuditEntry::Failure(e) => &e.id,
        }
    }
}

/// In-memory record of everything the engines reported, forwarded to an
/// inner observer.
pub struct AuditTrail<O> {
    entries: Mutex<Vec<AuditEntry>>,
    inner: O,
}

impl<O: TransitionObserver> AuditTrail<O> {
    pub fn new(inner: O) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            inner,
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    /// Entries about one entity, oldest first.
    pub fn history(&self, id: &str) -> Vec<AuditEntry> {
        self.lock().iter().filter(|e| e.id() == id).cloned().collect()
    }

    pub fn failures(&self) -> Vec<FailureEvent> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                AuditEntry::Failure(f) => Some(f.clone()),
                AuditEntry::Transition(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // a panicked writer leaves a complete Vec behind, so keep using it
    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<O: TransitionObserver> TransitionObserver for AuditTrail<O> {
    fn on_transition(&self, event: &TransitionEvent) {
        self.lock().push(AuditEntry::Transition(event.clone()));
        self.inner.on_transition(event);
    }

    fn on_failure(&self, event: &FailureEvent) {
        self.lock().push(AuditEntry::Failure(event.clone()));
        self.inner.on_failure(event);
    }
}
