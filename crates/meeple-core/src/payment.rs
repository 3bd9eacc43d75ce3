//! # Payment
//!
//! A payment settles exactly one order. Its total is a snapshot of the
//! order total taken at creation; the method only matters at construction
//! (validation) and on the receipt (transaction reference).
//!
//! ## Methods
//! ```text
//! ┌──────────┬──────────────────────────┬──────────────────────────────────┐
//! │ Method   │ Field                    │ Rule                             │
//! ├──────────┼──────────────────────────┼──────────────────────────────────┤
//! │ Cash     │ amount_received          │ ≥ total, else InsufficientFunds  │
//! │ Card     │ last_four                │ exactly 4 ASCII digits           │
//! │ Online   │ reference                │ non-empty                        │
//! └──────────┴──────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! ```text
//!   Pending ──► Processing ──► Completed ──refund(reason ≥ 10)──► Refunded
//!                   │
//!                   └── close order / clear table / credit member fails
//!                       ──► Failed (earlier steps stay applied)
//! ```
//!
//! The cross-entity completion lives in [`crate::ledger::OrderBook`]; this
//! module holds the entity and its own transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::Order;
use crate::types::{new_id, EntityKind};
use crate::validation::{validate_card_last_four, validate_online_reference, validate_refund_reason};

// =============================================================================
// Method
// =============================================================================

/// How the bill is settled, with the field each method needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash { amount_received: Money },
    Card { last_four: String },
    Online { reference: String },
}

impl PaymentMethod {
    /// Method-specific checks against the total being paid.
    pub fn validate(&self, total: Money) -> CoreResult<()> {
        match self {
            PaymentMethod::Cash { amount_received } => {
                if *amount_received < total {
                    return Err(ValidationError::InsufficientFunds {
                        required: total,
                        received: *amount_received,
                    }
                    .into());
                }
            }
            PaymentMethod::Card { last_four } => validate_card_last_four(last_four)?,
            PaymentMethod::Online { reference } => validate_online_reference(reference)?,
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash { .. } => "cash",
            PaymentMethod::Card { .. } => "card",
            PaymentMethod::Online { .. } => "online",
        }
    }
}

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Still settling, or settled: blocks another payment for the order.
    pub fn holds_order(self) -> bool {
        matches!(
            self,
            PaymentStatus::Pending | PaymentStatus::Processing | PaymentStatus::Completed
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Processing => write!(f, "Processing"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub member_id: Option<String>,
    pub method: PaymentMethod,
    /// Order total when the payment was created.
    pub total: Money,
    status: PaymentStatus,
    failure_reason: Option<String>,
    refund_reason: Option<String>,
    points_credited: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates a Pending payment for `order`, snapshotting its total.
    ///
    /// ```rust
    /// use chrono::Utc;
    /// use meeple_core::catalog::{MenuCategory, MenuItem};
    /// use meeple_core::money::Money;
    /// use meeple_core::order::Order;
    /// use meeple_core::payment::{Payment, PaymentMethod};
    /// use meeple_core::types::Rate;
    ///
    /// let tea = MenuItem::new("D001", "Thai Iced Tea", MenuCategory::Drink, Money::from_major(60))
    ///     .unwrap()
    ///     .with_stock(10);
    /// let mut order = Order::new(None, None, Rate::from_bps(700), Utc::now());
    /// order.add_item(&tea, 1, None, Utc::now()).unwrap();
    ///
    /// let cash = PaymentMethod::Cash { amount_received: Money::from_major(100) };
    /// let payment = Payment::new(&order, cash, Utc::now()).unwrap();
    /// assert_eq!(payment.total, Money::from_cents(6_420));
    /// ```
    pub fn new(order: &Order, method: PaymentMethod, now: DateTime<Utc>) -> CoreResult<Self> {
        let total = order.total();
        method.validate(total)?;

        Ok(Payment {
            id: new_id(),
            order_id: order.id.clone(),
            member_id: order.member_id.clone(),
            method,
            total,
            status: PaymentStatus::Pending,
            failure_reason: None,
            refund_reason: None,
            points_credited: 0,
            created_at: now,
            completed_at: None,
        })
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn refund_reason(&self) -> Option<&str> {
        self.refund_reason.as_deref()
    }

    pub fn points_credited(&self) -> i64 {
        self.points_credited
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Cash handed back; zero for other methods.
    pub fn change_due(&self) -> Money {
        match &self.method {
            PaymentMethod::Cash { amount_received } => *amount_received - self.total,
            _ => Money::zero(),
        }
    }

    /// Reference printed on the receipt.
    pub fn transaction_reference(&self) -> String {
        match &self.method {
            PaymentMethod::Cash { .. } => format!("CASH-{}", short_id(&self.id)),
            PaymentMethod::Card { last_four } => format!("CARD-****{}", last_four),
            PaymentMethod::Online { reference } => format!("ONLINE-{}", reference),
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Pending → Processing.
    pub(crate) fn begin(&mut self) -> CoreResult<()> {
        self.require(PaymentStatus::Pending, "complete")?;
        self.status = PaymentStatus::Processing;
        Ok(())
    }

    /// Processing → Completed.
    pub(crate) fn settle(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.require(PaymentStatus::Processing, "settle")?;
        self.status = PaymentStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    pub(crate) fn record_points(&mut self, points: i64) {
        self.points_credited = points;
    }

    /// Any status → Failed, keeping the cause.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.status = PaymentStatus::Failed;
        self.failure_reason = Some(reason.into());
    }

    /// Completed → Refunded. Spend and points are not reversed.
    pub fn refund(&mut self, reason: &str) -> CoreResult<()> {
        self.require(PaymentStatus::Completed, "refund")?;
        validate_refund_reason(reason)?;
        self.status = PaymentStatus::Refunded;
        self.refund_reason = Some(reason.trim().to_string());
        Ok(())
    }

    fn require(&self, expected: PaymentStatus, operation: &str) -> CoreResult<()> {
        if self.status != expected {
            return Err(CoreError::invalid_state(EntityKind::Payment, &self.id, self.status, operation));
        }
        Ok(())
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

// =============================================================================
// Unit Tests
// =============================================================================
