//! # Error Types
//!
//! Domain-specific error types for meeple-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meeple-core errors (this file)                                        │
//! │  ├── CoreError        - Business outcomes and state-machine violations │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  meeple-branch errors (separate crate)                                 │
//! │  └── BranchError      - Lookup, registration, lock, config failures    │
//! │                         + ErrorCode for external callers               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BranchError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Semantics
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ Validation           │ caller fixes input; never retried                │
//! │ Conflict             │ expected outcome; pick another slot or table     │
//! │ QuotaExceeded        │ expected outcome; tier limit reached             │
//! │ ResourceUnavailable  │ caller may retry against a different resource    │
//! │ GracePeriodExpired   │ NoShow transition ALREADY APPLIED                │
//! │ InvalidState         │ caller/programmer error; never retried           │
//! │ PaymentFailed        │ payment is Failed, earlier steps not rolled back │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Display;
use thiserror::Error;

use crate::money::Money;
use crate::tier::BookingLimit;
use crate::types::EntityKind;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The requested slot overlaps a live reservation on the same table.
    ///
    /// ## When This Occurs
    /// ```text
    /// T001: [14:00 ───────── 16:00)  existing, Confirmed
    ///              [15:00 ───────── 17:00)  requested → Conflict
    ///                         [16:00 ───────── 18:00)  requested → OK
    /// ```
    #[error("Table {table_id} is already booked by reservation {existing_id}")]
    Conflict {
        table_id: String,
        existing_id: String,
    },

    /// The member's tier does not permit this booking.
    ///
    /// Members without a tier have a quota of zero, so their first booking
    /// attempt lands here.
    #[error("Member {member_id} exceeded the {limit}: allowed {allowed} {}, requested {requested}", .limit.unit())]
    QuotaExceeded {
        member_id: String,
        limit: BookingLimit,
        allowed: i64,
        requested: i64,
    },

    /// Table or game is already claimed, out of service, or too small.
    #[error("{entity} {id} is unavailable: {reason}")]
    ResourceUnavailable {
        entity: EntityKind,
        id: String,
        reason: String,
    },

    /// Check-in attempted after `start + grace period`.
    ///
    /// The reservation has been moved to NoShow by the same call that
    /// returns this error.
    #[error("Reservation {reservation_id} missed its check-in deadline ({deadline}) and is now a no-show")]
    GracePeriodExpired {
        reservation_id: String,
        deadline: DateTime<Utc>,
    },

    /// Operation not permitted from the entity's current state.
    ///
    /// ## When This Occurs
    /// - Adding items to a Closed order
    /// - Cancelling an already Cancelled reservation
    /// - Refunding a payment that never completed
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        status: String,
        operation: String,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// A step after "mark Completed" failed during payment completion.
    ///
    /// The payment is now Failed. Side effects applied before the failing
    /// step (order closed, table cleared) are NOT rolled back.
    #[error("Payment {payment_id} failed: {cause}")]
    PaymentFailed {
        payment_id: String,
        #[source]
        cause: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: EntityKind,
        id: impl Into<String>,
        status: impl Display,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity,
            id: id.into(),
            status: status.to_string(),
            operation: operation.into(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a ResourceUnavailable error.
    pub fn unavailable(entity: EntityKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::ResourceUnavailable {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Always caller-recoverable; the engines never retry them.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short (refund reasons, for example).
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (card digits, identifiers).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., a second table registered as "T001").
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// End of a time range is not strictly after its start.
    #[error("time range end ({end}) must be after start ({start})")]
    InvalidTimeRange { start: String, end: String },

    /// Reservation start lies in the past.
    #[error("start time {start} is in the past")]
    StartInPast { start: String },

    /// More guests than seats.
    #[error("guest count {guests} exceeds table capacity {capacity}")]
    ExceedsCapacity { guests: u32, capacity: u32 },

    /// Discount larger than the order subtotal, or negative.
    #[error("discount {discount} must be between ฿0.00 and the subtotal {subtotal}")]
    InvalidDiscount { discount: Money, subtotal: Money },

    /// Cash tendered does not cover the payment total.
    #[error("insufficient funds: total {required}, received {received}")]
    InsufficientFunds { required: Money, received: Money },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::Conflict {
            table_id: "T001".to_string(),
            existing_id: "RES001".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Table T001 is already booked by reservation RES001"
        );

        let err = CoreError::invalid_state(EntityKind::Order, "ORD-1", "Closed", "add items");
        assert_eq!(err.to_string(), "Order ORD-1 is Closed, cannot add items");
    }

    #[test]
    fn test_quota_message_names_the_limit() {
        let err = CoreError::QuotaExceeded {
            member_id: "MEM001".to_string(),
            limit: BookingLimit::ActiveBookings,
            allowed: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Member MEM001 exceeded the active booking quota: allowed 0 bookings, requested 1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::InsufficientFunds {
            required: Money::from_major(180),
            received: Money::from_major(100),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: total ฿180.00, received ฿100.00"
        );

        let err = ValidationError::TooShort {
            field: "refund reason".to_string(),
            min: 10,
        };
        assert_eq!(err.to_string(), "refund reason must be at least 10 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "reason".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_payment_failure_keeps_cause() {
        use std::error::Error as _;

        let err = CoreError::PaymentFailed {
            payment_id: "PAY-1".to_string(),
            cause: Box::new(CoreError::not_found(EntityKind::Member, "MEM404")),
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Member not found: MEM404"));
    }
}
