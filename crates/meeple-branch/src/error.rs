//! # Branch Error Types
//!
//! Error type for the branch facade.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in a Branch                               │
//! │                                                                         │
//! │  caller ──► Branch::create_reservation(...)                             │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  lock poisoned?      ─── BranchError::LockPoisoned ─────────────►│  │
//! │  │  engine rejected?    ─── CoreError ──► BranchError::Core ───────►│  │
//! │  │  branch.toml bad?    ─── BranchError::InvalidConfig / Config* ──►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  err.code()     → ErrorCode::CONFLICT, QUOTA_EXCEEDED, ...             │
//! │  err.to_body()  → { "code": "CONFLICT", "message": "Table T001 ..." }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use meeple_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for branch operations.
pub type BranchResult<T> = Result<T, BranchError>;

#[derive(Debug, Error)]
pub enum BranchError {
    /// Rejected by a core engine.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A thread panicked while holding the branch lock.
    #[error("Branch state lock poisoned")]
    LockPoisoned,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid branch configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl From<ValidationError> for BranchError {
    fn from(err: ValidationError) -> Self {
        BranchError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for BranchError {
    fn from(err: std::io::Error) -> Self {
        BranchError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for BranchError {
    fn from(err: toml::de::Error) -> Self {
        BranchError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for BranchError {
    fn from(err: toml::ser::Error) -> Self {
        BranchError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Machine-readable category of a failure.
///
/// ## Usage by a staff front-end
/// ```typescript
/// switch (e.code) {
///   case 'CONFLICT':       suggestOtherSlots(); break;
///   case 'QUOTA_EXCEEDED': showTierLimits(); break;
///   case 'GRACE_PERIOD_EXPIRED': refreshReservation(); break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// Registration with an id already in use
    Duplicate,

    /// Entity does not exist
    NotFound,

    /// Reservation slot overlaps another booking
    Conflict,

    /// Tier limit reached
    QuotaExceeded,

    /// Table or game cannot be claimed
    ResourceUnavailable,

    /// Check-in too late; reservation is now a no-show
    GracePeriodExpired,

    /// Operation not allowed in the current state
    InvalidState,

    /// Payment completion failed part-way
    PaymentFailed,

    /// Configuration could not be loaded or is invalid
    ConfigError,

    /// Internal error
    Internal,
}

/// Serializable error payload for external callers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl BranchError {
    /// Category of this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            BranchError::Core(err) => match err {
                CoreError::Validation(ValidationError::Duplicate { .. }) => ErrorCode::Duplicate,
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::Conflict { .. } => ErrorCode::Conflict,
                CoreError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
                CoreError::ResourceUnavailable { .. } => ErrorCode::ResourceUnavailable,
                CoreError::GracePeriodExpired { .. } => ErrorCode::GracePeriodExpired,
                CoreError::InvalidState { .. } => ErrorCode::InvalidState,
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::PaymentFailed { .. } => ErrorCode::PaymentFailed,
            },
            BranchError::LockPoisoned => ErrorCode::Internal,
            BranchError::InvalidConfig(_)
            | BranchError::ConfigLoadFailed(_)
            | BranchError::ConfigSaveFailed(_) => ErrorCode::ConfigError,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }

    /// Expected business outcomes, as opposed to caller or system faults.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::Conflict
                | ErrorCode::QuotaExceeded
                | ErrorCode::ResourceUnavailable
                | ErrorCode::GracePeriodExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeple_core::EntityKind;

    #[test]
    fn test_codes() {
        let err: BranchError = CoreError::Conflict {
            table_id: "T001".to_string(),
            existing_id: "R1".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert!(err.is_business_outcome());

        let err: BranchError = ValidationError::Duplicate {
            field: "table id".to_string(),
            value: "T001".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Duplicate);
        assert!(!err.is_business_outcome());

        assert_eq!(BranchError::LockPoisoned.code(), ErrorCode::Internal);
    }

    #[test]
    fn test_body_serializes_screaming_snake_case() {
        let err: BranchError = CoreError::not_found(EntityKind::Member, "MEM404").into();
        let json = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Member not found: MEM404");

        let err: BranchError = CoreError::GracePeriodExpired {
            reservation_id: "R1".to_string(),
            deadline: chrono::Utc::now(),
        }
        .into();
        assert_eq!(
            serde_json::to_value(err.code()).unwrap(),
            "GRACE_PERIOD_EXPIRED"
        );
    }
}
