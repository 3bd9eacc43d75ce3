//! # Validation Module
//!
//! Input validation shared by the engines and the branch registration helpers.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (staff front-end, CLI)                                │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Identifiers, names, quantities, prices                            │
//! │  ├── Guest count vs. table capacity                                    │
//! │  └── Payment method fields, refund reasons                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Entity state machines                                        │
//! │  └── InvalidState / Conflict / QuotaExceeded (not validation)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meeple_core::validation::{validate_guest_count, validate_quantity};
//!
//! validate_quantity(2).unwrap();
//! assert!(validate_guest_count(5, 4).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES, MIN_REFUND_REASON_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a registrar-assigned identifier ("T001", "BG-CATAN", "MEM001").
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ```rust
/// use meeple_core::validation::validate_identifier;
///
/// assert!(validate_identifier("table", "T001").is_ok());
/// assert!(validate_identifier("table", "").is_err());
/// assert!(validate_identifier("table", "T 001").is_err());
/// ```
pub fn validate_identifier(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > 50 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 50,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (member, table, game title, menu item).
///
/// Non-empty after trimming, at most 200 characters.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a refund reason: at least 10 characters after trimming.
pub fn validate_refund_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "refund reason".to_string(),
        });
    }

    if reason.chars().count() < MIN_REFUND_REASON_LEN {
        return Err(ValidationError::TooShort {
            field: "refund reason".to_string(),
            min: MIN_REFUND_REASON_LEN,
        });
    }

    Ok(())
}

/// Validates the last four digits of a card: exactly four ASCII digits.
///
/// ```rust
/// use meeple_core::validation::validate_card_last_four;
///
/// assert!(validate_card_last_four("4242").is_ok());
/// assert!(validate_card_last_four("424").is_err());
/// assert!(validate_card_last_four("42a2").is_err());
/// ```
pub fn validate_card_last_four(digits: &str) -> ValidationResult<()> {
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "card last four".to_string(),
            reason: "must be exactly 4 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an external transaction reference for online payments.
pub fn validate_online_reference(reference: &str) -> ValidationResult<()> {
    if reference.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "transaction reference".to_string(),
        });
    }

    if reference.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "transaction reference".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ```text
///  add_item(qty)
///       │
///       ├── qty <= 0?  → MustBePositive
///       ├── qty > 999? → OutOfRange
///       └── OK → snapshot price, append line
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or rate in minor units. Zero is allowed (free refills).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a table capacity (≥ 1).
pub fn validate_capacity(capacity: u32) -> ValidationResult<()> {
    if capacity == 0 {
        return Err(ValidationError::MustBePositive {
            field: "capacity".to_string(),
        });
    }

    Ok(())
}

/// Validates a party size against a table: `1 <= guests <= capacity`.
pub fn validate_guest_count(guests: u32, capacity: u32) -> ValidationResult<()> {
    if guests < 1 {
        return Err(ValidationError::MustBePositive {
            field: "guest count".to_string(),
        });
    }

    if guests > capacity {
        return Err(ValidationError::ExceedsCapacity { guests, capacity });
    }

    Ok(())
}

/// Validates a rate in basis points (0% to 100%).
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates order size (number of lines, cancelled ones included).
pub fn validate_order_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "order lines".to_string(),
            min: 0,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
