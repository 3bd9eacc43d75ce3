//! # Shared Value Types
//!
//! Small value types used by every engine in the crate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Value Types                                     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │      Rate       │   │      TimeSlot        │   │   new_id()      │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  bps (u32)      │   │  start (inclusive)   │   │  UUID v4 string │  │
//! │  │  700  = 7% VAT  │   │  end   (exclusive)   │   │  for engine-    │  │
//! │  │  5000 = 50%     │   │  [start, end)        │   │  created rows   │  │
//! │  │  15000 = 1.5×   │   │                      │   │                 │  │
//! │  └─────────────────┘   └──────────────────────┘   └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;

// =============================================================================
// Rate
// =============================================================================

/// A rate in basis points (1 bps = 0.01%).
///
/// ## Why Basis Points?
/// Tax (7%), tier discounts (5/10/15%), the cancellation penalty (50%) and
/// the loyalty point multipliers (1.0×, 1.5×, 2.0× = 10000, 15000, 20000 bps)
/// all stay exact in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// 100% / 1.0×.
    pub const ONE: Rate = Rate(10_000);

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage (for configuration input).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the rate as a multiplier (for display only): 15000 bps → 1.5.
    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// TimeSlot
// =============================================================================

/// A half-open booking interval `[start, end)`.
///
/// A slot ending at 16:00 and one starting at 16:00 do not overlap, so
/// back-to-back bookings on the same table are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeSlot {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Creates a slot, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(TimeSlot { start, end })
    }

    /// Half-open overlap: `self.start < other.end && self.end > other.start`.
    #[inline]
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Time between `now` and the start of the slot (negative once started).
    #[inline]
    pub fn lead_time(&self, now: DateTime<Utc>) -> Duration {
        self.start - now
    }
}

// =============================================================================
// Entity Kind
// =============================================================================

/// The kind of entity an error or state transition refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Member,
    Table,
    BoardGame,
    Reservation,
    Order,
    OrderLine,
    Payment,
    MenuItem,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Member => "Member",
            EntityKind::Table => "Table",
            EntityKind::BoardGame => "Board game",
            EntityKind::Reservation => "Reservation",
            EntityKind::Order => "Order",
            EntityKind::OrderLine => "Order line",
            EntityKind::Payment => "Payment",
            EntityKind::MenuItem => "Menu item",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Generates an identifier for an engine-created entity (reservation, order,
/// order line, payment).
///
/// Tables, games, members and menu items keep the ids their registrar gives
/// them ("T001", "BG001", "MEM001").
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_rate_conversions() {
        let rate = Rate::from_percentage(7.0);
        assert_eq!(rate.bps(), 700);
        assert!((rate.percentage() - 7.0).abs() < 0.001);
        assert!((Rate::from_bps(15_000).multiplier() - 1.5).abs() < 0.001);
    }

    #[test]
    fn test_slot_rejects_empty_or_inverted_range() {
        assert!(TimeSlot::new(at(14), at(14)).is_err());
        assert!(TimeSlot::new(at(16), at(14)).is_err());
        assert!(TimeSlot::new(at(14), at(16)).is_ok());
    }

    #[test]
    fn test_slot_overlap_is_half_open() {
        let booked = TimeSlot::new(at(14), at(16)).unwrap();

        assert!(booked.overlaps(&TimeSlot::new(at(15), at(17)).unwrap()));
        assert!(booked.overlaps(&TimeSlot::new(at(13), at(15)).unwrap()));
        assert!(booked.overlaps(&TimeSlot::new(at(12), at(18)).unwrap()));

        assert!(!booked.overlaps(&TimeSlot::new(at(16), at(18)).unwrap()));
        assert!(!booked.overlaps(&TimeSlot::new(at(12), at(14)).unwrap()));
    }

    #[test]
    fn test_new_id_is_uuid() {
        let id = new_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_id());
    }
}
