//! # Tier Policy
//!
//! Pure, stateless mapping from a member's lifetime spend to a loyalty tier
//! and the benefits that tier grants.
//!
//! ## Tier Table
//! ```text
//! ┌──────────┬───────────┬──────────┬────────────┬──────────┬──────────────┐
//! │ Tier     │ Spend ≥   │ Discount │ Multiplier │ Bookings │ Max h / days │
//! ├──────────┼───────────┼──────────┼────────────┼──────────┼──────────────┤
//! │ (none)   │ -         │ 0%       │ 1.0×       │ 0        │ 0 / 0        │
//! │ Silver   │ ฿2,000    │ 5%       │ 1.0×       │ 2        │ 2 / 7        │
//! │ Gold     │ ฿7,500    │ 10%      │ 1.5×       │ 4        │ 3 / 14       │
//! │ Platinum │ ฿20,000   │ 15%      │ 2.0×       │ 6        │ 4 / 30       │
//! └──────────┴───────────┴──────────┴────────────┴──────────┴──────────────┘
//! ```
//!
//! Boundaries are inclusive: exactly ฿2,000.00 is Silver.
//!
//! Members without a tier have a booking quota of zero. Self-service booking
//! unlocks only after a minimum spend.
//!
//! ## Usage
//! ```rust
//! use meeple_core::money::Money;
//! use meeple_core::tier::{points_earned, tier_for_spend, Tier};
//!
//! let tier = tier_for_spend(Money::from_major(7_500));
//! assert_eq!(tier, Some(Tier::Gold));
//!
//! // ฿1,000 at 1.5× → floor(1000 × 1.5 / 10) = 150 points
//! let points = points_earned(Money::from_major(1_000), tier.map(|t| t.benefits().points_multiplier).unwrap());
//! assert_eq!(points, 150);
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Rate;

// =============================================================================
// Thresholds
// =============================================================================

/// Lifetime spend needed for Silver.
pub const SILVER_THRESHOLD: Money = Money::from_major(2_000);

/// Lifetime spend needed for Gold.
pub const GOLD_THRESHOLD: Money = Money::from_major(7_500);

/// Lifetime spend needed for Platinum.
pub const PLATINUM_THRESHOLD: Money = Money::from_major(20_000);

/// One loyalty point per ฿10 spent, before the tier multiplier.
const MINOR_UNITS_PER_POINT: i128 = 10 * 100;

// =============================================================================
// Tier
// =============================================================================

/// Loyalty tier derived from lifetime spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// Benefits granted by this tier.
    pub const fn benefits(self) -> TierBenefits {
        match self {
            Tier::Silver => TierBenefits {
                discount_rate: Rate::from_bps(500),
                points_multiplier: Rate::from_bps(10_000),
                limits: BookingLimits {
                    max_active_bookings: 2,
                    max_duration_hours: 2,
                    max_advance_days: 7,
                },
            },
            Tier::Gold => TierBenefits {
                discount_rate: Rate::from_bps(1_000),
                points_multiplier: Rate::from_bps(15_000),
                limits: BookingLimits {
                    max_active_bookings: 4,
                    max_duration_hours: 3,
                    max_advance_days: 14,
                },
            },
            Tier::Platinum => TierBenefits {
                discount_rate: Rate::from_bps(1_500),
                points_multiplier: Rate::from_bps(20_000),
                limits: BookingLimits {
                    max_active_bookings: 6,
                    max_duration_hours: 4,
                    max_advance_days: 30,
                },
            },
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Silver => write!(f, "Silver"),
            Tier::Gold => write!(f, "Gold"),
            Tier::Platinum => write!(f, "Platinum"),
        }
    }
}

/// Resolves the tier for a lifetime spend. `None` below ฿2,000.
pub fn tier_for_spend(spend: Money) -> Option<Tier> {
    if spend >= PLATINUM_THRESHOLD {
        Some(Tier::Platinum)
    } else if spend >= GOLD_THRESHOLD {
        Some(Tier::Gold)
    } else if spend >= SILVER_THRESHOLD {
        Some(Tier::Silver)
    } else {
        None
    }
}

/// Benefits for an optional tier; no tier gets the zero row.
pub const fn benefits_for(tier: Option<Tier>) -> TierBenefits {
    match tier {
        Some(tier) => tier.benefits(),
        None => TierBenefits::NONE,
    }
}

// =============================================================================
// Benefits
// =============================================================================

/// Everything a tier grants, in one lookup row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierBenefits {
    /// Order discount rate (500 bps = 5%).
    pub discount_rate: Rate,
    /// Loyalty point multiplier (15000 bps = 1.5×).
    pub points_multiplier: Rate,
    pub limits: BookingLimits,
}

impl TierBenefits {
    /// The row for members without a tier.
    pub const NONE: TierBenefits = TierBenefits {
        discount_rate: Rate::zero(),
        points_multiplier: Rate::ONE,
        limits: BookingLimits {
            max_active_bookings: 0,
            max_duration_hours: 0,
            max_advance_days: 0,
        },
    };
}

/// Self-service booking limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingLimits {
    pub max_active_bookings: u32,
    pub max_duration_hours: u32,
    pub max_advance_days: u32,
}

/// Which booking limit a request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingLimit {
    /// Pending + Confirmed + CheckedIn reservations.
    ActiveBookings,
    /// Length of a single reservation.
    Duration,
    /// How far ahead the reservation starts.
    AdvanceWindow,
}

impl BookingLimit {
    /// Unit the `allowed` / `requested` numbers of a quota error are in.
    pub fn unit(&self) -> &'static str {
        match self {
            BookingLimit::ActiveBookings => "bookings",
            BookingLimit::Duration => "minutes",
            BookingLimit::AdvanceWindow => "days",
        }
    }
}

impl fmt::Display for BookingLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingLimit::ActiveBookings => write!(f, "active booking quota"),
            BookingLimit::Duration => write!(f, "maximum booking duration"),
            BookingLimit::AdvanceWindow => write!(f, "advance booking window"),
        }
    }
}

impl BookingLimits {
    /// False for the no-tier row (quota 0).
    pub fn allows_booking(&self) -> bool {
        self.max_active_bookings > 0
    }

    /// Checks the active-booking quota: `active >= quota` is rejected.
    pub fn check_quota(&self, member_id: &str, active: usize) -> CoreResult<()> {
        if active as u64 >= self.max_active_bookings as u64 {
            return Err(CoreError::QuotaExceeded {
                member_id: member_id.to_string(),
                limit: BookingLimit::ActiveBookings,
                allowed: self.max_active_bookings as i64,
                requested: active as i64 + 1,
            });
        }
        Ok(())
    }

    /// Checks the duration and advance-window limits.
    ///
    /// `duration` is compared exactly, to the second. `lead_time` is the gap
    /// between now and the reservation start; only whole days count toward
    /// the advance window.
    pub fn check_window(&self, member_id: &str, duration: Duration, lead_time: Duration) -> CoreResult<()> {
        let allowed = Duration::hours(self.max_duration_hours as i64);
        if duration > allowed {
            // partial minutes round up
            let requested = (duration.num_seconds() + 59) / 60;
            return Err(CoreError::QuotaExceeded {
                member_id: member_id.to_string(),
                limit: BookingLimit::Duration,
                allowed: allowed.num_minutes(),
                requested,
            });
        }

        if lead_time.num_days() > self.max_advance_days as i64 {
            return Err(CoreError::QuotaExceeded {
                member_id: member_id.to_string(),
                limit: BookingLimit::AdvanceWindow,
                allowed: self.max_advance_days as i64,
                requested: lead_time.num_days(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Calculations
// =============================================================================

/// Points for a transaction: `floor(amount × multiplier / 10)`.
///
/// Non-positive amounts earn nothing.
pub fn points_earned(amount: Money, multiplier: Rate) -> i64 {
    if !amount.is_positive() {
        return 0;
    }
    let scaled = amount.cents() as i128 * multiplier.bps() as i128;
    (scaled / (Rate::ONE.bps() as i128 * MINOR_UNITS_PER_POINT)) as i64
}

/// Tier discount on a subtotal, never exceeding the subtotal.
pub fn member_discount(subtotal: Money, tier: Option<Tier>) -> Money {
    if !subtotal.is_positive() {
        return Money::zero();
    }
    subtotal
        .apply_rate(benefits_for(tier).discount_rate)
        .min(subtotal)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        assert_eq!(tier_for_spend(Money::zero()), None);
        assert_eq!(tier_for_spend(Money::from_cents(199_999)), None);
        assert_eq!(tier_for_spend(Money::from_major_minor(2_000, 0)), Some(Tier::Silver));
        assert_eq!(tier_for_spend(Money::from_cents(749_999)), Some(Tier::Silver));
        assert_eq!(tier_for_spend(Money::from_major(7_500)), Some(Tier::Gold));
        assert_eq!(tier_for_spend(Money::from_cents(1_999_999)), Some(Tier::Gold));
        assert_eq!(tier_for_spend(Money::from_major(20_000)), Some(Tier::Platinum));
        assert_eq!(tier_for_spend(Money::from_major(1_000_000)), Some(Tier::Platinum));
    }

    #[test]
    fn test_benefit_rows() {
        let silver = Tier::Silver.benefits();
        assert_eq!(silver.discount_rate.bps(), 500);
        assert_eq!(silver.points_multiplier, Rate::ONE);
        assert_eq!(silver.limits.max_active_bookings, 2);

        let gold = Tier::Gold.benefits();
        assert_eq!(gold.discount_rate.bps(), 1_000);
        assert_eq!(gold.points_multiplier.bps(), 15_000);
        assert_eq!(gold.limits.max_duration_hours, 3);
        assert_eq!(gold.limits.max_advance_days, 14);

        let platinum = Tier::Platinum.benefits();
        assert_eq!(platinum.discount_rate.bps(), 1_500);
        assert_eq!(platinum.points_multiplier.bps(), 20_000);
        assert_eq!(platinum.limits.max_active_bookings, 6);
        assert_eq!(platinum.limits.max_advance_days, 30);

        let none = benefits_for(None);
        assert!(none.discount_rate.is_zero());
        assert_eq!(none.points_multiplier, Rate::ONE);
        assert!(!none.limits.allows_booking());
    }

    #[test]
    fn test_points_are_floored() {
        // ฿180.00 × 1.0 / 10 = 18
        assert_eq!(points_earned(Money::from_major(180), Rate::ONE), 18);
        // ฿240.75 × 1.0 / 10 = 24.075 → 24
        assert_eq!(points_earned(Money::from_cents(24_075), Rate::ONE), 24);
        // ฿240.75 × 1.5 / 10 = 36.1125 → 36
        assert_eq!(points_earned(Money::from_cents(24_075), Rate::from_bps(15_000)), 36);
        // ฿9.99 × 2.0 / 10 = 1.998 → 1
        assert_eq!(points_earned(Money::from_cents(999), Rate::from_bps(20_000)), 1);
        assert_eq!(points_earned(Money::from_cents(499), Rate::ONE), 0);
        assert_eq!(points_earned(Money::from_cents(-5_000), Rate::ONE), 0);
    }

    #[test]
    fn test_member_discount() {
        let subtotal = Money::from_major(1_040);
        assert_eq!(member_discount(subtotal, None), Money::zero());
        assert_eq!(member_discount(subtotal, Some(Tier::Silver)), Money::from_major(52));
        assert_eq!(member_discount(subtotal, Some(Tier::Platinum)), Money::from_major(156));
        assert_eq!(member_discount(Money::zero(), Some(Tier::Gold)), Money::zero());
    }

    #[test]
    fn test_no_tier_quota_is_zero() {
        let limits = benefits_for(None).limits;
        let err = limits.check_quota("MEM001", 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuotaExceeded {
                limit: BookingLimit::ActiveBookings,
                allowed: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_quota_counts_active_bookings() {
        let limits = Tier::Silver.benefits().limits;
        assert!(limits.check_quota("MEM001", 0).is_ok());
        assert!(limits.check_quota("MEM001", 1).is_ok());
        assert!(limits.check_quota("MEM001", 2).is_err());
    }

    #[test]
    fn test_window_limits() {
        let limits = Tier::Gold.benefits().limits;

        assert!(limits
            .check_window("MEM002", Duration::hours(3), Duration::days(14))
            .is_ok());

        let err = limits
            .check_window("MEM002", Duration::minutes(181), Duration::days(1))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuotaExceeded {
                limit: BookingLimit::Duration,
                allowed: 180,
                requested: 181,
                ..
            }
        ));

        let silver = Tier::Silver.benefits().limits;
        let err = silver
            .check_window("MEM001", Duration::hours(2) + Duration::seconds(59), Duration::days(1))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuotaExceeded {
                limit: BookingLimit::Duration,
                allowed: 120,
                requested: 121,
                ..
            }
        ));
        assert!(silver
            .check_window("MEM001", Duration::hours(2), Duration::days(1))
            .is_ok());

        let err = limits
            .check_window("MEM002", Duration::hours(2), Duration::days(15))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuotaExceeded {
                limit: BookingLimit::AdvanceWindow,
                ..
            }
        ));
    }
}
