//! # Money Module
//!
//! Provides the `Money` type for every monetary value in the café: table
//! rates, menu prices, order totals, member spend and cancellation penalties.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Tier thresholds are compared against lifetime spend:                  │
//! │    1999.9999999 >= 2000.00  → false  ❌ member misses Silver            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (satang / cents)                    │
//! │    199_999 < 200_000 and 200_000 >= 200_000, exactly                   │
//! │                                                                         │
//! │  Rates (tax, discount, penalty, point multiplier) are basis points,    │
//! │  so every calculation stays in integer space until display.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meeple_core::money::Money;
//! use meeple_core::types::Rate;
//!
//! let pad_thai = Money::from_major(120);
//! let two = pad_thai * 2;
//! assert_eq!(two.cents(), 24_000);
//!
//! // 7% VAT on ฿240.00
//! assert_eq!(two.calculate_tax(Rate::from_bps(700)).cents(), 1_680);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;

/// Display symbol for the single supported currency (Thai baht).
pub const CURRENCY_SYMBOL: &str = "฿";

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (satang; 100 = ฿1.00).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction of a discount may pass through zero
///   transiently; invariants (spend ≥ 0, discount ≤ subtotal) are enforced by
///   the entities, not by the type
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// MenuItem.price ──► LineItem.unit_price (snapshot) ──► Order.subtotal
///                                                          │
///                      Order.discount ◄── Tier discount ───┤
///                                                          ▼
///                                      Order.total ──► Payment.total
///                                                          │
///                                                          ▼
///                                  Member.spend += total, points += f(total)
///
/// Table.hourly_rate ──► Table.charge_for(1h) ──► late-cancel penalty (50%)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use meeple_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // ฿10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// Menu prices and table rates in the café are whole baht, so this is
    /// the constructor most call sites use.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -฿5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount, rounded half-up to the minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides the
    /// rounding (5000/10000 = 0.5).
    ///
    /// ```rust
    /// use meeple_core::money::Money;
    /// use meeple_core::types::Rate;
    ///
    /// // ฿225.00 at 7% = ฿15.75
    /// let tax = Money::from_major(225).calculate_tax(Rate::from_bps(700));
    /// assert_eq!(tax.cents(), 1575);
    /// ```
    pub fn calculate_tax(&self, rate: Rate) -> Money {
        self.apply_rate(rate)
    }

    /// Returns `rate` of this amount, rounded half-up to the minor unit.
    ///
    /// Used for tier discounts (5% / 10% / 15%) and the late-cancellation
    /// penalty (50% of one hour).
    pub fn apply_rate(&self, rate: Rate) -> Money {
        // i128 so large amounts times 10_000 bps cannot overflow
        let share = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(share as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use meeple_core::money::Money;
    ///
    /// let unit_price = Money::from_major(60); // Thai iced tea
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_major(180));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable form, e.g. `฿240.75`. Receipts go through
/// `BranchConfig::format_currency` instead so the symbol is configurable.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}{}.{:02}",
            sign,
            CURRENCY_SYMBOL,
            self.major().abs(),
            self.minor_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
