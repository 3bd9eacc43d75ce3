//! # meeple-core: Pure Business Logic for the Meeple Café
//!
//! This crate is the **heart** of a board-game café branch. It holds every
//! business rule (loyalty tiers, reservations, tables and games, orders,
//! payments) as plain data plus engines that take `now` as an argument.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meeple Café Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               meeple-branch (Branch facade)                     │   │
//! │  │    config • RwLock<BranchState> • clock • tracing • sweeper     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ &mut engines, now                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ meeple-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌───────────┐  ┌──────────┐  │   │
//! │  │   │   tier    │  │ reservation │  │  resource │  │  ledger  │  │   │
//! │  │   │  member   │  │ ReservBook  │  │   Floor   │  │ OrderBook│  │   │
//! │  │   │  quotas   │  │ grace/late  │  │ tables    │  │ order    │  │   │
//! │  │   │  points   │  │ no-shows    │  │ games     │  │ payment  │  │   │
//! │  │   └───────────┘  └─────────────┘  └───────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   money • types • validation • catalog • clock • observer      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO LOCKS • NO LOGGING • TIME IS A PARAMETER         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (satang, no floats)
//! - [`types`] - Rates in basis points, half-open time slots, ids
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`tier`] - Tier table, point earning, booking limits
//! - [`member`] - Members and the member directory
//! - [`catalog`] - Menu items and the catalog trait
//! - [`resource`] - Tables, board games and the branch floor
//! - [`reservation`] - Reservation lifecycle and policy
//! - [`order`] - Orders and their lines
//! - [`payment`] - Payments and methods
//! - [`ledger`] - Order book and payment completion
//! - [`clock`] - Injectable time source
//! - [`observer`] - Transition observer seam
//!
//! ## Example Usage
//!
//! ```rust
//! use meeple_core::money::Money;
//! use meeple_core::tier::{tier_for_spend, Tier};
//! use meeple_core::types::Rate;
//!
//! let spend = Money::from_major(8_000);
//! assert_eq!(tier_for_spend(spend), Some(Tier::Gold));
//!
//! // 7% VAT on ฿240.75 = ฿16.85 (half-up)
//! let tax = Money::from_cents(24_075).calculate_tax(Rate::from_bps(700));
//! assert_eq!(tax.cents(), 1_685);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod member;
pub mod money;
pub mod observer;
pub mod order;
pub mod payment;
pub mod reservation;
pub mod resource;
pub mod tier;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use observer::{FailureEvent, NoopObserver, TransitionEvent, TransitionObserver};
pub use tier::Tier;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single order line.
///
/// Catches fat-finger entries (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum lines on a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Minimum length of a refund reason, after trimming.
pub const MIN_REFUND_REASON_LEN: usize = 10;

/// Stock at or below this level is reported as low.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Minutes after a reservation's start during which check-in is still
/// accepted.
pub const GRACE_PERIOD_MINUTES: i64 = 15;

/// Cancelling with less lead time than this incurs the penalty.
pub const LATE_CANCEL_WINDOW_MINUTES: i64 = 120;

/// Late-cancellation penalty as a share of one hour's table charge.
pub const LATE_CANCEL_PENALTY_BPS: u32 = 5_000;

/// Default VAT rate (7%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 700;
