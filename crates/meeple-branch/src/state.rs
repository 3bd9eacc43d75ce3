//! # Branch State
//!
//! Everything one branch knows, held together so a single lock covers it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    RwLock<BranchState>                                  │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────────┐ ┌──────────────┐                │
//! │  │    Floor     │ │ ReservationBook  │ │  OrderBook   │                │
//! │  │ tables/games │ │ bookings, policy │ │ orders, pays │                │
//! │  └──────────────┘ └──────────────────┘ └──────────────┘                │
//! │  ┌──────────────────┐ ┌──────────────┐                                 │
//! │  │ MemberDirectory  │ │     Menu     │                                 │
//! │  └──────────────────┘ └──────────────┘                                 │
//! │                                                                         │
//! │  Payment completion touches order, table, games and member at once,    │
//! │  so the state is one unit rather than a lock per engine.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use meeple_core::catalog::Menu;
use meeple_core::ledger::OrderBook;
use meeple_core::member::MemberDirectory;
use meeple_core::reservation::ReservationBook;
use meeple_core::resource::Floor;
use meeple_core::TransitionObserver;
use std::sync::Arc;

use crate::config::BranchConfig;

#[derive(Debug)]
pub struct BranchState {
    pub floor: Floor,
    pub reservations: ReservationBook,
    pub orders: OrderBook,
    pub members: MemberDirectory,
    pub menu: Menu,
}

impl BranchState {
    /// Empty branch with engines configured from `config`, all reporting to
    /// `observer`.
    pub fn new(config: &BranchConfig, observer: Arc<dyn TransitionObserver>) -> Self {
        BranchState {
            floor: Floor::new(observer.clone()),
            reservations: ReservationBook::new(config.reservation_policy(), observer.clone()),
            orders: OrderBook::new(config.tax_rate(), observer),
            members: MemberDirectory::new(),
            menu: Menu::new(),
        }
    }
}
