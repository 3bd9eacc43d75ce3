//! # Branch Facade
//!
//! [`Branch`] is the one entry point callers use for a physical location. It
//! owns the branch state behind a single `RwLock`, reads the time from an
//! injected [`Clock`], and hands `now` to the core engines.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Branch Operations                                    │
//! │                                                                         │
//! │  Caller                 Branch                      BranchState         │
//! │  ──────                 ──────                      ───────────         │
//! │                                                                         │
//! │  create_reservation ──► write lock ──► check conflicts ──► insert       │
//! │  complete_payment ────► write lock ──► order/table/member in one go     │
//! │  is_table_available ──► read lock ───► scan ──► bool                    │
//! │  order(id) ───────────► read lock ───► clone ──► owned snapshot         │
//! │                                                                         │
//! │  Two callers racing for the same slot serialize on the write lock:     │
//! │  the second sees the first's reservation and gets Conflict.            │
//! │                                                                         │
//! │  A poisoned lock surfaces as BranchError::LockPoisoned, never a panic. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use meeple_core::catalog::MenuItem;
use meeple_core::ledger::PaymentReceipt;
use meeple_core::member::Member;
use meeple_core::order::{LineItem, Order};
use meeple_core::payment::{Payment, PaymentMethod};
use meeple_core::reservation::{Cancellation, Reservation};
use meeple_core::resource::{BoardGame, Table};
use meeple_core::tier::TierBenefits;
use meeple_core::{Clock, CoreError, Money, SystemClock, Tier, TimeSlot};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::audit::{AuditTrail, TracingObserver};
use crate::config::BranchConfig;
use crate::error::{BranchError, BranchResult, ErrorCode};
use crate::state::BranchState;

/// A member record with its derived tier data, as shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProfile {
    pub member: Member,
    pub tier: Option<Tier>,
    pub benefits: TierBenefits,
    pub active_bookings: usize,
}

pub struct Branch {
    config: BranchConfig,
    state: RwLock<BranchState>,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditTrail<TracingObserver>>,
}

impl std::fmt::Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("id", &self.config.branch.id)
            .field("events", &self.audit.len())
            .finish()
    }
}

impl Branch {
    /// Creates an empty branch on the system clock.
    pub fn new(config: BranchConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty branch reading time from `clock`.
    pub fn with_clock(config: BranchConfig, clock: Arc<dyn Clock>) -> Self {
        let audit = Arc::new(AuditTrail::new(TracingObserver::new(config.branch.id.clone())));
        let state = BranchState::new(&config, audit.clone());

        info!(
            branch = %config.branch.id,
            name = %config.branch.name,
            tax_bps = config.policy.tax_rate_bps,
            "Branch opened"
        );

        Branch {
            config,
            state: RwLock::new(state),
            clock,
            audit,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.branch.id
    }

    pub fn config(&self) -> &BranchConfig {
        &self.config
    }

    /// Every transition reported since the branch opened.
    pub fn audit(&self) -> &AuditTrail<TracingObserver> {
        &self.audit
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // Reservations
    // =========================================================================

    /// Books `table_id` for `member_id` over `[start, end)`.
    pub fn create_reservation(
        &self,
        member_id: &str,
        table_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        guests: u32,
    ) -> BranchResult<Reservation> {
        debug!(member_id, table_id, %start, %end, guests, "Creating reservation");
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let result = state.members.get(member_id).and_then(|member| {
            let table = state.floor.table(table_id)?;
            state.reservations.create(member, table, start, end, guests, now)
        });
        let reservation = result.map_err(|e| self.rejected("create_reservation", e))?;

        info!(
            reservation_id = %reservation.id,
            member_id,
            table_id,
            %start,
            guests,
            "Reservation created"
        );
        Ok(reservation)
    }

    pub fn confirm_reservation(&self, id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .reservations
            .confirm(id, now)
            .map_err(|e| self.rejected("confirm_reservation", e))?;
        info!(reservation_id = id, "Reservation confirmed");
        Ok(())
    }

    /// Seats a Confirmed reservation's party. Too late and the reservation
    /// becomes a no-show.
    pub fn check_in(&self, id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        state
            .reservations
            .check_in(id, &mut state.floor, now)
            .map_err(|e| self.rejected("check_in", e))?;
        info!(reservation_id = id, "Party checked in");
        Ok(())
    }

    pub fn complete_reservation(&self, id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .reservations
            .complete(id, now)
            .map_err(|e| self.rejected("complete_reservation", e))?;
        info!(reservation_id = id, "Reservation completed");
        Ok(())
    }

    /// Cancels a reservation. Inside the late window the returned record
    /// carries a penalty; nothing is charged.
    pub fn cancel_reservation(&self, id: &str, reason: &str) -> BranchResult<Cancellation> {
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        let cancellation = state
            .reservations
            .cancel(id, reason, &mut state.floor, now)
            .map_err(|e| self.rejected("cancel_reservation", e))?;

        if cancellation.is_late() {
            info!(
                reservation_id = id,
                penalty = %self.config.format_currency(cancellation.penalty),
                "Late cancellation"
            );
        } else {
            info!(reservation_id = id, "Reservation cancelled");
        }
        Ok(cancellation)
    }

    /// Marks overdue Confirmed reservations as no-shows.
    pub fn sweep_no_shows(&self) -> BranchResult<Vec<String>> {
        let now = self.now();
        let mut state = self.write()?;
        let marked = state.reservations.mark_no_shows(now);
        if !marked.is_empty() {
            info!(count = marked.len(), "Marked no-shows");
        }
        Ok(marked)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Opens an order, optionally for a member and at an Occupied table.
    pub fn create_order(&self, member_id: Option<&str>, table_id: Option<&str>) -> BranchResult<Order> {
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let member = match member_id {
            Some(id) => Some(
                state
                    .members
                    .get(id)
                    .map_err(|e| self.rejected("create_order", e))?,
            ),
            None => None,
        };
        let order = state
            .orders
            .create_order(member, table_id, &mut state.floor, now)
            .map_err(|e| self.rejected("create_order", e))?;

        info!(order_id = %order.id, member_id = ?member_id, table_id = ?table_id, "Order opened");
        Ok(order)
    }

    pub fn add_order_item(
        &self,
        order_id: &str,
        menu_item_id: &str,
        quantity: i64,
        notes: Option<String>,
    ) -> BranchResult<LineItem> {
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        let line = state
            .orders
            .add_item(order_id, &state.menu, menu_item_id, quantity, notes, now)
            .map_err(|e| self.rejected("add_order_item", e))?;

        debug!(order_id, line_id = %line.id, menu_item_id, quantity, "Line added");
        Ok(line)
    }

    pub fn remove_order_item(&self, order_id: &str, line_id: &str) -> BranchResult<LineItem> {
        let mut state = self.write()?;
        let line = state
            .orders
            .remove_item(order_id, line_id)
            .map_err(|e| self.rejected("remove_order_item", e))?;
        debug!(order_id, line_id, "Line removed");
        Ok(line)
    }

    pub fn apply_discount(&self, order_id: &str, amount: Money) -> BranchResult<()> {
        let mut state = self.write()?;
        state
            .orders
            .apply_discount(order_id, amount)
            .map_err(|e| self.rejected("apply_discount", e))?;
        info!(order_id, discount = %amount, "Discount applied");
        Ok(())
    }

    /// Applies the ordering member's tier discount. Returns the amount.
    pub fn apply_member_discount(&self, order_id: &str) -> BranchResult<Money> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let discount = state
            .orders
            .apply_member_discount(order_id, &state.members)
            .map_err(|e| self.rejected("apply_member_discount", e))?;
        info!(order_id, discount = %discount, "Member discount applied");
        Ok(discount)
    }

    pub fn mark_line_preparing(&self, order_id: &str, line_id: &str) -> BranchResult<()> {
        let mut state = self.write()?;
        state
            .orders
            .mark_preparing(order_id, line_id)
            .map_err(|e| self.rejected("mark_line_preparing", e))?;
        Ok(())
    }

    pub fn mark_line_served(&self, order_id: &str, line_id: &str) -> BranchResult<()> {
        let mut state = self.write()?;
        state
            .orders
            .mark_served(order_id, line_id)
            .map_err(|e| self.rejected("mark_line_served", e))?;
        Ok(())
    }

    pub fn cancel_order_line(&self, order_id: &str, line_id: &str) -> BranchResult<()> {
        let mut state = self.write()?;
        state
            .orders
            .cancel_line(order_id, line_id)
            .map_err(|e| self.rejected("cancel_order_line", e))?;
        debug!(order_id, line_id, "Line cancelled");
        Ok(())
    }

    pub fn cancel_order(&self, order_id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        state
            .orders
            .cancel_order(order_id, &mut state.floor, now)
            .map_err(|e| self.rejected("cancel_order", e))?;
        info!(order_id, "Order cancelled");
        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    pub fn create_payment(&self, order_id: &str, method: PaymentMethod) -> BranchResult<Payment> {
        let now = self.now();
        let mut state = self.write()?;
        let payment = state
            .orders
            .create_payment(order_id, method, now)
            .map_err(|e| self.rejected("create_payment", e))?;
        info!(
            payment_id = %payment.id,
            order_id,
            method = payment.method.name(),
            total = %self.config.format_currency(payment.total),
            "Payment created"
        );
        Ok(payment)
    }

    /// Settles a payment: closes the order, frees the table, credits the
    /// member.
    pub fn complete_payment(&self, payment_id: &str) -> BranchResult<PaymentReceipt> {
        let now = self.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        let receipt = state
            .orders
            .complete_payment(payment_id, &mut state.floor, &mut state.members, now)
            .map_err(|e| self.rejected("complete_payment", e))?;

        info!(
            payment_id,
            order_id = %receipt.order.order_id,
            total = %self.config.format_currency(receipt.total),
            points = receipt.points_earned,
            table = ?receipt.table_released,
            "Payment completed"
        );
        if receipt.tier_after > receipt.tier_before {
            info!(
                member_id = ?receipt.member_id,
                tier = ?receipt.tier_after,
                "Member upgraded"
            );
        }
        Ok(receipt)
    }

    pub fn refund_payment(&self, payment_id: &str, reason: &str) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .orders
            .refund_payment(payment_id, reason, now)
            .map_err(|e| self.rejected("refund_payment", e))?;
        info!(payment_id, "Payment refunded");
        Ok(())
    }

    // =========================================================================
    // Tables & Games
    // =========================================================================

    /// Seats a party that walked in without a reservation.
    pub fn seat_walk_in(&self, table_id: &str, party_size: u32) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .floor
            .seat(table_id, party_size, now)
            .map_err(|e| self.rejected("seat_walk_in", e))?;
        info!(table_id, party_size, "Walk-in seated");
        Ok(())
    }

    pub fn assign_game(&self, table_id: &str, game_id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .floor
            .assign_game(table_id, game_id, now)
            .map_err(|e| self.rejected("assign_game", e))?;
        info!(table_id, game_id, "Game handed out");
        Ok(())
    }

    pub fn set_table_maintenance(&self, table_id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .floor
            .set_maintenance(table_id, now)
            .map_err(|e| self.rejected("set_table_maintenance", e))?;
        info!(table_id, "Table out of service");
        Ok(())
    }

    /// Clears a table from any status. Returns the games put back.
    pub fn release_table(&self, table_id: &str) -> BranchResult<Vec<String>> {
        let now = self.now();
        let mut state = self.write()?;
        if let Ok(table) = state.floor.table(table_id) {
            if let Some(order_id) = table.active_order() {
                warn!(table_id, order_id, "Releasing a table with an open order");
            }
        }
        let games = state
            .floor
            .clear_table(table_id, now)
            .map_err(|e| self.rejected("release_table", e))?;
        info!(table_id, games = games.len(), "Table released");
        Ok(games)
    }

    /// Holds an Available table for an imminent party.
    pub fn hold_table(&self, table_id: &str) -> BranchResult<()> {
        let now = self.now();
        let mut state = self.write()?;
        state
            .floor
            .hold(table_id, now)
            .map_err(|e| self.rejected("hold_table", e))?;
        info!(table_id, "Table held");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True when no live reservation on the table overlaps `[start, end)`.
    pub fn is_table_available(&self, table_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> BranchResult<bool> {
        let slot = TimeSlot::new(start, end)?;
        let state = self.read()?;
        state.floor.table(table_id)?;
        Ok(state.reservations.is_table_available(table_id, &slot))
    }

    pub fn active_booking_count(&self, member_id: &str) -> BranchResult<usize> {
        let state = self.read()?;
        state.members.get(member_id)?;
        Ok(state.reservations.active_booking_count(member_id))
    }

    pub fn member(&self, id: &str) -> BranchResult<MemberProfile> {
        let state = self.read()?;
        let member = state.members.get(id)?;
        Ok(MemberProfile {
            tier: member.tier(),
            benefits: member.benefits(),
            active_bookings: state.reservations.active_booking_count(id),
            member: member.clone(),
        })
    }

    pub fn table(&self, id: &str) -> BranchResult<Table> {
        Ok(self.read()?.floor.table(id)?.clone())
    }

    pub fn game(&self, id: &str) -> BranchResult<BoardGame> {
        Ok(self.read()?.floor.game(id)?.clone())
    }

    pub fn reservation(&self, id: &str) -> BranchResult<Reservation> {
        Ok(self.read()?.reservations.get(id)?.clone())
    }

    pub fn reservations_for_member(&self, member_id: &str) -> BranchResult<Vec<Reservation>> {
        let state = self.read()?;
        Ok(state.reservations.for_member(member_id).into_iter().cloned().collect())
    }

    pub fn reservations_for_table(&self, table_id: &str) -> BranchResult<Vec<Reservation>> {
        let state = self.read()?;
        Ok(state.reservations.for_table(table_id).into_iter().cloned().collect())
    }

    pub fn order(&self, id: &str) -> BranchResult<Order> {
        Ok(self.read()?.orders.order(id)?.clone())
    }

    pub fn open_orders(&self) -> BranchResult<Vec<Order>> {
        Ok(self.read()?.orders.open_orders().into_iter().cloned().collect())
    }

    pub fn payment(&self, id: &str) -> BranchResult<Payment> {
        Ok(self.read()?.orders.payment(id)?.clone())
    }

    pub fn available_tables(&self) -> BranchResult<Vec<Table>> {
        Ok(self.read()?.floor.available_tables().into_iter().cloned().collect())
    }

    pub fn available_games(&self) -> BranchResult<Vec<BoardGame>> {
        Ok(self.read()?.floor.available_games().into_iter().cloned().collect())
    }

    pub fn low_stock_items(&self) -> BranchResult<Vec<MenuItem>> {
        Ok(self.read()?.menu.low_stock().into_iter().cloned().collect())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a new member with no spend history.
    pub fn register_member(&self, id: &str, name: &str) -> BranchResult<Member> {
        let member = Member::new(id, name, self.now())?;
        self.import_member(member.clone())?;
        Ok(member)
    }

    /// Registers an existing member record (spend and points carried over).
    pub fn import_member(&self, member: Member) -> BranchResult<()> {
        let id = member.id.clone();
        self.write()?.members.register(member)?;
        info!(member_id = %id, "Member registered");
        Ok(())
    }

    pub fn deactivate_member(&self, id: &str) -> BranchResult<()> {
        self.write()?.members.get_mut(id)?.deactivate();
        info!(member_id = id, "Member deactivated");
        Ok(())
    }

    pub fn reactivate_member(&self, id: &str) -> BranchResult<()> {
        self.write()?.members.get_mut(id)?.reactivate();
        info!(member_id = id, "Member reactivated");
        Ok(())
    }

    /// Spends loyalty points. Returns the remaining balance.
    pub fn redeem_points(&self, member_id: &str, points: i64) -> BranchResult<i64> {
        let mut state = self.write()?;
        let remaining = state
            .members
            .get_mut(member_id)?
            .redeem_points(points)
            .map_err(|e| self.rejected("redeem_points", e))?;
        info!(member_id, points, remaining, "Points redeemed");
        Ok(remaining)
    }

    pub fn add_table(&self, table: Table) -> BranchResult<()> {
        let id = table.id.clone();
        self.write()?.floor.add_table(table)?;
        debug!(table_id = %id, "Table added");
        Ok(())
    }

    pub fn add_board_game(&self, game: BoardGame) -> BranchResult<()> {
        let id = game.id.clone();
        self.write()?.floor.add_game(game)?;
        debug!(game_id = %id, "Board game added");
        Ok(())
    }

    pub fn add_menu_item(&self, item: MenuItem) -> BranchResult<()> {
        let id = item.id.clone();
        self.write()?.menu.add(item)?;
        debug!(menu_item_id = %id, "Menu item added");
        Ok(())
    }

    /// Staff toggle; stock still decides availability on top of it.
    pub fn set_menu_item_available(&self, id: &str, available: bool) -> BranchResult<()> {
        self.write()?.menu.set_enabled(id, available)?;
        info!(menu_item_id = id, available, "Menu item availability changed");
        Ok(())
    }

    pub fn restock_menu_item(&self, id: &str, quantity: u32) -> BranchResult<()> {
        self.write()?.menu.get_mut(id)?.add_stock(quantity)?;
        debug!(menu_item_id = id, quantity, "Menu item restocked");
        Ok(())
    }

    pub fn retire_game(&self, id: &str) -> BranchResult<()> {
        self.write()?.floor.retire_game(id)?;
        info!(game_id = id, "Board game retired");
        Ok(())
    }

    pub fn send_game_to_maintenance(&self, id: &str) -> BranchResult<()> {
        self.write()?.floor.send_game_to_maintenance(id)?;
        info!(game_id = id, "Board game sent to maintenance");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read(&self) -> BranchResult<RwLockReadGuard<'_, BranchState>> {
        self.state.read().map_err(|_| BranchError::LockPoisoned)
    }

    fn write(&self) -> BranchResult<RwLockWriteGuard<'_, BranchState>> {
        self.state.write().map_err(|_| BranchError::LockPoisoned)
    }

    // business outcomes are warnings, everything else debug
    fn rejected(&self, operation: &'static str, err: CoreError) -> BranchError {
        let err = BranchError::from(err);
        if err.is_business_outcome() || err.code() == ErrorCode::PaymentFailed {
            warn!(branch = %self.config.branch.id, operation, code = ?err.code(), error = %err, "Rejected");
        } else {
            debug!(branch = %self.config.branch.id, operation, code = ?err.code(), error = %err, "Rejected");
        }
        err
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
