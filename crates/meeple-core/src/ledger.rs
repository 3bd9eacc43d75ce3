//! # Order & Payment Engine
//!
//! [`OrderBook`] owns a branch's orders and the payments taken against them,
//! and runs payment completion: the one transaction that reaches across
//! order, table, games and member at once.
//!
//! ## Payment Completion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete_payment(payment_id)                                          │
//! │                                                                         │
//! │  0. Pending → Processing          (anything else: InvalidState, no-op) │
//! │  1. Processing → Completed                                             │
//! │  2. order.close()                                                      │
//! │  3. clear the order's table, games back on the shelf                   │
//! │     (only while the table still carries this order)                    │
//! │  4. member.credit(total, now)     points at the PRE-credit tier        │
//! │                                                                         │
//! │  Step 2, 3 or 4 fails:                                                 │
//! │    payment → Failed (cause stored), observer.on_failure(...)           │
//! │    → CoreError::PaymentFailed { cause }                                │
//! │    steps that already ran stay applied                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Freezing the Bill
//! Once a payment exists for an order, nothing that changes the total
//! (add / remove / cancel line, discount, cancel order) is accepted, and a
//! second payment is refused while one is Pending, Processing or Completed.
//! A Failed payment frees the order for another attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use ts_rs::TS;

use crate::catalog::MenuCatalog;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::member::{Credit, Member, MemberDirectory};
use crate::money::Money;
use crate::observer::{FailureEvent, NoopObserver, TransitionEvent, TransitionObserver};
use crate::order::{LineItem, Order, OrderStatus, OrderSummary};
use crate::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::resource::Floor;
use crate::tier::Tier;
use crate::types::{EntityKind, Rate};

// =============================================================================
// Receipt
// =============================================================================

/// What a successful completion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub method: String,
    pub transaction_reference: String,
    pub total: Money,
    pub change_due: Money,
    pub order: OrderSummary,
    pub table_released: Option<String>,
    pub games_released: Vec<String>,
    pub member_id: Option<String>,
    pub points_earned: i64,
    pub tier_before: Option<Tier>,
    pub tier_after: Option<Tier>,
    #[ts(as = "String")]
    pub completed_at: DateTime<Utc>,
}

// what steps 2-4 changed
struct Settlement {
    table_released: Option<String>,
    games_released: Vec<String>,
    credit: Option<Credit>,
}

// =============================================================================
// Order Book
// =============================================================================

pub struct OrderBook {
    orders: HashMap<String, Order>,
    payments: HashMap<String, Payment>,
    tax_rate: Rate,
    observer: Arc<dyn TransitionObserver>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new(Rate::from_bps(crate::DEFAULT_TAX_RATE_BPS), Arc::new(NoopObserver))
    }
}

impl fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderBook")
            .field("orders", &self.orders.len())
            .field("payments", &self.payments.len())
            .field("tax_rate", &self.tax_rate)
            .finish()
    }
}

impl OrderBook {
    pub fn new(tax_rate: Rate, observer: Arc<dyn TransitionObserver>) -> Self {
        Self {
            orders: HashMap::new(),
            payments: HashMap::new(),
            tax_rate,
            observer,
        }
    }

    pub fn tax_rate(&self) -> Rate {
        self.tax_rate
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn order(&self, id: &str) -> CoreResult<&Order> {
        self.orders
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Order, id))
    }

    pub fn payment(&self, id: &str) -> CoreResult<&Payment> {
        self.payments
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Payment, id))
    }

    /// Payments taken against an order, oldest first.
    pub fn payments_for(&self, order_id: &str) -> Vec<&Payment> {
        let mut list: Vec<&Payment> = self
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .collect();
        list.sort_by_key(|p| p.created_at);
        list
    }

    /// Open orders, oldest first.
    pub fn open_orders(&self) -> Vec<&Order> {
        let mut list: Vec<&Order> = self.orders.values().filter(|o| o.is_open()).collect();
        list.sort_by_key(|o| o.created_at);
        list
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Opens an order for an optional member at an optional table.
    ///
    /// A table must be Occupied and becomes linked to the order.
    pub fn create_order(
        &mut self,
        member: Option<&Member>,
        table_id: Option<&str>,
        floor: &mut Floor,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        let order = Order::new(
            member.map(|m| m.id.clone()),
            table_id.map(str::to_string),
            self.tax_rate,
            now,
        );

        if let Some(table_id) = table_id {
            floor.table_mut(table_id)?.attach_order(&order.id)?;
        }

        self.orders.insert(order.id.clone(), order.clone());
        self.emit(EntityKind::Order, &order.id, None, OrderStatus::Open, now);
        Ok(order)
    }

    /// Adds `quantity` of a catalog item to an order. Returns the new line.
    pub fn add_item<C>(
        &mut self,
        order_id: &str,
        catalog: &C,
        menu_item_id: &str,
        quantity: i64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<LineItem>
    where
        C: MenuCatalog + ?Sized,
    {
        let item = catalog
            .item(menu_item_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::MenuItem, menu_item_id))?;
        let order = self.order_for_update(order_id, "add items")?;
        let line_id = order.add_item(item, quantity, notes, now)?;
        order.line(&line_id).cloned()
    }

    pub fn remove_item(&mut self, order_id: &str, line_id: &str) -> CoreResult<LineItem> {
        self.order_for_update(order_id, "remove items")?.remove_item(line_id)
    }

    pub fn apply_discount(&mut self, order_id: &str, amount: Money) -> CoreResult<()> {
        self.order_for_update(order_id, "apply a discount")?
            .apply_discount(amount)
    }

    /// Applies the member's tier discount. Walk-in orders get none.
    pub fn apply_member_discount(&mut self, order_id: &str, members: &MemberDirectory) -> CoreResult<Money> {
        let tier = match &self.order(order_id)?.member_id {
            Some(member_id) => members.get(member_id)?.tier(),
            None => None,
        };
        self.order_for_update(order_id, "apply a discount")?
            .apply_member_discount(tier)
    }

    pub fn mark_preparing(&mut self, order_id: &str, line_id: &str) -> CoreResult<()> {
        self.order_mut(order_id)?.mark_preparing(line_id)
    }

    pub fn mark_served(&mut self, order_id: &str, line_id: &str) -> CoreResult<()> {
        self.order_mut(order_id)?.mark_served(line_id)
    }

    pub fn cancel_line(&mut self, order_id: &str, line_id: &str) -> CoreResult<()> {
        self.order_for_update(order_id, "cancel a line")?
            .cancel_line(line_id)
    }

    /// Cancels an Open order and unlinks it from its table. The party stays
    /// seated.
    pub fn cancel_order(&mut self, order_id: &str, floor: &mut Floor, now: DateTime<Utc>) -> CoreResult<()> {
        let order = self.order_for_update(order_id, "cancel")?;
        order.cancel(now)?;
        let table_id = order.table_id.clone();

        if let Some(table_id) = table_id {
            if let Ok(table) = floor.table_mut(&table_id) {
                table.detach_order(order_id);
            }
        }
        self.emit(
            EntityKind::Order,
            order_id,
            Some(OrderStatus::Open),
            OrderStatus::Cancelled,
            now,
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Takes a payment for an Open order at its current total.
    pub fn create_payment(
        &mut self,
        order_id: &str,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> CoreResult<Payment> {
        let order = self.order(order_id)?;
        if !order.is_open() {
            return Err(CoreError::invalid_state(EntityKind::Order, order_id, order.status(), "take a payment"));
        }
        if let Some(existing) = self.blocking_payment(order_id) {
            return Err(CoreError::invalid_state(
                EntityKind::Order,
                order_id,
                format!("awaiting payment {}", existing.id),
                "take another payment",
            ));
        }
        if !order.total().is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            }
            .into());
        }

        let payment = Payment::new(order, method, now)?;
        self.payments.insert(payment.id.clone(), payment.clone());
        self.observer.on_transition(
            &TransitionEvent::new(
                EntityKind::Payment,
                payment.id.as_str(),
                None,
                PaymentStatus::Pending.to_string(),
                now,
            )
            .with_detail(format!("{} {} for order {}", payment.method.name(), payment.total, order_id)),
        );
        Ok(payment)
    }

    /// Completes a Pending payment; see the module docs for the steps.
    pub fn complete_payment(
        &mut self,
        payment_id: &str,
        floor: &mut Floor,
        members: &mut MemberDirectory,
        now: DateTime<Utc>,
    ) -> CoreResult<PaymentReceipt> {
        let payment = self
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Payment, payment_id))?;
        payment.begin()?;
        payment.settle(now)?;
        let order_id = payment.order_id.clone();
        let member_id = payment.member_id.clone();
        let total = payment.total;

        self.emit(
            EntityKind::Payment,
            payment_id,
            Some(PaymentStatus::Pending),
            PaymentStatus::Completed,
            now,
        );

        match self.settle(&order_id, member_id.as_deref(), total, floor, members, now) {
            Ok(settlement) => {
                let order = self.order(&order_id)?.summary();
                let payment = self
                    .payments
                    .get_mut(payment_id)
                    .ok_or_else(|| CoreError::not_found(EntityKind::Payment, payment_id))?;
                let credit = settlement.credit;
                payment.record_points(credit.map(|c| c.points).unwrap_or(0));

                Ok(PaymentReceipt {
                    payment_id: payment.id.clone(),
                    method: payment.method.name().to_string(),
                    transaction_reference: payment.transaction_reference(),
                    total,
                    change_due: payment.change_due(),
                    order,
                    table_released: settlement.table_released,
                    games_released: settlement.games_released,
                    member_id,
                    points_earned: credit.map(|c| c.points).unwrap_or(0),
                    tier_before: credit.and_then(|c| c.tier_before),
                    tier_after: credit.and_then(|c| c.tier_after),
                    completed_at: now,
                })
            }
            Err((step, cause)) => {
                if let Some(payment) = self.payments.get_mut(payment_id) {
                    payment.fail(cause.to_string());
                }
                self.observer.on_failure(&FailureEvent {
                    entity: EntityKind::Payment,
                    id: payment_id.to_string(),
                    step: step.to_string(),
                    cause: cause.to_string(),
                    at: now,
                });
                self.emit(
                    EntityKind::Payment,
                    payment_id,
                    Some(PaymentStatus::Completed),
                    PaymentStatus::Failed,
                    now,
                );
                Err(CoreError::PaymentFailed {
                    payment_id: payment_id.to_string(),
                    cause: Box::new(cause),
                })
            }
        }
    }

    /// Completed → Refunded. Loyalty credit stays with the member.
    pub fn refund_payment(&mut self, payment_id: &str, reason: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let payment = self
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Payment, payment_id))?;
        payment.refund(reason)?;

        self.observer.on_transition(
            &TransitionEvent::new(
                EntityKind::Payment,
                payment_id,
                Some(PaymentStatus::Completed.to_string()),
                PaymentStatus::Refunded.to_string(),
                now,
            )
            .with_detail(reason.trim()),
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    // steps 2-4 of completion; Err carries the failing step's name
    fn settle(
        &mut self,
        order_id: &str,
        member_id: Option<&str>,
        total: Money,
        floor: &mut Floor,
        members: &mut MemberDirectory,
        now: DateTime<Utc>,
    ) -> Result<Settlement, (&'static str, CoreError)> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| ("close order", CoreError::not_found(EntityKind::Order, order_id)))?;
        order.close(now).map_err(|e| ("close order", e))?;
        let table_id = order.table_id.clone();
        self.emit(
            EntityKind::Order,
            order_id,
            Some(OrderStatus::Open),
            OrderStatus::Closed,
            now,
        );

        let mut table_released = None;
        let mut games_released = Vec::new();
        if let Some(table_id) = table_id {
            let table = floor.table(&table_id).map_err(|e| ("clear table", e))?;
            // a released table may already be seating the next party
            if table.active_order() == Some(order_id) {
                games_released = floor
                    .clear_table(&table_id, now)
                    .map_err(|e| ("clear table", e))?;
                table_released = Some(table_id);
            }
        }

        let credit = match member_id {
            Some(member_id) => {
                let member = members.get_mut(member_id).map_err(|e| ("credit member", e))?;
                let credit = member.credit(total, now).map_err(|e| ("credit member", e))?;
                self.observer.on_transition(
                    &TransitionEvent::new(
                        EntityKind::Member,
                        member_id,
                        credit.tier_before.map(|t| t.to_string()),
                        credit
                            .tier_after
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "no tier".to_string()),
                        now,
                    )
                    .with_detail(format!("+{} spend, +{} points", total, credit.points)),
                );
                Some(credit)
            }
            None => None,
        };

        Ok(Settlement {
            table_released,
            games_released,
            credit,
        })
    }

    fn blocking_payment(&self, order_id: &str) -> Option<&Payment> {
        self.payments
            .values()
            .find(|p| p.order_id == order_id && p.status().holds_order())
    }

    fn order_mut(&mut self, order_id: &str) -> CoreResult<&mut Order> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Order, order_id))
    }

    // the bill is frozen once a payment holds the order
    fn order_for_update(&mut self, order_id: &str, operation: &str) -> CoreResult<&mut Order> {
        if let Some(payment) = self.blocking_payment(order_id) {
            return Err(CoreError::invalid_state(
                EntityKind::Order,
                order_id,
                format!("held by payment {}", payment.id),
                operation,
            ));
        }
        self.order_mut(order_id)
    }

    fn emit<S: fmt::Display>(&self, entity: EntityKind, id: &str, from: Option<S>, to: S, now: DateTime<Utc>) {
        self.observer.on_transition(&TransitionEvent::new(
            entity,
            id,
            from.map(|f| f.to_string()),
            to.to_string(),
            now,
        ));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Menu, MenuCategory, MenuItem};
    use crate::observer::testing::RecordingObserver;
    use crate::resource::{BoardGame, Table, TableStatus};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 19, 0, 0).unwrap()
    }

    struct Fixture {
        book: OrderBook,
        floor: Floor,
        members: MemberDirectory,
        menu: Menu,
        observer: Arc<RecordingObserver>,
    }

    fn fixture(tax_bps: u32) -> Fixture {
        let observer = Arc::new(RecordingObserver::default());
        let book = OrderBook::new(Rate::from_bps(tax_bps), observer.clone());

        let mut floor = Floor::default();
        floor
            .add_table(Table::new("T001", "Table 1", 4, Money::from_major(50)).unwrap())
            .unwrap();
        floor
            .add_game(BoardGame::new("BG001", "Settlers of Catan", "Strategy", (3, 4), 90).unwrap())
            .unwrap();

        let mut members = MemberDirectory::new();
        members
            .register(
                Member::new("MEM001", "Alice", now())
                    .unwrap()
                    .with_history(Money::from_major(7_000), 0)
                    .unwrap(),
            )
            .unwrap();

        let mut menu = Menu::new();
        for (id, price) in [("A", 100), ("B", 50), ("D001", 60)] {
            menu.add(
                MenuItem::new(id, format!("Item {}", id), MenuCategory::Food, Money::from_major(price))
                    .unwrap()
                    .with_stock(50),
            )
            .unwrap();
        }

        Fixture {
            book,
            floor,
            members,
            menu,
            observer,
        }
    }

    /// Seats the table, hands it a game and opens a ฿180 order (3 × ฿60).
    fn seated_order(f: &mut Fixture, member: bool) -> Order {
        f.floor.seat("T001", 3, now()).unwrap();
        f.floor.assign_game("T001", "BG001", now()).unwrap();
        let member = if member { Some(f.members.get("MEM001").unwrap().clone()) } else { None };
        let order = f
            .book
            .create_order(member.as_ref(), Some("T001"), &mut f.floor, now())
            .unwrap();
        f.book
            .add_item(&order.id, &f.menu, "D001", 3, None, now())
            .unwrap();
        order
    }

    fn cash(amount: i64) -> PaymentMethod {
        PaymentMethod::Cash {
            amount_received: Money::from_major(amount),
        }
    }

    #[test]
    fn test_order_links_to_occupied_table() {
        let mut f = fixture(0);
        let err = f
            .book
            .create_order(None, Some("T001"), &mut f.floor, now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));

        let order = seated_order(&mut f, false);
        assert_eq!(f.floor.table("T001").unwrap().active_order(), Some(order.id.as_str()));
        assert!(matches!(
            f.book.create_order(None, Some("T404"), &mut f.floor, now()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_add_item_consults_catalog() {
        let mut f = fixture(700);
        let order = f.book.create_order(None, None, &mut f.floor, now()).unwrap();

        assert!(matches!(
            f.book.add_item(&order.id, &f.menu, "NOPE", 1, None, now()),
            Err(CoreError::NotFound { .. })
        ));

        f.menu.set_enabled("A", false).unwrap();
        assert!(matches!(
            f.book.add_item(&order.id, &f.menu, "A", 1, None, now()),
            Err(CoreError::ResourceUnavailable { .. })
        ));

        let line = f.book.add_item(&order.id, &f.menu, "B", 2, None, now()).unwrap();
        assert_eq!(line.unit_price, Money::from_major(50));
        assert_eq!(f.book.order(&order.id).unwrap().subtotal(), Money::from_major(100));
    }

    #[test]
    fn test_member_discount_uses_directory_tier() {
        let mut f = fixture(700);
        let alice = f.members.get("MEM001").unwrap().clone();
        let order = f.book.create_order(Some(&alice), None, &mut f.floor, now()).unwrap();
        f.book.add_item(&order.id, &f.menu, "A", 2, None, now()).unwrap();
        f.book.add_item(&order.id, &f.menu, "B", 1, None, now()).unwrap();

        // ฿7,000 spend is Silver: 5% of ฿250
        let discount = f.book.apply_member_discount(&order.id, &f.members).unwrap();
        assert_eq!(discount, Money::from_cents(1_250));

        let walk_in = f.book.create_order(None, None, &mut f.floor, now()).unwrap();
        f.book.add_item(&walk_in.id, &f.menu, "A", 1, None, now()).unwrap();
        assert_eq!(f.book.apply_member_discount(&walk_in.id, &f.members).unwrap(), Money::zero());
    }

    #[test]
    fn test_cash_payment_completes_and_frees_table() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, false);

        let payment = f.book.create_payment(&order.id, cash(200), now()).unwrap();
        assert_eq!(payment.total, Money::from_major(180));

        let receipt = f
            .book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap();
        assert_eq!(receipt.change_due, Money::from_major(20));
        assert_eq!(receipt.table_released.as_deref(), Some("T001"));
        assert_eq!(receipt.games_released, vec!["BG001".to_string()]);

        assert_eq!(f.book.order(&order.id).unwrap().status(), OrderStatus::Closed);
        assert_eq!(f.book.payment(&payment.id).unwrap().status(), PaymentStatus::Completed);
        let table = f.floor.table("T001").unwrap();
        assert_eq!(table.status(), TableStatus::Available);
        assert_eq!(table.active_order(), None);
        assert!(f.floor.game("BG001").unwrap().is_available());
    }

    #[test]
    fn test_insufficient_cash_fails_at_creation() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, false);
        let err = f.book.create_payment(&order.id, cash(100), now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InsufficientFunds { .. })
        ));
        assert!(f.book.payments_for(&order.id).is_empty());
    }

    #[test]
    fn test_member_credited_at_pre_credit_tier() {
        let mut f = fixture(0);
        let alice = f.members.get("MEM001").unwrap().clone();
        let order = f.book.create_order(Some(&alice), None, &mut f.floor, now()).unwrap();
        // ฿600 pushes ฿7,000 (Silver) over ฿7,500 (Gold)
        f.book.add_item(&order.id, &f.menu, "A", 6, None, now()).unwrap();

        let payment = f.book.create_payment(&order.id, cash(600), now()).unwrap();
        let receipt = f
            .book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap();

        assert_eq!(receipt.points_earned, 60);
        assert_eq!(receipt.tier_before, Some(Tier::Silver));
        assert_eq!(receipt.tier_after, Some(Tier::Gold));
        assert_eq!(receipt.table_released, None);

        let alice = f.members.get("MEM001").unwrap();
        assert_eq!(alice.points(), 60);
        assert_eq!(alice.lifetime_spend(), Money::from_major(7_600));
        assert_eq!(f.book.payment(&payment.id).unwrap().points_credited(), 60);
    }

    #[test]
    fn test_bill_is_frozen_once_paid_for() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, false);
        let payment = f.book.create_payment(&order.id, cash(200), now()).unwrap();

        assert!(matches!(
            f.book.add_item(&order.id, &f.menu, "A", 1, None, now()),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(f.book.apply_discount(&order.id, Money::from_major(10)).is_err());
        assert!(f.book.cancel_order(&order.id, &mut f.floor, now()).is_err());
        assert!(matches!(
            f.book.create_payment(&order.id, cash(200), now()),
            Err(CoreError::InvalidState { .. })
        ));

        // kitchen can still work the lines
        let line_id = f.book.order(&order.id).unwrap().lines()[0].id.clone();
        f.book.mark_preparing(&order.id, &line_id).unwrap();
        f.book.mark_served(&order.id, &line_id).unwrap();

        f.book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap();
        assert!(matches!(
            f.book.complete_payment(&payment.id, &mut f.floor, &mut f.members, now()),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_partial_failure_marks_payment_failed() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, true);
        let payment = f.book.create_payment(&order.id, cash(200), now()).unwrap();

        // member gone between order and payment: step 4 fails
        f.members = MemberDirectory::new();

        let err = f
            .book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap_err();
        match &err {
            CoreError::PaymentFailed { cause, .. } => {
                assert!(matches!(**cause, CoreError::NotFound { entity: EntityKind::Member, .. }));
            }
            other => panic!("expected PaymentFailed, got {other:?}"),
        }

        let stored = f.book.payment(&payment.id).unwrap();
        assert_eq!(stored.status(), PaymentStatus::Failed);
        assert!(stored.failure_reason().unwrap_or_default().contains("MEM001"));

        // earlier steps stay applied
        assert_eq!(f.book.order(&order.id).unwrap().status(), OrderStatus::Closed);
        assert!(f.floor.table("T001").unwrap().is_available());

        let failures = f.observer.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].step, "credit member");
    }

    #[test]
    fn test_paying_after_release_leaves_next_party_seated() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, false);

        // staff release the table before the first party pays
        f.floor.clear_table("T001", now()).unwrap();
        f.floor.seat("T001", 2, now()).unwrap();
        f.floor.assign_game("T001", "BG001", now()).unwrap();

        let payment = f.book.create_payment(&order.id, cash(180), now()).unwrap();
        let receipt = f
            .book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap();

        assert_eq!(receipt.table_released, None);
        assert!(receipt.games_released.is_empty());
        assert_eq!(f.book.order(&order.id).unwrap().status(), OrderStatus::Closed);

        let table = f.floor.table("T001").unwrap();
        assert_eq!(table.status(), TableStatus::Occupied);
        assert_eq!(table.party_size(), Some(2));
        assert!(!f.floor.game("BG001").unwrap().is_available());
    }

    #[test]
    fn test_deactivated_member_payment_still_completes() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, true);
        let payment = f.book.create_payment(&order.id, cash(200), now()).unwrap();
        f.members.get_mut("MEM001").unwrap().deactivate();

        let receipt = f
            .book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap();

        assert_eq!(receipt.points_earned, 18);
        assert_eq!(f.book.payment(&payment.id).unwrap().status(), PaymentStatus::Completed);
        let alice = f.members.get("MEM001").unwrap();
        assert_eq!(alice.lifetime_spend(), Money::from_major(7_180));
        assert_eq!(alice.visit_count(), 1);
        assert_eq!(alice.last_visit().map(|v| v.at), Some(now()));
        assert!(f.observer.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_order_cannot_be_paid() {
        let mut f = fixture(0);
        let order = f.book.create_order(None, None, &mut f.floor, now()).unwrap();
        assert!(matches!(
            f.book.create_payment(&order.id, cash(10), now()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_refund() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, true);
        let payment = f.book.create_payment(&order.id, cash(180), now()).unwrap();

        assert!(f.book.refund_payment(&payment.id, "Wrong table billed", now()).is_err());
        f.book
            .complete_payment(&payment.id, &mut f.floor, &mut f.members, now())
            .unwrap();

        assert!(matches!(
            f.book.refund_payment(&payment.id, "oops", now()),
            Err(CoreError::Validation(_))
        ));
        f.book
            .refund_payment(&payment.id, "Wrong table billed", now())
            .unwrap();
        assert_eq!(f.book.payment(&payment.id).unwrap().status(), PaymentStatus::Refunded);

        // no reversal of loyalty credit
        assert_eq!(f.members.get("MEM001").unwrap().points(), 18);
    }

    #[test]
    fn test_cancel_order_detaches_table() {
        let mut f = fixture(0);
        let order = seated_order(&mut f, false);
        f.book.cancel_order(&order.id, &mut f.floor, now()).unwrap();

        let table = f.floor.table("T001").unwrap();
        assert_eq!(table.status(), TableStatus::Occupied);
        assert_eq!(table.active_order(), None);
        assert!(f.book.open_orders().is_empty());
        assert!(f.book.create_payment(&order.id, cash(200), now()).is_err());
        assert!(f.observer.targets().contains(&format!("{}:Cancelled", order.id)));
    }
}
