//! # Order
//!
//! A table's (or a walk-in's) running bill of menu items.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌────────┐  add_item / remove_item / apply_discount / line moves     │
//! │   │  Open  │ ◄──────────────────────────────────────────────┐          │
//! │   └────────┘ ───────────────────────────────────────────────┘          │
//! │     │    │                                                              │
//! │     │    └── close()  (only by payment completion) ──► Closed          │
//! │     └─────── cancel() (every line → Cancelled)     ──► Cancelled       │
//! │                                                                         │
//! │   Line: Pending ──► Preparing ──► Served                               │
//! │            │            │                                               │
//! │            └────────────┴──► Cancelled   (never from Served)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//!   subtotal = Σ unit_price × qty        (non-cancelled lines)
//!   net      = subtotal − discount       (0 ≤ discount ≤ subtotal)
//!   tax      = net × tax_rate            (half-up to the satang)
//!   total    = net + tax
//!
//!   A(2 × ฿100) + B(1 × ฿50) = ฿250, −10% = ฿225, +7% = ฿240.75
//! ```
//!
//! Unit prices are snapshotted when the line is added, so later menu price
//! changes never reach an open bill.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::catalog::MenuItem;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::tier::{member_discount, Tier};
use crate::types::{new_id, EntityKind, Rate};
use crate::validation::{validate_order_size, validate_quantity};

// =============================================================================
// Statuses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Closed,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "Open"),
            OrderStatus::Closed => write!(f, "Closed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Pending,
    Preparing,
    Served,
    Cancelled,
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStatus::Pending => write!(f, "Pending"),
            LineStatus::Preparing => write!(f, "Preparing"),
            LineStatus::Served => write!(f, "Served"),
            LineStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One entry on the bill, frozen at the moment it was ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub id: String,
    pub menu_item_id: String,
    /// Name at time of ordering (frozen)
    pub name: String,
    /// Price at time of ordering (frozen)
    pub unit_price: Money,
    pub quantity: i64,
    pub notes: Option<String>,
    pub status: LineStatus,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    fn from_menu_item(item: &MenuItem, quantity: i64, notes: Option<String>, now: DateTime<Utc>) -> Self {
        LineItem {
            id: new_id(),
            menu_item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
            notes: notes.filter(|n| !n.trim().is_empty()),
            status: LineStatus::Pending,
            added_at: now,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == LineStatus::Cancelled
    }
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// `None` for walk-ins.
    pub member_id: Option<String>,
    pub table_id: Option<String>,
    lines: Vec<LineItem>,
    discount: Money,
    pub tax_rate: Rate,
    status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    closed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        member_id: Option<String>,
        table_id: Option<String>,
        tax_rate: Rate,
        now: DateTime<Utc>,
    ) -> Self {
        Order {
            id: new_id(),
            member_id,
            table_id,
            lines: Vec::new(),
            discount: Money::zero(),
            tax_rate,
            status: OrderStatus::Open,
            created_at: now,
            closed_at: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, line_id: &str) -> CoreResult<&LineItem> {
        self.lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::OrderLine, line_id))
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Sum over non-cancelled lines.
    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .filter(|l| !l.is_cancelled())
            .map(LineItem::line_total)
            .sum()
    }

    pub fn tax(&self) -> Money {
        (self.subtotal() - self.discount).calculate_tax(self.tax_rate)
    }

    pub fn total(&self) -> Money {
        self.subtotal() - self.discount + self.tax()
    }

    /// True when every non-cancelled line is Served.
    pub fn all_items_served(&self) -> bool {
        self.lines
            .iter()
            .filter(|l| !l.is_cancelled())
            .all(|l| l.status == LineStatus::Served)
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary::from(self)
    }

    // -------------------------------------------------------------------------
    // Mutations (Open only)
    // -------------------------------------------------------------------------

    /// Adds a line at the item's current price. Returns the line id.
    ///
    /// Same menu item twice gives two lines; the kitchen tracks them
    /// separately.
    pub fn add_item(
        &mut self,
        item: &MenuItem,
        quantity: i64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        self.require_open("add items")?;
        validate_quantity(quantity)?;
        validate_order_size(self.lines.len())?;
        if !item.is_available() {
            return Err(CoreError::unavailable(
                EntityKind::MenuItem,
                &item.id,
                format!("{} is not available", item.name),
            ));
        }

        let line = LineItem::from_menu_item(item, quantity, notes, now);
        let line_id = line.id.clone();
        self.lines.push(line);
        Ok(line_id)
    }

    /// Drops a line from the bill. Served lines stay.
    pub fn remove_item(&mut self, line_id: &str) -> CoreResult<LineItem> {
        self.require_open("remove items")?;
        let index = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::OrderLine, line_id))?;
        if self.lines[index].status == LineStatus::Served {
            return Err(CoreError::invalid_state(
                EntityKind::OrderLine,
                line_id,
                LineStatus::Served,
                "remove",
            ));
        }

        let removed = self.lines.remove(index);
        self.clamp_discount();
        Ok(removed)
    }

    /// Sets a flat discount: `0 ≤ amount ≤ subtotal`.
    pub fn apply_discount(&mut self, amount: Money) -> CoreResult<()> {
        self.require_open("apply a discount")?;
        let subtotal = self.subtotal();
        if amount.is_negative() || amount > subtotal {
            return Err(ValidationError::InvalidDiscount {
                discount: amount,
                subtotal,
            }
            .into());
        }
        self.discount = amount;
        Ok(())
    }

    /// Sets the discount to the tier's rate on the current subtotal.
    pub fn apply_member_discount(&mut self, tier: Option<Tier>) -> CoreResult<Money> {
        let discount = member_discount(self.subtotal(), tier);
        self.apply_discount(discount)?;
        Ok(discount)
    }

    pub fn mark_preparing(&mut self, line_id: &str) -> CoreResult<()> {
        self.move_line(line_id, &[LineStatus::Pending], LineStatus::Preparing, "start preparing")
    }

    pub fn mark_served(&mut self, line_id: &str) -> CoreResult<()> {
        self.move_line(line_id, &[LineStatus::Preparing], LineStatus::Served, "serve")
    }

    pub fn cancel_line(&mut self, line_id: &str) -> CoreResult<()> {
        self.move_line(
            line_id,
            &[LineStatus::Pending, LineStatus::Preparing],
            LineStatus::Cancelled,
            "cancel",
        )?;
        self.clamp_discount();
        Ok(())
    }

    /// Open → Closed.
    pub fn close(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.require_open("close")?;
        self.status = OrderStatus::Closed;
        self.closed_at = Some(now);
        Ok(())
    }

    /// Open → Cancelled; every line is cancelled with it.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.require_open("cancel")?;
        for line in &mut self.lines {
            line.status = LineStatus::Cancelled;
        }
        self.discount = Money::zero();
        self.status = OrderStatus::Cancelled;
        self.closed_at = Some(now);
        Ok(())
    }

    fn move_line(
        &mut self,
        line_id: &str,
        from: &[LineStatus],
        to: LineStatus,
        operation: &str,
    ) -> CoreResult<()> {
        self.require_open(operation)?;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::OrderLine, line_id))?;
        if !from.contains(&line.status) {
            return Err(CoreError::invalid_state(EntityKind::OrderLine, line_id, line.status, operation));
        }
        line.status = to;
        Ok(())
    }

    // discount ≤ subtotal must survive lines leaving the bill
    fn clamp_discount(&mut self) {
        self.discount = self.discount.min(self.subtotal());
    }

    fn require_open(&self, operation: &str) -> CoreResult<()> {
        if self.status != OrderStatus::Open {
            return Err(CoreError::invalid_state(EntityKind::Order, &self.id, self.status, operation));
        }
        Ok(())
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Flat view of an order's totals for receipts and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub order_id: String,
    pub member_id: Option<String>,
    pub table_id: Option<String>,
    pub line_count: usize,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub all_served: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        OrderSummary {
            order_id: order.id.clone(),
            member_id: order.member_id.clone(),
            table_id: order.table_id.clone(),
            line_count: order.lines.iter().filter(|l| !l.is_cancelled()).count(),
            subtotal: order.subtotal(),
            discount: order.discount,
            tax: order.tax(),
            total: order.total(),
            status: order.status,
            all_served: order.all_items_served(),
            created_at: order.created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MenuCategory;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 18, 0, 0).unwrap()
    }

    fn item(id: &str, price: i64) -> MenuItem {
        MenuItem::new(id, format!("Item {}", id), MenuCategory::Food, Money::from_major(price))
            .unwrap()
            .with_stock(20)
    }

    fn order() -> Order {
        Order::new(Some("MEM001".to_string()), Some("T001".to_string()), Rate::from_bps(700), now())
    }

    #[test]
    fn test_reference_total() {
        let mut o = order();
        o.add_item(&item("A", 100), 2, None, now()).unwrap();
        o.add_item(&item("B", 50), 1, None, now()).unwrap();
        assert_eq!(o.subtotal(), Money::from_major(250));

        o.apply_discount(Money::from_major(25)).unwrap();
        assert_eq!(o.tax(), Money::from_cents(1_575));
        assert_eq!(o.total(), Money::from_cents(24_075));
    }

    #[test]
    fn test_member_discount_gives_same_total() {
        let mut o = order();
        o.add_item(&item("A", 100), 2, None, now()).unwrap();
        o.add_item(&item("B", 50), 1, None, now()).unwrap();

        let discount = o.apply_member_discount(Some(Tier::Gold)).unwrap();
        assert_eq!(discount, Money::from_major(25));
        assert_eq!(o.total(), Money::from_cents(24_075));

        assert_eq!(o.apply_member_discount(None).unwrap(), Money::zero());
    }

    #[test]
    fn test_price_is_snapshotted() {
        let mut o = order();
        let mut tea = item("D001", 60);
        o.add_item(&tea, 3, Some("less sugar".to_string()), now()).unwrap();

        tea.set_price(Money::from_major(80)).unwrap();
        assert_eq!(o.subtotal(), Money::from_major(180));
        assert_eq!(o.lines()[0].notes.as_deref(), Some("less sugar"));
    }

    #[test]
    fn test_add_item_rejections() {
        let mut o = order();
        assert!(matches!(
            o.add_item(&item("A", 100), 0, None, now()),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            o.add_item(&item("A", 100), -2, None, now()),
            Err(CoreError::Validation(_))
        ));

        let mut sold_out = item("A", 100);
        sold_out.stock_level = 0;
        assert!(matches!(
            o.add_item(&sold_out, 1, None, now()),
            Err(CoreError::ResourceUnavailable { .. })
        ));

        o.close(now()).unwrap();
        assert!(matches!(
            o.add_item(&item("A", 100), 1, None, now()),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_discount_bounds() {
        let mut o = order();
        o.add_item(&item("A", 100), 1, None, now()).unwrap();
        assert!(matches!(
            o.apply_discount(Money::from_major(101)),
            Err(CoreError::Validation(ValidationError::InvalidDiscount { .. }))
        ));
        assert!(o.apply_discount(Money::from_cents(-1)).is_err());
        o.apply_discount(Money::from_major(100)).unwrap();
        assert_eq!(o.total(), Money::zero());
    }

    #[test]
    fn test_line_transitions() {
        let mut o = order();
        let line = o.add_item(&item("A", 100), 1, None, now()).unwrap();

        assert!(o.mark_served(&line).is_err());
        o.mark_preparing(&line).unwrap();
        assert!(o.mark_preparing(&line).is_err());
        o.mark_served(&line).unwrap();
        assert!(matches!(o.cancel_line(&line), Err(CoreError::InvalidState { .. })));
        assert!(o.remove_item(&line).is_err());
        assert!(o.all_items_served());
    }

    #[test]
    fn test_cancelled_lines_leave_subtotal() {
        let mut o = order();
        let a = o.add_item(&item("A", 100), 2, None, now()).unwrap();
        o.add_item(&item("B", 50), 1, None, now()).unwrap();
        o.apply_discount(Money::from_major(150)).unwrap();

        o.cancel_line(&a).unwrap();
        assert_eq!(o.subtotal(), Money::from_major(50));
        // discount shrinks with the bill
        assert_eq!(o.discount(), Money::from_major(50));
        assert!(!o.all_items_served());
    }

    #[test]
    fn test_remove_item() {
        let mut o = order();
        let a = o.add_item(&item("A", 100), 2, None, now()).unwrap();
        let removed = o.remove_item(&a).unwrap();
        assert_eq!(removed.menu_item_id, "A");
        assert!(o.lines().is_empty());
        assert!(matches!(o.remove_item(&a), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_cancel_order_cancels_lines() {
        let mut o = order();
        o.add_item(&item("A", 100), 2, None, now()).unwrap();
        o.add_item(&item("B", 50), 1, None, now()).unwrap();
        o.cancel(now()).unwrap();

        assert_eq!(o.status(), OrderStatus::Cancelled);
        assert!(o.lines().iter().all(|l| l.status == LineStatus::Cancelled));
        assert_eq!(o.total(), Money::zero());
        assert!(o.close(now()).is_err());
        assert!(o.cancel(now()).is_err());
    }

    #[test]
    fn test_close_once() {
        let mut o = order();
        o.close(now()).unwrap();
        assert_eq!(o.closed_at(), Some(now()));
        assert!(matches!(o.close(now()), Err(CoreError::InvalidState { .. })));
    }

    #[test]
    fn test_summary() {
        let mut o = order();
        let a = o.add_item(&item("A", 100), 2, None, now()).unwrap();
        o.add_item(&item("B", 50), 1, None, now()).unwrap();
        o.cancel_line(&a).unwrap();

        let summary = o.summary();
        assert_eq!(summary.line_count, 1);
        assert_eq!(summary.subtotal, Money::from_major(50));
        assert_eq!(summary.tax, Money::from_cents(350));
        assert_eq!(summary.total, Money::from_cents(5_350));
        assert_eq!(summary.status, OrderStatus::Open);
        assert!(!summary.all_served);
    }
}
