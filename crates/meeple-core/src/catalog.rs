//! # Menu Catalog
//!
//! The order engine only needs two answers from the menu: what does an item
//! cost right now, and can it be sold right now. Catalog management (adding
//! dishes, restocking) lives with whoever owns the menu; the engine reads it
//! through [`MenuCatalog`].
//!
//! ```text
//! ┌──────────────┐  item(id)   ┌────────────────────────────────────────┐
//! │  OrderBook   │ ──────────► │  MenuCatalog (trait)                   │
//! │  add_item()  │ ◄────────── │   └── Menu (in-memory HashMap impl)   │
//! └──────────────┘  MenuItem   └────────────────────────────────────────┘
//!        │
//!        └── snapshots name + price into the LineItem
//! ```
//!
//! An item is sellable only when it is enabled AND has stock:
//! `is_available = enabled && stock_level > 0`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::EntityKind;
use crate::validation::{validate_identifier, validate_name, validate_price_cents};
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Menu Item
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MenuCategory {
    Food,
    Drink,
    Snack,
}

impl fmt::Display for MenuCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuCategory::Food => write!(f, "Food"),
            MenuCategory::Drink => write!(f, "Drink"),
            MenuCategory::Snack => write!(f, "Snack"),
        }
    }
}

/// A sellable menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category: MenuCategory,
    pub price: Money,
    pub stock_level: u32,
    /// Staff-controlled flag; stock can still make the item unavailable.
    pub enabled: bool,
}

impl MenuItem {
    /// Creates an enabled item with no stock.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: MenuCategory,
        price: Money,
    ) -> CoreResult<Self> {
        let id = id.into();
        let name = name.into();
        validate_identifier("menu item id", &id)?;
        validate_name("menu item name", &name)?;
        validate_price_cents("price", price.cents())?;

        Ok(Self {
            id,
            name,
            category,
            price,
            stock_level: 0,
            enabled: true,
        })
    }

    /// Builder-style stock setter for seeding.
    pub fn with_stock(mut self, stock_level: u32) -> Self {
        self.stock_level = stock_level;
        self
    }

    pub fn is_available(&self) -> bool {
        self.enabled && self.stock_level > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_level <= LOW_STOCK_THRESHOLD
    }

    pub fn add_stock(&mut self, quantity: u32) -> CoreResult<()> {
        if quantity == 0 {
            return Err(ValidationError::MustBePositive {
                field: "stock quantity".to_string(),
            }
            .into());
        }
        self.stock_level = self.stock_level.saturating_add(quantity);
        Ok(())
    }

    /// Removes stock; taking more than is on hand is rejected.
    pub fn reduce_stock(&mut self, quantity: u32) -> CoreResult<()> {
        if quantity == 0 {
            return Err(ValidationError::MustBePositive {
                field: "stock quantity".to_string(),
            }
            .into());
        }
        if quantity > self.stock_level {
            return Err(CoreError::unavailable(
                EntityKind::MenuItem,
                &self.id,
                format!("insufficient stock, {} on hand", self.stock_level),
            ));
        }
        self.stock_level -= quantity;
        Ok(())
    }

    pub fn set_price(&mut self, price: Money) -> CoreResult<()> {
        validate_price_cents("price", price.cents())?;
        self.price = price;
        Ok(())
    }
}

// =============================================================================
// Catalog Trait
// =============================================================================

/// Read access to the menu, as consumed by the order engine.
pub trait MenuCatalog {
    fn item(&self, id: &str) -> Option<&MenuItem>;

    /// Current price, or `None` for unknown items.
    fn price(&self, id: &str) -> Option<Money> {
        self.item(id).map(|item| item.price)
    }

    /// False for unknown items.
    fn is_available(&self, id: &str) -> bool {
        self.item(id).map(MenuItem::is_available).unwrap_or(false)
    }
}

// =============================================================================
// In-Memory Menu
// =============================================================================

/// The branch's menu.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Menu {
    items: HashMap<String, MenuItem>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an item; ids are unique.
    pub fn add(&mut self, item: MenuItem) -> CoreResult<()> {
        if self.items.contains_key(&item.id) {
            return Err(ValidationError::Duplicate {
                field: "menu item id".to_string(),
                value: item.id,
            }
            .into());
        }
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn get_mut(&mut self, id: &str) -> CoreResult<&mut MenuItem> {
        self.items
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::MenuItem, id))
    }

    /// Enables or disables an item without touching its stock.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> CoreResult<()> {
        self.get_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Items at or below the low-stock threshold, sorted by id.
    pub fn low_stock(&self) -> Vec<&MenuItem> {
        let mut items: Vec<&MenuItem> = self.items.values().filter(|i| i.is_low_stock()).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MenuCatalog for Menu {
    fn item(&self, id: &str) -> Option<&MenuItem> {
        self.items.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad_thai() -> MenuItem {
        MenuItem::new("F001", "Pad Thai", MenuCategory::Food, Money::from_major(120))
            .unwrap()
            .with_stock(10)
    }

    #[test]
    fn test_availability_needs_flag_and_stock() {
        let mut item = pad_thai();
        assert!(item.is_available());

        item.enabled = false;
        assert!(!item.is_available());

        item.enabled = true;
        item.reduce_stock(10).unwrap();
        assert!(!item.is_available());
        assert!(item.is_low_stock());
    }

    #[test]
    fn test_stock_changes_are_validated() {
        let mut item = pad_thai();
        assert!(item.add_stock(0).is_err());
        assert!(matches!(
            item.reduce_stock(11),
            Err(CoreError::ResourceUnavailable { .. })
        ));
        item.add_stock(5).unwrap();
        assert_eq!(item.stock_level, 15);
    }

    #[test]
    fn test_rejects_negative_price() {
        assert!(MenuItem::new("D001", "Thai Iced Tea", MenuCategory::Drink, Money::from_cents(-1)).is_err());
        let mut item = pad_thai();
        assert!(item.set_price(Money::from_cents(-100)).is_err());
        assert_eq!(item.price, Money::from_major(120));
    }

    #[test]
    fn test_menu_lookup() {
        let mut menu = Menu::new();
        menu.add(pad_thai()).unwrap();
        menu.add(MenuItem::new("S001", "Nachos", MenuCategory::Snack, Money::from_major(90)).unwrap())
            .unwrap();

        assert_eq!(menu.price("F001"), Some(Money::from_major(120)));
        assert!(menu.is_available("F001"));
        // no stock yet
        assert!(!menu.is_available("S001"));
        assert!(!menu.is_available("NOPE"));
        assert_eq!(menu.price("NOPE"), None);

        assert!(menu.add(pad_thai()).is_err());

        menu.set_enabled("F001", false).unwrap();
        assert!(!menu.is_available("F001"));
        assert!(menu.set_enabled("NOPE", true).is_err());

        let low: Vec<&str> = menu.low_stock().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(low, vec!["S001"]);
    }
}
