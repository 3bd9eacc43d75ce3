//! # Resource Entities
//!
//! Play tables and board games: the physical things a branch rents out.
//! Each is a small state machine that only changes through the methods
//! below; [`Floor`] owns both and performs the moves that touch a table and
//! its games together.
//!
//! ## Table Lifecycle
//! ```text
//!                   assign_customer(party ≤ capacity)
//!   ┌───────────┐ ─────────────────────────────────► ┌───────────┐
//!   │ Available │                                    │ Occupied  │
//!   └───────────┘ ◄───────────────────────────────── └───────────┘
//!     │   ▲   ▲              clear()                  games, order,
//!     │   │   │                                       occupied_since
//!     │   │   └──────── clear() ──── ┌─────────────┐
//!     │   │                          │ Maintenance │
//!     │   └── clear() ── Reserved    └─────────────┘
//!     │                    ▲                ▲
//!     ├──── hold() ────────┘                │
//!     └──── set_maintenance() ──────────────┘
//! ```
//!
//! `clear()` resets status, games, order, party and timestamp together.
//!
//! ## Game Lifecycle
//! ```text
//!   Available ──mark_in_use(table)──► InUse ──mark_available()──► Available
//!       │                                                            │
//!       ├── send_to_maintenance() ──► Maintenance ── mark_available ─┘
//!       └── retire() ──► Retired (permanent)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::observer::{NoopObserver, TransitionEvent, TransitionObserver};
use crate::types::EntityKind;
use crate::validation::{validate_capacity, validate_identifier, validate_name, validate_price_cents};

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    /// Held by staff for an arriving party.
    Reserved,
    Maintenance,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Available => write!(f, "Available"),
            TableStatus::Occupied => write!(f, "Occupied"),
            TableStatus::Reserved => write!(f, "Reserved"),
            TableStatus::Maintenance => write!(f, "Maintenance"),
        }
    }
}

/// Standard tables charge the hourly rate; VIP rooms add a room-service fee
/// to every charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableKind {
    Standard,
    Vip { room_service_fee: Money },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Table {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub hourly_rate: Money,
    pub kind: TableKind,
    status: TableStatus,
    games: Vec<String>,
    active_order: Option<String>,
    #[ts(as = "Option<String>")]
    occupied_since: Option<DateTime<Utc>>,
    party_size: Option<u32>,
}

impl Table {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capacity: u32,
        hourly_rate: Money,
    ) -> CoreResult<Self> {
        let id = id.into();
        let name = name.into();
        validate_identifier("table id", &id)?;
        validate_name("table name", &name)?;
        validate_capacity(capacity)?;
        validate_price_cents("hourly rate", hourly_rate.cents())?;

        Ok(Self {
            id,
            name,
            capacity,
            hourly_rate,
            kind: TableKind::Standard,
            status: TableStatus::Available,
            games: Vec::new(),
            active_order: None,
            occupied_since: None,
            party_size: None,
        })
    }

    /// A VIP room: `room_service_fee` is added to every charge.
    pub fn vip(
        id: impl Into<String>,
        name: impl Into<String>,
        capacity: u32,
        hourly_rate: Money,
        room_service_fee: Money,
    ) -> CoreResult<Self> {
        validate_price_cents("room service fee", room_service_fee.cents())?;
        let mut table = Self::new(id, name, capacity, hourly_rate)?;
        table.kind = TableKind::Vip { room_service_fee };
        Ok(table)
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn games(&self) -> &[String] {
        &self.games
    }

    pub fn active_order(&self) -> Option<&str> {
        self.active_order.as_deref()
    }

    pub fn occupied_since(&self) -> Option<DateTime<Utc>> {
        self.occupied_since
    }

    pub fn party_size(&self) -> Option<u32> {
        self.party_size
    }

    pub fn is_available(&self) -> bool {
        self.status == TableStatus::Available
    }

    pub fn is_vip(&self) -> bool {
        matches!(self.kind, TableKind::Vip { .. })
    }

    /// Charge for `hours` of play; VIP rooms add the room-service fee once.
    ///
    /// ```rust
    /// use meeple_core::money::Money;
    /// use meeple_core::resource::Table;
    ///
    /// let vip = Table::vip("VIP01", "VIP Room Alpha", 8, Money::from_major(100), Money::from_major(300)).unwrap();
    /// assert_eq!(vip.charge_for(1), Money::from_major(400));
    /// ```
    pub fn charge_for(&self, hours: u32) -> Money {
        let base = self.hourly_rate.multiply_quantity(hours as i64);
        match self.kind {
            TableKind::Standard => base,
            TableKind::Vip { room_service_fee } => base + room_service_fee,
        }
    }

    /// How long the current party has been seated.
    pub fn occupied_for(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.occupied_since.map(|since| now - since)
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Available → Occupied.
    pub fn assign_customer(&mut self, party_size: u32, now: DateTime<Utc>) -> CoreResult<()> {
        self.occupy(party_size, now, false)
    }

    /// Available or Reserved → Occupied, for a party arriving on a booking.
    pub fn check_in_party(&mut self, party_size: u32, now: DateTime<Utc>) -> CoreResult<()> {
        self.occupy(party_size, now, true)
    }

    /// Any status → Available. Returns the ids of the games that were on the
    /// table; the caller returns them to the shelf.
    pub fn clear(&mut self) -> Vec<String> {
        self.status = TableStatus::Available;
        self.active_order = None;
        self.occupied_since = None;
        self.party_size = None;
        std::mem::take(&mut self.games)
    }

    /// Available → Maintenance.
    pub fn set_maintenance(&mut self) -> CoreResult<()> {
        self.require_available("set maintenance")?;
        self.status = TableStatus::Maintenance;
        Ok(())
    }

    /// Available → Reserved.
    pub fn hold(&mut self) -> CoreResult<()> {
        self.require_available("hold")?;
        self.status = TableStatus::Reserved;
        Ok(())
    }

    /// Links the seated party's order. One active order per table.
    pub fn attach_order(&mut self, order_id: &str) -> CoreResult<()> {
        if self.status != TableStatus::Occupied {
            return Err(CoreError::invalid_state(
                EntityKind::Table,
                &self.id,
                self.status,
                "attach an order",
            ));
        }
        match &self.active_order {
            Some(existing) if existing != order_id => Err(CoreError::unavailable(
                EntityKind::Table,
                &self.id,
                format!("order {} is already open", existing),
            )),
            _ => {
                self.active_order = Some(order_id.to_string());
                Ok(())
            }
        }
    }

    /// Unlinks `order_id` if it is the active order.
    pub fn detach_order(&mut self, order_id: &str) {
        if self.active_order.as_deref() == Some(order_id) {
            self.active_order = None;
        }
    }

    fn add_game(&mut self, game_id: &str) -> CoreResult<()> {
        if self.status != TableStatus::Occupied {
            return Err(CoreError::invalid_state(
                EntityKind::Table,
                &self.id,
                self.status,
                "take a game",
            ));
        }
        self.games.push(game_id.to_string());
        Ok(())
    }

    fn occupy(&mut self, party_size: u32, now: DateTime<Utc>, held_ok: bool) -> CoreResult<()> {
        if party_size == 0 {
            return Err(ValidationError::MustBePositive {
                field: "party size".to_string(),
            }
            .into());
        }
        let seatable = match self.status {
            TableStatus::Available => true,
            TableStatus::Reserved => held_ok,
            _ => false,
        };
        if !seatable {
            return Err(CoreError::unavailable(
                EntityKind::Table,
                &self.id,
                format!("table is {}", self.status),
            ));
        }
        if party_size > self.capacity {
            return Err(CoreError::unavailable(
                EntityKind::Table,
                &self.id,
                format!("party of {} exceeds capacity {}", party_size, self.capacity),
            ));
        }

        self.status = TableStatus::Occupied;
        self.occupied_since = Some(now);
        self.party_size = Some(party_size);
        Ok(())
    }

    fn require_available(&self, operation: &str) -> CoreResult<()> {
        if self.status != TableStatus::Available {
            return Err(CoreError::invalid_state(EntityKind::Table, &self.id, self.status, operation));
        }
        Ok(())
    }
}

// =============================================================================
// Board Game
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Available,
    InUse,
    Maintenance,
    Retired,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Available => write!(f, "Available"),
            GameStatus::InUse => write!(f, "InUse"),
            GameStatus::Maintenance => write!(f, "Maintenance"),
            GameStatus::Retired => write!(f, "Retired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoardGame {
    pub id: String,
    pub title: String,
    pub category: String,
    pub min_players: u32,
    pub max_players: u32,
    pub play_minutes: u32,
    status: GameStatus,
    play_count: u32,
    table: Option<String>,
}

impl BoardGame {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        players: (u32, u32),
        play_minutes: u32,
    ) -> CoreResult<Self> {
        let id = id.into();
        let title = title.into();
        validate_identifier("game id", &id)?;
        validate_name("game title", &title)?;
        let (min_players, max_players) = players;
        if min_players == 0 || max_players < min_players {
            return Err(ValidationError::OutOfRange {
                field: "player count".to_string(),
                min: 1,
                max: max_players as i64,
            }
            .into());
        }

        Ok(Self {
            id,
            title,
            category: category.into(),
            min_players,
            max_players,
            play_minutes,
            status: GameStatus::Available,
            play_count: 0,
            table: None,
        })
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn play_count(&self) -> u32 {
        self.play_count
    }

    /// Table currently holding the game.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.status == GameStatus::Available
    }

    pub fn supports(&self, players: u32) -> bool {
        (self.min_players..=self.max_players).contains(&players)
    }

    /// Available → InUse, claimed by `table_id`.
    pub fn mark_in_use(&mut self, table_id: &str) -> CoreResult<()> {
        match self.status {
            GameStatus::Available => {
                self.status = GameStatus::InUse;
                self.table = Some(table_id.to_string());
                self.play_count += 1;
                Ok(())
            }
            GameStatus::InUse => Err(CoreError::unavailable(
                EntityKind::BoardGame,
                &self.id,
                format!("in use at table {}", self.table.as_deref().unwrap_or("?")),
            )),
            status => Err(CoreError::unavailable(
                EntityKind::BoardGame,
                &self.id,
                format!("game is {}", status),
            )),
        }
    }

    /// Returns the game to the shelf and detaches the table. Never fails; a
    /// retired game stays retired.
    pub fn mark_available(&mut self) {
        self.table = None;
        if self.status != GameStatus::Retired {
            self.status = GameStatus::Available;
        }
    }

    pub fn send_to_maintenance(&mut self) -> CoreResult<()> {
        if self.status != GameStatus::Available {
            return Err(CoreError::invalid_state(
                EntityKind::BoardGame,
                &self.id,
                self.status,
                "send to maintenance",
            ));
        }
        self.status = GameStatus::Maintenance;
        Ok(())
    }

    pub fn retire(&mut self) -> CoreResult<()> {
        if self.status == GameStatus::InUse {
            return Err(CoreError::invalid_state(EntityKind::BoardGame, &self.id, self.status, "retire"));
        }
        self.status = GameStatus::Retired;
        Ok(())
    }
}

// =============================================================================
// Floor
// =============================================================================

/// All tables and games of one branch.
///
/// Tables and games are keyed by id in sorted maps so listings come out in a
/// stable order.
pub struct Floor {
    tables: BTreeMap<String, Table>,
    games: BTreeMap<String, BoardGame>,
    observer: Arc<dyn TransitionObserver>,
}

impl Default for Floor {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}

impl fmt::Debug for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Floor")
            .field("tables", &self.tables.len())
            .field("games", &self.games.len())
            .finish()
    }
}

impl Floor {
    pub fn new(observer: Arc<dyn TransitionObserver>) -> Self {
        Self {
            tables: BTreeMap::new(),
            games: BTreeMap::new(),
            observer,
        }
    }

    pub fn add_table(&mut self, table: Table) -> CoreResult<()> {
        if self.tables.contains_key(&table.id) {
            return Err(ValidationError::Duplicate {
                field: "table id".to_string(),
                value: table.id,
            }
            .into());
        }
        self.tables.insert(table.id.clone(), table);
        Ok(())
    }

    pub fn add_game(&mut self, game: BoardGame) -> CoreResult<()> {
        if self.games.contains_key(&game.id) {
            return Err(ValidationError::Duplicate {
                field: "game id".to_string(),
                value: game.id,
            }
            .into());
        }
        self.games.insert(game.id.clone(), game);
        Ok(())
    }

    pub fn table(&self, id: &str) -> CoreResult<&Table> {
        self.tables
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Table, id))
    }

    pub(crate) fn table_mut(&mut self, id: &str) -> CoreResult<&mut Table> {
        self.tables
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Table, id))
    }

    pub fn game(&self, id: &str) -> CoreResult<&BoardGame> {
        self.games
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::BoardGame, id))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn available_tables(&self) -> Vec<&Table> {
        self.tables.values().filter(|t| t.is_available()).collect()
    }

    pub fn available_games(&self) -> Vec<&BoardGame> {
        self.games.values().filter(|g| g.is_available()).collect()
    }

    // -------------------------------------------------------------------------
    // Table moves
    // -------------------------------------------------------------------------

    /// Seats a party at an Available table.
    pub fn seat(&mut self, table_id: &str, party_size: u32, now: DateTime<Utc>) -> CoreResult<()> {
        let table = self.table_mut(table_id)?;
        let from = table.status();
        table.assign_customer(party_size, now)?;
        self.emit_table(table_id, from, TableStatus::Occupied, now, Some(format!("party of {}", party_size)));
        Ok(())
    }

    /// Seats a booked party. The table may be Available or held for them.
    pub fn seat_reserved(&mut self, table_id: &str, party_size: u32, now: DateTime<Utc>) -> CoreResult<()> {
        let table = self.table_mut(table_id)?;
        let from = table.status();
        table.check_in_party(party_size, now)?;
        self.emit_table(table_id, from, TableStatus::Occupied, now, Some(format!("party of {}", party_size)));
        Ok(())
    }

    /// Clears a table and returns its games to the shelf.
    ///
    /// Returns the ids of the released games.
    pub fn clear_table(&mut self, table_id: &str, now: DateTime<Utc>) -> CoreResult<Vec<String>> {
        let table = self.table_mut(table_id)?;
        let from = table.status();
        let released = table.clear();

        for game_id in &released {
            if let Some(game) = self.games.get_mut(game_id) {
                let game_from = game.status();
                game.mark_available();
                self.observer.on_transition(&TransitionEvent::new(
                    EntityKind::BoardGame,
                    game_id.as_str(),
                    Some(game_from.to_string()),
                    game.status().to_string(),
                    now,
                ));
            }
        }

        self.emit_table(table_id, from, TableStatus::Available, now, None);
        Ok(released)
    }

    pub fn set_maintenance(&mut self, table_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let table = self.table_mut(table_id)?;
        table.set_maintenance()?;
        self.emit_table(table_id, TableStatus::Available, TableStatus::Maintenance, now, None);
        Ok(())
    }

    pub fn hold(&mut self, table_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let table = self.table_mut(table_id)?;
        table.hold()?;
        self.emit_table(table_id, TableStatus::Available, TableStatus::Reserved, now, None);
        Ok(())
    }

    /// Hands a game to an Occupied table.
    ///
    /// The table is checked before the game is claimed, so a refused table
    /// never leaves the game InUse.
    pub fn assign_game(&mut self, table_id: &str, game_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let table = self.table(table_id)?;
        if table.status() != TableStatus::Occupied {
            return Err(CoreError::invalid_state(
                EntityKind::Table,
                table_id,
                table.status(),
                "take a game",
            ));
        }

        let game = self
            .games
            .get_mut(game_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::BoardGame, game_id))?;
        game.mark_in_use(table_id)?;
        self.table_mut(table_id)?.add_game(game_id)?;

        self.observer.on_transition(
            &TransitionEvent::new(
                EntityKind::BoardGame,
                game_id,
                Some(GameStatus::Available.to_string()),
                GameStatus::InUse.to_string(),
                now,
            )
            .with_detail(format!("table {}", table_id)),
        );
        Ok(())
    }

    pub fn send_game_to_maintenance(&mut self, game_id: &str) -> CoreResult<()> {
        self.games
            .get_mut(game_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::BoardGame, game_id))?
            .send_to_maintenance()
    }

    pub fn retire_game(&mut self, game_id: &str) -> CoreResult<()> {
        self.games
            .get_mut(game_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::BoardGame, game_id))?
            .retire()
    }

    fn emit_table(
        &self,
        table_id: &str,
        from: TableStatus,
        to: TableStatus,
        now: DateTime<Utc>,
        detail: Option<String>,
    ) {
        let mut event = TransitionEvent::new(
            EntityKind::Table,
            table_id,
            Some(from.to_string()),
            to.to_string(),
            now,
        );
        event.detail = detail;
        self.observer.on_transition(&event);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
