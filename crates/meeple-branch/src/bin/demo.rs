//! # Branch Demo
//!
//! Seeds a branch and walks through one afternoon at the café.
//!
//! ## Usage
//! ```bash
//! # Default config location (or built-in defaults)
//! cargo run -p meeple-branch --bin demo
//!
//! # Explicit config file
//! cargo run -p meeple-branch --bin demo -- --config ./branch.toml
//!
//! # More detail
//! RUST_LOG=meeple=trace cargo run -p meeple-branch --bin demo
//! ```
//!
//! ## Scenario
//! - Alice (Silver) books T001 for 14:00-16:00; Bob tries the same slot
//! - Alice's party checks in, borrows Catan, orders, pays cash
//! - Carol (Platinum) cancels the VIP room an hour before her booking
//! - A forgotten reservation is swept as a no-show

use chrono::{Duration, TimeZone, Utc};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use meeple_branch::{init_tracing, spawn_no_show_sweeper, Branch, BranchConfig};
use meeple_core::catalog::{MenuCategory, MenuItem};
use meeple_core::member::Member;
use meeple_core::payment::PaymentMethod;
use meeple_core::resource::{BoardGame, Table};
use meeple_core::{ManualClock, Money};

/// Board games on the shelf: (id, title, category, players, minutes)
const GAMES: &[(&str, &str, &str, (u32, u32), u32)] = &[
    ("BG001", "Settlers of Catan", "Strategy", (3, 4), 90),
    ("BG002", "Pandemic", "Cooperative", (2, 4), 60),
    ("BG003", "Ticket to Ride", "Family", (2, 5), 60),
    ("BG004", "Codenames", "Party", (4, 8), 20),
];

/// Menu: (id, name, category, price in baht, stock)
const MENU: &[(&str, &str, MenuCategory, i64, u32)] = &[
    ("D001", "Thai Iced Tea", MenuCategory::Drink, 60, 40),
    ("D002", "Americano", MenuCategory::Drink, 70, 40),
    ("F001", "Pad Thai", MenuCategory::Food, 120, 15),
    ("F002", "Fried Rice", MenuCategory::Food, 110, 4),
    ("S001", "Nachos", MenuCategory::Snack, 90, 10),
];

/// Members: (id, name, lifetime spend in baht, points)
const MEMBERS: &[(&str, &str, i64, i64)] = &[
    ("MEM001", "Alice", 2_500, 120),
    ("MEM002", "Bob", 8_000, 640),
    ("MEM003", "Carol", 21_000, 2_300),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meeple Café Branch Demo");
                println!();
                println!("Usage: demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  branch.toml to load (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let config = BranchConfig::load_or_default(config_path);
    let sweeper_enabled = config.sweeper.enabled;
    let sweep_every = config.sweep_interval();

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).single().ok_or("bad start time")?);
    let branch = Arc::new(Branch::with_clock(config, Arc::new(clock.clone())));
    let at = |hour: u32, minute: u32| {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0)
            .single()
            .ok_or("bad demo time")
    };

    println!("🎲 {} ({})", branch.config().branch.name, branch.id());
    println!("================================");

    // -------------------------------------------------------------------------
    // Seed
    // -------------------------------------------------------------------------
    branch.add_table(Table::new("T001", "Window table", 4, Money::from_major(50))?)?;
    branch.add_table(Table::new("T002", "Big table", 6, Money::from_major(60))?)?;
    branch.add_table(Table::vip("VIP01", "VIP room", 8, Money::from_major(100), Money::from_major(300))?)?;

    for (id, title, category, players, minutes) in GAMES {
        branch.add_board_game(BoardGame::new(*id, *title, *category, *players, *minutes)?)?;
    }
    for (id, name, category, price, stock) in MENU {
        branch.add_menu_item(MenuItem::new(*id, *name, *category, Money::from_major(*price))?.with_stock(*stock))?;
    }
    for (id, name, spend, points) in MEMBERS {
        let member = Member::new(*id, *name, branch.now())?.with_history(Money::from_major(*spend), *points)?;
        branch.import_member(member)?;
    }

    println!(
        "✓ {} tables, {} games, {} menu items, {} members",
        3,
        GAMES.len(),
        MENU.len(),
        MEMBERS.len()
    );
    println!();

    // -------------------------------------------------------------------------
    // Booking and a conflict
    // -------------------------------------------------------------------------
    let booking = branch.create_reservation("MEM001", "T001", at(14, 0)?, at(16, 0)?, 3)?;
    branch.confirm_reservation(&booking.id)?;
    println!("✓ Alice booked T001 14:00-16:00 ({})", booking.id);

    match branch.create_reservation("MEM002", "T001", at(15, 0)?, at(17, 0)?, 2) {
        Ok(r) => println!("⚠ Unexpected second booking {}", r.id),
        Err(e) => println!("✗ Bob's overlapping booking: {}", serde_json::to_string(&e.to_body())?),
    }
    let forgotten = branch.create_reservation("MEM002", "T002", at(14, 0)?, at(16, 0)?, 5)?;
    branch.confirm_reservation(&forgotten.id)?;

    let vip = branch.create_reservation("MEM003", "VIP01", at(18, 0)?, at(20, 0)?, 8)?;
    branch.confirm_reservation(&vip.id)?;
    println!("✓ Carol booked VIP01 18:00-20:00");
    println!();

    // -------------------------------------------------------------------------
    // Afternoon service
    // -------------------------------------------------------------------------
    clock.set(at(14, 5)?);
    branch.check_in(&booking.id)?;
    branch.assign_game("T001", "BG001")?;

    let order = branch.create_order(Some("MEM001"), Some("T001"))?;
    let tea = branch.add_order_item(&order.id, "D001", 2, Some("less sugar".to_string()))?;
    let noodles = branch.add_order_item(&order.id, "F001", 1, None)?;
    branch.add_order_item(&order.id, "S001", 1, None)?;
    for line in [&tea, &noodles] {
        branch.mark_line_preparing(&order.id, &line.id)?;
        branch.mark_line_served(&order.id, &line.id)?;
    }
    let discount = branch.apply_member_discount(&order.id)?;
    println!("✓ Member discount {}", branch.config().format_currency(discount));

    clock.set(at(14, 20)?);
    let swept = branch.sweep_no_shows()?;
    println!("✓ Swept {} no-show(s): {:?}", swept.len(), swept);

    clock.set(at(15, 50)?);
    let payment = branch.create_payment(
        &order.id,
        PaymentMethod::Cash {
            amount_received: Money::from_major(500),
        },
    )?;
    let receipt = branch.complete_payment(&payment.id)?;
    branch.complete_reservation(&booking.id)?;
    println!("✓ Paid {}", branch.config().format_currency(receipt.total));
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    println!();

    // -------------------------------------------------------------------------
    // Late cancellation
    // -------------------------------------------------------------------------
    clock.set(at(17, 0)?);
    let cancellation = branch.cancel_reservation(&vip.id, "Guest of honour is sick")?;
    println!(
        "✓ VIP01 cancelled an hour before start, penalty {}",
        branch.config().format_currency(cancellation.penalty)
    );

    let alice = branch.member("MEM001")?;
    println!(
        "✓ Alice: {} points, tier {:?}, lifetime {}",
        alice.member.points(),
        alice.tier,
        branch.config().format_currency(alice.member.lifetime_spend())
    );
    for item in branch.low_stock_items()? {
        println!("⚠ Low stock: {} ({} left)", item.name, item.stock_level);
    }
    println!("✓ {} audit events recorded", branch.audit().len());

    // -------------------------------------------------------------------------
    // Background sweeper
    // -------------------------------------------------------------------------
    if sweeper_enabled {
        let late = branch.create_reservation("MEM002", "T002", at(17, 30)?, at(19, 0)?, 4)?;
        branch.confirm_reservation(&late.id)?;
        clock.advance(Duration::minutes(50));

        let sweeper = spawn_no_show_sweeper(Arc::clone(&branch), sweep_every);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        sweeper.shutdown().await;
        println!("✓ Sweeper ran: {} is {}", late.id, branch.reservation(&late.id)?.status());
    }

    Ok(())
}
