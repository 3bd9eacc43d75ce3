//! # Meeple Branch
//!
//! Runtime for one café location: configuration, the shared-state facade,
//! audit logging and the background no-show sweeper.
//!
//! ## Module Organization
//! ```text
//! meeple_branch/
//! ├── lib.rs          ◄─── You are here (exports & tracing setup)
//! ├── config.rs       ◄─── branch.toml + MEEPLE_* env overrides
//! ├── error.rs        ◄─── BranchError, ErrorCode, ErrorBody
//! ├── state.rs        ◄─── BranchState (all engines under one lock)
//! ├── branch.rs       ◄─── Branch facade (every staff operation)
//! ├── audit.rs        ◄─── TracingObserver + in-memory AuditTrail
//! ├── sweeper.rs      ◄─── Periodic no-show sweep (tokio task)
//! └── bin/demo.rs     ◄─── Seeded walkthrough of a café afternoon
//! ```
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   front desk / kitchen / cashier                                        │
//! │              │                                                          │
//! │              ▼                                                          │
//! │   ┌─────────────────────┐      ┌──────────────────────┐                 │
//! │   │  Branch (RwLock)    │─────►│  AuditTrail          │──► tracing      │
//! │   └──────────┬──────────┘      └──────────────────────┘                 │
//! │              │ now from Clock                                           │
//! │              ▼                                                          │
//! │   ┌─────────────────────────────────────────────────────┐               │
//! │   │  meeple-core: Floor, ReservationBook, OrderBook,    │               │
//! │   │               MemberDirectory, Menu                 │               │
//! │   └─────────────────────────────────────────────────────┘               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod branch;
pub mod config;
pub mod error;
pub mod state;
pub mod sweeper;

pub use audit::{AuditEntry, AuditTrail, TracingObserver};
pub use branch::{Branch, MemberProfile};
pub use config::BranchConfig;
pub use error::{BranchError, BranchResult, ErrorBody, ErrorCode};
pub use sweeper::{spawn_no_show_sweeper, SweeperHandle};

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,meeple=debug";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Calling it twice is harmless;
/// the second call keeps the first subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .try_init();
}
