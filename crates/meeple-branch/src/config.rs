//! # Branch Configuration
//!
//! Per-branch settings: identity, the time and money rules handed to the
//! core engines, the no-show sweeper, and display options.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEEPLE_BRANCH_ID=BKK-01                                            │
//! │     MEEPLE_TAX_RATE_BPS=700                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cafe/branch.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.meeple.cafe/branch.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     7% VAT, 15 min grace, 2 h late window, 50% penalty                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # branch.toml
//! [branch]
//! id = "BKK-01"
//! name = "Meeple Café Ari"
//! location = "Phahonyothin Rd, Bangkok"
//!
//! [policy]
//! tax_rate_bps = 700
//! grace_minutes = 15
//! late_cancel_window_minutes = 120
//! penalty_bps = 5000
//!
//! [sweeper]
//! enabled = true
//! interval_secs = 60
//!
//! [display]
//! currency_symbol = "฿"
//! ```

use chrono::Duration;
use meeple_core::reservation::ReservationPolicy;
use meeple_core::validation::{validate_identifier, validate_rate_bps};
use meeple_core::{Money, Rate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{BranchError, BranchResult};

// =============================================================================
// Branch Identity
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Unique branch identifier.
    pub id: String,

    /// Name printed on receipts.
    #[serde(default = "default_branch_name")]
    pub name: String,

    #[serde(default)]
    pub location: String,
}

fn default_branch_name() -> String {
    "Meeple Café".to_string()
}

impl Default for BranchInfo {
    fn default() -> Self {
        BranchInfo {
            id: "main".to_string(),
            name: default_branch_name(),
            location: String::new(),
        }
    }
}

// =============================================================================
// Policy Settings
// =============================================================================

/// Money and time rules for the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    /// VAT in basis points (700 = 7%).
    #[serde(default = "default_tax_rate")]
    pub tax_rate_bps: u32,

    /// Minutes after the start during which check-in is accepted.
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: i64,

    /// Cancellations with less lead time than this carry a penalty.
    #[serde(default = "default_late_cancel_window")]
    pub late_cancel_window_minutes: i64,

    /// Penalty as a share of one hour's table charge (5000 = 50%).
    #[serde(default = "default_penalty")]
    pub penalty_bps: u32,
}

fn default_tax_rate() -> u32 {
    meeple_core::DEFAULT_TAX_RATE_BPS
}

fn default_grace_minutes() -> i64 {
    meeple_core::GRACE_PERIOD_MINUTES
}

fn default_late_cancel_window() -> i64 {
    meeple_core::LATE_CANCEL_WINDOW_MINUTES
}

fn default_penalty() -> u32 {
    meeple_core::LATE_CANCEL_PENALTY_BPS
}

impl Default for PolicySettings {
    fn default() -> Self {
        PolicySettings {
            tax_rate_bps: default_tax_rate(),
            grace_minutes: default_grace_minutes(),
            late_cancel_window_minutes: default_late_cancel_window(),
            penalty_bps: default_penalty(),
        }
    }
}

// =============================================================================
// Sweeper Settings
// =============================================================================

/// Background no-show sweep. Check-in enforces the grace period on its
/// own; the sweeper only keeps listings tidy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SweeperSettings {
    fn default() -> Self {
        SweeperSettings {
            enabled: false,
            interval_secs: default_sweep_interval(),
        }
    }
}

// =============================================================================
// Display Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "฿".to_string()
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            currency_symbol: default_currency_symbol(),
        }
    }
}

// =============================================================================
// Main Branch Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchConfig {
    #[serde(default)]
    pub branch: BranchInfo,

    #[serde(default)]
    pub policy: PolicySettings,

    #[serde(default)]
    pub sweeper: SweeperSettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl BranchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (branch.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> BranchResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading branch config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load branch config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> BranchResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| BranchError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BranchError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| BranchError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Branch config saved");
        Ok(())
    }

    pub fn validate(&self) -> BranchResult<()> {
        validate_identifier("branch id", &self.branch.id).map_err(invalid)?;
        validate_rate_bps("tax_rate_bps", self.policy.tax_rate_bps).map_err(invalid)?;
        validate_rate_bps("penalty_bps", self.policy.penalty_bps).map_err(invalid)?;

        if self.policy.grace_minutes < 0 {
            return Err(BranchError::InvalidConfig(
                "grace_minutes must not be negative".into(),
            ));
        }
        if self.policy.late_cancel_window_minutes < 0 {
            return Err(BranchError::InvalidConfig(
                "late_cancel_window_minutes must not be negative".into(),
            ));
        }
        if self.sweeper.enabled && self.sweeper.interval_secs == 0 {
            return Err(BranchError::InvalidConfig(
                "sweeper interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `MEEPLE_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("MEEPLE_BRANCH_ID") {
            debug!(branch_id = %id, "Overriding branch ID from environment");
            self.branch.id = id;
        }

        if let Some(name) = lookup("MEEPLE_BRANCH_NAME") {
            self.branch.name = name;
        }

        if let Some(bps) = lookup("MEEPLE_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(v) => self.policy.tax_rate_bps = v,
                Err(_) => warn!(value = %bps, "Ignoring non-numeric MEEPLE_TAX_RATE_BPS"),
            }
        }

        if let Some(minutes) = lookup("MEEPLE_GRACE_MINUTES") {
            if let Ok(v) = minutes.parse::<i64>() {
                self.policy.grace_minutes = v;
            }
        }

        if let Some(minutes) = lookup("MEEPLE_LATE_CANCEL_WINDOW_MINUTES") {
            if let Ok(v) = minutes.parse::<i64>() {
                self.policy.late_cancel_window_minutes = v;
            }
        }

        if let Some(bps) = lookup("MEEPLE_PENALTY_BPS") {
            if let Ok(v) = bps.parse::<u32>() {
                self.policy.penalty_bps = v;
            }
        }

        if let Some(flag) = lookup("MEEPLE_SWEEPER_ENABLED") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sweeper.enabled = true,
                "0" | "false" | "no" | "off" => self.sweeper.enabled = false,
                _ => warn!(value = %flag, "Unknown MEEPLE_SWEEPER_ENABLED value"),
            }
        }

        if let Some(secs) = lookup("MEEPLE_SWEEPER_INTERVAL_SECS") {
            if let Ok(v) = secs.parse::<u64>() {
                self.sweeper.interval_secs = v;
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "meeple", "cafe")
            .map(|dirs| dirs.config_dir().join("branch.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn branch_id(&self) -> &str {
        &self.branch.id
    }

    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.policy.tax_rate_bps)
    }

    /// Time rules for the reservation engine.
    pub fn reservation_policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            grace_period: Duration::minutes(self.policy.grace_minutes),
            late_cancel_window: Duration::minutes(self.policy.late_cancel_window_minutes),
            penalty_rate: Rate::from_bps(self.policy.penalty_bps),
        }
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweeper.interval_secs)
    }

    /// Formats an amount with the configured symbol and thousands separators.
    pub fn format_currency(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let digits = amount.major().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!(
            "{}{}{}.{:02}",
            sign,
            self.display.currency_symbol,
            grouped,
            amount.minor_part()
        )
    }
}

fn invalid(err: meeple_core::ValidationError) -> BranchError {
    BranchError::InvalidConfig(err.to_string())
}
