//! # PharmaPOS Configuration
//!
//! Layered configuration for one terminal or storefront session.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PHARMAPOS_API_URL=https://pharmacy.example.com/api                 │
//! │     PHARMAPOS_BRANCH_ID=branch-1                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pharmapos/pos.toml (Linux)                               │
//! │     ~/Library/Application Support/com.pharmapos.pos/pos.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost backend, all branches, 60 day horizon                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # pos.toml
//! [api]
//! base_url = "http://localhost:3000/api"
//! timeout_secs = 30
//!
//! [terminal]
//! branch_id = "branch-1"
//! success_display_secs = 5
//!
//! [pricing]
//! near_expiry_horizon_days = 60
//! promotion_policy = "first_listed"   # first_listed | highest_discount
//!
//! [storage]
//! cart_key = "cart"
//! data_dir = "/var/lib/pharmapos"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use pharmapos_api::ApiConfig;
use pharmapos_core::{
    ExpiryClassifier, PricingResolver, PromotionPolicy, PromotionalStockEstimator,
    DEFAULT_CART_STORAGE_KEY, DEFAULT_NEAR_EXPIRY_HORIZON_DAYS,
};

use crate::error::{SessionError, SessionResult};
use crate::store::is_valid_key;

// =============================================================================
// Terminal Settings
// =============================================================================

/// Settings for the counter terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Branch whose inventory scopes POS stock checks.
    /// A session's own branch takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,

    /// How long the "sale completed" banner stays up (seconds).
    #[serde(default = "default_success_display")]
    pub success_display_secs: u64,
}

fn default_success_display() -> u64 {
    5
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            branch_id: None,
            success_display_secs: default_success_display(),
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Days ahead within which a batch is near expiry.
    #[serde(default = "default_horizon")]
    pub near_expiry_horizon_days: u32,

    /// Which promotion applies when a product has several.
    #[serde(default)]
    pub promotion_policy: PromotionPolicy,
}

fn default_horizon() -> u32 {
    DEFAULT_NEAR_EXPIRY_HORIZON_DAYS
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            near_expiry_horizon_days: default_horizon(),
            promotion_policy: PromotionPolicy::default(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key of the persisted storefront cart.
    #[serde(default = "default_cart_key")]
    pub cart_key: String,

    /// Directory for persisted carts. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_cart_key() -> String {
    DEFAULT_CART_STORAGE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            cart_key: default_cart_key(),
            data_dir: None,
        }
    }
}

// =============================================================================
// Complete Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl PosConfig {
    /// Loads configuration from file, then environment, then validates.
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`PosConfig::load`], falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> SessionResult<()> {
        self.api
            .validate()
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;

        if self.terminal.success_display_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "success_display_secs must be greater than 0".into(),
            ));
        }

        if !is_valid_key(&self.storage.cart_key) {
            return Err(SessionError::InvalidConfig(format!(
                "cart_key '{}' must be non-empty and use only letters, digits, '-' or '_'",
                self.storage.cart_key
            )));
        }

        if matches!(&self.terminal.branch_id, Some(id) if id.trim().is_empty()) {
            return Err(SessionError::InvalidConfig("branch_id cannot be blank".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `PHARMAPOS_*` overrides read through `lookup`.
    /// Unparseable values are ignored with a warning.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PHARMAPOS_API_URL") {
            debug!(url = %url, "Overriding backend URL from environment");
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup("PHARMAPOS_API_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = Some(secs),
                Err(_) => warn!(value = %timeout, "Ignoring invalid PHARMAPOS_API_TIMEOUT"),
            }
        }

        if let Some(branch) = lookup("PHARMAPOS_BRANCH_ID") {
            debug!(branch_id = %branch, "Overriding branch from environment");
            self.terminal.branch_id = Some(branch);
        }

        if let Some(days) = lookup("PHARMAPOS_HORIZON_DAYS") {
            match days.parse::<u32>() {
                Ok(d) => self.pricing.near_expiry_horizon_days = d,
                Err(_) => warn!(value = %days, "Ignoring invalid PHARMAPOS_HORIZON_DAYS"),
            }
        }

        if let Some(policy) = lookup("PHARMAPOS_PROMOTION_POLICY") {
            match policy.parse() {
                Ok(parsed) => self.pricing.promotion_policy = parsed,
                Err(e) => warn!(error = %e, "Ignoring invalid PHARMAPOS_PROMOTION_POLICY"),
            }
        }

        if let Some(dir) = lookup("PHARMAPOS_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pharmapos", "pos")
            .map(|dirs| dirs.config_dir().join("pos.toml"))
    }

    /// Directory holding persisted carts.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(|| {
            directories::ProjectDirs::from("com", "pharmapos", "pos")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
    }

    // =========================================================================
    // Derived Components
    // =========================================================================

    pub fn pricing_resolver(&self) -> PricingResolver {
        PricingResolver::new(self.pricing.promotion_policy)
    }

    pub fn expiry_classifier(&self) -> ExpiryClassifier {
        ExpiryClassifier::new(self.pricing.near_expiry_horizon_days)
    }

    pub fn stock_estimator(&self) -> PromotionalStockEstimator {
        PromotionalStockEstimator::new(self.expiry_classifier())
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_secs(self.terminal.success_display_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
