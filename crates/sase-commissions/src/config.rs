//! Configuration for the commissions engine
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `COMMISSIONS__*` environment variables (`COMMISSIONS__ENGINE__TRAILING_RATE_FACTOR=0.25`).
//!
//! The file may also carry the reference data the engine reads but does not
//! own, loaded into the store at startup:
//!
//! ```toml
//! [[reference.products]]
//! id = "edge-gateway"
//! organization_id = "acme"
//! name = "Edge Gateway"
//! is_active = true
//! created_at = "2024-01-01T00:00:00Z"
//!
//! [[reference.rules]]
//! organization_id = "acme"
//! product_id = "edge-gateway"
//! initial_sale_rate = "10"
//! renewal_rate = "5"
//! mrr_commission_type = "trailing"
//! mrr_duration_months = 12
//! trailing_months = 6
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{MrrCommissionType, PipelineStage, Product, ProductCommissionRule};
use crate::domain::services::DEFAULT_TRAILING_RATE_FACTOR;
use crate::domain::value_objects::{EntityId, Money, OrganizationId, Rate};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub reference: ReferenceData,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

/// Calculation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Multiplier on the renewal rate inside the trailing window
    #[serde(default = "default_trailing_rate_factor")]
    pub trailing_rate_factor: Decimal,

    /// Tracking window length when the caller gives no period bounds
    #[serde(default = "default_period_days")]
    pub default_period_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trailing_rate_factor: default_trailing_rate_factor(),
            default_period_days: default_period_days(),
        }
    }
}

/// Catalog products, pipeline stages and commission rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub products: Vec<Product>,

    #[serde(default)]
    pub stages: Vec<PipelineStage>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// A commission rule as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<EntityId>,
    pub organization_id: OrganizationId,
    pub product_id: EntityId,
    #[serde(default)]
    pub priority: i32,
    pub initial_sale_rate: Rate,
    pub renewal_rate: Rate,
    #[serde(default)]
    pub mrr_commission_type: Option<MrrCommissionType>,
    #[serde(default)]
    pub mrr_duration_months: u32,
    #[serde(default)]
    pub trailing_months: u32,
    #[serde(default)]
    pub min_sale_amount: Option<Money>,
    #[serde(default)]
    pub max_commission_amount: Option<Money>,
    #[serde(default)]
    pub estimated_margin_percentage: Option<Decimal>,
    #[serde(default)]
    pub max_commission_of_margin: Option<Decimal>,
    #[serde(default)]
    pub requires_manager_approval: bool,
    #[serde(default)]
    pub approval_threshold: Option<Money>,
}

impl RuleConfig {
    pub fn to_rule(&self) -> ProductCommissionRule {
        let mut rule = ProductCommissionRule::new(
            self.organization_id.clone(),
            self.product_id.clone(),
            self.initial_sale_rate,
            self.renewal_rate,
        )
        .with_priority(self.priority);
        if let Some(id) = &self.id {
            rule.id = id.clone();
        }
        rule.mrr_commission_type = self.mrr_commission_type;
        rule.mrr_duration_months = self.mrr_duration_months;
        rule.trailing_months = self.trailing_months;
        rule.min_sale_amount = self.min_sale_amount;
        rule.max_commission_amount = self.max_commission_amount;
        rule.estimated_margin_percentage = self.estimated_margin_percentage;
        rule.max_commission_of_margin = self.max_commission_of_margin;
        rule.requires_manager_approval = self.requires_manager_approval;
        rule.approval_threshold = self.approval_threshold;
        rule
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_trailing_rate_factor() -> Decimal {
    DEFAULT_TRAILING_RATE_FACTOR
}

fn default_period_days() -> u32 {
    30
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("COMMISSIONS")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document over the defaults. No environment layer.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let factor = self.engine.trailing_rate_factor;
        if (factor.is_sign_negative() && !factor.is_zero()) || factor > Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "engine.trailing_rate_factor must be between 0 and 1, got {factor}"
            )));
        }
        if self.engine.default_period_days == 0 {
            return Err(ConfigError::Invalid("engine.default_period_days must be at least 1".into()));
        }

        let products: HashSet<(&OrganizationId, &EntityId)> = self
            .reference
            .products
            .iter()
            .map(|p| (&p.organization_id, &p.id))
            .collect();
        if let Some(rule) = self
            .reference
            .rules
            .iter()
            .find(|r| !products.contains(&(&r.organization_id, &r.product_id)))
        {
            return Err(ConfigError::Invalid(format!(
                "reference rule for product {} in organization {} has no matching product",
                rule.product_id, rule.organization_id
            )));
        }
        Ok(())
    }
}
