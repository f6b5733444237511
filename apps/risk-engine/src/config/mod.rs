//! Configuration module for the risk engine.
//!
//! Loads the YAML configuration, interpolates environment variables and
//! validates every section before the engine starts. Every section has
//! defaults, so an empty file is a valid configuration.
//!
//! # Usage
//!
//! ```rust,ignore
//! use risk_engine::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("portfolio VaR limit: {}", config.limits.portfolio_var);
//! ```

mod engine;
mod observability;
mod risk;
mod universe;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{EngineConfig, MarketDataConfig, PortfolioConfig};
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use risk::{MonteCarloConfig, REQUIRED_CONFIDENCE_LEVELS, RiskConfig};
pub use universe::{CommodityConfig, UniverseConfig};

use crate::monitor::RiskLimits;
use crate::risk::{RiskCalculator, Scenario};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Commodity universe.
    #[serde(default)]
    pub universe: UniverseConfig,
    /// Risk calculation settings.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Risk limits.
    #[serde(default)]
    pub limits: RiskLimits,
    /// Stress scenarios, evaluated in order.
    #[serde(default = "Scenario::builtins")]
    pub scenarios: Vec<Scenario>,
    /// Position book.
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    /// Market data.
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Monitoring passes.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            risk: RiskConfig::default(),
            limits: RiskLimits::default(),
            scenarios: Scenario::builtins(),
            portfolio: PortfolioConfig::default(),
            market_data: MarketDataConfig::default(),
            engine: EngineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Look up a scenario by name.
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.universe.commodities.is_empty() {
        return Err(ConfigError::ValidationError(
            "universe.commodities must not be empty".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    for commodity in &config.universe.commodities {
        if commodity.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "universe.commodities: id must not be empty".to_string(),
            ));
        }
        if !seen.insert(&commodity.id) {
            return Err(ConfigError::ValidationError(format!(
                "universe.commodities: duplicate id {}",
                commodity.id
            )));
        }
    }

    // Confidence set, horizon and simulation floor.
    RiskCalculator::new(config.risk.clone())
        .and_then(|calculator| calculator.check_confidence(config.risk.monitor_confidence))
        .map_err(|e| ConfigError::ValidationError(format!("risk: {e}")))?;

    let invalid = config.limits.invalid_entries();
    if !invalid.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "limits must be positive: {}",
            invalid.join(", ")
        )));
    }

    let mut names = BTreeSet::new();
    for scenario in &config.scenarios {
        scenario
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("scenarios: {e}")))?;
        if !names.insert(scenario.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "scenarios: duplicate name '{}'",
                scenario.name
            )));
        }
    }

    if config.market_data.history_days < 3 {
        return Err(ConfigError::ValidationError(
            "market_data.history_days must be at least 3".to_string(),
        ));
    }
    config
        .market_data
        .synthetic
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("market_data.synthetic: {e}")))?;

    if config.engine.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.interval_secs must be positive".to_string(),
        ));
    }
    if !config.engine.concentration_var.is_finite() || config.engine.concentration_var <= 0.0 {
        return Err(ConfigError::ValidationError(
            "engine.concentration_var must be positive".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty", "compact"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommodityId;
    use crate::portfolio::ExposureConvention;
    use crate::risk::VarMethod;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.universe.commodities.len(), 8);
        assert_eq!(config.risk.confidence_levels, vec![0.90, 0.95, 0.99]);
        assert_eq!(config.risk.monte_carlo.n_simulations, 10_000);
        assert_eq!(config.limits.portfolio_var, 3_000_000.0);
        assert_eq!(config.scenarios.len(), 3);
        assert_eq!(config.portfolio.exposure_convention, ExposureConvention::Gross);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = load_config_from_string("").unwrap();
        assert_eq!(config.risk.horizon_days, 1);
        assert!(config.scenario("covid_2020").is_some());
    }

    #[test]
    fn test_load_partial_config() {
        let yaml = r"
risk:
  horizon_days: 10
  monitor_method: parametric
limits:
  portfolio_var: 5000000
  commodity_var:
    corn: 750000
portfolio:
  exposure_convention: net
";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.risk.horizon_days, 10);
        assert_eq!(config.risk.monitor_method, VarMethod::Parametric);
        assert_eq!(config.limits.portfolio_var, 5_000_000.0);
        assert_eq!(config.limits.commodity_var_limit(&CommodityId::new("CORN")), 750_000.0);
        // Untouched sections keep their defaults.
        assert_eq!(config.limits.default_commodity_var, 1_200_000.0);
        assert_eq!(config.portfolio.exposure_convention, ExposureConvention::Net);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "seed: ${RISK_ENGINE_TEST_NONEXISTENT_VAR:-42}";
        assert_eq!(interpolate_env_vars(input), "seed: 42");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "level: ${RISK_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "level: ");
    }

    #[test]
    fn test_missing_required_confidence() {
        let yaml = r"
risk:
  confidence_levels: [0.95, 0.99]
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(err.to_string().contains("0.9"));
    }

    #[test]
    fn test_simulation_floor() {
        let yaml = r"
risk:
  monte_carlo:
    n_simulations: 500
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_negative_limit_rejected() {
        let yaml = r"
limits:
  position_size:
    corn: -1
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(err.to_string().contains("position_size.CORN"));
    }

    #[test]
    fn test_duplicate_scenario_rejected() {
        let yaml = r"
scenarios:
  - name: drought
    volatility_multiplier: 1.5
  - name: drought
    volatility_multiplier: 2.0
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_custom_scenario_with_shocks() {
        let yaml = r"
scenarios:
  - name: drought
    source_period: 2012-06/2012-08
    volatility_multiplier: 1.8
    shocks:
      corn: 0.2
      soybeans: 0.15
";
        let config = load_config_from_string(yaml).unwrap();
        let drought = config.scenario("drought").unwrap();
        assert_eq!(drought.shocks[&CommodityId::new("corn")], 0.2);
        assert_eq!(drought.uniform_shock, None);
    }

    #[test]
    fn test_invalid_log_format() {
        let yaml = r"
observability:
  logging:
    format: xml
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine:\n  interval_secs: 5").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.engine.interval_secs, 5);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = load_config_from_string(include_str!("../../config.yaml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.universe, defaults.universe);
        assert_eq!(config.risk, defaults.risk);
        assert_eq!(config.limits, defaults.limits);
        assert_eq!(config.scenarios.len(), 3);
        assert_eq!(
            config.scenario("ukraine_conflict").unwrap().shock_for(Some(&CommodityId::new("wheat"))),
            -0.20
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some("/nonexistent/risk-engine.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
