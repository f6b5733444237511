//! Seeded geometric-Brownian price paths.
//!
//! Every commodity starts at its configured reference price. Daily shocks
//! mix one common factor with an idiosyncratic draw, so the generated book
//! has positive cross-commodity correlation. The same seed always produces
//! the same paths.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MarketDataPort, PriceHistory, PriceQuote, trailing};
use crate::config::UniverseConfig;
use crate::error::{RiskError, RiskResult};
use crate::models::{CommodityId, PricePoint, PriceSeries};

/// Generator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSettings {
    /// Root seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Annualized volatility of every path.
    #[serde(default = "default_annual_volatility")]
    pub annual_volatility: f64,
    /// Annualized drift.
    #[serde(default)]
    pub annual_drift: f64,
    /// Share of daily variance driven by the common factor, in [0, 1].
    #[serde(default = "default_common_factor")]
    pub common_factor: f64,
    /// Trading days per year used to scale volatility to one day.
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            annual_volatility: default_annual_volatility(),
            annual_drift: 0.0,
            common_factor: default_common_factor(),
            trading_days_per_year: default_trading_days(),
        }
    }
}

impl SyntheticSettings {
    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a negative or non-finite volatility, a
    /// common factor outside [0, 1], or zero trading days.
    pub fn validate(&self) -> RiskResult<()> {
        if !self.annual_volatility.is_finite() || self.annual_volatility < 0.0 {
            return Err(RiskError::configuration(format!(
                "annual_volatility must be non-negative, got {}",
                self.annual_volatility
            )));
        }
        if !self.annual_drift.is_finite() {
            return Err(RiskError::configuration("annual_drift must be finite"));
        }
        if !(0.0..=1.0).contains(&self.common_factor) {
            return Err(RiskError::configuration(format!(
                "common_factor must be in [0, 1], got {}",
                self.common_factor
            )));
        }
        if self.trading_days_per_year == 0 {
            return Err(RiskError::configuration("trading_days_per_year must be positive"));
        }
        Ok(())
    }

    fn daily_step(&self) -> (f64, f64) {
        let dt = 1.0 / f64::from(self.trading_days_per_year);
        let sigma = self.annual_volatility * dt.sqrt();
        let drift = (self.annual_drift - 0.5 * self.annual_volatility.powi(2)) * dt;
        (drift, sigma)
    }
}

#[derive(Debug)]
struct Paths {
    rng: StdRng,
    window: usize,
    points: BTreeMap<CommodityId, Vec<PricePoint>>,
}

/// Deterministic synthetic market.
#[derive(Debug)]
pub struct SyntheticMarketData {
    settings: SyntheticSettings,
    paths: RwLock<Paths>,
}

impl SyntheticMarketData {
    /// Generate `history_days` daily prices per commodity from `start`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for invalid settings, fewer than 2 days, or a
    /// non-positive reference price.
    pub fn generate(
        universe: &UniverseConfig,
        settings: SyntheticSettings,
        history_days: usize,
        start: DateTime<Utc>,
    ) -> RiskResult<Self> {
        settings.validate()?;
        if history_days < 2 {
            return Err(RiskError::configuration("history_days must be at least 2"));
        }
        if let Some(bad) = universe
            .commodities
            .iter()
            .find(|c| !c.reference_price.is_finite() || c.reference_price <= 0.0)
        {
            return Err(RiskError::configuration(format!(
                "{}: reference_price must be positive",
                bad.id
            )));
        }

        let mut paths = Paths {
            rng: StdRng::seed_from_u64(settings.seed),
            window: history_days,
            points: universe
                .commodities
                .iter()
                .map(|c| (c.id.clone(), vec![PricePoint::new(start, c.reference_price)]))
                .collect(),
        };
        for _ in 1..history_days {
            Self::extend(&settings, &mut paths);
        }
        debug!(
            commodities = paths.points.len(),
            days = history_days,
            seed = settings.seed,
            "Synthetic price paths generated"
        );

        Ok(Self {
            settings,
            paths: RwLock::new(paths),
        })
    }

    /// Roll every path forward one day, dropping the oldest observation.
    pub fn advance(&self) {
        let mut paths = self.paths.write();
        Self::extend(&self.settings, &mut paths);
        let window = paths.window;
        for points in paths.points.values_mut() {
            if points.len() > window {
                let excess = points.len() - window;
                points.drain(..excess);
            }
        }
    }

    fn extend(settings: &SyntheticSettings, paths: &mut Paths) {
        let (drift, sigma) = settings.daily_step();
        let common_weight = settings.common_factor.sqrt();
        let own_weight = (1.0 - settings.common_factor).sqrt();
        let common: f64 = paths.rng.sample(StandardNormal);
        for points in paths.points.values_mut() {
            let own: f64 = paths.rng.sample(StandardNormal);
            let z = common_weight * common + own_weight * own;
            if let Some(last) = points.last().copied() {
                let price = last.price * (drift + sigma * z).exp();
                points.push(PricePoint::new(last.timestamp + Duration::days(1), price));
            }
        }
    }
}

impl MarketDataPort for SyntheticMarketData {
    fn history(&self, commodity: &CommodityId, days: usize) -> RiskResult<PriceHistory> {
        let paths = self.paths.read();
        let points = paths
            .points
            .get(commodity)
            .ok_or_else(|| RiskError::insufficient("price history", 2, 0))?;
        let series = PriceSeries::new(commodity.clone(), points.clone())?;
        Ok(PriceHistory {
            series: trailing(&series, days)?,
            stale: false,
        })
    }

    fn latest(&self, commodity: &CommodityId) -> Option<PriceQuote> {
        let paths = self.paths.read();
        let last = paths.points.get(commodity)?.last()?;
        Some(PriceQuote {
            commodity: commodity.clone(),
            price: Decimal::from_f64(last.price)?.round_dp(4),
            timestamp: last.timestamp,
            stale: false,
        })
    }
}

const fn default_seed() -> u64 {
    7
}

const fn default_annual_volatility() -> f64 {
    0.25
}

const fn default_common_factor() -> f64 {
    0.3
}

const fn default_trading_days() -> u32 {
    252
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::sample_timestamp;

    fn market(seed: u64) -> SyntheticMarketData {
        let settings = SyntheticSettings {
            seed,
            ..SyntheticSettings::default()
        };
        SyntheticMarketData::generate(&UniverseConfig::default(), settings, 60, sample_timestamp())
            .unwrap()
    }

    #[test]
    fn test_same_seed_same_paths() {
        let corn = CommodityId::new("corn");
        let a = market(11).history(&corn, 60).unwrap();
        let b = market(11).history(&corn, 60).unwrap();
        assert_eq!(a, b);
        let c = market(12).history(&corn, 60).unwrap();
        assert_ne!(a.series.prices(), c.series.prices());
    }

    #[test]
    fn test_starts_at_reference_price() {
        let data = market(1);
        let cocoa = data.history(&CommodityId::new("cocoa"), 60).unwrap();
        assert_eq!(cocoa.series.len(), 60);
        assert_eq!(cocoa.series.prices()[0], 8000.0);
        assert!(cocoa.series.prices().iter().all(|p| *p > 0.0));
    }

    #[test]
    fn test_advance_keeps_window() {
        let data = market(1);
        let corn = CommodityId::new("corn");
        let before = data.latest(&corn).unwrap();
        data.advance();
        let after = data.latest(&corn).unwrap();
        assert_eq!(after.timestamp, before.timestamp + Duration::days(1));
        assert_eq!(data.history(&corn, 1000).unwrap().series.len(), 60);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = SyntheticSettings {
            common_factor: 1.5,
            ..SyntheticSettings::default()
        };
        let err = SyntheticMarketData::generate(&UniverseConfig::default(), settings, 60, sample_timestamp())
            .unwrap_err();
        assert!(matches!(err, RiskError::Configuration(_)));
    }
}
