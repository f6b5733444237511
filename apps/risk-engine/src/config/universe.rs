//! Commodity universe configuration.

use serde::{Deserialize, Serialize};

use crate::models::CommodityId;

/// One tradable commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityConfig {
    /// Stable identifier used throughout the engine.
    pub id: CommodityId,
    /// Market-data ticker.
    pub ticker: String,
    /// Display name.
    pub display_name: String,
    /// Reference price used to seed synthetic market data.
    #[serde(default = "default_reference_price")]
    pub reference_price: f64,
}

impl CommodityConfig {
    fn new(name: &str, ticker: &str, reference_price: f64) -> Self {
        Self {
            id: CommodityId::new(name),
            ticker: ticker.to_string(),
            display_name: name.to_string(),
            reference_price,
        }
    }
}

/// Commodity universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Commodities in reporting order.
    #[serde(default = "default_commodities")]
    pub commodities: Vec<CommodityConfig>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            commodities: default_commodities(),
        }
    }
}

impl UniverseConfig {
    /// Commodity identifiers in order.
    #[must_use]
    pub fn ids(&self) -> Vec<CommodityId> {
        self.commodities.iter().map(|c| c.id.clone()).collect()
    }

    /// Look up a commodity.
    #[must_use]
    pub fn get(&self, id: &CommodityId) -> Option<&CommodityConfig> {
        self.commodities.iter().find(|c| &c.id == id)
    }
}

const fn default_reference_price() -> f64 {
    100.0
}

fn default_commodities() -> Vec<CommodityConfig> {
    vec![
        CommodityConfig::new("Corn", "ZC=F", 350.0),
        CommodityConfig::new("Wheat", "ZW=F", 550.0),
        CommodityConfig::new("Soybeans", "ZS=F", 900.0),
        CommodityConfig::new("Sugar", "SB=F", 18.0),
        CommodityConfig::new("Coffee", "KC=F", 270.0),
        CommodityConfig::new("Cotton", "CT=F", 65.0),
        CommodityConfig::new("Cocoa", "CC=F", 8000.0),
        CommodityConfig::new("Rice", "ZR=F", 15.0),
    ]
}
