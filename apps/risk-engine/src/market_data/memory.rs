use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{MarketDataPort, PriceHistory, PriceQuote, trailing};
use crate::error::{RiskError, RiskResult};
use crate::models::{CommodityId, PriceSeries};

#[derive(Debug, Clone)]
struct Feed {
    history: PriceSeries,
    history_stale: bool,
    latest: Option<PriceQuote>,
}

/// Fixed prices held in memory, for tests and replay.
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    feeds: RwLock<BTreeMap<CommodityId, Feed>>,
}

impl InMemoryMarketData {
    /// Empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a history; the latest quote is left untouched.
    pub fn insert_history(&self, series: PriceSeries, stale: bool) {
        let mut feeds = self.feeds.write();
        let commodity = series.commodity().clone();
        match feeds.get_mut(&commodity) {
            Some(feed) => {
                feed.history = series;
                feed.history_stale = stale;
            }
            None => {
                feeds.insert(
                    commodity,
                    Feed {
                        history: series,
                        history_stale: stale,
                        latest: None,
                    },
                );
            }
        }
    }

    /// Set the latest quote.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no history has been stored for the commodity.
    pub fn set_latest(&self, quote: PriceQuote) -> RiskResult<()> {
        let mut feeds = self.feeds.write();
        let feed = feeds.get_mut(&quote.commodity).ok_or_else(|| {
            RiskError::invalid_input("commodity", format!("no history for {}", quote.commodity))
        })?;
        feed.latest = Some(quote);
        Ok(())
    }

    /// Drop the latest quote, as if the feed went quiet.
    pub fn clear_latest(&self, commodity: &CommodityId) {
        if let Some(feed) = self.feeds.write().get_mut(commodity) {
            feed.latest = None;
        }
    }
}

impl MarketDataPort for InMemoryMarketData {
    fn history(&self, commodity: &CommodityId, days: usize) -> RiskResult<PriceHistory> {
        let feeds = self.feeds.read();
        let feed = feeds
            .get(commodity)
            .ok_or_else(|| RiskError::insufficient("price history", 2, 0))?;
        Ok(PriceHistory {
            series: trailing(&feed.history, days)?,
            stale: feed.history_stale,
        })
    }

    fn latest(&self, commodity: &CommodityId) -> Option<PriceQuote> {
        self.feeds.read().get(commodity).and_then(|f| f.latest.clone())
    }
}
