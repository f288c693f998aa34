//! Market quote types and the provider abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    Crypto,
    Stocks,
    Forex,
}

impl MarketCategory {
    pub const ALL: [MarketCategory; 3] = [
        MarketCategory::Crypto,
        MarketCategory::Stocks,
        MarketCategory::Forex,
    ];
}

impl Display for MarketCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MarketCategory::Crypto => "crypto",
                MarketCategory::Stocks => "stocks",
                MarketCategory::Forex => "forex",
            }
        )
    }
}

/// One value per market data category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub crypto: T,
    pub stocks: T,
    pub forex: T,
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: MarketCategory) -> &T {
        match category {
            MarketCategory::Crypto => &self.crypto,
            MarketCategory::Stocks => &self.stocks,
            MarketCategory::Forex => &self.forex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CryptoQuote {
    /// Provider coin id, e.g. `bitcoin`.
    pub id: String,
    pub name: String,
    /// Price in the configured local currency.
    #[serde(rename = "price_inr")]
    pub price_local: f64,
    pub currency: String,
    pub price_usd: Option<f64>,
    #[serde(rename = "change_24h")]
    pub change_24h_percent: f64,
    pub market_cap_usd: Option<f64>,
    pub as_of: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    #[serde(rename = "change")]
    pub change_absolute: f64,
    pub change_percent: f64,
    pub volume: Option<u64>,
    pub latest_trading_day: Option<String>,
    pub as_of: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForexRate {
    /// `FROM_TO`, e.g. `USD_INR`.
    pub pair: String,
    pub from_currency: String,
    pub to_currency: String,
    pub exchange_rate: f64,
    pub last_refreshed: Option<String>,
    pub as_of: DateTime<Utc>,
    pub source: String,
}

/// A normalized quote from any provider.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketQuote {
    Crypto(CryptoQuote),
    Stock(StockQuote),
    Forex(ForexRate),
}

impl MarketQuote {
    /// Key under which the quote is published: coin id, ticker or pair.
    pub fn key(&self) -> &str {
        match self {
            MarketQuote::Crypto(q) => &q.id,
            MarketQuote::Stock(q) => &q.symbol,
            MarketQuote::Forex(q) => &q.pair,
        }
    }

    pub fn category(&self) -> MarketCategory {
        match self {
            MarketQuote::Crypto(_) => MarketCategory::Crypto,
            MarketQuote::Stock(_) => MarketCategory::Stocks,
            MarketQuote::Forex(_) => MarketCategory::Forex,
        }
    }
}

/// Where the quotes of a category came from in a given snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryStatus {
    Live { fetched_at: DateTime<Utc> },
    Cached { fetched_at: DateTime<Utc> },
    Unavailable,
}

impl CategoryStatus {
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CategoryStatus::Live { fetched_at } | CategoryStatus::Cached { fetched_at } => {
                Some(*fetched_at)
            }
            CategoryStatus::Unavailable => None,
        }
    }
}

/// Snapshot of all categories. Maps are ordered so iteration and
/// serialization are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketData {
    pub crypto: BTreeMap<String, CryptoQuote>,
    pub stocks: BTreeMap<String, StockQuote>,
    pub forex: BTreeMap<String, ForexRate>,
    pub sources: BTreeMap<MarketCategory, CategoryStatus>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl MarketData {
    /// Adds a quote unless one with the same key is already present.
    pub fn insert(&mut self, quote: MarketQuote) {
        match quote {
            MarketQuote::Crypto(q) => {
                self.crypto.entry(q.id.clone()).or_insert(q);
            }
            MarketQuote::Stock(q) => {
                self.stocks.entry(q.symbol.clone()).or_insert(q);
            }
            MarketQuote::Forex(q) => {
                self.forex.entry(q.pair.clone()).or_insert(q);
            }
        }
    }

    /// Records the outcome of one category fetch.
    pub fn absorb(
        &mut self,
        category: MarketCategory,
        status: CategoryStatus,
        quotes: impl IntoIterator<Item = MarketQuote>,
    ) {
        for quote in quotes {
            if quote.category() == category {
                self.insert(quote);
            }
        }
        if let Some(fetched_at) = status.fetched_at() {
            self.last_updated = Some(match self.last_updated {
                Some(current) if current >= fetched_at => current,
                _ => fetched_at,
            });
        }
        self.sources.insert(category, status);
    }

    pub fn is_empty(&self) -> bool {
        self.crypto.is_empty() && self.stocks.is_empty() && self.forex.is_empty()
    }
}

/// An upstream source of quotes for one category.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> MarketCategory;

    /// Fetches quotes for the given identifiers (coin ids, tickers or
    /// `FROM_TO` pairs). Identifiers the provider cannot serve are skipped;
    /// an error means nothing usable came back.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<MarketQuote>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(symbol: &str, price: f64, source: &str) -> MarketQuote {
        MarketQuote::Stock(StockQuote {
            symbol: symbol.to_string(),
            price,
            change_absolute: 0.0,
            change_percent: 0.0,
            volume: None,
            latest_trading_day: None,
            as_of: Utc::now(),
            source: source.to_string(),
        })
    }

    #[test]
    fn test_first_quote_wins() {
        let mut data = MarketData::default();
        data.insert(stock("AAPL", 190.0, "first"));
        data.insert(stock("AAPL", 1.0, "second"));
        assert_eq!(data.stocks["AAPL"].source, "first");
        assert_eq!(data.stocks["AAPL"].price, 190.0);
    }

    #[test]
    fn test_absorb_ignores_foreign_categories_and_tracks_freshness() {
        let mut data = MarketData::default();
        let older = Utc::now() - chrono::Duration::seconds(30);
        let newer = Utc::now();

        data.absorb(
            MarketCategory::Crypto,
            CategoryStatus::Cached { fetched_at: older },
            vec![stock("AAPL", 190.0, "misfiled")],
        );
        data.absorb(
            MarketCategory::Stocks,
            CategoryStatus::Live { fetched_at: newer },
            vec![stock("MSFT", 400.0, "test")],
        );
        data.absorb(MarketCategory::Forex, CategoryStatus::Unavailable, vec![]);

        assert!(data.crypto.is_empty());
        assert!(!data.stocks.contains_key("AAPL"));
        assert!(data.stocks.contains_key("MSFT"));
        assert_eq!(data.last_updated, Some(newer));
        assert_eq!(data.sources[&MarketCategory::Forex], CategoryStatus::Unavailable);
    }

    #[test]
    fn test_serialized_shape() {
        let mut data = MarketData::default();
        data.insert(MarketQuote::Forex(ForexRate {
            pair: "USD_INR".to_string(),
            from_currency: "USD".to_string(),
            to_currency: "INR".to_string(),
            exchange_rate: 83.25,
            last_refreshed: None,
            as_of: Utc::now(),
            source: "Alpha Vantage".to_string(),
        }));
        data.absorb(MarketCategory::Crypto, CategoryStatus::Unavailable, vec![]);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["forex"]["USD_INR"]["exchange_rate"], 83.25);
        assert_eq!(json["sources"]["crypto"]["status"], "unavailable");
        assert!(json["stocks"].as_object().unwrap().is_empty());
    }
}
