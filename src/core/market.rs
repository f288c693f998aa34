//! Market data aggregator: concurrent per-category fetches with timeouts,
//! graceful degradation and a shared TTL cache.

use crate::core::cache::TtlCache;
use crate::core::config::MarketConfig;
use crate::core::error::ProviderError;
use crate::core::quote::{
    CategoryStatus, MarketCategory, MarketData, MarketQuote, PerCategory, QuoteProvider,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// A detached refresh may outlive the caller's timeout by this factor.
const REFRESH_BUDGET_FACTOR: u32 = 5;

#[derive(Debug, Clone)]
struct CategorySnapshot {
    quotes: Vec<MarketQuote>,
    fetched_at: DateTime<Utc>,
}

enum CategoryOutcome {
    Live(CategorySnapshot),
    Cached(CategorySnapshot),
    Unavailable,
}

impl CategoryOutcome {
    fn into_parts(self) -> (CategoryStatus, Vec<MarketQuote>) {
        match self {
            CategoryOutcome::Live(s) => (
                CategoryStatus::Live {
                    fetched_at: s.fetched_at,
                },
                s.quotes,
            ),
            CategoryOutcome::Cached(s) => (
                CategoryStatus::Cached {
                    fetched_at: s.fetched_at,
                },
                s.quotes,
            ),
            CategoryOutcome::Unavailable => (CategoryStatus::Unavailable, Vec::new()),
        }
    }
}

/// Everything a detached refresh task needs; cheap to clone.
#[derive(Clone)]
struct CategoryFetcher {
    category: MarketCategory,
    providers: Vec<Arc<dyn QuoteProvider>>,
    cache: Arc<TtlCache<MarketCategory, CategorySnapshot>>,
    in_flight: Arc<Mutex<()>>,
    /// Upper bound of one refresh, so the category lock is always released.
    budget: Duration,
}

impl CategoryFetcher {
    /// Fetches from every provider of the category and caches a non-empty
    /// result. Holds the category lock so concurrent callers share one
    /// upstream round trip.
    async fn refresh(self, symbols: Vec<String>) -> CategoryOutcome {
        let _guard = self.in_flight.lock().await;
        if let Some(snapshot) = self.cache.get(&self.category).await {
            return CategoryOutcome::Cached(snapshot);
        }

        let fetched_at = Utc::now();
        let fetch = fetch_from_providers(self.category, &self.providers, &symbols);
        let Ok(quotes) = tokio::time::timeout(self.budget, fetch).await else {
            let error = ProviderError::Timeout {
                category: self.category,
                timeout_ms: self.budget.as_millis() as u64,
            };
            warn!(%error, "Abandoning market data refresh");
            return CategoryOutcome::Unavailable;
        };
        if quotes.is_empty() {
            return CategoryOutcome::Unavailable;
        }

        let snapshot = CategorySnapshot { quotes, fetched_at };
        self.cache.put(self.category, snapshot.clone()).await;
        CategoryOutcome::Live(snapshot)
    }
}

/// Queries providers concurrently and merges their quotes in registration
/// order. Provider failures are logged and skipped.
async fn fetch_from_providers(
    category: MarketCategory,
    providers: &[Arc<dyn QuoteProvider>],
    symbols: &[String],
) -> Vec<MarketQuote> {
    let results = join_all(providers.iter().map(|provider| async move {
        (provider.name().to_string(), provider.fetch_quotes(symbols).await)
    }))
    .await;

    let mut quotes = Vec::new();
    for (provider, result) in results {
        match result {
            Ok(fetched) => {
                debug!(%category, %provider, count = fetched.len(), "Provider returned quotes");
                quotes.extend(fetched.into_iter().filter(|q| q.category() == category));
            }
            Err(e) => {
                let error = ProviderError::Unavailable {
                    provider,
                    reason: format!("{e:#}"),
                };
                warn!(%category, %error, "Quote provider failed");
            }
        }
    }
    quotes
}

pub struct MarketDataAggregator {
    fetchers: HashMap<MarketCategory, CategoryFetcher>,
    watchlist: PerCategory<Vec<String>>,
    timeouts: PerCategory<Duration>,
}

impl MarketDataAggregator {
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>, config: &MarketConfig) -> Self {
        let cache = Arc::new(TtlCache::new(Duration::from_millis(config.cache_ttl_ms)));
        let timeouts = PerCategory {
            crypto: Duration::from_millis(config.timeouts_ms.crypto),
            stocks: Duration::from_millis(config.timeouts_ms.stocks),
            forex: Duration::from_millis(config.timeouts_ms.forex),
        };
        let fetchers = MarketCategory::ALL
            .into_iter()
            .map(|category| {
                let fetcher = CategoryFetcher {
                    category,
                    providers: providers
                        .iter()
                        .filter(|p| p.category() == category)
                        .cloned()
                        .collect(),
                    cache: Arc::clone(&cache),
                    in_flight: Arc::new(Mutex::new(())),
                    budget: *timeouts.get(category) * REFRESH_BUDGET_FACTOR,
                };
                (category, fetcher)
            })
            .collect();

        Self {
            fetchers,
            watchlist: config.watchlist.clone(),
            timeouts,
        }
    }

    pub fn watchlist(&self, category: MarketCategory) -> &[String] {
        self.watchlist.get(category)
    }

    /// Snapshot of every category's watchlist. Never fails: a category whose
    /// providers error out or exceed the timeout comes back empty.
    #[instrument(name = "MarketFetch", skip(self))]
    pub async fn fetch(&self) -> MarketData {
        let (crypto, stocks, forex) = tokio::join!(
            self.category(MarketCategory::Crypto),
            self.category(MarketCategory::Stocks),
            self.category(MarketCategory::Forex),
        );

        let mut data = MarketData::default();
        for (category, outcome) in [
            (MarketCategory::Crypto, crypto),
            (MarketCategory::Stocks, stocks),
            (MarketCategory::Forex, forex),
        ] {
            let (status, quotes) = outcome.into_parts();
            data.absorb(category, status, quotes);
        }
        data
    }

    /// Watchlist quotes of a single category, through the same cache.
    pub async fn fetch_category(&self, category: MarketCategory) -> MarketData {
        let (status, quotes) = self.category(category).await.into_parts();
        let mut data = MarketData::default();
        data.absorb(category, status, quotes);
        data
    }

    async fn category(&self, category: MarketCategory) -> CategoryOutcome {
        let Some(fetcher) = self.fetchers.get(&category) else {
            return CategoryOutcome::Unavailable;
        };
        let symbols = self.watchlist.get(category).clone();
        if fetcher.providers.is_empty() || symbols.is_empty() {
            return CategoryOutcome::Unavailable;
        }
        if let Some(snapshot) = fetcher.cache.get(&category).await {
            return CategoryOutcome::Cached(snapshot);
        }

        // Detached so an abandoned request still leaves a warm cache behind.
        let task = tokio::spawn(fetcher.clone().refresh(symbols));
        let timeout = *self.timeouts.get(category);
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(outcome)) => {
                if matches!(outcome, CategoryOutcome::Unavailable) {
                    warn!(%category, "No quotes available, serving empty category");
                }
                outcome
            }
            Ok(Err(e)) => {
                let error = ProviderError::Aborted {
                    category,
                    reason: e.to_string(),
                };
                warn!(%error, "Market data refresh failed");
                CategoryOutcome::Unavailable
            }
            Err(_) => {
                let error = ProviderError::Timeout {
                    category,
                    timeout_ms: timeout.as_millis() as u64,
                };
                warn!(%error, "Market data refresh is too slow");
                CategoryOutcome::Unavailable
            }
        }
    }

    /// Ad-hoc lookup for identifiers outside the watchlist. Bounded by the
    /// category timeout, bypasses the cache.
    pub async fn lookup(&self, category: MarketCategory, symbols: &[String]) -> Vec<MarketQuote> {
        let Some(fetcher) = self.fetchers.get(&category) else {
            return Vec::new();
        };
        let timeout = *self.timeouts.get(category);
        match tokio::time::timeout(
            timeout,
            fetch_from_providers(category, &fetcher.providers, symbols),
        )
        .await
        {
            Ok(quotes) => quotes,
            Err(_) => {
                let error = ProviderError::Timeout {
                    category,
                    timeout_ms: timeout.as_millis() as u64,
                };
                warn!(%error, ?symbols, "Quote lookup is too slow");
                Vec::new()
            }
        }
    }
}
