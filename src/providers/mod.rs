pub mod alpha_vantage;
pub mod coingecko;
pub mod util;

use crate::core::config::AppConfig;
use crate::core::quote::QuoteProvider;
use alpha_vantage::{AlphaVantageClient, AlphaVantageForexProvider, AlphaVantageStockProvider};
use anyhow::Result;
use coingecko::CoinGeckoProvider;
use std::sync::Arc;
use util::RetryPolicy;

/// Builds the upstream providers named in the config, one per category.
pub fn default_providers(config: &AppConfig) -> Result<Vec<Arc<dyn QuoteProvider>>> {
    let retry = RetryPolicy::from(&config.market);
    let coingecko = CoinGeckoProvider::new(
        &config.providers.coingecko.base_url,
        &config.currency.code,
        retry,
    )?;

    let alpha_vantage = &config.providers.alpha_vantage;
    let av_client = Arc::new(AlphaVantageClient::new(
        &alpha_vantage.base_url,
        &alpha_vantage.resolve_api_key(),
        retry,
    )?);

    Ok(vec![
        Arc::new(coingecko),
        Arc::new(AlphaVantageStockProvider::new(Arc::clone(&av_client))),
        Arc::new(AlphaVantageForexProvider::new(av_client)),
    ])
}
