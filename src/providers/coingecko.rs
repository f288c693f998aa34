use crate::core::quote::{CryptoQuote, MarketCategory, MarketQuote, QuoteProvider};
use crate::providers::util::{RetryPolicy, http_client, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const SOURCE: &str = "CoinGecko";

/// Crypto prices from the CoinGecko `simple/price` endpoint.
pub struct CoinGeckoProvider {
    base_url: String,
    /// Lowercase code of the local currency, as CoinGecko expects it.
    local_currency: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, local_currency: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            local_currency: local_currency.to_lowercase(),
            retry,
            client: http_client(retry.attempt_timeout())?,
        })
    }

    fn request_url(&self, ids: &[String]) -> Result<reqwest::Url> {
        let vs_currencies = if self.local_currency == "usd" {
            "usd".to_string()
        } else {
            format!("usd,{}", self.local_currency)
        };
        reqwest::Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[
                ("ids", ids.join(",")),
                ("vs_currencies", vs_currencies),
                ("include_24hr_change", "true".to_string()),
                ("include_market_cap", "true".to_string()),
            ],
        )
        .with_context(|| format!("Invalid CoinGecko base URL: {}", self.base_url))
    }

    fn to_quote(&self, id: &str, fields: &PriceFields) -> Option<CryptoQuote> {
        let price_local = fields.get(&self.local_currency)?;
        Some(CryptoQuote {
            id: id.to_string(),
            name: display_name(id),
            price_local,
            currency: self.local_currency.to_uppercase(),
            price_usd: fields.get("usd"),
            change_24h_percent: fields.get("usd_24h_change").unwrap_or(0.0),
            market_cap_usd: fields.get("usd_market_cap"),
            as_of: Utc::now(),
            source: SOURCE.to_string(),
        })
    }
}

/// Per-coin object; CoinGecko reports `null` for fields it cannot price.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct PriceFields(HashMap<String, Option<f64>>);

impl PriceFields {
    fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().flatten()
    }
}

/// `bitcoin-cash` becomes `Bitcoin Cash`.
fn display_name(id: &str) -> String {
    id.split(['-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[async_trait]
impl QuoteProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    fn category(&self) -> MarketCategory {
        MarketCategory::Crypto
    }

    #[instrument(name = "CoinGeckoFetch", skip(self), fields(coins = symbols.len()))]
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<MarketQuote>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.request_url(symbols)?;
        debug!("Requesting crypto prices from {}", url);

        let data: HashMap<String, PriceFields> = with_retry(
            || async {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| anyhow!("Request error: {e} for URL: {url}"))?;
                if !response.status().is_success() {
                    return Err(anyhow!("HTTP error: {} from CoinGecko", response.status()));
                }
                response
                    .json::<HashMap<String, PriceFields>>()
                    .await
                    .context("Failed to parse CoinGecko response")
            },
            self.retry.retries,
            self.retry.delay_ms,
        )
        .await?;

        let quotes: Vec<MarketQuote> = symbols
            .iter()
            .filter_map(|id| match data.get(id).and_then(|fields| self.to_quote(id, fields)) {
                Some(quote) => Some(MarketQuote::Crypto(quote)),
                None => {
                    debug!(coin = %id, "No price returned");
                    None
                }
            })
            .collect();
        debug!("Received {} crypto quotes", quotes.len());
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> CoinGeckoProvider {
        CoinGeckoProvider::new(
            base_url,
            "INR",
            RetryPolicy {
                retries: 0,
                delay_ms: 1,
                attempt_timeout_ms: 200,
            },
        )
        .unwrap()
    }

    async fn create_mock_server(status_code: u16, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("vs_currencies", "usd,inr"))
            .and(query_param("include_24hr_change", "true"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_fetch_quotes() {
        let mock_response = r#"{
            "bitcoin": {"usd": 67000.5, "inr": 5600000.0, "usd_24h_change": 6.25, "usd_market_cap": 1.3e12},
            "binancecoin": {"usd": 580.0, "inr": 48500.0, "usd_24h_change": -1.5, "usd_market_cap": null}
        }"#;
        let mock_server = create_mock_server(200, mock_response).await;

        let symbols = vec![
            "bitcoin".to_string(),
            "binancecoin".to_string(),
            "unknown-coin".to_string(),
        ];
        let quotes = provider(&mock_server.uri())
            .fetch_quotes(&symbols)
            .await
            .unwrap();

        assert_eq!(quotes.len(), 2);
        let MarketQuote::Crypto(btc) = &quotes[0] else {
            panic!("expected a crypto quote");
        };
        assert_eq!(btc.id, "bitcoin");
        assert_eq!(btc.name, "Bitcoin");
        assert_eq!(btc.price_local, 5600000.0);
        assert_eq!(btc.currency, "INR");
        assert_eq!(btc.price_usd, Some(67000.5));
        assert_eq!(btc.change_24h_percent, 6.25);
        assert_eq!(btc.source, "CoinGecko");

        let MarketQuote::Crypto(bnb) = &quotes[1] else {
            panic!("expected a crypto quote");
        };
        assert_eq!(bnb.market_cap_usd, None);
        assert_eq!(bnb.change_24h_percent, -1.5);
    }

    #[tokio::test]
    async fn test_rate_limited_is_an_error() {
        let mock_server = create_mock_server(429, r#"{"status": {"error_code": 429}}"#).await;
        let result = provider(&mock_server.uri())
            .fetch_quotes(&["bitcoin".to_string()])
            .await;
        assert!(result.unwrap_err().to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let mock_server = create_mock_server(200, "<html>maintenance</html>").await;
        let result = provider(&mock_server.uri())
            .fetch_quotes(&["bitcoin".to_string()])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(std::time::Duration::from_secs(10)),
            )
            .mount(&mock_server)
            .await;

        let started = std::time::Instant::now();
        let result = provider(&mock_server.uri())
            .fetch_quotes(&["bitcoin".to_string()])
            .await;
        assert!(result.is_err());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("bitcoin"), "Bitcoin");
        assert_eq!(display_name("bitcoin-cash"), "Bitcoin Cash");
        assert_eq!(display_name("usd-COIN"), "Usd Coin");
    }
}
