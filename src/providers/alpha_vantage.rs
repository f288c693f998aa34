use crate::core::quote::{ForexRate, MarketCategory, MarketQuote, QuoteProvider, StockQuote};
use crate::providers::util::{RetryPolicy, http_client, parse_number, with_retry};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const SOURCE: &str = "Alpha Vantage";

const GLOBAL_QUOTE_KEY: &str = "Global Quote";
const EXCHANGE_RATE_KEY: &str = "Realtime Currency Exchange Rate";

/// Connection shared by the stock and forex providers.
pub struct AlphaVantageClient {
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    pub fn new(base_url: &str, api_key: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(AlphaVantageClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry,
            client: http_client(retry.attempt_timeout())?,
        })
    }

    /// Calls `/query` and returns the object under `payload_key`, or `None`
    /// when the service answered without data (unknown symbol).
    async fn query<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        payload_key: &str,
    ) -> Result<Option<T>> {
        let mut all_params = params.to_vec();
        all_params.push(("apikey", self.api_key.as_str()));
        let url = reqwest::Url::parse_with_params(&format!("{}/query", self.base_url), &all_params)
            .with_context(|| format!("Invalid Alpha Vantage base URL: {}", self.base_url))?;
        debug!(params = ?params, "Requesting Alpha Vantage data");

        let mut body: Value = with_retry(
            || async {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| anyhow!("Request error: {e} for {payload_key}"))?;
                if !response.status().is_success() {
                    return Err(anyhow!("HTTP error: {} from Alpha Vantage", response.status()));
                }
                let body: Value = response
                    .json()
                    .await
                    .context("Failed to parse Alpha Vantage response")?;
                check_service_messages(&body)?;
                Ok(body)
            },
            self.retry.retries,
            self.retry.delay_ms,
        )
        .await?;

        match body.get_mut(payload_key).map(Value::take) {
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(payload) => serde_json::from_value(payload)
                .map(Some)
                .with_context(|| format!("Unexpected shape of {payload_key}")),
            None => Ok(None),
        }
    }
}

/// Rate limits and bad requests come back as 200 with a message field.
fn check_service_messages(body: &Value) -> Result<()> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            bail!("Alpha Vantage {key}: {message}");
        }
    }
    Ok(())
}

/// Runs one lookup per identifier. Unknown identifiers are skipped; the call
/// fails only when every lookup failed.
async fn fetch_each<F, Fut>(symbols: &[String], lookup: F) -> Result<Vec<MarketQuote>>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<Option<MarketQuote>>>,
{
    let results = join_all(symbols.iter().cloned().map(&lookup)).await;
    let mut quotes = Vec::new();
    let mut last_error = None;
    for (symbol, result) in symbols.iter().zip(results) {
        match result {
            Ok(Some(quote)) => quotes.push(quote),
            Ok(None) => debug!(%symbol, "No data returned"),
            Err(e) => {
                warn!(%symbol, error = %e, "Lookup failed");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) if quotes.is_empty() => Err(e),
        _ => Ok(quotes),
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: String,
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "09. change")]
    change: String,
    #[serde(rename = "10. change percent")]
    change_percent: String,
}

impl GlobalQuote {
    fn into_quote(self) -> Result<StockQuote> {
        Ok(StockQuote {
            price: parse_number(&self.price, "05. price")?,
            change_absolute: parse_number(&self.change, "09. change")?,
            change_percent: parse_number(&self.change_percent, "10. change percent")?,
            volume: self.volume.and_then(|v| v.trim().parse().ok()),
            latest_trading_day: self.latest_trading_day.filter(|d| !d.is_empty()),
            symbol: self.symbol,
            as_of: Utc::now(),
            source: SOURCE.to_string(),
        })
    }
}

/// Stock quotes from `GLOBAL_QUOTE`, one request per ticker.
pub struct AlphaVantageStockProvider {
    client: Arc<AlphaVantageClient>,
}

impl AlphaVantageStockProvider {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        AlphaVantageStockProvider { client }
    }

    async fn fetch_one(&self, symbol: String) -> Result<Option<MarketQuote>> {
        let quote: Option<GlobalQuote> = self
            .client
            .query(
                &[("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str())],
                GLOBAL_QUOTE_KEY,
            )
            .await
            .with_context(|| format!("Failed to fetch quote for {symbol}"))?;
        quote
            .map(|q| q.into_quote().map(MarketQuote::Stock))
            .transpose()
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageStockProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    fn category(&self) -> MarketCategory {
        MarketCategory::Stocks
    }

    #[instrument(name = "AlphaVantageStockFetch", skip(self))]
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<MarketQuote>> {
        fetch_each(symbols, |symbol| self.fetch_one(symbol)).await
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRate {
    #[serde(rename = "1. From_Currency Code")]
    from_currency: String,
    #[serde(rename = "3. To_Currency Code")]
    to_currency: String,
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: String,
    #[serde(rename = "6. Last Refreshed")]
    last_refreshed: Option<String>,
}

/// Exchange rates from `CURRENCY_EXCHANGE_RATE`, keyed `FROM_TO`.
pub struct AlphaVantageForexProvider {
    client: Arc<AlphaVantageClient>,
}

impl AlphaVantageForexProvider {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        AlphaVantageForexProvider { client }
    }

    async fn fetch_one(&self, pair: String) -> Result<Option<MarketQuote>> {
        let (from, to) = pair
            .split_once('_')
            .ok_or_else(|| anyhow!("Forex pair {pair} must look like FROM_TO"))?;
        let rate: Option<ExchangeRate> = self
            .client
            .query(
                &[
                    ("function", "CURRENCY_EXCHANGE_RATE"),
                    ("from_currency", from),
                    ("to_currency", to),
                ],
                EXCHANGE_RATE_KEY,
            )
            .await
            .with_context(|| format!("Failed to fetch exchange rate for {pair}"))?;
        let Some(rate) = rate else {
            return Ok(None);
        };
        Ok(Some(MarketQuote::Forex(ForexRate {
            exchange_rate: parse_number(&rate.exchange_rate, "5. Exchange Rate")?,
            from_currency: rate.from_currency,
            to_currency: rate.to_currency,
            last_refreshed: rate.last_refreshed,
            pair,
            as_of: Utc::now(),
            source: SOURCE.to_string(),
        })))
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageForexProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    fn category(&self) -> MarketCategory {
        MarketCategory::Forex
    }

    #[instrument(name = "AlphaVantageForexFetch", skip(self))]
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<MarketQuote>> {
        fetch_each(symbols, |pair| self.fetch_one(pair)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> Arc<AlphaVantageClient> {
        Arc::new(
            AlphaVantageClient::new(
                base_url,
                "test-key",
                RetryPolicy {
                    retries: 0,
                    delay_ms: 1,
                    attempt_timeout_ms: 200,
                },
            )
            .unwrap(),
        )
    }

    async fn mount_quote(server: &MockServer, symbol: &str, status_code: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .and(query_param("symbol", symbol))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .mount(server)
            .await;
    }

    const AAPL_RESPONSE: &str = r#"{
        "Global Quote": {
            "01. symbol": "AAPL",
            "02. open": "190.00",
            "05. price": "189.50",
            "06. volume": "48213344",
            "07. latest trading day": "2024-06-14",
            "08. previous close": "190.64",
            "09. change": "-1.1400",
            "10. change percent": "-0.5980%"
        }
    }"#;

    #[tokio::test]
    async fn test_fetch_stock_quotes() {
        let server = MockServer::start().await;
        mount_quote(&server, "AAPL", 200, AAPL_RESPONSE).await;
        mount_quote(&server, "NOPE", 200, r#"{"Global Quote": {}}"#).await;

        let provider = AlphaVantageStockProvider::new(client(&server.uri()));
        let quotes = provider
            .fetch_quotes(&["AAPL".to_string(), "NOPE".to_string()])
            .await
            .unwrap();

        assert_eq!(quotes.len(), 1);
        let MarketQuote::Stock(aapl) = &quotes[0] else {
            panic!("expected a stock quote");
        };
        assert_eq!(aapl.symbol, "AAPL");
        assert_eq!(aapl.price, 189.5);
        assert_eq!(aapl.change_absolute, -1.14);
        assert_eq!(aapl.change_percent, -0.598);
        assert_eq!(aapl.volume, Some(48213344));
        assert_eq!(aapl.latest_trading_day.as_deref(), Some("2024-06-14"));
    }

    #[tokio::test]
    async fn test_partial_stock_failure_keeps_successes() {
        let server = MockServer::start().await;
        mount_quote(&server, "AAPL", 200, AAPL_RESPONSE).await;
        mount_quote(&server, "GOOGL", 500, "oops").await;

        let provider = AlphaVantageStockProvider::new(client(&server.uri()));
        let quotes = provider
            .fetch_quotes(&["AAPL".to_string(), "GOOGL".to_string()])
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].key(), "AAPL");
    }

    #[tokio::test]
    async fn test_rate_limit_note_is_an_error() {
        let server = MockServer::start().await;
        let note = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        mount_quote(&server, "AAPL", 200, note).await;

        let provider = AlphaVantageStockProvider::new(client(&server.uri()));
        let err = provider
            .fetch_quotes(&["AAPL".to_string()])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("call frequency"));
    }

    #[tokio::test]
    async fn test_fetch_forex_rate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "CURRENCY_EXCHANGE_RATE"))
            .and(query_param("from_currency", "USD"))
            .and(query_param("to_currency", "INR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "Realtime Currency Exchange Rate": {
                        "1. From_Currency Code": "USD",
                        "2. From_Currency Name": "United States Dollar",
                        "3. To_Currency Code": "INR",
                        "4. To_Currency Name": "Indian Rupee",
                        "5. Exchange Rate": "86.12000000",
                        "6. Last Refreshed": "2024-06-14 10:00:01",
                        "7. Time Zone": "UTC"
                    }
                }"#,
            ))
            .mount(&server)
            .await;

        let provider = AlphaVantageForexProvider::new(client(&server.uri()));
        let quotes = provider
            .fetch_quotes(&["USD_INR".to_string()])
            .await
            .unwrap();

        assert_eq!(quotes.len(), 1);
        let MarketQuote::Forex(rate) = &quotes[0] else {
            panic!("expected a forex rate");
        };
        assert_eq!(rate.pair, "USD_INR");
        assert_eq!(rate.from_currency, "USD");
        assert_eq!(rate.to_currency, "INR");
        assert_eq!(rate.exchange_rate, 86.12);
        assert_eq!(rate.last_refreshed.as_deref(), Some("2024-06-14 10:00:01"));
    }

    #[tokio::test]
    async fn test_malformed_pair_is_an_error() {
        let server = MockServer::start().await;
        let provider = AlphaVantageForexProvider::new(client(&server.uri()));
        assert!(provider.fetch_quotes(&["USDINR".to_string()]).await.is_err());
    }
}
