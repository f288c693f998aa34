use crate::AppState;
use crate::core::advice::{InvestmentAdviceResult, RiskProfile};
use crate::core::budget::BudgetResult;
use crate::core::quote::{CryptoQuote, ForexRate, MarketCategory, MarketData, MarketQuote, StockQuote};
use crate::core::tips::financial_tips;
use crate::server::error::ApiError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    /// Missing income is treated as zero and rejected by the engine.
    #[serde(default)]
    pub monthly_income: f64,
}

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    pub investment_amount: f64,
    #[serde(default)]
    pub risk_profile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CryptoQuery {
    /// Comma separated coin ids.
    pub coins: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForexQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// POST /api/budget-allocation
#[instrument(skip_all)]
pub async fn budget_allocation(
    State(state): State<AppState>,
    payload: Result<Json<BudgetRequest>, JsonRejection>,
) -> Result<Json<BudgetResult>, ApiError> {
    let Json(request) = payload?;
    info!(monthly_income = request.monthly_income, "Budget allocation requested");
    Ok(Json(state.budget.allocate(request.monthly_income)?))
}

/// POST /api/investment-advice
#[instrument(skip_all)]
pub async fn investment_advice(
    State(state): State<AppState>,
    payload: Result<Json<AdviceRequest>, JsonRejection>,
) -> Result<Json<InvestmentAdviceResult>, ApiError> {
    let Json(request) = payload?;
    let risk_profile = match request.risk_profile.as_deref() {
        Some(profile) => profile.parse::<RiskProfile>()?,
        None => RiskProfile::Moderate,
    };
    info!(
        investment_amount = request.investment_amount,
        %risk_profile,
        "Investment advice requested"
    );
    let advice = state
        .advisor
        .advise(request.investment_amount, risk_profile)
        .await?;
    Ok(Json(advice))
}

/// GET /api/market-data
#[instrument(skip_all)]
pub async fn market_data(State(state): State<AppState>) -> Json<MarketData> {
    Json(state.market.fetch().await)
}

/// GET /api/stock-quote/{symbol}
#[instrument(skip(state))]
pub async fn stock_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockQuote>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    state
        .market
        .lookup(MarketCategory::Stocks, std::slice::from_ref(&symbol))
        .await
        .into_iter()
        .find_map(|quote| match quote {
            MarketQuote::Stock(quote) => Some(Json(quote)),
            _ => None,
        })
        .ok_or_else(|| ApiError::NotFound(format!("Stock {symbol} not found or API limit reached")))
}

/// GET /api/crypto-prices?coins=bitcoin,ethereum
///
/// Without `coins` the cached watchlist snapshot is served.
#[instrument(skip(state))]
pub async fn crypto_prices(
    State(state): State<AppState>,
    query: Result<Query<CryptoQuery>, QueryRejection>,
) -> Result<Json<BTreeMap<String, CryptoQuote>>, ApiError> {
    let Query(query) = query?;
    let coins: Vec<String> = query
        .coins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|coin| coin.trim().to_lowercase())
        .filter(|coin| !coin.is_empty())
        .collect();

    if coins.is_empty() {
        return Ok(Json(state.market.fetch_category(MarketCategory::Crypto).await.crypto));
    }

    debug!(?coins, "Looking up crypto prices");
    let mut data = MarketData::default();
    for quote in state.market.lookup(MarketCategory::Crypto, &coins).await {
        data.insert(quote);
    }
    Ok(Json(data.crypto))
}

/// GET /api/forex-rate?from=USD&to=INR
#[instrument(skip(state))]
pub async fn forex_rate(
    State(state): State<AppState>,
    query: Result<Query<ForexQuery>, QueryRejection>,
) -> Result<Json<ForexRate>, ApiError> {
    let Query(query) = query?;
    let from = query.from.as_deref().unwrap_or("USD").trim().to_uppercase();
    let to = query
        .to
        .as_deref()
        .unwrap_or(&state.currency.code)
        .trim()
        .to_uppercase();
    if from.is_empty() || to.is_empty() {
        return Err(ApiError::BadRequest("from and to must not be empty".to_string()));
    }

    let pair = format!("{from}_{to}");
    state
        .market
        .lookup(MarketCategory::Forex, std::slice::from_ref(&pair))
        .await
        .into_iter()
        .find_map(|quote| match quote {
            MarketQuote::Forex(rate) => Some(Json(rate)),
            _ => None,
        })
        .ok_or_else(|| {
            ApiError::NotFound(format!("Forex rate {pair} not found or API limit reached"))
        })
}

/// GET /api/financial-tips
pub async fn tips() -> Json<Value> {
    Json(json!({ "tips": financial_tips() }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
