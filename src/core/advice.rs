//! Investment advisory engine: risk-profile templates applied to an amount,
//! enriched with market data and rule-driven insights.

use crate::core::allocation::{largest_share_index, split_by_percentages};
use crate::core::config::CurrencyConfig;
use crate::core::currency::{format_amount, to_decimal};
use crate::core::error::AdvisorError;
use crate::core::market::MarketDataAggregator;
use crate::core::quote::{CryptoQuote, ForexRate, MarketData, StockQuote};
use crate::core::template;
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Conservative,
        RiskProfile::Moderate,
        RiskProfile::Aggressive,
    ];
}

impl Display for RiskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RiskProfile::Conservative => "conservative",
                RiskProfile::Moderate => "moderate",
                RiskProfile::Aggressive => "aggressive",
            }
        )
    }
}

impl FromStr for RiskProfile {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            _ => Err(AdvisorError::UnknownRiskProfile(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    pub asset_class: String,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTemplates {
    pub conservative: Vec<AssetWeight>,
    pub moderate: Vec<AssetWeight>,
    pub aggressive: Vec<AssetWeight>,
}

impl RiskTemplates {
    pub fn get(&self, profile: RiskProfile) -> &[AssetWeight] {
        match profile {
            RiskProfile::Conservative => &self.conservative,
            RiskProfile::Moderate => &self.moderate,
            RiskProfile::Aggressive => &self.aggressive,
        }
    }
}

fn asset_weights(weights: &[(&str, i64)]) -> Vec<AssetWeight> {
    weights
        .iter()
        .map(|(asset_class, pct)| AssetWeight {
            asset_class: asset_class.to_string(),
            percentage: Decimal::from(*pct),
        })
        .collect()
}

impl Default for RiskTemplates {
    fn default() -> Self {
        Self {
            conservative: asset_weights(&[("debt", 60), ("equity", 20), ("gold", 15), ("crypto", 5)]),
            moderate: asset_weights(&[("equity", 50), ("debt", 30), ("gold", 10), ("crypto", 10)]),
            aggressive: asset_weights(&[("equity", 60), ("crypto", 25), ("debt", 10), ("gold", 5)]),
        }
    }
}

/// Market condition that triggers an insight. Per-instrument conditions fire
/// once for every matching instrument, in key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum InsightCondition {
    /// 24h change of `coin` above `percent`.
    CryptoChangeAbove { coin: String, percent: f64 },
    /// 24h change of `coin` below `percent` (use a negative threshold).
    CryptoChangeBelow { coin: String, percent: f64 },
    /// Any coin whose 24h change magnitude exceeds `percent`.
    CryptoSwing { percent: f64 },
    StockChangeAbove { percent: f64 },
    StockChangeBelow { percent: f64 },
    ForexRateAbove { pair: String, rate: f64 },
    ForexRateBelow { pair: String, rate: f64 },
}

impl InsightCondition {
    fn placeholders(&self) -> &'static [&'static str] {
        match self {
            InsightCondition::CryptoChangeAbove { .. }
            | InsightCondition::CryptoChangeBelow { .. }
            | InsightCondition::CryptoSwing { .. } => &["name", "coin", "change", "price"],
            InsightCondition::StockChangeAbove { .. }
            | InsightCondition::StockChangeBelow { .. } => &["symbol", "change", "price"],
            InsightCondition::ForexRateAbove { .. } | InsightCondition::ForexRateBelow { .. } => {
                &["pair", "rate", "from", "to"]
            }
        }
    }
}

const ASSET_PLACEHOLDERS: &[&str] = &["asset", "allocation", "amount"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRule {
    #[serde(flatten)]
    pub condition: InsightCondition,
    /// Only fire when the chosen template allocates to this asset class.
    #[serde(default)]
    pub requires_asset: Option<String>,
    pub message: String,
}

fn crypto_vars(quote: &CryptoQuote) -> Vec<(&'static str, String)> {
    vec![
        ("name", quote.name.clone()),
        ("coin", quote.id.clone()),
        ("change", format!("{:+.1}", quote.change_24h_percent)),
        ("price", format!("{:.2}", quote.price_local)),
    ]
}

fn stock_vars(quote: &StockQuote) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", quote.symbol.clone()),
        ("change", format!("{:+.1}", quote.change_percent)),
        ("price", format!("{:.2}", quote.price)),
    ]
}

fn forex_vars(rate: &ForexRate) -> Vec<(&'static str, String)> {
    vec![
        ("pair", rate.pair.clone()),
        ("rate", format!("{:.2}", rate.exchange_rate)),
        ("from", rate.from_currency.clone()),
        ("to", rate.to_currency.clone()),
    ]
}

impl InsightRule {
    pub fn evaluate(
        &self,
        market: &MarketData,
        allocations: &[AssetAllocation],
        currency: &CurrencyConfig,
    ) -> Vec<String> {
        let mut asset_vars = Vec::new();
        if let Some(asset) = &self.requires_asset {
            let Some(allocation) = allocations
                .iter()
                .find(|a| a.asset_class.eq_ignore_ascii_case(asset) && a.percentage > Decimal::ZERO)
            else {
                return Vec::new();
            };
            asset_vars.push(("asset", allocation.asset_class.clone()));
            asset_vars.push(("allocation", allocation.percentage.normalize().to_string()));
            asset_vars.push(("amount", format_amount(allocation.amount, &currency.symbol)));
        }

        let render = |mut vars: Vec<(&'static str, String)>| {
            vars.extend(asset_vars.iter().cloned());
            template::render(&self.message, &vars)
        };

        match &self.condition {
            InsightCondition::CryptoChangeAbove { coin, percent } => market
                .crypto
                .get(coin)
                .filter(|q| q.change_24h_percent > *percent)
                .map(|q| render(crypto_vars(q)))
                .into_iter()
                .collect(),
            InsightCondition::CryptoChangeBelow { coin, percent } => market
                .crypto
                .get(coin)
                .filter(|q| q.change_24h_percent < *percent)
                .map(|q| render(crypto_vars(q)))
                .into_iter()
                .collect(),
            InsightCondition::CryptoSwing { percent } => market
                .crypto
                .values()
                .filter(|q| q.change_24h_percent.abs() > *percent)
                .map(|q| render(crypto_vars(q)))
                .collect(),
            InsightCondition::StockChangeAbove { percent } => market
                .stocks
                .values()
                .filter(|q| q.change_percent > *percent)
                .map(|q| render(stock_vars(q)))
                .collect(),
            InsightCondition::StockChangeBelow { percent } => market
                .stocks
                .values()
                .filter(|q| q.change_percent < *percent)
                .map(|q| render(stock_vars(q)))
                .collect(),
            InsightCondition::ForexRateAbove { pair, rate } => market
                .forex
                .get(pair)
                .filter(|q| q.exchange_rate > *rate)
                .map(|q| render(forex_vars(q)))
                .into_iter()
                .collect(),
            InsightCondition::ForexRateBelow { pair, rate } => market
                .forex
                .get(pair)
                .filter(|q| q.exchange_rate < *rate)
                .map(|q| render(forex_vars(q)))
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    pub templates: RiskTemplates,
    pub insights: Vec<InsightRule>,
    /// Emitted when market data is present but no rule fired.
    pub fallback_insight: String,
    /// Emitted when no market data could be fetched at all.
    pub unavailable_insight: String,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            templates: RiskTemplates::default(),
            insights: default_insights(),
            fallback_insight:
                "Markets are relatively stable today. Stick to your long-term investment strategy."
                    .to_string(),
            unavailable_insight:
                "Live market data is unavailable right now. Stick to your long-term investment strategy."
                    .to_string(),
        }
    }
}

fn default_insights() -> Vec<InsightRule> {
    let rule = |condition, requires_asset: Option<&str>, message: &str| InsightRule {
        condition,
        requires_asset: requires_asset.map(str::to_string),
        message: message.to_string(),
    };
    vec![
        rule(
            InsightCondition::CryptoChangeAbove {
                coin: "bitcoin".to_string(),
                percent: 5.0,
            },
            None,
            "{name} is up significantly today ({change}%). Consider taking profits if you're overexposed to crypto.",
        ),
        rule(
            InsightCondition::CryptoChangeBelow {
                coin: "bitcoin".to_string(),
                percent: -5.0,
            },
            None,
            "{name} is down significantly today ({change}%). This might be a good buying opportunity for long-term investors.",
        ),
        rule(
            InsightCondition::CryptoSwing { percent: 10.0 },
            Some("crypto"),
            "{name} moved {change}% in 24 hours; expect volatility in your {allocation}% crypto allocation ({amount}).",
        ),
        rule(
            InsightCondition::StockChangeAbove { percent: 3.0 },
            None,
            "{symbol} is performing well today ({change}%). Monitor for potential profit-taking opportunities.",
        ),
        rule(
            InsightCondition::ForexRateAbove {
                pair: "USD_INR".to_string(),
                rate: 85.0,
            },
            None,
            "{from}/{to} is at {rate}. Consider international diversification as rupee is weakening.",
        ),
    ]
}

impl AdviceConfig {
    pub fn validate(&self) -> Result<()> {
        for profile in RiskProfile::ALL {
            let weights = self.templates.get(profile);
            if weights.is_empty() {
                bail!("Allocation template for {profile} is empty");
            }
            let mut seen = HashSet::new();
            let mut total = Decimal::ZERO;
            for weight in weights {
                if weight.percentage < Decimal::ZERO || weight.percentage > Decimal::ONE_HUNDRED {
                    bail!(
                        "Percentage for {} in {profile} template must be within 0..=100",
                        weight.asset_class
                    );
                }
                if !seen.insert(weight.asset_class.to_lowercase()) {
                    bail!(
                        "Asset class {} appears twice in {profile} template",
                        weight.asset_class
                    );
                }
                total += weight.percentage;
            }
            if total != Decimal::ONE_HUNDRED {
                bail!("Allocation template for {profile} must sum to 100, got {total}");
            }
        }

        for rule in &self.insights {
            let mut allowed = rule.condition.placeholders().to_vec();
            if rule.requires_asset.is_some() {
                allowed.extend_from_slice(ASSET_PLACEHOLDERS);
            }
            template::validate(&rule.message, &allowed)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetAllocation {
    pub asset_class: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentAdviceResult {
    pub risk_profile: RiskProfile,
    #[serde(with = "rust_decimal::serde::float")]
    pub investment_amount: Decimal,
    pub allocations: Vec<AssetAllocation>,
    pub market_insights: Vec<String>,
    pub market_data: MarketData,
}

pub struct AdvisoryEngine {
    config: AdviceConfig,
    currency: CurrencyConfig,
    market: Arc<MarketDataAggregator>,
}

impl AdvisoryEngine {
    pub fn new(
        config: AdviceConfig,
        currency: CurrencyConfig,
        market: Arc<MarketDataAggregator>,
    ) -> Self {
        Self {
            config,
            currency,
            market,
        }
    }

    pub async fn advise(
        &self,
        amount: f64,
        risk_profile: RiskProfile,
    ) -> Result<InvestmentAdviceResult, AdvisorError> {
        let amount = to_decimal(amount, "investment_amount")?;
        if amount < Decimal::ZERO {
            return Err(AdvisorError::InvalidInput(
                "investment_amount must not be negative".to_string(),
            ));
        }

        let allocations = self.allocate(amount, risk_profile);
        let market_data = self.market.fetch().await;
        let market_insights = self.insights(&allocations, &market_data);
        info!(
            %risk_profile,
            %amount,
            crypto = market_data.crypto.len(),
            stocks = market_data.stocks.len(),
            forex = market_data.forex.len(),
            "Composed investment advice"
        );

        Ok(InvestmentAdviceResult {
            risk_profile,
            investment_amount: amount,
            allocations,
            market_insights,
            market_data,
        })
    }

    /// Applies the profile's template; the largest class absorbs rounding.
    pub fn allocate(&self, amount: Decimal, risk_profile: RiskProfile) -> Vec<AssetAllocation> {
        let weights = self.config.templates.get(risk_profile);
        let percentages: Vec<Decimal> = weights.iter().map(|w| w.percentage).collect();
        let amounts = split_by_percentages(
            amount,
            &percentages,
            largest_share_index(&percentages),
            self.currency.decimal_places,
        );
        debug!(%risk_profile, %amount, ?amounts, "Applied allocation template");

        weights
            .iter()
            .zip(amounts)
            .map(|(weight, amount)| AssetAllocation {
                asset_class: weight.asset_class.clone(),
                percentage: weight.percentage,
                amount,
            })
            .collect()
    }

    pub fn insights(&self, allocations: &[AssetAllocation], market: &MarketData) -> Vec<String> {
        if market.is_empty() {
            return vec![self.config.unavailable_insight.clone()];
        }
        let insights: Vec<String> = self
            .config
            .insights
            .iter()
            .flat_map(|rule| rule.evaluate(market, allocations, &self.currency))
            .collect();
        if insights.is_empty() {
            vec![self.config.fallback_insight.clone()]
        } else {
            insights
        }
    }
}
