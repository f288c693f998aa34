//! Core business logic: the budget and advisory engines and the market data
//! layer they read from

pub mod advice;
pub mod allocation;
pub mod budget;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod market;
pub mod quote;
pub mod template;
pub mod tips;

// Re-export main types for cleaner imports
pub use advice::{AdvisoryEngine, InvestmentAdviceResult, RiskProfile};
pub use budget::{BudgetEngine, BudgetResult};
pub use error::{AdvisorError, ProviderError};
pub use market::MarketDataAggregator;
pub use quote::{MarketCategory, MarketData, MarketQuote, QuoteProvider};
