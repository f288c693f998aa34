//! Error taxonomy for the engines and the market data layer

use crate::core::quote::MarketCategory;
use thiserror::Error;

/// Errors surfaced to callers of the budget and advisory engines.
///
/// Both variants are raised before any computation happens and map to a
/// client error at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown risk profile: {0}")]
    UnknownRiskProfile(String),
}

/// Failures of a market data category. These never reach the caller; the
/// category degrades to an empty mapping and the error is logged.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("{category} quotes timed out after {timeout_ms}ms")]
    Timeout {
        category: MarketCategory,
        timeout_ms: u64,
    },

    #[error("{category} refresh task aborted: {reason}")]
    Aborted {
        category: MarketCategory,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AdvisorError::UnknownRiskProfile("yolo".to_string()).to_string(),
            "Unknown risk profile: yolo"
        );
        assert_eq!(
            ProviderError::Timeout {
                category: MarketCategory::Stocks,
                timeout_ms: 250
            }
            .to_string(),
            "stocks quotes timed out after 250ms"
        );
    }
}
