use crate::core::advice::AdviceConfig;
use crate::core::budget::BudgetConfig;
use crate::core::quote::PerCategory;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::{fs, path::PathBuf};
use tracing::{debug, info};

pub const ALPHA_VANTAGE_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CurrencyConfig {
    /// ISO 4217 code of the caller's base currency.
    pub code: String,
    pub symbol: String,
    /// Amounts are rounded to this many places (the smallest currency unit).
    pub decimal_places: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            code: "INR".to_string(),
            symbol: "₹".to_string(),
            decimal_places: 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoinGeckoConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AlphaVantageConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl AlphaVantageConfig {
    /// Configured key, then `ALPHA_VANTAGE_API_KEY`, then the public `demo` key.
    pub fn resolve_api_key(&self) -> String {
        self.api_key
            .clone()
            .or_else(|| std::env::var(ALPHA_VANTAGE_KEY_VAR).ok())
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| "demo".to_string())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub coingecko: CoinGeckoConfig,
    pub alpha_vantage: AlphaVantageConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: CoinGeckoConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
            },
            alpha_vantage: AlphaVantageConfig {
                base_url: "https://www.alphavantage.co".to_string(),
                api_key: None,
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MarketConfig {
    pub cache_ttl_ms: u64,
    pub timeouts_ms: PerCategory<u64>,
    /// Extra attempts per upstream call, made inside the category timeout.
    pub retries: usize,
    pub retry_delay_ms: u64,
    /// Coin ids, tickers and `FROM_TO` pairs fetched for advice.
    pub watchlist: PerCategory<Vec<String>>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        MarketConfig {
            cache_ttl_ms: 60_000,
            timeouts_ms: PerCategory {
                crypto: 5_000,
                stocks: 5_000,
                forex: 5_000,
            },
            retries: 1,
            retry_delay_ms: 250,
            watchlist: PerCategory {
                crypto: strings(&["bitcoin", "ethereum", "binancecoin", "cardano", "solana"]),
                stocks: strings(&["AAPL", "GOOGL"]),
                forex: strings(&["USD_INR"]),
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("Invalid server bind address: {}", self.bind))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub currency: CurrencyConfig,
    pub providers: ProvidersConfig,
    pub market: MarketConfig,
    pub budget: BudgetConfig,
    pub advice: AdviceConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            info!(
                "No config file at {}, using built-in defaults",
                config_path.display()
            );
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "finadvisor", "finadvisor")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency.decimal_places > 8 {
            bail!("currency.decimal_places must be at most 8");
        }
        for pair in &self.market.watchlist.forex {
            if pair.split_once('_').is_none() {
                bail!("Forex pair {pair} must look like FROM_TO, e.g. USD_INR");
            }
        }
        self.budget.validate().context("Invalid budget section")?;
        self.advice.validate().context("Invalid advice section")?;
        Ok(())
    }
}
