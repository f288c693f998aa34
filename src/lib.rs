pub mod cli;
pub mod core;
pub mod providers;
pub mod server;

pub use crate::core::config;

use crate::cli::ui;
use crate::core::advice::{AdvisoryEngine, RiskProfile};
use crate::core::budget::BudgetEngine;
use crate::core::config::{AppConfig, CurrencyConfig, ServerConfig};
use crate::core::market::MarketDataAggregator;
use crate::core::quote::QuoteProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Engines shared by the CLI and the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub budget: Arc<BudgetEngine>,
    pub advisor: Arc<AdvisoryEngine>,
    pub market: Arc<MarketDataAggregator>,
    pub currency: CurrencyConfig,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let providers = providers::default_providers(config)?;
        Ok(Self::with_providers(config, providers))
    }

    pub fn with_providers(config: &AppConfig, providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        let market = Arc::new(MarketDataAggregator::new(providers, &config.market));
        AppState {
            budget: Arc::new(BudgetEngine::new(
                config.budget.clone(),
                config.currency.clone(),
            )),
            advisor: Arc::new(AdvisoryEngine::new(
                config.advice.clone(),
                config.currency.clone(),
                Arc::clone(&market),
            )),
            market,
            currency: config.currency.clone(),
        }
    }
}

pub enum AppCommand {
    Budget { income: f64 },
    Advise { amount: f64, risk_profile: String },
    Market,
    Serve { bind: Option<String> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Finance advisor starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let state = AppState::from_config(&config)?;
    let symbol = &config.currency.symbol;

    match command {
        AppCommand::Budget { income } => {
            let result = state.budget.allocate(income)?;
            println!("{}", result.display_as_table(symbol));
        }
        AppCommand::Advise {
            amount,
            risk_profile,
        } => {
            let risk_profile: RiskProfile = risk_profile.parse()?;
            let spinner = ui::new_spinner("Fetching market data");
            let advice = state.advisor.advise(amount, risk_profile).await;
            spinner.finish_and_clear();
            println!("{}", advice?.display_as_table(symbol));
        }
        AppCommand::Market => {
            let spinner = ui::new_spinner("Fetching market data");
            let data = state.market.fetch().await;
            spinner.finish_and_clear();
            println!("{}", data.display_as_tables());
        }
        AppCommand::Serve { bind } => {
            let addr = match bind {
                Some(bind) => ServerConfig { bind }.socket_addr()?,
                None => config.server.socket_addr()?,
            };
            println!("Serving the API on http://{addr}");
            server::serve(state, addr).await?;
        }
    }
    Ok(())
}
