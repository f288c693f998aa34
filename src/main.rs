use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finadvisor::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for finadvisor::AppCommand {
    fn from(cmd: Commands) -> finadvisor::AppCommand {
        match cmd {
            Commands::Budget { income } => finadvisor::AppCommand::Budget { income },
            Commands::Advise {
                amount,
                risk_profile,
            } => finadvisor::AppCommand::Advise {
                amount,
                risk_profile,
            },
            Commands::Market => finadvisor::AppCommand::Market,
            Commands::Serve { bind } => finadvisor::AppCommand::Serve { bind },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Split a monthly income into needs, wants and savings
    Budget {
        /// Monthly income in the configured currency
        #[arg(allow_negative_numbers = true)]
        income: f64,
    },
    /// Suggest an investment allocation with live market insights
    Advise {
        /// Amount to invest in the configured currency
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        /// conservative, moderate or aggressive
        #[arg(short, long, default_value = "moderate")]
        risk_profile: String,
    },
    /// Display the current market snapshot
    Market,
    /// Run the HTTP API
    Serve {
        /// Address to listen on, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => finadvisor::cli::setup::setup(),
        Some(cmd) => finadvisor::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
