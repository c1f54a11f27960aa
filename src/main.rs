use allowance::core::log::init_logging;
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show live ETH/BTC prices and simulate a donation split
    Prices {
        /// Keep polling and show the price history at the end
        #[arg(long)]
        live: bool,
    },
    /// Audit the contract's transaction history and export a CSV
    Audit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => allowance::cli::setup::setup(),
        Some(Commands::Prices { live }) => {
            allowance::run_command(
                allowance::AppCommand::Prices { live },
                cli.config_path.as_deref(),
            )
            .await
        }
        Some(Commands::Audit) => {
            allowance::run_command(allowance::AppCommand::Audit, cli.config_path.as_deref()).await
        }
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
