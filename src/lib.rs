pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Price check with donation simulation; `live` keeps polling.
    Prices { live: bool },
    /// Contract transaction audit.
    Audit,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => {
            let default_path = AppConfig::default_config_path()?;
            if default_path.exists() {
                AppConfig::load()
            } else {
                debug!(
                    "No config at {}, using built-in defaults",
                    default_path.display()
                );
                let config = AppConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!(?command, "Allowance starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let coingecko = config.providers.coingecko();
    let price_provider =
        providers::CoinGeckoProvider::new(&coingecko.base_url, coingecko.timeout())?;

    match command {
        AppCommand::Prices { live: false } => cli::prices::run_single(&config, &price_provider).await,
        AppCommand::Prices { live: true } => cli::prices::run_live(&config, &price_provider).await,
        AppCommand::Audit => {
            let etherscan = config.providers.etherscan();
            let explorer = providers::EtherscanProvider::new(
                &etherscan.base_url,
                &config.auditor.api_key,
                config.auditor.network,
                etherscan.timeout(),
            )?;
            cli::audit::run(&config, &price_provider, &explorer)
                .await
                .map(|_| ())
        }
    }
}
