use crate::core::transaction::Address;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Sepolia,
    Mainnet,
}

impl Network {
    /// Chain identifier expected by the multichain explorer API.
    pub fn chain_id(&self) -> &'static str {
        match self {
            Network::Sepolia => "11155111",
            Network::Mainnet => "1",
        }
    }

    /// Base URL for linking a transaction hash on the explorer website.
    pub fn explorer_tx_url(&self) -> &'static str {
        match self {
            Network::Sepolia => "https://sepolia.etherscan.io/tx/",
            Network::Mainnet => "https://etherscan.io/tx/",
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Network::Sepolia => "Sepolia",
            Network::Mainnet => "Mainnet",
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PollerConfig {
    pub donation_eth: Decimal,
    pub beneficiaries: u32,
    pub poll_interval_secs: u64,
    pub iterations: u32,
    pub max_history_points: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            donation_eth: Decimal::new(1, 1),
            beneficiaries: 5,
            poll_interval_secs: 15,
            iterations: 20,
            max_history_points: 50,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuditorConfig {
    pub contract_address: String,
    pub api_key: String,
    pub network: Network,
    pub fallback_eth_price: f64,
    pub recent_rows: usize,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        AuditorConfig {
            contract_address: String::new(),
            api_key: String::new(),
            network: Network::Sepolia,
            fallback_eth_price: 2000.0,
            recent_rows: 12,
        }
    }
}

impl AuditorConfig {
    pub fn contract(&self) -> Result<Address> {
        if self.contract_address.trim().is_empty() {
            bail!("auditor.contract_address is not set");
        }
        self.contract_address
            .parse()
            .with_context(|| format!("Invalid contract address: {}", self.contract_address))
    }
}

const DEFAULT_COINGECKO_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ETHERSCAN_TIMEOUT_SECS: u64 = 12;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Falls back to the provider's own default when omitted.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_COINGECKO_TIMEOUT_SECS))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<ProviderConfig>,
    pub etherscan: Option<ProviderConfig>,
}

fn default_coingecko() -> ProviderConfig {
    ProviderConfig {
        base_url: "https://api.coingecko.com".to_string(),
        timeout_secs: Some(DEFAULT_COINGECKO_TIMEOUT_SECS),
    }
}

fn default_etherscan() -> ProviderConfig {
    ProviderConfig {
        base_url: "https://api.etherscan.io".to_string(),
        timeout_secs: Some(DEFAULT_ETHERSCAN_TIMEOUT_SECS),
    }
}

fn resolve(configured: Option<&ProviderConfig>, default: fn() -> ProviderConfig) -> ProviderConfig {
    let fallback = default();
    match configured {
        Some(provider) => ProviderConfig {
            base_url: provider.base_url.clone(),
            timeout_secs: provider.timeout_secs.or(fallback.timeout_secs),
        },
        None => fallback,
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(default_coingecko()),
            etherscan: Some(default_etherscan()),
        }
    }
}

impl ProvidersConfig {
    pub fn coingecko(&self) -> ProviderConfig {
        resolve(self.coingecko.as_ref(), default_coingecko)
    }

    pub fn etherscan(&self) -> ProviderConfig {
        resolve(self.etherscan.as_ref(), default_etherscan)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub auditor: AuditorConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub output_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "allowance-center", "allowance")
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

    /// Checks the settings every command relies on. The contract address is
    /// only checked by the audit command.
    pub fn validate(&self) -> Result<()> {
        let poller = &self.poller;
        if poller.beneficiaries == 0 {
            bail!("poller.beneficiaries must be at least 1");
        }
        if poller.donation_eth <= Decimal::ZERO {
            bail!("poller.donation_eth must be positive");
        }
        if poller.max_history_points == 0 {
            bail!("poller.max_history_points must be at least 1");
        }
        if poller.iterations == 0 {
            bail!("poller.iterations must be at least 1");
        }
        let fallback = self.auditor.fallback_eth_price;
        if fallback.is_nan() || fallback <= 0.0 {
            bail!("auditor.fallback_eth_price must be positive");
        }
        Ok(())
    }

    /// Where generated files go; the working directory unless configured.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir
            .as_deref()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
poller:
  donation_eth: "0.25"
  beneficiaries: 4
  poll_interval_secs: 30
  iterations: 3
  max_history_points: 10
auditor:
  contract_address: "0xAbCdEf0123456789aBcDeF0123456789abcdef01"
  api_key: "KEY"
  network: mainnet
providers:
  coingecko:
    base_url: "http://example.com/cg"
  etherscan:
    base_url: "http://example.com/scan"
    timeout_secs: 3
output_dir: "/tmp/out"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.poller.donation_eth, Decimal::from_str("0.25").unwrap());
        assert_eq!(config.poller.beneficiaries, 4);
        assert_eq!(config.poller.poll_interval_secs, 30);
        assert_eq!(config.poller.iterations, 3);
        assert_eq!(config.poller.max_history_points, 10);
        assert_eq!(config.auditor.network, Network::Mainnet);
        assert_eq!(config.auditor.api_key, "KEY");
        assert_eq!(config.auditor.fallback_eth_price, 2000.0);
        assert_eq!(config.auditor.recent_rows, 12);
        assert_eq!(
            config.auditor.contract().unwrap().as_str(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );

        let coingecko = config.providers.coingecko();
        assert_eq!(coingecko.base_url, "http://example.com/cg");
        assert_eq!(coingecko.timeout(), Duration::from_secs(5));
        assert_eq!(config.providers.etherscan().timeout(), Duration::from_secs(3));
        assert_eq!(config.output_path("a.csv"), PathBuf::from("/tmp/out/a.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.poller.donation_eth, Decimal::from_str("0.1").unwrap());
        assert_eq!(config.poller.beneficiaries, 5);
        assert_eq!(config.poller.poll_interval_secs, 15);
        assert_eq!(config.poller.max_history_points, 50);
        assert_eq!(config.auditor.network, Network::Sepolia);
        assert_eq!(
            config.providers.coingecko().base_url,
            "https://api.coingecko.com"
        );
        assert_eq!(config.providers.etherscan().timeout_secs, Some(12));
        assert_eq!(config.output_path("x.json"), PathBuf::from("./x.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_providers_fall_back_to_defaults() {
        let yaml = r#"
providers:
  coingecko:
    base_url: "http://localhost:9000"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.providers.coingecko().base_url, "http://localhost:9000");
        assert_eq!(
            config.providers.etherscan().base_url,
            "https://api.etherscan.io"
        );
    }

    #[test]
    fn test_omitted_timeouts_use_provider_defaults() {
        let yaml = r#"
providers:
  coingecko:
    base_url: "http://localhost:9000"
  etherscan:
    base_url: "http://localhost:9001"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.providers.coingecko().timeout(), Duration::from_secs(5));
        assert_eq!(config.providers.etherscan().timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_validation_rejects_bad_poller_settings() {
        let mut config = AppConfig::default();
        config.poller.beneficiaries = 0;
        assert!(config.validate().unwrap_err().to_string().contains("beneficiaries"));

        let mut config = AppConfig::default();
        config.poller.donation_eth = Decimal::ZERO;
        assert!(config.validate().unwrap_err().to_string().contains("donation_eth"));

        let mut config = AppConfig::default();
        config.poller.max_history_points = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_contract_address_is_reported() {
        let config = AppConfig::default();
        assert!(config.auditor.contract().unwrap_err().to_string().contains("not set"));

        let mut config = AppConfig::default();
        config.auditor.contract_address = "0x1234".to_string();
        assert!(config.auditor.contract().is_err());
    }

    #[test]
    fn test_network_selects_chain_and_links() {
        assert_eq!(Network::Sepolia.chain_id(), "11155111");
        assert_eq!(Network::Mainnet.chain_id(), "1");
        assert_eq!(Network::Mainnet.explorer_tx_url(), "https://etherscan.io/tx/");
        assert_eq!(Network::Sepolia.to_string(), "Sepolia");
    }
}
