use crate::core::{PricePoint, PriceProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Spot prices from the public CoinGecko API. No key required.
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("allowance/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct SimplePriceResponse {
    ethereum: CoinQuote,
    bitcoin: CoinQuote,
}

#[derive(Deserialize, Debug)]
struct CoinQuote {
    usd: f64,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_prices(&self) -> Result<PricePoint> {
        let url = Url::parse_with_params(
            &format!("{}/api/v3/simple/price", self.base_url),
            &[
                ("ids", "ethereum,bitcoin"),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ],
        )
        .with_context(|| format!("Invalid price API url: {}", self.base_url))?;
        debug!("Requesting prices from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Price request failed")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;
        if !status.is_success() {
            return Err(anyhow!("Price API returned {status}: {response_text}"));
        }

        let data: SimplePriceResponse = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse price response"
                );
                return Err(e).context("Failed to parse price response");
            }
        };

        let point = PricePoint {
            eth_usd: data.ethereum.usd,
            eth_change_24h: data.ethereum.usd_24h_change.unwrap_or_default(),
            btc_usd: data.bitcoin.usd,
            btc_change_24h: data.bitcoin.usd_24h_change.unwrap_or_default(),
            observed_at: Utc::now(),
        };
        debug!(?point, "Fetched prices");
        Ok(point)
    }
}
