//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One observation of ETH and BTC prices in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub eth_usd: f64,
    pub eth_change_24h: f64,
    pub btc_usd: f64,
    pub btc_change_24h: f64,
    pub observed_at: DateTime<Utc>,
}

/// The latest prices as written to `latest_prices.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub eth_usd: f64,
    pub btc_usd: f64,
    pub updated: DateTime<Utc>,
}

impl From<&PricePoint> for PriceSnapshot {
    fn from(point: &PricePoint) -> Self {
        PriceSnapshot {
            eth_usd: point.eth_usd,
            btc_usd: point.btc_usd,
            updated: point.observed_at,
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_prices(&self) -> Result<PricePoint>;
}

/// Current ETH/USD price, or `fallback` when the provider fails.
pub async fn eth_price_or_fallback(
    provider: &(dyn PriceProvider + Send + Sync),
    fallback: f64,
) -> (f64, bool) {
    match provider.fetch_prices().await {
        Ok(point) => (point.eth_usd, true),
        Err(e) => {
            warn!(error = %e, fallback, "Could not fetch live ETH price");
            (fallback, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedProvider(Option<f64>);

    #[async_trait]
    impl PriceProvider for FixedProvider {
        async fn fetch_prices(&self) -> Result<PricePoint> {
            let eth_usd = self.0.ok_or_else(|| anyhow!("connection refused"))?;
            Ok(PricePoint {
                eth_usd,
                eth_change_24h: 1.0,
                btc_usd: 60000.0,
                btc_change_24h: -1.0,
                observed_at: Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn test_uses_live_price_when_available() {
        let (price, live) = eth_price_or_fallback(&FixedProvider(Some(3150.25)), 2000.0).await;
        assert_eq!(price, 3150.25);
        assert!(live);
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let (price, live) = eth_price_or_fallback(&FixedProvider(None), 2000.0).await;
        assert_eq!(price, 2000.0);
        assert!(!live);
    }

    #[test]
    fn test_snapshot_serializes_rfc3339_timestamp() {
        let point = PricePoint {
            eth_usd: 2000.0,
            eth_change_24h: 0.0,
            btc_usd: 60000.0,
            btc_change_24h: 0.0,
            observed_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(PriceSnapshot::from(&point)).unwrap();
        assert_eq!(json["eth_usd"], 2000.0);
        assert_eq!(json["btc_usd"], 60000.0);
        assert_eq!(json["updated"], "2024-05-01T12:00:00Z");
    }
}
