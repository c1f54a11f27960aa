use crate::core::config::Network;
use crate::core::transaction::{Address, RawTransaction};
use crate::core::TransactionSource;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Transaction history from the Etherscan multichain (v2) API.
pub struct EtherscanProvider {
    base_url: String,
    api_key: String,
    network: Network,
    client: reqwest::Client,
}

impl EtherscanProvider {
    pub fn new(base_url: &str, api_key: &str, network: Network, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("allowance/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EtherscanProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            network,
            client,
        })
    }

    async fn fetch_list(&self, action: &str, address: &Address) -> Result<Vec<RawTransaction>> {
        let url = Url::parse_with_params(
            &format!("{}/v2/api", self.base_url),
            &[
                ("chainid", self.network.chain_id()),
                ("module", "account"),
                ("action", action),
                ("address", address.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "asc"),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .with_context(|| format!("Invalid explorer url: {}", self.base_url))?;
        debug!(action, address = %address, "Requesting explorer data");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Explorer request failed for {action}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Explorer returned {status} for {action}"));
        }

        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;

        Ok(parse_envelope(action, &response_text))
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

/// Extracts rows from an explorer response. Anything other than a `status: "1"`
/// envelope carrying a list is treated as "no transactions".
fn parse_envelope(action: &str, body: &str) -> Vec<RawTransaction> {
    let envelope: ExplorerEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(action, error = %e, response = %body, "Malformed explorer response");
            return Vec::new();
        }
    };

    if envelope.status != "1" {
        warn!(
            action,
            message = %envelope.message,
            result = %envelope.result,
            "No transactions found or API error"
        );
        return Vec::new();
    }

    let Value::Array(rows) = &envelope.result else {
        warn!(action, result = %envelope.result, "Explorer result is not a transaction list");
        return Vec::new();
    };

    let total = rows.len();
    let parsed: Vec<RawTransaction> = rows.iter().filter_map(RawTransaction::from_json).collect();
    if parsed.len() < total {
        warn!(action, skipped = total - parsed.len(), "Skipped malformed explorer rows");
    }
    debug!(action, count = parsed.len(), "Found transactions");
    parsed
}

#[async_trait]
impl TransactionSource for EtherscanProvider {
    #[instrument(skip(self), fields(network = %self.network))]
    async fn fetch_transactions(&self, address: &Address) -> Result<Vec<RawTransaction>> {
        self.fetch_list("txlist", address).await
    }

    #[instrument(skip(self), fields(network = %self.network))]
    async fn fetch_internal_transactions(&self, address: &Address) -> Result<Vec<RawTransaction>> {
        self.fetch_list("txlistinternal", address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTRACT: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

    const TXLIST_JSON: &str = r#"{
        "status": "1",
        "message": "OK",
        "result": [
            {
                "blockNumber": "5123456",
                "timeStamp": "1712000000",
                "hash": "0xaaa",
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0xabcdef0123456789abcdef0123456789abcdef01",
                "value": "100000000000000000",
                "gas": "60000",
                "gasUsed": "45000",
                "isError": "0",
                "txreceipt_status": "1"
            },
            {
                "blockNumber": "5123000",
                "timeStamp": "1711990000",
                "hash": "0xbbb",
                "from": "0x1111111111111111111111111111111111111111",
                "to": "",
                "value": "0",
                "gasUsed": "900000",
                "isError": "0"
            }
        ]
    }"#;

    async fn create_mock_server(action: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/api"))
            .and(query_param("chainid", "11155111"))
            .and(query_param("module", "account"))
            .and(query_param("action", action))
            .and(query_param("address", CONTRACT))
            .and(query_param("apikey", "TESTKEY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(uri: &str) -> EtherscanProvider {
        EtherscanProvider::new(uri, "TESTKEY", Network::Sepolia, Duration::from_secs(5)).unwrap()
    }

    fn contract() -> Address {
        CONTRACT.parse().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_transactions() {
        let mock_server = create_mock_server("txlist", TXLIST_JSON).await;
        let rows = provider(&mock_server.uri())
            .fetch_transactions(&contract())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hash, "0xaaa");
        assert_eq!(rows[0].block_number, "5123456");
        assert_eq!(rows[0].gas_used, "45000");
        assert_eq!(rows[0].to.as_deref(), Some(CONTRACT));
        assert_eq!(rows[1].to.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_fetch_internal_transactions() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "blockNumber": "5123999",
                "timeStamp": "1712100000",
                "hash": "0xccc",
                "from": "0xabcdef0123456789abcdef0123456789abcdef01",
                "to": "0x2222222222222222222222222222222222222222",
                "value": "20000000000000000",
                "type": "call",
                "gasUsed": "0",
                "isError": "0",
                "errCode": ""
            }]
        }"#;
        let mock_server = create_mock_server("txlistinternal", body).await;
        let rows = provider(&mock_server.uri())
            .fetch_internal_transactions(&contract())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "20000000000000000");
    }

    #[tokio::test]
    async fn test_status_zero_yields_empty_list() {
        let body = r#"{"status": "0", "message": "No transactions found", "result": []}"#;
        let mock_server = create_mock_server("txlist", body).await;
        let rows = provider(&mock_server.uri())
            .fetch_transactions(&contract())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_message_yields_empty_list() {
        let body = r#"{"status": "0", "message": "NOTOK", "result": "Invalid API Key"}"#;
        let mock_server = create_mock_server("txlist", body).await;
        let rows = provider(&mock_server.uri())
            .fetch_transactions(&contract())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;
        let result = provider(&mock_server.uri()).fetch_transactions(&contract()).await;
        assert!(result.unwrap_err().to_string().contains("502"));
    }

    #[test]
    fn test_malformed_bodies_yield_empty_list() {
        assert!(parse_envelope("txlist", "<html>").is_empty());
        assert!(parse_envelope("txlist", r#"{"status": "1", "result": "oops"}"#).is_empty());
    }

    #[test]
    fn test_bad_row_does_not_drop_the_list() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [
                {"hash": "0x01", "from": null, "to": "0xabcdef0123456789abcdef0123456789abcdef01",
                 "value": 1000, "timeStamp": 1712000000, "isError": "0"},
                "garbage",
                {"hash": "0x02", "from": "0x1111111111111111111111111111111111111111",
                 "to": null, "value": "0", "gasUsed": "21000", "isError": "0"}
            ]
        }"#;
        let rows = parse_envelope("txlist", body);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hash, "0x01");
        assert_eq!(rows[0].from, "");
        assert_eq!(rows[0].value, "1000");
        assert_eq!(rows[0].time_stamp, "1712000000");
        assert_eq!(rows[1].hash, "0x02");
        assert!(rows[1].to.is_none());
    }
}
