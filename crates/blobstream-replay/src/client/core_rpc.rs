//! Client for the celestia-core `data_commitment` RPC endpoint, the
//! independent source of truth commitments are verified against.

use alloy_primitives::{hex, B256};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::CommitmentOracle;

pub struct CoreClient {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<DataCommitmentResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct DataCommitmentResult {
    data_commitment: String,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl CoreClient {
    /// Creates a client for a celestia-core node. Tendermint-style `tcp://`
    /// addresses are accepted and queried over HTTP.
    pub fn new(core_rpc: &str) -> Result<Self> {
        let normalized = match core_rpc.strip_prefix("tcp://") {
            Some(rest) => format!("http://{rest}"),
            None => core_rpc.to_string(),
        };
        let endpoint = Url::parse(&normalized)
            .with_context(|| format!("invalid core rpc address {core_rpc}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Tendermint serializes byte fields as hex strings in JSON, so the
    /// commitment arrives as 64 hex characters.
    fn parse_response(body: &str) -> Result<B256> {
        let response: RpcResponse =
            serde_json::from_str(body).context("malformed core rpc response")?;
        if let Some(err) = response.error {
            bail!(
                "core rpc error {}: {} {}",
                err.code,
                err.message,
                err.data.unwrap_or_default()
            );
        }
        let result = response
            .result
            .ok_or_else(|| anyhow!("core rpc response carries neither result nor error"))?;
        let raw = hex::decode(&result.data_commitment)
            .context("data commitment is not valid hex")?;
        if raw.len() != 32 {
            bail!("data commitment is {} bytes, expected 32", raw.len());
        }
        Ok(B256::from_slice(&raw))
    }
}

#[async_trait]
impl CommitmentOracle for CoreClient {
    async fn data_commitment(&self, start_block: u64, end_block: u64) -> Result<B256> {
        let mut url = self.endpoint.join("data_commitment")?;
        url.query_pairs_mut()
            .append_pair("start", &start_block.to_string())
            .append_pair("end", &end_block.to_string());

        let body = self
            .http
            .get(url)
            .send()
            .await
            .context("core rpc request failed")?
            .error_for_status()
            .context("core rpc returned an error status")?
            .text()
            .await
            .context("failed to read core rpc response")?;

        Self::parse_response(&body)
            .with_context(|| format!("data_commitment query for [{start_block}, {end_block}) failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_hex_encoded_commitment() {
        let commitment = B256::repeat_byte(0x5a);
        // Tendermint's HexBytes marshals as an uppercase hex string.
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":-1,"result":{{"data_commitment":"{}"}}}}"#,
            hex::encode_upper(commitment)
        );
        assert_eq!(CoreClient::parse_response(&body).unwrap(), commitment);
    }

    #[test]
    fn accepts_lowercase_hex() {
        let commitment = B256::repeat_byte(0x0f);
        let body = format!(
            r#"{{"result":{{"data_commitment":"{}"}}}}"#,
            hex::encode(commitment)
        );
        assert_eq!(CoreClient::parse_response(&body).unwrap(), commitment);
    }

    #[test]
    fn surfaces_rpc_errors() {
        let body = r#"{"jsonrpc":"2.0","id":-1,"error":{"code":-32603,"message":"Internal error","data":"height requested is too high"}}"#;
        let err = CoreClient::parse_response(body).unwrap_err();
        assert!(err.to_string().contains("Internal error"));
    }

    #[test]
    fn rejects_wrongly_sized_commitments() {
        let body = format!(
            r#"{{"result":{{"data_commitment":"{}"}}}}"#,
            hex::encode([0u8; 16])
        );
        let err = CoreClient::parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("expected 32"));
    }

    #[test]
    fn rejects_non_hex_commitments() {
        let body = r#"{"result":{"data_commitment":"not-hex-at-all"}}"#;
        assert!(CoreClient::parse_response(body).is_err());
    }

    #[test]
    fn normalizes_tendermint_addresses() {
        let client = CoreClient::new("tcp://localhost:26657").unwrap();
        assert_eq!(client.endpoint.scheme(), "http");
    }
}
