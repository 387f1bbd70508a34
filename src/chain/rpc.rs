//! Chain client
//!
//! `ChainClient` is the seam the broadcast sequencer and the mint builder
//! talk to. `RpcChainClient` implements it over Solana's JSON-RPC 2.0 API.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::chain::codec::CodecError;
use crate::chain::message::Hash;
use crate::chain::transaction::{Signature, VersionedTransaction};
use crate::config::ChainClientConfig;

/// Chain client errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),
}

/// How settled a slot must be before a read reflects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl Default for CommitmentLevel {
    fn default() -> Self {
        CommitmentLevel::Confirmed
    }
}

impl CommitmentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentLevel::Processed => "processed",
            CommitmentLevel::Confirmed => "confirmed",
            CommitmentLevel::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for CommitmentLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(CommitmentLevel::Processed),
            "confirmed" => Ok(CommitmentLevel::Confirmed),
            "finalized" => Ok(CommitmentLevel::Finalized),
            other => Err(format!("unknown commitment level: {}", other)),
        }
    }
}

/// A recent blockhash and the last block height at which it is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockhashInfo {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Outcome of a dry run
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Chain-reported error, `None` on success
    pub err: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub logs: Vec<String>,
    #[serde(default)]
    pub units_consumed: Option<u64>,
}

/// Status of a submitted signature
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<CommitmentLevel>,
}

impl SignatureStatus {
    /// Whether the status has reached at least `commitment`
    pub fn satisfies(&self, commitment: CommitmentLevel) -> bool {
        match self.confirmation_status {
            Some(level) => level >= commitment,
            // older nodes only report confirmations; None means rooted
            None => self.confirmations.is_none(),
        }
    }
}

/// Options for `sendTransaction`
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: CommitmentLevel,
    /// Retries performed by the RPC node itself
    pub max_retries: Option<usize>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: CommitmentLevel::Processed,
            max_retries: Some(5),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Operations the co-signing flow needs from the chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn latest_blockhash(&self) -> Result<BlockhashInfo, RpcError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: u64) -> Result<u64, RpcError>;

    async fn simulate_transaction(
        &self,
        tx: &VersionedTransaction,
    ) -> Result<SimulationResult, RpcError>;

    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<Signature, RpcError>;

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError>;

    async fn block_height(&self) -> Result<u64, RpcError>;
}

// =============================================================================
// JSON-RPC transport
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Results wrapped with the slot they were read at
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

/// JSON-RPC implementation of [`ChainClient`]
pub struct RpcChainClient {
    config: ChainClientConfig,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(config: ChainClientConfig) -> Result<Self, RpcError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ChainClientConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        log::debug!("RPC {} -> {}", method, self.config.rpc_url);

        let response: RpcResponse<T> = self
            .http_client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        response
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{} returned no result", method)))
    }

    fn encode(tx: &VersionedTransaction) -> Result<String, RpcError> {
        Ok(STANDARD.encode(tx.serialize()?))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn latest_blockhash(&self) -> Result<BlockhashInfo, RpcError> {
        let response: WithContext<LatestBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment.as_str() }]),
            )
            .await?;
        Ok(BlockhashInfo {
            blockhash: response.value.blockhash.parse()?,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: u64) -> Result<u64, RpcError> {
        self.call(
            "getMinimumBalanceForRentExemption",
            json!([data_len, { "commitment": self.config.commitment.as_str() }]),
        )
        .await
    }

    async fn simulate_transaction(
        &self,
        tx: &VersionedTransaction,
    ) -> Result<SimulationResult, RpcError> {
        let response: WithContext<SimulationResult> = self
            .call(
                "simulateTransaction",
                json!([
                    Self::encode(tx)?,
                    {
                        "encoding": "base64",
                        "sigVerify": true,
                        "commitment": CommitmentLevel::Processed.as_str(),
                    }
                ]),
            )
            .await?;
        Ok(response.value)
    }

    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<Signature, RpcError> {
        let mut config = json!({
            "encoding": "base64",
            "skipPreflight": options.skip_preflight,
            "preflightCommitment": options.preflight_commitment.as_str(),
        });
        if let Some(retries) = options.max_retries {
            config["maxRetries"] = json!(retries);
        }

        let signature: String = self
            .call("sendTransaction", json!([Self::encode(tx)?, config]))
            .await?;
        Ok(signature.parse()?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        self.call(
            "getBlockHeight",
            json!([{ "commitment": self.config.commitment.as_str() }]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_ordering() {
        assert!(CommitmentLevel::Finalized > CommitmentLevel::Confirmed);
        assert!(CommitmentLevel::Confirmed > CommitmentLevel::Processed);
        assert_eq!("finalized".parse::<CommitmentLevel>(), Ok(CommitmentLevel::Finalized));
        assert!("rooted".parse::<CommitmentLevel>().is_err());
    }

    #[test]
    fn test_parse_simulation_result() {
        let json = r#"{
            "context": {"slot": 218},
            "value": {
                "err": {"InstructionError": [0, {"Custom": 1}]},
                "logs": ["Program 11111111111111111111111111111111 invoke [1]", "insufficient lamports"],
                "accounts": null,
                "unitsConsumed": 150
            }
        }"#;
        let parsed: WithContext<SimulationResult> = serde_json::from_str(json).unwrap();
        assert!(parsed.value.err.is_some());
        assert_eq!(parsed.value.logs.len(), 2);
        assert_eq!(parsed.value.units_consumed, Some(150));

        let ok = r#"{"context": {"slot": 1}, "value": {"err": null, "logs": null}}"#;
        let parsed: WithContext<SimulationResult> = serde_json::from_str(ok).unwrap();
        assert!(parsed.value.err.is_none());
        assert!(parsed.value.logs.is_empty());
    }

    #[test]
    fn test_parse_signature_statuses() {
        let json = r#"{
            "jsonrpc": "2.0",
            "result": {
                "context": {"slot": 82},
                "value": [{"slot": 72, "confirmations": 10, "err": null, "confirmationStatus": "confirmed"}]
            },
            "id": 1
        }"#;
        let parsed: RpcResponse<WithContext<Vec<Option<SignatureStatus>>>> =
            serde_json::from_str(json).unwrap();
        let status = parsed.result.unwrap().value[0].clone().unwrap();
        assert!(status.satisfies(CommitmentLevel::Confirmed));
        assert!(!status.satisfies(CommitmentLevel::Finalized));
    }

    #[test]
    fn test_parse_rpc_error() {
        let json = r#"{
            "jsonrpc": "2.0",
            "error": {"code": -32002, "message": "Transaction simulation failed", "data": {"logs": []}},
            "id": 3
        }"#;
        let parsed: RpcResponse<String> = serde_json::from_str(json).unwrap();
        assert!(parsed.result.is_none());
        let error = parsed.error.unwrap();
        assert_eq!(error.code, -32002);
        assert!(error.data.is_some());
    }

    #[test]
    fn test_parse_latest_blockhash() {
        let json = r#"{
            "context": {"slot": 2792},
            "value": {"blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N", "lastValidBlockHeight": 3090}
        }"#;
        let parsed: WithContext<LatestBlockhash> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.value.last_valid_block_height, 3090);
        assert!(parsed.value.blockhash.parse::<Hash>().is_ok());
    }

    #[test]
    fn test_rooted_status_without_level() {
        let status = SignatureStatus {
            slot: 1,
            confirmations: None,
            err: None,
            confirmation_status: None,
        };
        assert!(status.satisfies(CommitmentLevel::Finalized));
    }

    fn client_for(url: &str) -> RpcChainClient {
        RpcChainClient::new(ChainClientConfig::default().with_rpc_url(url).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_error_object_becomes_rpc_error() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"Transaction simulation failed: Blockhash not found","data":{"logs":[]}}}"#;
        let url = crate::testing::serve_once("200 OK", body).await;

        match client_for(&url).block_height().await {
            Err(RpcError::Rpc { code, message, data }) => {
                assert_eq!(code, -32002);
                assert_eq!(message, "Transaction simulation failed: Blockhash not found");
                assert!(data.is_some());
            }
            other => panic!("expected Rpc, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_result_is_returned() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":1234}"#;
        let url = crate::testing::serve_once("200 OK", body).await;
        assert_eq!(client_for(&url).block_height().await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn test_missing_result_is_invalid_response() {
        let url = crate::testing::serve_once("200 OK", r#"{"jsonrpc":"2.0","id":1}"#).await;
        assert!(matches!(
            client_for(&url).block_height().await,
            Err(RpcError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_http_failure_is_http_error() {
        let url = crate::testing::serve_once("503 Service Unavailable", "{}").await;
        assert!(matches!(
            client_for(&url).block_height().await,
            Err(RpcError::HttpError(_))
        ));
    }
}
