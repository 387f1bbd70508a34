//! HTTP client for the smart-wallet service
//!
//! Every request carries the `X-API-KEY` header. Non-success responses are
//! surfaced with the status, reason phrase and body exactly as received.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::chain::Pubkey;
use crate::config::GatewayConfig;
use crate::gateway::types::{
    CreateWalletRequest, SubmitTransactionParams, SubmitTransactionRequest, TransactionResponse,
    WalletResponse,
};

/// Wallet service errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Wallet service returned {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Transaction response has no on-chain payload")]
    MissingOnChain,
}

/// Client for the wallets API
pub struct GatewayClient {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Create a Solana smart wallet administered by `admin_signer`
    pub async fn create_wallet(&self, admin_signer: &Pubkey) -> Result<WalletResponse, GatewayError> {
        let url = format!("{}/wallets", self.config.api_root());
        let wallet: WalletResponse = self
            .post(&url, &CreateWalletRequest::solana_smart(admin_signer))
            .await?;
        log::info!("Created smart wallet {}", wallet.address);
        Ok(wallet)
    }

    /// Fetch a wallet by id or address
    pub async fn get_wallet(&self, wallet_id: &str) -> Result<WalletResponse, GatewayError> {
        let url = format!("{}/wallets/{}", self.config.api_root(), wallet_id);
        self.get(&url).await
    }

    /// Hand a serialized transaction to the wallet for wrapping
    pub async fn submit_transaction(
        &self,
        wallet_address: &str,
        transaction_base58: &str,
        required_signers: &[Pubkey],
    ) -> Result<TransactionResponse, GatewayError> {
        let url = format!(
            "{}/wallets/{}/transactions",
            self.config.api_root(),
            wallet_address
        );
        let request = SubmitTransactionRequest {
            params: SubmitTransactionParams {
                transaction: transaction_base58.to_string(),
                required_signers: required_signers.iter().map(|k| k.to_string()).collect(),
            },
        };

        let response: TransactionResponse = self.post(&url, &request).await?;
        log::info!(
            "Submitted transaction for {} ({} pending approvals)",
            wallet_address,
            response.pending_approvals().len()
        );
        Ok(response)
    }

    /// Fetch a previously submitted transaction
    pub async fn get_transaction(
        &self,
        wallet_address: &str,
        transaction_id: &str,
    ) -> Result<TransactionResponse, GatewayError> {
        let url = format!(
            "{}/wallets/{}/transactions/{}",
            self.config.api_root(),
            wallet_address,
            transaction_id
        );
        self.get(&url).await
    }

    // =========================================================================
    // HTTP helpers
    // =========================================================================

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        log::debug!("GET {}", url);
        let response = self
            .http_client
            .get(url)
            .header("X-API-KEY", &self.config.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        log::debug!("POST {}", url);
        let response = self
            .http_client
            .post(url)
            .header("X-API-KEY", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("Wallet service error {}: {}", status, body);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_uses_versioned_root() {
        let config = GatewayConfig::new("sk_test")
            .unwrap()
            .with_base_url("http://localhost:3000/api")
            .unwrap();
        let client = GatewayClient::new(config).unwrap();
        assert_eq!(client.config().api_root(), "http://localhost:3000/api/2025-06-09");
    }

    #[test]
    fn test_status_error_message() {
        let err = GatewayError::Status {
            status: 400,
            reason: "Bad Request".to_string(),
            body: r#"{"message":"invalid signer"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Wallet service returned 400 Bad Request: {"message":"invalid signer"}"#
        );
    }

    fn client_for(base_url: &str) -> GatewayClient {
        let config = GatewayConfig::new("sk_test")
            .unwrap()
            .with_base_url(base_url)
            .unwrap();
        GatewayClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_error_status_keeps_body_verbatim() {
        let body = r#"{"error":true,"message":"adminSigner.address: Invalid Solana address"}"#;
        let url = crate::testing::serve_once("400 Bad Request", body).await;
        let admin = crate::crypto::KeyPair::generate().pubkey();

        match client_for(&url).create_wallet(&admin).await {
            Err(GatewayError::Status {
                status,
                reason,
                body: received,
            }) => {
                assert_eq!(status, 400);
                assert_eq!(reason, "Bad Request");
                assert_eq!(received, body);
            }
            other => panic!("expected Status, got {:?}", other.map(|w| w.address)),
        }
    }

    #[tokio::test]
    async fn test_success_body_is_decoded() {
        let body = r#"{"id":"tx-9","status":"pending","approvals":{"pending":[]}}"#;
        let url = crate::testing::serve_once("200 OK", body).await;

        let response = client_for(&url).get_transaction("wallet", "tx-9").await.unwrap();
        assert_eq!(response.id.as_deref(), Some("tx-9"));
        assert!(response.pending_approvals().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let url = crate::testing::serve_once("200 OK", "not json").await;
        assert!(matches!(
            client_for(&url).get_wallet("w").await,
            Err(GatewayError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        let config = GatewayConfig::new("sk_test")
            .unwrap()
            .with_base_url("http://127.0.0.1:1")
            .unwrap();
        let client = GatewayClient::new(config).unwrap();
        assert!(matches!(
            client.get_wallet("missing").await,
            Err(GatewayError::HttpError(_))
        ));
    }
}
