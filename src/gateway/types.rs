//! Wallet service request and response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::Pubkey;
use crate::cosign::{Approval, CosignError, PendingApproval, WrappedTransaction};
use crate::gateway::client::GatewayError;

// =============================================================================
// Wallets
// =============================================================================

/// Body of `POST /wallets`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub chain_type: String,
    #[serde(rename = "type")]
    pub wallet_type: String,
    pub config: WalletConfig,
}

impl CreateWalletRequest {
    /// A Solana smart wallet administered by an external key
    pub fn solana_smart(admin_signer: &Pubkey) -> Self {
        Self {
            chain_type: "solana".to_string(),
            wallet_type: "smart".to_string(),
            config: WalletConfig {
                admin_signer: AdminSigner {
                    signer_type: "external-wallet".to_string(),
                    address: admin_signer.to_string(),
                    locator: None,
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    pub admin_signer: AdminSigner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSigner {
    #[serde(rename = "type")]
    pub signer_type: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

/// A smart wallet as returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    #[serde(rename = "type")]
    pub wallet_type: String,
    /// On-chain address; pays fees for transactions submitted through it
    pub address: Pubkey,
    pub config: WalletConfig,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub chain_type: Option<String>,
}

// =============================================================================
// Transactions
// =============================================================================

/// Body of `POST /wallets/{address}/transactions`
#[derive(Debug, Clone, Serialize)]
pub struct SubmitTransactionRequest {
    pub params: SubmitTransactionParams,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionParams {
    /// Base58 serialized transaction
    pub transaction: String,
    /// External keys that must co-sign besides the wallet itself
    pub required_signers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Approvals {
    #[serde(default)]
    pub pending: Vec<PendingApproval>,
    #[serde(default)]
    pub submitted: Vec<Approval>,
}

/// On-chain part of a transaction response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChain {
    /// Base58 wrapped transaction
    pub transaction: String,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
    #[serde(default)]
    pub tx_id: Option<String>,
}

/// A wallet transaction as returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub approvals: Option<Approvals>,
    #[serde(default)]
    pub on_chain: Option<OnChain>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TransactionResponse {
    /// Approvals still waiting for a signature, empty when none
    pub fn pending_approvals(&self) -> &[PendingApproval] {
        self.approvals
            .as_ref()
            .map(|a| a.pending.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_valid_block_height(&self) -> Result<u64, GatewayError> {
        self.on_chain
            .as_ref()
            .and_then(|o| o.last_valid_block_height)
            .ok_or(GatewayError::MissingOnChain)
    }

    /// Decode the wrapped transaction the wallet service built
    pub fn wrapped_transaction(&self) -> Result<WrappedTransaction, GatewayError> {
        let on_chain = self.on_chain.as_ref().ok_or(GatewayError::MissingOnChain)?;
        let height = self.last_valid_block_height()?;
        WrappedTransaction::from_base58(&on_chain.transaction, height)
            .map_err(|e: CosignError| GatewayError::Decode(e.to_string()))
    }
}
