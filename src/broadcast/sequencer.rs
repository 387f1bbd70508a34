//! Broadcast sequencer
//!
//! Runs an assembled transaction through simulate, send and confirm. A
//! transaction is never sent if its simulation failed, and confirmation
//! gives up once the chain has moved past the blockhash's last valid height.

use serde_json::Value;
use thiserror::Error;

use crate::chain::{
    ChainClient, CommitmentLevel, RpcError, SendOptions, Signature, SignatureStatus,
    SimulationResult,
};
use crate::config::BroadcastConfig;
use crate::cosign::SignedTransaction;

/// Broadcast errors
#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Simulation failed: {err}")]
    Simulation { err: Value, logs: Vec<String> },
    #[error("Transaction {signature} failed on chain: {err}")]
    TransactionFailed { signature: Signature, err: Value },
    #[error("Blockhash expired: block height {block_height} is past {last_valid_block_height}")]
    Expired {
        last_valid_block_height: u64,
        block_height: u64,
    },
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

/// A confirmed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastOutcome {
    pub signature: Signature,
    pub slot: u64,
    pub confirmation_status: Option<CommitmentLevel>,
}

/// Sends assembled transactions through a [`ChainClient`]
pub struct BroadcastSequencer<'a, C: ChainClient> {
    client: &'a C,
    config: BroadcastConfig,
    commitment: CommitmentLevel,
}

impl<'a, C: ChainClient> BroadcastSequencer<'a, C> {
    pub fn new(client: &'a C, config: BroadcastConfig) -> Self {
        Self {
            client,
            config,
            commitment: CommitmentLevel::default(),
        }
    }

    /// Commitment the confirmation loop waits for
    pub fn with_commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.commitment = commitment;
        self
    }

    /// Simulate, send and confirm
    pub async fn broadcast(
        &self,
        signed: &SignedTransaction,
    ) -> Result<BroadcastOutcome, BroadcastError> {
        self.report_unverified(signed);

        if self.config.simulate {
            let result = self.simulate(signed).await?;
            log::info!(
                "Simulation succeeded ({} compute units)",
                result.units_consumed.unwrap_or_default()
            );
        } else {
            log::info!("Skipping simulation");
        }

        let signature = self.send(signed).await?;
        let status = self
            .confirm(&signature, signed.last_valid_block_height)
            .await?;

        Ok(BroadcastOutcome {
            signature,
            slot: status.slot,
            confirmation_status: status.confirmation_status,
        })
    }

    /// Dry-run the transaction; a chain-reported error aborts with the logs
    pub async fn simulate(
        &self,
        signed: &SignedTransaction,
    ) -> Result<SimulationResult, BroadcastError> {
        let result = self.client.simulate_transaction(&signed.transaction).await?;
        match result.err {
            Some(err) => {
                for line in &result.logs {
                    log::warn!("  {}", line);
                }
                Err(BroadcastError::Simulation {
                    err,
                    logs: result.logs,
                })
            }
            None => Ok(result),
        }
    }

    /// Submit the wire bytes with preflight checks enabled
    pub async fn send(&self, signed: &SignedTransaction) -> Result<Signature, BroadcastError> {
        let options = SendOptions {
            max_retries: Some(self.config.max_retries),
            ..SendOptions::default()
        };
        let signature = self
            .client
            .send_transaction(&signed.transaction, &options)
            .await?;
        log::info!("Sent transaction {}", signature);
        Ok(signature)
    }

    /// Poll until the signature reaches the configured commitment
    pub async fn confirm(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<SignatureStatus, BroadcastError> {
        loop {
            if let Some(status) = self.client.signature_status(signature).await? {
                if let Some(err) = &status.err {
                    return Err(BroadcastError::TransactionFailed {
                        signature: *signature,
                        err: err.clone(),
                    });
                }
                if status.satisfies(self.commitment) {
                    log::info!("Transaction {} confirmed in slot {}", signature, status.slot);
                    return Ok(status);
                }
            }

            let block_height = self.client.block_height().await?;
            if block_height > last_valid_block_height {
                return Err(BroadcastError::Expired {
                    last_valid_block_height,
                    block_height,
                });
            }

            log::debug!(
                "Waiting for {} (block height {}/{})",
                signature,
                block_height,
                last_valid_block_height
            );
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn report_unverified(&self, signed: &SignedTransaction) {
        match signed.transaction.unverified_signers() {
            Ok(keys) => {
                for key in keys {
                    log::warn!("Signature slot for {} does not verify", key);
                }
            }
            Err(e) => log::warn!("Could not verify signatures: {}", e),
        }
    }
}
