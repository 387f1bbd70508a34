//! Smart-wallet co-signer: a client for smart wallets on Solana
//!
//! This crate provides:
//! - Ed25519 key pairs compatible with the Solana CLI keypair format
//! - A self-contained Solana wire codec (legacy and v0 messages)
//! - A JSON-RPC chain client behind the `ChainClient` trait
//! - A client for the smart-wallet service's wallets API
//! - Co-signing: answering pending approvals and positioning signatures
//! - A simulate, send and confirm broadcast sequencer
//! - A Token-2022 mint transaction builder
//!
//! # Example
//!
//! ```rust
//! use smart_wallet_cosigner::chain::{Hash, VersionedTransaction};
//! use smart_wallet_cosigner::cosign::{assemble_signed_transaction, AssemblyPolicy, Approval, WrappedTransaction};
//! use smart_wallet_cosigner::crypto::KeyPair;
//! use smart_wallet_cosigner::mint::MintPlan;
//!
//! let wallet = KeyPair::generate();
//! let mint = KeyPair::generate();
//! let recipient = KeyPair::generate();
//!
//! let plan = MintPlan::build(
//!     &wallet.pubkey(),
//!     &mint.pubkey(),
//!     &recipient.pubkey(),
//!     9,
//!     1_461_600,
//!     Hash::default(),
//! )
//! .unwrap();
//!
//! let data = plan.transaction.message_data().unwrap();
//! let approvals: Vec<Approval> = [&wallet, &mint]
//!     .iter()
//!     .map(|kp| Approval {
//!         signer: format!("external-wallet:{}", kp.pubkey()),
//!         signature: kp.sign(&data).to_string(),
//!     })
//!     .collect();
//!
//! let wrapped = WrappedTransaction::new(plan.transaction.clone(), 1_000);
//! let signed = assemble_signed_transaction(&wrapped, &approvals, AssemblyPolicy::Strict).unwrap();
//! assert!(signed.transaction.unverified_signers().unwrap().is_empty());
//! # let _: &VersionedTransaction = &signed.transaction;
//! ```

pub mod broadcast;
pub mod chain;
pub mod cli;
pub mod config;
pub mod cosign;
pub mod crypto;
pub mod gateway;
pub mod mint;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use broadcast::{BroadcastError, BroadcastOutcome, BroadcastSequencer};
pub use chain::{ChainClient, Pubkey, RpcChainClient, Signature, VersionedTransaction};
pub use config::{AppConfig, BroadcastConfig, ChainClientConfig, GatewayConfig};
pub use cosign::{
    assemble_signed_transaction, match_approvals, Approval, AssemblyPolicy, CosignError,
    PendingApproval, SignedTransaction, WrappedTransaction,
};
pub use crypto::KeyPair;
pub use gateway::{GatewayClient, GatewayError};
pub use mint::{MintError, MintPlan};
