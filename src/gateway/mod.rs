//! Remote smart-wallet service
//!
//! Creates wallets, submits transactions for wrapping and reads back the
//! approvals the wallet still needs.

pub mod client;
pub mod types;

pub use client::{GatewayClient, GatewayError};
pub use types::{
    AdminSigner, Approvals, CreateWalletRequest, OnChain, SubmitTransactionParams,
    SubmitTransactionRequest, TransactionResponse, WalletConfig, WalletResponse,
};
