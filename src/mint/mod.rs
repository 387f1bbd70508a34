//! Token-2022 mint transaction
//!
//! Builds the unsigned v0 transaction the smart wallet pays for:
//! 1. System `CreateAccount` for the new mint (82 bytes, owned by Token-2022)
//! 2. Token-2022 `InitializeMint` with the wallet as mint and freeze authority
//! 3. Associated Token Account `Create` for the recipient
//!
//! The mint account signs as an external co-signer; the wallet service adds
//! the wallet's own authorization when it wraps the transaction.

use thiserror::Error;

use crate::chain::instruction::{
    create_account, create_associated_token_account, initialize_mint,
};
use crate::chain::{
    ChainClient, CodecError, Hash, Message, MessageVersion, Pubkey, RpcError,
    VersionedTransaction, MINT_SIZE, TOKEN_2022_PROGRAM_ID,
};

/// Decimals used when none are given
pub const DEFAULT_DECIMALS: u8 = 9;

/// Mint builder errors
#[derive(Error, Debug)]
pub enum MintError {
    #[error("Invalid accounts: {0}")]
    InvalidAccounts(String),
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),
    #[error("RPC error: {0}")]
    RpcError(#[from] RpcError),
}

/// Everything needed to submit and later report on a mint transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPlan {
    pub payer: Pubkey,
    pub mint: Pubkey,
    pub recipient_owner: Pubkey,
    pub recipient_token_account: Pubkey,
    pub decimals: u8,
    pub lamports: u64,
    pub transaction: VersionedTransaction,
}

impl MintPlan {
    /// Build the unsigned transaction
    pub fn build(
        payer: &Pubkey,
        mint: &Pubkey,
        recipient_owner: &Pubkey,
        decimals: u8,
        lamports: u64,
        blockhash: Hash,
    ) -> Result<Self, MintError> {
        if payer == mint {
            return Err(MintError::InvalidAccounts(
                "mint account must differ from the payer".to_string(),
            ));
        }
        if recipient_owner == mint {
            return Err(MintError::InvalidAccounts(
                "recipient cannot be the mint itself".to_string(),
            ));
        }

        let recipient_token_account =
            Pubkey::associated_token_address(recipient_owner, mint, &TOKEN_2022_PROGRAM_ID);

        let instructions = [
            create_account(payer, mint, lamports, MINT_SIZE, &TOKEN_2022_PROGRAM_ID),
            initialize_mint(&TOKEN_2022_PROGRAM_ID, mint, payer, Some(payer), decimals),
            create_associated_token_account(payer, recipient_owner, mint, &TOKEN_2022_PROGRAM_ID),
        ];
        let message = Message::compile(MessageVersion::V0, payer, &instructions, blockhash)?;

        log::debug!(
            "Mint plan: mint {} recipient ATA {} ({} lamports)",
            mint,
            recipient_token_account,
            lamports
        );

        Ok(Self {
            payer: *payer,
            mint: *mint,
            recipient_owner: *recipient_owner,
            recipient_token_account,
            decimals,
            lamports,
            transaction: VersionedTransaction::new_unsigned(message),
        })
    }

    /// Fetch rent and a blockhash from the chain, then build
    pub async fn prepare<C: ChainClient>(
        client: &C,
        payer: &Pubkey,
        mint: &Pubkey,
        recipient_owner: &Pubkey,
        decimals: u8,
    ) -> Result<Self, MintError> {
        let lamports = client.minimum_balance_for_rent_exemption(MINT_SIZE).await?;
        let blockhash = client.latest_blockhash().await?;
        log::info!(
            "Rent-exempt minimum for mint: {} lamports, blockhash {}",
            lamports,
            blockhash.blockhash
        );
        Self::build(
            payer,
            mint,
            recipient_owner,
            decimals,
            lamports,
            blockhash.blockhash,
        )
    }

    /// Keys besides the wallet that must co-sign
    pub fn external_signers(&self) -> Vec<Pubkey> {
        vec![self.mint]
    }

    pub fn to_base58(&self) -> Result<String, MintError> {
        Ok(self.transaction.to_base58()?)
    }
}
