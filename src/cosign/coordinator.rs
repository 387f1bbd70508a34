//! Co-signing coordinator
//!
//! Takes the partially signed transaction returned by the wallet service,
//! answers its pending approvals with local keys and writes the resulting
//! signatures into the slots the transaction header assigns them.
//!
//! Slot `i` must hold the signature of `account_keys[i]`; the chain rejects
//! the transaction otherwise.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::{CodecError, Pubkey, Signature, VersionedTransaction};
use crate::cosign::approval::{sign_approval, Approval, PendingApproval, SignerLocator};
use crate::crypto::{verify_signature, KeyPair};

/// Errors raised while signing or assembling a co-signed transaction
#[derive(Error, Debug)]
pub enum CosignError {
    #[error("No matching keypair found for required signer: {0}")]
    NoMatchingSigner(String),
    #[error("Signer locator has no address: {0}")]
    InvalidLocator(String),
    #[error("Invalid approval message for {signer}: {reason}")]
    InvalidMessageEncoding { signer: String, reason: String },
    #[error("Invalid signature encoding for {signer}: {reason}")]
    InvalidSignatureEncoding { signer: String, reason: String },
    #[error("Invalid signature length for {signer}: {len} bytes")]
    InvalidSignatureLength { signer: String, len: usize },
    #[error("Missing signatures for required signers: {}", join_keys(.0))]
    MissingSignatures(Vec<Pubkey>),
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),
}

fn join_keys(keys: &[Pubkey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// What to do with required signers nobody supplied a signature for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyPolicy {
    /// Refuse to assemble while any required slot would stay empty
    #[default]
    Strict,
    /// Fill what we have and leave the remaining slots as the service sent them
    PartialFill,
}

/// A transaction handed back by the wallet service, awaiting signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedTransaction {
    pub transaction: VersionedTransaction,
    /// Block height after which the blockhash expires
    pub last_valid_block_height: u64,
}

impl WrappedTransaction {
    pub fn new(transaction: VersionedTransaction, last_valid_block_height: u64) -> Self {
        Self {
            transaction,
            last_valid_block_height,
        }
    }

    /// Decode the base58 payload returned by the service
    pub fn from_base58(encoded: &str, last_valid_block_height: u64) -> Result<Self, CosignError> {
        Ok(Self::new(
            VersionedTransaction::from_base58(encoded)?,
            last_valid_block_height,
        ))
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        self.transaction.required_signers()
    }
}

/// A transaction whose signature slots have been positioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: VersionedTransaction,
    pub last_valid_block_height: u64,
    /// Required signers whose slot was written from an approval
    pub filled: Vec<Pubkey>,
}

impl SignedTransaction {
    /// The transaction id (first signature)
    pub fn id(&self) -> Option<&Signature> {
        self.transaction.id()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        self.transaction.serialize()
    }
}

/// Answer every pending approval with a local key pair
///
/// Fails on the first request no available key can satisfy; nothing is
/// returned in that case. Output order follows input order.
pub fn match_approvals(
    pending: &[PendingApproval],
    available_signers: &[KeyPair],
) -> Result<Vec<Approval>, CosignError> {
    pending
        .iter()
        .map(|request| {
            let locator = SignerLocator::parse(&request.signer)
                .map_err(|_| CosignError::NoMatchingSigner(request.signer.clone()))?;
            let key_pair = available_signers
                .iter()
                .find(|kp| locator.matches(&kp.pubkey()))
                .ok_or_else(|| CosignError::NoMatchingSigner(request.signer.clone()))?;

            log::debug!("Signing approval for {}", locator.address);
            sign_approval(request, key_pair)
        })
        .collect()
}

/// Write approvals into the signature slots of the wrapped transaction
///
/// Every approval is decoded and length-checked before any slot is
/// written. Under [`AssemblyPolicy::Strict`] a required signer with neither
/// an approval nor a valid signature already present in the wrapped
/// transaction is an error. The input is not modified, so repeated calls
/// with the same arguments yield identical results.
pub fn assemble_signed_transaction(
    wrapped: &WrappedTransaction,
    approvals: &[Approval],
    policy: AssemblyPolicy,
) -> Result<SignedTransaction, CosignError> {
    let required = wrapped.required_signers();

    let mut by_signer: HashMap<Pubkey, Signature> = HashMap::with_capacity(approvals.len());
    for approval in approvals {
        let locator = SignerLocator::parse(&approval.signer)?;
        let signature = approval.decode_signature()?;
        by_signer.insert(locator.address, signature);
    }

    for key in by_signer.keys() {
        if !required.contains(key) {
            log::debug!("Ignoring approval from {}: not a required signer", key);
        }
    }

    if policy == AssemblyPolicy::Strict {
        let data = wrapped.transaction.message_data()?;
        let missing: Vec<Pubkey> = required
            .iter()
            .enumerate()
            .filter(|(i, key)| {
                !by_signer.contains_key(*key)
                    && !wrapped
                        .transaction
                        .signatures
                        .get(*i)
                        .map_or(false, |sig| verify_signature(key, &data, sig))
            })
            .map(|(_, key)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(CosignError::MissingSignatures(missing));
        }
    }

    let mut transaction = wrapped.transaction.clone();
    let mut filled = Vec::new();
    for (index, key) in required.iter().enumerate() {
        if let (Some(signature), Some(slot)) =
            (by_signer.get(key), transaction.signatures.get_mut(index))
        {
            *slot = *signature;
            filled.push(*key);
            log::debug!("Updated signature {} for {}", index + 1, key);
        }
    }

    Ok(SignedTransaction {
        transaction,
        last_valid_block_height: wrapped.last_valid_block_height,
        filled,
    })
}
