//! Approval requests and responses exchanged with the wallet service
//!
//! The service identifies each signer with a colon-separated locator such
//! as `external-wallet:<address>` or `solana:<address>:external-wallet`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::{Pubkey, Signature};
use crate::cosign::coordinator::CosignError;
use crate::crypto::{verify_signature, KeyPair};

/// A signing request: `signer` must produce a detached signature over `message`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Base58-encoded bytes to sign
    pub message: String,
    /// Signer locator
    pub signer: String,
}

impl PendingApproval {
    /// Decode the message bytes
    pub fn message_bytes(&self) -> Result<Vec<u8>, CosignError> {
        bs58::decode(&self.message)
            .into_vec()
            .map_err(|e| CosignError::InvalidMessageEncoding {
                signer: self.signer.clone(),
                reason: e.to_string(),
            })
    }
}

/// A satisfied approval
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Signer locator, copied from the pending request
    pub signer: String,
    /// Base58-encoded detached signature
    pub signature: String,
}

impl Approval {
    /// Decode the signature, enforcing the 64-byte length
    pub fn decode_signature(&self) -> Result<Signature, CosignError> {
        let bytes = bs58::decode(&self.signature).into_vec().map_err(|e| {
            CosignError::InvalidSignatureEncoding {
                signer: self.signer.clone(),
                reason: e.to_string(),
            }
        })?;
        Signature::try_from(bytes.as_slice()).map_err(|len| CosignError::InvalidSignatureLength {
            signer: self.signer.clone(),
            len,
        })
    }

    /// Verify this approval's signature over `message`
    pub fn verify(&self, message: &[u8]) -> Result<bool, CosignError> {
        let locator = SignerLocator::parse(&self.signer)?;
        let signature = self.decode_signature()?;
        Ok(verify_signature(&locator.address, message, &signature))
    }
}

/// Sign a pending request with a key pair
pub fn sign_approval(pending: &PendingApproval, key_pair: &KeyPair) -> Result<Approval, CosignError> {
    let message = pending.message_bytes()?;
    let signature = key_pair.sign(&message);

    Ok(Approval {
        signer: pending.signer.clone(),
        signature: signature.to_string(),
    })
}

/// A parsed signer locator
///
/// The address is the segment that decodes as a 32-byte public key. When
/// segments follow the address, the leading segment names the chain and
/// the trailing one the signer role (`solana:<addr>:external-wallet`);
/// with only a leading segment it names the role (`external-wallet:<addr>`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerLocator {
    pub chain: Option<String>,
    pub address: Pubkey,
    pub role: Option<String>,
    raw: String,
}

impl SignerLocator {
    pub fn parse(locator: &str) -> Result<Self, CosignError> {
        let segments: Vec<&str> = locator.split(':').collect();
        let position = segments
            .iter()
            .position(|s| s.parse::<Pubkey>().is_ok())
            .ok_or_else(|| CosignError::InvalidLocator(locator.to_string()))?;
        let address = segments[position]
            .parse::<Pubkey>()
            .map_err(|_| CosignError::InvalidLocator(locator.to_string()))?;

        let join = |parts: &[&str]| {
            let joined = parts.join(":");
            (!joined.is_empty()).then_some(joined)
        };
        let prefix = join(&segments[..position]);
        let suffix = join(&segments[position + 1..]);

        let (chain, role) = match suffix {
            Some(role) => (prefix, Some(role)),
            None => (None, prefix),
        };

        Ok(Self {
            chain,
            address,
            role,
            raw: locator.to_string(),
        })
    }

    /// Whether this locator names the given key
    pub fn matches(&self, pubkey: &Pubkey) -> bool {
        self.address == *pubkey
    }
}

impl fmt::Display for SignerLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
