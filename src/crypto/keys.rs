//! Ed25519 key management
//!
//! Provides key pair generation, detached signing, verification and
//! persistence in the Solana CLI keypair format (a JSON array of the
//! 64 secret+public bytes).

use std::fs;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::chain::{Pubkey, Signature};

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// An ed25519 key pair held by the local process
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a key pair from the 64-byte secret+public encoding
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            KeyError::InvalidSecretKey(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| KeyError::InvalidSecretKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Create a key pair from a base58-encoded 64-byte secret
    pub fn from_base58_secret(secret: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| KeyError::InvalidSecretKey(e.to_string()))?;
        Self::from_keypair_bytes(&bytes)
    }

    /// Load a key pair from a Solana CLI keypair file
    pub fn read_from_file(path: &Path) -> Result<Self, KeyError> {
        let data = fs::read_to_string(path)?;
        let bytes: Vec<u8> = serde_json::from_str(&data)?;
        Self::from_keypair_bytes(&bytes)
    }

    /// Write the key pair to a Solana CLI keypair file
    pub fn write_to_file(&self, path: &Path) -> Result<(), KeyError> {
        let bytes = self.signing_key.to_keypair_bytes().to_vec();
        fs::write(path, serde_json::to_string(&bytes)?)?;
        Ok(())
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Base58 secret (64 bytes)
    /// WARNING: Keep this secret!
    pub fn to_base58_secret(&self) -> String {
        bs58::encode(self.signing_key.to_keypair_bytes()).into_string()
    }

    /// Produce a detached signature over the raw message bytes
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        verify_signature(&self.pubkey(), message, signature)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("pubkey", &self.pubkey().to_string())
            .finish_non_exhaustive()
    }
}

/// Verify a detached signature against a public key
///
/// Returns false for keys that are not valid curve points.
pub fn verify_signature(pubkey: &Pubkey, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(pubkey.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key.verify(message, &sig).is_ok()
}
