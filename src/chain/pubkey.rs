//! Solana public keys and program-derived addresses

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chain::codec::CodecError;
use crate::crypto::sha256_parts;

/// Maximum length of a single PDA seed
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds for a PDA
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// The System program (`11111111111111111111111111111111`)
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0; 32]);

/// The Token-2022 program (`TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`)
pub const TOKEN_2022_PROGRAM_ID: Pubkey = Pubkey([
    6, 221, 246, 225, 238, 117, 143, 222, 24, 66, 93, 188, 228, 108, 205, 218, 182, 26, 252, 77,
    131, 185, 13, 39, 254, 189, 249, 40, 216, 161, 139, 252,
]);

/// The Associated Token Account program (`ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`)
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey([
    140, 151, 37, 143, 78, 36, 137, 241, 187, 61, 16, 41, 20, 142, 13, 131, 11, 90, 19, 153, 218,
    255, 16, 132, 4, 142, 123, 216, 219, 233, 248, 89,
]);

/// The rent sysvar (`SysvarRent111111111111111111111111111111111`)
pub const RENT_SYSVAR_ID: Pubkey = Pubkey([
    6, 167, 213, 23, 25, 44, 92, 81, 33, 140, 201, 76, 61, 74, 241, 127, 88, 218, 238, 8, 155,
    161, 253, 68, 227, 219, 217, 138, 0, 0, 0, 0,
]);

/// A 32-byte account address, displayed as base58
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Whether the address is a valid ed25519 point (i.e. could have a private key)
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }

    /// Derive a program address from seeds, failing if it lands on the curve
    pub fn create_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<Pubkey, CodecError> {
        if seeds.len() > MAX_SEEDS {
            return Err(CodecError::InvalidSeeds(format!(
                "{} seeds exceeds maximum of {}",
                seeds.len(),
                MAX_SEEDS
            )));
        }
        if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
            return Err(CodecError::InvalidSeeds(format!(
                "seed of {} bytes exceeds maximum of {}",
                seed.len(),
                MAX_SEED_LEN
            )));
        }

        let mut parts: Vec<&[u8]> = seeds.to_vec();
        parts.push(program_id.as_bytes());
        parts.push(PDA_MARKER);

        let address = Pubkey(sha256_parts(&parts));
        if address.is_on_curve() {
            return Err(CodecError::InvalidSeeds(
                "derived address lies on the ed25519 curve".to_string(),
            ));
        }
        Ok(address)
    }

    /// Find the first valid program address, searching bump seeds from 255 down
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Option<(Pubkey, u8)> {
        // the bump seed takes one slot
        if seeds.len() >= MAX_SEEDS || seeds.iter().any(|s| s.len() > MAX_SEED_LEN) {
            return None;
        }
        (0..=u8::MAX).rev().find_map(|bump| {
            let bump_seed = [bump];
            let mut with_bump: Vec<&[u8]> = seeds.to_vec();
            with_bump.push(&bump_seed);
            Self::create_program_address(&with_bump, program_id)
                .ok()
                .map(|address| (address, bump))
        })
    }

    /// Associated token account for `owner` holding `mint` under `token_program`
    pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
        // A valid bump always exists for three 32-byte seeds.
        Self::find_program_address(
            &[owner.as_bytes(), token_program.as_bytes(), mint.as_bytes()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        )
        .map(|(address, _)| address)
        .unwrap_or_default()
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidPubkey(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(bytes))
    }
}

impl FromStr for Pubkey {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 32 bytes never need more than 44 base58 characters
        if s.is_empty() || s.len() > 44 {
            return Err(CodecError::InvalidPubkey(s.to_string()));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| CodecError::InvalidPubkey(s.to_string()))?;
        Pubkey::try_from(bytes.as_slice()).map_err(|_| CodecError::InvalidPubkey(s.to_string()))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
