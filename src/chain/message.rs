//! Transaction messages
//!
//! Both the legacy layout and the v0 layout (prefixed with `0x80`, carrying
//! address table lookups) are supported. The serialized message is exactly
//! what every required signer signs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chain::codec::{encode_length, CodecError, Reader};
use crate::chain::instruction::Instruction;
use crate::chain::pubkey::Pubkey;

/// High bit of the first message byte marks a versioned message
const VERSION_PREFIX: u8 = 0x80;

// =============================================================================
// Blockhash
// =============================================================================

/// A 32-byte recent blockhash
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Hash {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CodecError::InvalidBase58(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidBase58(format!("blockhash {} is not 32 bytes", s)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

// =============================================================================
// Message parts
// =============================================================================

/// Counts that split the account key list into signer/writable classes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// The first `num_required_signatures` account keys must sign
    pub num_required_signatures: u8,
    /// The last `num_readonly_signed_accounts` signers are read-only
    pub num_readonly_signed_accounts: u8,
    /// The last `num_readonly_unsigned_accounts` non-signers are read-only
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction with accounts replaced by indexes into the key list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// Reference into an on-chain address lookup table (v0 only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTableLookup {
    pub account_key: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageVersion {
    Legacy,
    V0,
}

/// A legacy or v0 transaction message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
    /// Always empty for legacy messages
    pub address_table_lookups: Vec<AddressTableLookup>,
}

impl Message {
    /// Compile instructions into a message with `payer` as the fee payer
    ///
    /// Keys are ordered payer first, then writable signers, read-only
    /// signers, writable non-signers and read-only non-signers, keeping
    /// first-seen order inside each class.
    pub fn compile(
        version: MessageVersion,
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> Result<Self, CodecError> {
        // (key, is_signer, is_writable) in first-seen order
        let mut metas: Vec<(Pubkey, bool, bool)> = vec![(*payer, true, true)];
        let mut upsert = |key: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = metas.iter_mut().find(|(k, _, _)| *k == key) {
                entry.1 |= signer;
                entry.2 |= writable;
            } else {
                metas.push((key, signer, writable));
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        let class = |signer: bool, writable: bool| match (signer, writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        // payer stays in front: it is already a writable signer and sort is stable
        metas.sort_by_key(|(_, s, w)| class(*s, *w));

        if metas.len() > u8::MAX as usize + 1 {
            return Err(CodecError::InvalidHeader(format!(
                "{} account keys cannot be indexed by u8",
                metas.len()
            )));
        }

        let count = |s: bool, w: bool| metas.iter().filter(|m| m.1 == s && m.2 == w).count();
        let header_count = |n: usize, field: &str| {
            u8::try_from(n).map_err(|_| {
                CodecError::InvalidHeader(format!("{} {} do not fit in a u8", n, field))
            })
        };
        let header = MessageHeader {
            num_required_signatures: header_count(
                count(true, true) + count(true, false),
                "required signatures",
            )?,
            num_readonly_signed_accounts: header_count(count(true, false), "read-only signers")?,
            num_readonly_unsigned_accounts: header_count(
                count(false, false),
                "read-only accounts",
            )?,
        };
        let account_keys: Vec<Pubkey> = metas.into_iter().map(|(k, _, _)| k).collect();

        let index_of = |key: &Pubkey| -> u8 {
            // every referenced key was inserted above
            account_keys.iter().position(|k| k == key).unwrap_or_default() as u8
        };
        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|a| index_of(&a.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups: Vec::new(),
        })
    }

    /// The ordered public keys whose signatures the chain requires
    pub fn required_signers(&self) -> &[Pubkey] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// Serialize to wire bytes (the bytes that get signed)
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(256);
        if self.version == MessageVersion::V0 {
            out.push(VERSION_PREFIX);
        }
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_length(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(self.recent_blockhash.as_bytes());

        encode_length(&mut out, self.instructions.len())?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_length(&mut out, ix.accounts.len())?;
            out.extend_from_slice(&ix.accounts);
            encode_length(&mut out, ix.data.len())?;
            out.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            encode_length(&mut out, self.address_table_lookups.len())?;
            for lookup in &self.address_table_lookups {
                out.extend_from_slice(lookup.account_key.as_bytes());
                encode_length(&mut out, lookup.writable_indexes.len())?;
                out.extend_from_slice(&lookup.writable_indexes);
                encode_length(&mut out, lookup.readonly_indexes.len())?;
                out.extend_from_slice(&lookup.readonly_indexes);
            }
        }

        Ok(out)
    }

    /// Decode a message from the reader's current position
    pub fn deserialize(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let first = reader.peek_u8()?;
        let version = if first & VERSION_PREFIX != 0 {
            let version = reader.read_u8()? & !VERSION_PREFIX;
            if version != 0 {
                return Err(CodecError::UnsupportedVersion(version));
            }
            MessageVersion::V0
        } else {
            MessageVersion::Legacy
        };

        let header = MessageHeader {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        };

        let key_count = reader.read_length()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(Pubkey::new(reader.read_array::<32>()?));
        }
        let recent_blockhash = Hash::new(reader.read_array::<32>()?);

        let ix_count = reader.read_length()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = reader.read_u8()?;
            let len = reader.read_length()?;
            let accounts = reader.read_bytes(len)?.to_vec();
            let len = reader.read_length()?;
            let data = reader.read_bytes(len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let mut address_table_lookups = Vec::new();
        if version == MessageVersion::V0 {
            let lookup_count = reader.read_length()?;
            for _ in 0..lookup_count {
                let account_key = Pubkey::new(reader.read_array::<32>()?);
                let len = reader.read_length()?;
                let writable_indexes = reader.read_bytes(len)?.to_vec();
                let len = reader.read_length()?;
                let readonly_indexes = reader.read_bytes(len)?.to_vec();
                address_table_lookups.push(AddressTableLookup {
                    account_key,
                    writable_indexes,
                    readonly_indexes,
                });
            }
        }

        let message = Self {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        };
        message.sanitize()?;
        Ok(message)
    }

    /// Check the header against the static key list
    pub fn sanitize(&self) -> Result<(), CodecError> {
        let signers = self.header.num_required_signatures as usize;
        if signers == 0 {
            return Err(CodecError::InvalidHeader(
                "message requires no signatures".to_string(),
            ));
        }
        if signers > self.account_keys.len() {
            return Err(CodecError::InvalidHeader(format!(
                "{} required signatures but only {} account keys",
                signers,
                self.account_keys.len()
            )));
        }
        if self.header.num_readonly_signed_accounts as usize >= signers {
            return Err(CodecError::InvalidHeader(
                "fee payer cannot be read-only".to_string(),
            ));
        }
        if signers + self.header.num_readonly_unsigned_accounts as usize > self.account_keys.len()
        {
            return Err(CodecError::InvalidHeader(
                "read-only unsigned count exceeds non-signer keys".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::instruction::{create_account, initialize_mint, AccountMeta, MINT_SIZE};
    use crate::chain::pubkey::{RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_2022_PROGRAM_ID};
    use crate::crypto::KeyPair;

    fn sample_message(version: MessageVersion) -> (Message, Pubkey, Pubkey) {
        let payer = KeyPair::generate().pubkey();
        let mint = KeyPair::generate().pubkey();
        let instructions = vec![
            create_account(&payer, &mint, 1_000, MINT_SIZE, &TOKEN_2022_PROGRAM_ID),
            initialize_mint(&TOKEN_2022_PROGRAM_ID, &mint, &payer, Some(&payer), 9),
        ];
        let message =
            Message::compile(version, &payer, &instructions, Hash::new([7; 32])).unwrap();
        (message, payer, mint)
    }

    #[test]
    fn test_compile_orders_keys() {
        let (message, payer, mint) = sample_message(MessageVersion::V0);

        assert_eq!(message.header.num_required_signatures, 2);
        assert_eq!(message.header.num_readonly_signed_accounts, 0);
        // system program, token program, rent sysvar
        assert_eq!(message.header.num_readonly_unsigned_accounts, 3);
        assert_eq!(message.required_signers(), &[payer, mint]);
        assert_eq!(message.account_keys[2], SYSTEM_PROGRAM_ID);
        assert!(message.account_keys.contains(&RENT_SYSVAR_ID));

        let create = &message.instructions[0];
        assert_eq!(message.account_keys[create.program_id_index as usize], SYSTEM_PROGRAM_ID);
        assert_eq!(create.accounts, vec![0, 1]);
    }

    #[test]
    fn test_v0_serialize_and_decode() {
        let (message, _, _) = sample_message(MessageVersion::V0);
        let bytes = message.serialize().unwrap();
        assert_eq!(bytes[0], 0x80);

        let mut reader = Reader::new(&bytes);
        let decoded = Message::deserialize(&mut reader).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_legacy_has_no_prefix() {
        let (message, _, _) = sample_message(MessageVersion::Legacy);
        let bytes = message.serialize().unwrap();
        assert_eq!(bytes[0], 2);

        let decoded = Message::deserialize(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(decoded.version, MessageVersion::Legacy);
        assert!(decoded.address_table_lookups.is_empty());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let (message, _, _) = sample_message(MessageVersion::V0);
        let mut bytes = message.serialize().unwrap();
        bytes[0] = 0x81;
        assert_eq!(
            Message::deserialize(&mut Reader::new(&bytes)),
            Err(CodecError::UnsupportedVersion(1))
        );
    }

    #[test]
    fn test_rejects_bad_header() {
        let (mut message, _, _) = sample_message(MessageVersion::V0);
        message.header.num_required_signatures = 40;
        let bytes = message.serialize().unwrap();
        assert!(matches!(
            Message::deserialize(&mut Reader::new(&bytes)),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_compile_rejects_too_many_signers() {
        let payer = KeyPair::generate().pubkey();
        let ix = Instruction {
            program_id: SYSTEM_PROGRAM_ID,
            accounts: (0..255)
                .map(|_| AccountMeta::new(KeyPair::generate().pubkey(), true))
                .collect(),
            data: Vec::new(),
        };
        // payer + 255 signers + program = 257 keys
        assert!(matches!(
            Message::compile(MessageVersion::V0, &payer, &[ix], Hash::default()),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_compile_rejects_256_signers() {
        let payer = KeyPair::generate().pubkey();
        let ix = Instruction {
            program_id: payer,
            accounts: (0..255)
                .map(|_| AccountMeta::new(KeyPair::generate().pubkey(), true))
                .collect(),
            data: Vec::new(),
        };
        // 256 keys fit the index range, but 256 signers overflow the header
        match Message::compile(MessageVersion::V0, &payer, &[ix], Hash::default()) {
            Err(CodecError::InvalidHeader(reason)) => {
                assert!(reason.contains("required signatures"))
            }
            other => panic!("expected InvalidHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_parse() {
        let hash = Hash::new([9; 32]);
        let parsed: Hash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        assert!("abc".parse::<Hash>().is_err());
    }
}
