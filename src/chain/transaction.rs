//! Versioned transactions and detached signatures
//!
//! Wire layout: compact-u16 signature count, the 64-byte signatures, then
//! the serialized message. Signature slot `i` belongs to
//! `message.account_keys[i]`.

use std::fmt;
use std::str::FromStr;

use crate::chain::codec::{encode_length, CodecError, Reader};
use crate::chain::message::Message;
use crate::chain::pubkey::Pubkey;
use crate::crypto::verify_signature;

/// Length of an ed25519 detached signature
pub const SIGNATURE_LENGTH: usize = 64;

// =============================================================================
// Signature
// =============================================================================

/// A 64-byte detached signature, displayed as base58
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    pub const fn new(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// The all-zero placeholder used for slots nobody has signed yet
    pub fn is_placeholder(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0; SIGNATURE_LENGTH])
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = usize;

    /// Fails with the offending length
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; SIGNATURE_LENGTH] = bytes.try_into().map_err(|_| bytes.len())?;
        Ok(Self(bytes))
    }
}

impl FromStr for Signature {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CodecError::InvalidBase58(e.to_string()))?;
        Signature::try_from(bytes.as_slice()).map_err(|len| {
            CodecError::InvalidBase58(format!("signature is {} bytes, expected 64", len))
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A transaction with a legacy or v0 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTransaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl VersionedTransaction {
    /// An unsigned transaction with one placeholder slot per required signer
    pub fn new_unsigned(message: Message) -> Self {
        let slots = message.header.num_required_signatures as usize;
        Self {
            signatures: vec![Signature::default(); slots],
            message,
        }
    }

    /// Decode from wire bytes, rejecting trailing data
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let count = reader.read_length()?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            signatures.push(Signature::new(reader.read_array::<SIGNATURE_LENGTH>()?));
        }
        let message = Message::deserialize(&mut reader)?;

        if reader.remaining() != 0 {
            return Err(CodecError::TrailingBytes(reader.remaining()));
        }
        if signatures.len() != message.header.num_required_signatures as usize {
            return Err(CodecError::InvalidHeader(format!(
                "{} signature slots for {} required signers",
                signatures.len(),
                message.header.num_required_signatures
            )));
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Decode from a base58 string
    pub fn from_base58(encoded: &str) -> Result<Self, CodecError> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| CodecError::InvalidBase58(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Serialize to wire bytes
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let message = self.message.serialize()?;
        let mut out = Vec::with_capacity(1 + self.signatures.len() * SIGNATURE_LENGTH + message.len());
        encode_length(&mut out, self.signatures.len())?;
        for sig in &self.signatures {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&message);
        Ok(out)
    }

    pub fn to_base58(&self) -> Result<String, CodecError> {
        Ok(bs58::encode(self.serialize()?).into_string())
    }

    /// Bytes each required signer must sign
    pub fn message_data(&self) -> Result<Vec<u8>, CodecError> {
        self.message.serialize()
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        self.message.required_signers()
    }

    /// The first signature doubles as the transaction id
    pub fn id(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Required signers whose slot does not hold a valid signature
    pub fn unverified_signers(&self) -> Result<Vec<Pubkey>, CodecError> {
        let data = self.message_data()?;
        Ok(self
            .required_signers()
            .iter()
            .enumerate()
            .filter(|(i, key)| match self.signatures.get(*i) {
                Some(sig) => !verify_signature(key, &data, sig),
                None => true,
            })
            .map(|(_, key)| *key)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::instruction::{create_account, MINT_SIZE};
    use crate::chain::message::{Hash, MessageVersion};
    use crate::chain::pubkey::TOKEN_2022_PROGRAM_ID;
    use crate::crypto::KeyPair;

    fn unsigned(payer: &KeyPair, mint: &KeyPair) -> VersionedTransaction {
        let ix = create_account(
            &payer.pubkey(),
            &mint.pubkey(),
            5_000,
            MINT_SIZE,
            &TOKEN_2022_PROGRAM_ID,
        );
        let message =
            Message::compile(MessageVersion::V0, &payer.pubkey(), &[ix], Hash::new([3; 32]))
                .unwrap();
        VersionedTransaction::new_unsigned(message)
    }

    #[test]
    fn test_new_unsigned_has_placeholders() {
        let tx = unsigned(&KeyPair::generate(), &KeyPair::generate());
        assert_eq!(tx.signatures.len(), 2);
        assert!(tx.signatures.iter().all(Signature::is_placeholder));
    }

    #[test]
    fn test_wire_decode_matches() {
        let payer = KeyPair::generate();
        let mint = KeyPair::generate();
        let mut tx = unsigned(&payer, &mint);
        let data = tx.message_data().unwrap();
        tx.signatures[0] = payer.sign(&data);

        let encoded = tx.to_base58().unwrap();
        let decoded = VersionedTransaction::from_base58(&encoded).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.id(), Some(&tx.signatures[0]));
    }

    #[test]
    fn test_unverified_signers() {
        let payer = KeyPair::generate();
        let mint = KeyPair::generate();
        let mut tx = unsigned(&payer, &mint);
        assert_eq!(tx.unverified_signers().unwrap(), vec![payer.pubkey(), mint.pubkey()]);

        let data = tx.message_data().unwrap();
        tx.signatures[0] = payer.sign(&data);
        tx.signatures[1] = mint.sign(&data);
        assert!(tx.unverified_signers().unwrap().is_empty());

        // swapped slots break the positional contract
        tx.signatures.swap(0, 1);
        assert_eq!(tx.unverified_signers().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let tx = unsigned(&KeyPair::generate(), &KeyPair::generate());
        let mut bytes = tx.serialize().unwrap();
        bytes.push(0);
        assert_eq!(
            VersionedTransaction::deserialize(&bytes),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_rejects_slot_count_mismatch() {
        let mut tx = unsigned(&KeyPair::generate(), &KeyPair::generate());
        tx.signatures.pop();
        let bytes = tx.serialize().unwrap();
        assert!(matches!(
            VersionedTransaction::deserialize(&bytes),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_signature_parse() {
        let sig = KeyPair::generate().sign(b"x");
        let parsed: Signature = sig.to_string().parse().unwrap();
        assert_eq!(parsed, sig);

        let short = bs58::encode([1u8; 63]).into_string();
        assert!(short.parse::<Signature>().is_err());
        assert_eq!(Signature::try_from(&[0u8; 10][..]), Err(10));
    }
}
