//! Solana chain primitives
//!
//! A small, self-contained implementation of the pieces of the Solana
//! wire format this client needs:
//! - Public keys and program-derived addresses
//! - Compact-u16 lengths
//! - Legacy and v0 messages
//! - Versioned transactions with positional signature slots
//! - JSON-RPC chain client

pub mod codec;
pub mod instruction;
pub mod message;
pub mod pubkey;
pub mod rpc;
pub mod transaction;

pub use codec::CodecError;
pub use instruction::{AccountMeta, Instruction, MINT_SIZE};
pub use message::{Hash, Message, MessageHeader, MessageVersion};
pub use pubkey::{
    Pubkey, ASSOCIATED_TOKEN_PROGRAM_ID, RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_2022_PROGRAM_ID,
};
pub use rpc::{
    BlockhashInfo, ChainClient, CommitmentLevel, RpcChainClient, RpcError, SendOptions,
    SignatureStatus, SimulationResult,
};
pub use transaction::{Signature, VersionedTransaction, SIGNATURE_LENGTH};
