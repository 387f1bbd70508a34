//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing
//! - Ed25519 key management and detached signatures

pub mod hash;
pub mod keys;

pub use hash::sha256_parts;
pub use keys::{verify_signature, KeyError, KeyPair};
