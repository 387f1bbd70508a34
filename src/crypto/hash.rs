//! SHA-256 hashing utilities
//!
//! Used for program-derived address derivation.

use sha2::{Digest, Sha256};

/// Computes SHA-256 over several byte slices as if they were concatenated
pub fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_parts() {
        let hash = sha256_parts(&[b"hello", b" ", b"world"]);
        assert_eq!(hash, sha256_parts(&[b"hello world"]));
        assert_eq!(hash[0], 0xb9);
        assert_eq!(hash[31], 0xe9);
    }
}
