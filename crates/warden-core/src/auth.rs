//! Credential hashing
//!
//! Passwords are never stored or compared in the clear; records hold a
//! lowercase hex SHA-256 digest. The trait seam exists so the engine
//! can surface a hashing failure as an explicit error path instead of
//! panicking, and so tests can inject a failing hasher.

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("credential hashing unavailable: {0}")]
pub struct HashingUnavailable(pub String);

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashingUnavailable>;

    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, HashingUnavailable> {
        Ok(self.hash(password)? == stored_hash)
    }
}

/// SHA-256 hex digests via the `sha2` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl CredentialHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> Result<String, HashingUnavailable> {
        Ok(format!("{:x}", Sha256::digest(password.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_lowercase_hex_sha256() {
        let hash = Sha256Hasher.hash("hunter2").unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        // known digest of the literal string
        assert_eq!(
            hash,
            "f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7"
        );
    }

    #[test]
    fn verify_matches_only_the_same_password() {
        let stored = Sha256Hasher.hash("correct horse").unwrap();
        assert!(Sha256Hasher.verify("correct horse", &stored).unwrap());
        assert!(!Sha256Hasher.verify("wrong horse", &stored).unwrap());
    }
}
