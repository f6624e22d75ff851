//! Hashing of the shared authentication secret (spec §4.5/§6).
//!
//! The server pre-hashes `auth_key` once at startup and compares digests
//! rather than plaintext on every `AUTH_KEY` request; the client hashes
//! its configured key the same way before sending it.

use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 digest of `secret`, the form carried on the
/// wire in an `AUTH_KEY` request's `auth_key` field.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_secret_hashes_the_same() {
        assert_eq!(hash_secret("123"), hash_secret("123"));
    }

    #[test]
    fn different_secrets_hash_differently() {
        assert_ne!(hash_secret("123"), hash_secret("1234"));
    }

    #[test]
    fn digest_is_lowercase_hex_of_expected_length() {
        let digest = hash_secret("abc");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
