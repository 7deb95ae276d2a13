//! Identifier and authorization-code generation
//!
//! All entity identifiers are opaque positive 64-bit integers in the
//! 12-digit window `[100_000_000_000, 999_999_999_999]`. Idempotency keys
//! map into the same window through a SHA-256 fold, so a given key always
//! derives the same request id; the decision cache is additionally keyed by
//! the full key to rule out fold collisions.

use rand::Rng;
use sha2::{Digest, Sha256};

const ID_WINDOW_BASE: i64 = 100_000_000_000;
const ID_WINDOW_SPAN: i64 = 900_000_000_000;

/// Generate a fresh random entity id in the 12-digit window.
pub fn generate_id() -> i64 {
    let mut rng = rand::thread_rng();
    ID_WINDOW_BASE + rng.gen_range(0..ID_WINDOW_SPAN)
}

/// Derive a deterministic request id from an idempotency key.
///
/// A 64-bit prefix of SHA-256 over the key bytes, folded into the positive
/// 12-digit id window.
pub fn request_id_for_key(key: &str) -> i64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let hash = u64::from_be_bytes(prefix);
    ID_WINDOW_BASE + (hash % ID_WINDOW_SPAN as u64) as i64
}

/// Generate a six-digit authorization code, zero-padded.
pub fn generate_authorization_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_in_window() {
        for _ in 0..100 {
            let id = generate_id();
            assert!((100_000_000_000..=999_999_999_999).contains(&id));
        }
    }

    #[test]
    fn test_request_id_for_key_is_deterministic() {
        let a = request_id_for_key("K1");
        let b = request_id_for_key("K1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_request_id_for_key_differs_per_key() {
        assert_ne!(request_id_for_key("K1"), request_id_for_key("K2"));
    }

    #[test]
    fn test_request_id_for_key_in_window() {
        for key in ["a", "b", "idempotency-key-with-length", ""] {
            let id = request_id_for_key(key);
            assert!((100_000_000_000..=999_999_999_999).contains(&id));
        }
    }

    #[test]
    fn test_authorization_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_authorization_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
