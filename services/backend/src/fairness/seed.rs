//! Seed generation and commitments

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Random bytes behind a server seed (hex-encoded to 64 chars)
pub const SERVER_SEED_BYTES: usize = 32;

/// Random bytes behind a default client seed (hex-encoded to 16 chars)
pub const DEFAULT_CLIENT_SEED_BYTES: usize = 8;

/// Fresh server seed from the OS CSPRNG
pub fn generate_server_seed() -> String {
    random_hex(SERVER_SEED_BYTES)
}

/// Default client seed assigned until the player picks one
pub fn generate_client_seed() -> String {
    random_hex(DEFAULT_CLIENT_SEED_BYTES)
}

/// Public commitment: lowercase hex SHA-256 of the seed string
pub fn commitment(server_seed: &str) -> String {
    hex::encode(Sha256::digest(server_seed.as_bytes()))
}

pub fn verify_commitment(server_seed: &str, server_seed_hash: &str) -> bool {
    commitment(server_seed).eq_ignore_ascii_case(server_seed_hash)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_seed_shape() {
        let seed = generate_server_seed();
        assert_eq!(seed.len(), SERVER_SEED_BYTES * 2);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(seed, generate_server_seed());
    }

    #[test]
    fn test_client_seed_shape() {
        assert_eq!(generate_client_seed().len(), 16);
    }

    #[test]
    fn test_commitment_known_vector() {
        // sha256("abc")
        assert_eq!(
            commitment("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(verify_commitment(
            "abc",
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        ));
        assert!(!verify_commitment("abd", &commitment("abc")));
    }
}
