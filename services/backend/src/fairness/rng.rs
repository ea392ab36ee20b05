//! HMAC-SHA256 draw stream
//!
//! Round `n` digests `"{client_seed}:{nonce}:{n}"` keyed by the server seed.
//! Each 32-byte digest is cut into eight 4-byte groups and each group maps to
//! a float in `[0, 1)` as `b0/256 + b1/256^2 + b2/256^3 + b3/256^4`. When a
//! digest is exhausted the next round is computed.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const DIGEST_LEN: usize = 32;
const BYTES_PER_DRAW: usize = 4;

/// Deterministic stream of draws for one bet
pub struct DrawStream<'a> {
    server_seed: &'a str,
    client_seed: &'a str,
    nonce: i64,
    round: u64,
    digest: [u8; DIGEST_LEN],
    cursor: usize,
}

impl<'a> DrawStream<'a> {
    pub fn new(server_seed: &'a str, client_seed: &'a str, nonce: i64) -> Self {
        Self {
            server_seed,
            client_seed,
            nonce,
            round: 0,
            digest: [0; DIGEST_LEN],
            // Forces the first call to compute round 0
            cursor: DIGEST_LEN,
        }
    }

    /// Next draw in `[0, 1)`
    pub fn next_draw(&mut self) -> f64 {
        if self.cursor + BYTES_PER_DRAW > DIGEST_LEN {
            self.digest = round_digest(self.server_seed, self.client_seed, self.nonce, self.round);
            self.round += 1;
            self.cursor = 0;
        }

        let group = &self.digest[self.cursor..self.cursor + BYTES_PER_DRAW];
        self.cursor += BYTES_PER_DRAW;

        group
            .iter()
            .enumerate()
            .map(|(i, byte)| f64::from(*byte) / 256f64.powi(i as i32 + 1))
            .sum()
    }

    /// Uniform index in `[0, bound)` taken from the next draw
    pub fn next_index(&mut self, bound: usize) -> usize {
        let scaled = (self.next_draw() * bound as f64).floor() as usize;
        scaled.min(bound.saturating_sub(1))
    }
}

/// Raw digest for one round, exposed for verification tooling
pub fn round_digest(server_seed: &str, client_seed: &str, nonce: i64, round: u64) -> [u8; DIGEST_LEN] {
    // HMAC is defined for keys of every length, so construction cannot fail.
    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}:{}:{}", client_seed, nonce, round).as_bytes());

    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_are_deterministic() {
        let mut a = DrawStream::new("server", "client", 7);
        let mut b = DrawStream::new("server", "client", 7);
        for _ in 0..20 {
            assert_eq!(a.next_draw(), b.next_draw());
        }
    }

    #[test]
    fn test_draws_in_unit_interval() {
        let mut stream = DrawStream::new("seed", "player", 1);
        for _ in 0..200 {
            let draw = stream.next_draw();
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn test_first_draw_matches_digest_bytes() {
        let digest = round_digest("server", "client", 3, 0);
        let expected = f64::from(digest[0]) / 256.0
            + f64::from(digest[1]) / 65_536.0
            + f64::from(digest[2]) / 16_777_216.0
            + f64::from(digest[3]) / 4_294_967_296.0;

        let mut stream = DrawStream::new("server", "client", 3);
        assert_eq!(stream.next_draw(), expected);
    }

    #[test]
    fn test_ninth_draw_starts_next_round() {
        let second_round = round_digest("server", "client", 3, 1);
        let mut stream = DrawStream::new("server", "client", 3);
        for _ in 0..8 {
            stream.next_draw();
        }
        let expected = f64::from(second_round[0]) / 256.0
            + f64::from(second_round[1]) / 65_536.0
            + f64::from(second_round[2]) / 16_777_216.0
            + f64::from(second_round[3]) / 4_294_967_296.0;
        assert_eq!(stream.next_draw(), expected);
    }

    #[test]
    fn test_nonce_changes_stream() {
        let mut a = DrawStream::new("server", "client", 1);
        let mut b = DrawStream::new("server", "client", 2);
        assert_ne!(a.next_draw(), b.next_draw());
    }

    #[test]
    fn test_next_index_bounds() {
        let mut stream = DrawStream::new("server", "client", 9);
        for bound in 1..=25 {
            assert!(stream.next_index(bound) < bound);
        }
    }
}
