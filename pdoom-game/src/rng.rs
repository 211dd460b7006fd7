//! Deterministic session RNG.
//!
//! Every stochastic decision in a session pulls from a single ChaCha20 stream
//! derived from the seed string. The stream position is part of the persisted
//! record, so a restored session continues the exact same sequence.
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const STREAM_DOMAIN: &[u8] = b"pdoom.session.v1";

/// Counting ChaCha20 stream bound to a seed string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RngRecord", into = "RngRecord")]
pub struct GameRng {
    seed: String,
    rng: ChaCha20Rng,
    draws: u64,
}

/// Persisted form of a [`GameRng`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngRecord {
    pub seed: String,
    /// ChaCha word position within the stream.
    pub word_pos: u64,
    #[serde(default)]
    pub draws: u64,
}

impl GameRng {
    /// Construct the stream from a user-visible seed string.
    #[must_use]
    pub fn from_seed_str(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
            rng: ChaCha20Rng::from_seed(derive_stream_seed(seed)),
            draws: 0,
        }
    }

    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform sample in `[0, 1)`.
    pub fn roll(&mut self) -> f64 {
        self.r#gen::<f64>()
    }

    /// Bernoulli trial succeeding with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.roll() < p
    }

    /// Uniform index in `0..len`; `None` when `len` is zero (no draw consumed).
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.gen_range(0..len))
    }
}

impl PartialEq for GameRng {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.draws == other.draws
            && self.rng.get_word_pos() == other.rng.get_word_pos()
    }
}

impl From<RngRecord> for GameRng {
    fn from(record: RngRecord) -> Self {
        let mut rng = ChaCha20Rng::from_seed(derive_stream_seed(&record.seed));
        rng.set_word_pos(u128::from(record.word_pos));
        Self {
            seed: record.seed,
            rng,
            draws: record.draws,
        }
    }
}

impl From<GameRng> for RngRecord {
    fn from(value: GameRng) -> Self {
        Self {
            word_pos: u64::try_from(value.rng.get_word_pos()).unwrap_or(u64::MAX),
            seed: value.seed,
            draws: value.draws,
        }
    }
}

impl RngCore for GameRng {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn derive_stream_seed(seed: &str) -> [u8; 32] {
    // HMAC accepts keys of any length, including empty ones.
    let mut mac = match Hmac::<Sha256>::new_from_slice(seed.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return [0_u8; 32],
    };
    mac.update(STREAM_DOMAIN);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 32];
    seed_bytes.copy_from_slice(&digest);
    seed_bytes
}
