//! Keyed, row-scoped pseudorandom sampling.
//!
//! Insertion and detection never communicate. They agree on which rows,
//! attributes and bits carry the fingerprint only because both re-derive the
//! same draw sequence from the owner's secret key and each row's primary key:
//!
//! ```text
//! seed = (secret_key << 20) | primary_key
//! ```
//!
//! A fresh generator is built for every row, so decisions never depend on
//! row order, deletions, or which thread handled the row.
//!
//! # Draw order
//!
//! 1. `mark % gamma == 0` selects the row
//! 2. attribute index (uniform, or weighted by `1 - weight`; one draw either way)
//! 3. `bit % xi`
//! 4. `mask % 2`
//! 5. `fingerprint % fingerprint_length`
//!
//! Insertion may take one more draw afterwards to pick a categorical code.
//!
//! # Generator policy (v1)
//!
//! The 16-byte big-endian seed is hashed with SHA3-256 under a domain tag and
//! the digest keys a ChaCha20 stream. Each draw is one raw `u64` of that
//! stream. Changing any of this is a new [`SchemeVersion`].

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha3::{Digest, Sha3_256};

use crate::dataset::{AttributeWeights, MarkableColumns};
use crate::key::SecretKey;
use crate::params::{EmbeddingParams, SchemeVersion, PRIMARY_KEY_BITS};

/// Domain tag for v1 row seeds.
const ROW_SEED_DOMAIN_V1: &[u8] = b"datamark/row-sampler/v1";

/// Scale mapping the top 53 bits of a draw into [0, 1).
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// Concatenate the secret key and a primary key into the per-row seed.
pub fn row_seed(key: &SecretKey, primary_key: u32) -> u128 {
    (u128::from(key.value()) << PRIMARY_KEY_BITS) | u128::from(primary_key)
}

/// Everything the sampler decided for a selected row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkDecision {
    /// Index into the markable columns.
    pub attr_index: usize,
    /// Bit position in `[0, xi)`.
    pub bit_index: u32,
    pub mask_bit: u8,
    /// Fingerprint position in `[0, fingerprint_length)`.
    pub fingerprint_index: usize,
}

/// Row-scoped draw sequence.
pub struct RowSampler {
    rng: ChaCha20Rng,
}

impl RowSampler {
    /// Build the generator for one row.
    pub fn new(version: SchemeVersion, key: &SecretKey, primary_key: u32) -> Self {
        let seed = row_seed(key, primary_key);
        let digest = match version {
            SchemeVersion::V1 => {
                let mut hasher = Sha3_256::new();
                hasher.update(ROW_SEED_DOMAIN_V1);
                hasher.update(seed.to_be_bytes());
                hasher.finalize()
            }
        };
        Self {
            rng: ChaCha20Rng::from_seed(digest.into()),
        }
    }

    /// Next raw draw.
    pub fn draw(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Next draw reduced modulo `n` (`n` must be non-zero).
    pub fn draw_below(&mut self, n: u64) -> u64 {
        self.draw() % n
    }

    /// Next draw mapped into [0, 1).
    pub fn draw_unit(&mut self) -> f64 {
        (self.draw() >> 11) as f64 * UNIT_SCALE
    }

    /// Run draws 1 to 5 for the row.
    ///
    /// Returns `None` when the row is not selected. The sampler stays usable
    /// for follow-up draws (categorical code choice).
    pub fn decide(
        &mut self,
        params: &EmbeddingParams,
        columns: &MarkableColumns,
        weights: Option<&AttributeWeights>,
    ) -> Option<MarkDecision> {
        if self.draw_below(u64::from(params.gamma)) != 0 {
            return None;
        }
        let attr_index = match weights {
            Some(weights) => weights.pick(self.draw_unit()),
            None => self.draw_below(columns.len() as u64) as usize,
        };
        let bit_index = self.draw_below(u64::from(params.xi)) as u32;
        let mask_bit = self.draw_below(2) as u8;
        let fingerprint_index = self.draw_below(params.fingerprint_length as u64) as usize;
        Some(MarkDecision {
            attr_index,
            bit_index,
            mask_bit,
            fingerprint_index,
        })
    }
}
