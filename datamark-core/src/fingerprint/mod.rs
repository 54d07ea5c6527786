//! Per-recipient fingerprint codes.
//!
//! A fingerprint is a fixed-length bit vector derived from the owner's secret
//! key and a recipient id. The code family is pluggable through
//! [`FingerprintCode`]; the engine only relies on generation being pure and
//! deterministic.
//!
//! # Components
//!
//! - **Fingerprint**: the bit vector itself
//! - **KeyedPseudorandomCode**: default code, independent keyed random bits
//!   per recipient

mod keyed;

pub use keyed::KeyedPseudorandomCode;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DatamarkError, Result};
use crate::key::SecretKey;

/// Recipient (buyer) identifier in `[0, total_recipients)`.
pub type RecipientId = u32;

/// Source of recipient fingerprints.
///
/// Implementations must be referentially transparent: the same inputs always
/// produce the same bits, on every installation.
pub trait FingerprintCode: Send + Sync {
    /// Generate the fingerprint of `recipient`.
    fn generate(
        &self,
        key: &SecretKey,
        recipient: RecipientId,
        total_recipients: u32,
        length: usize,
    ) -> Result<Fingerprint>;
}

/// Immutable per-recipient bit vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    bits: Vec<bool>,
}

impl Fingerprint {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Parse a `0`/`1` string.
    pub fn parse(text: &str) -> Result<Self> {
        text.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(DatamarkError::SerializationError(format!(
                    "invalid fingerprint symbol {other:?}"
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::from_bits)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bit at `index` as 0 or 1.
    pub fn bit(&self, index: usize) -> Option<u8> {
        self.bits.get(index).map(|&b| u8::from(b))
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Number of differing positions; `None` when lengths differ.
    pub fn hamming_distance(&self, other: &Self) -> Option<usize> {
        if self.len() != other.len() {
            return None;
        }
        Some(
            self.bits
                .iter()
                .zip(&other.bits)
                .filter(|(a, b)| a != b)
                .count(),
        )
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Generate every recipient's fingerprint.
pub fn generate_all<C: FingerprintCode + ?Sized>(
    code: &C,
    key: &SecretKey,
    total_recipients: u32,
    length: usize,
) -> Result<Vec<Fingerprint>> {
    (0..total_recipients)
        .map(|recipient| code.generate(key, recipient, total_recipients, length))
        .collect()
}

/// Mean pairwise Hamming distance across a set of fingerprints.
///
/// Returns `None` with fewer than two fingerprints or mixed lengths.
pub fn mean_pairwise_distance(fingerprints: &[Fingerprint]) -> Option<f64> {
    if fingerprints.len() < 2 {
        return None;
    }
    let mut total = 0usize;
    let mut pairs = 0usize;
    for (i, a) in fingerprints.iter().enumerate() {
        for b in &fingerprints[i + 1..] {
            total += a.hamming_distance(b)?;
            pairs += 1;
        }
    }
    Some(total as f64 / pairs as f64)
}
