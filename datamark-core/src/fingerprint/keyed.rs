//! Keyed pseudorandom fingerprint code.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha3::{Digest, Sha3_256};

use super::{Fingerprint, FingerprintCode, RecipientId};
use crate::error::Result;
use crate::key::SecretKey;
use crate::params::check_recipient;

/// Domain tag for v1 fingerprints.
const FINGERPRINT_DOMAIN_V1: &[u8] = b"datamark/fingerprint/v1";

/// Independent keyed random bits per recipient.
///
/// Expected pairwise Hamming distance is half the fingerprint length. Bit `i`
/// is bit `i % 64` of the `i / 64`-th draw from a ChaCha20 stream keyed by
/// SHA3-256 over the key, recipient, recipient count and length.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyedPseudorandomCode;

impl FingerprintCode for KeyedPseudorandomCode {
    fn generate(
        &self,
        key: &SecretKey,
        recipient: RecipientId,
        total_recipients: u32,
        length: usize,
    ) -> Result<Fingerprint> {
        check_recipient(recipient, total_recipients)?;

        let mut hasher = Sha3_256::new();
        hasher.update(FINGERPRINT_DOMAIN_V1);
        hasher.update(key.value().to_be_bytes());
        hasher.update(recipient.to_be_bytes());
        hasher.update(total_recipients.to_be_bytes());
        hasher.update((length as u64).to_be_bytes());
        let mut rng = ChaCha20Rng::from_seed(hasher.finalize().into());

        let mut bits = Vec::with_capacity(length);
        while bits.len() < length {
            let word = rng.next_u64();
            let take = (length - bits.len()).min(64);
            bits.extend((0..take).map(|shift| (word >> shift) & 1 == 1));
        }
        Ok(Fingerprint::from_bits(bits))
    }
}
