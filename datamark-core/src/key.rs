//! Owner secret key handling.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// The data owner's secret key.
///
/// Never stored with a dataset or a scheme record, not even as a digest. The
/// value is wiped from memory on drop and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(u64);

impl SecretKey {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw key value, for seed derivation only.
    pub(crate) fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SecretKey {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretKey::new(1234);
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("1234"));
    }
}
