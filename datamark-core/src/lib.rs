//! Datamark Core - fingerprinting and traitor tracing for relational datasets
//!
//! This crate embeds a per-recipient, secret-keyed fingerprint into the
//! low-order bits and category codes of a table, recovers it from a possibly
//! trimmed or shuffled copy by majority vote, and names the recipient the
//! copy was issued to.
//!
//! # Features
//!
//! - Keyed per-row sampling: insertion and detection agree through the secret
//!   key and each row's primary key alone
//! - Type-aware codec for integer, decimal and categorical columns
//! - Order-independent detection, robust to row deletion and reordering
//! - Pluggable fingerprint codes behind [`FingerprintCode`]
//! - Data-parallel passes via `rayon` (feature `parallel`, on by default)
//!
//! # Example
//!
//! ```no_run
//! use datamark_core::{
//!     AttributeType, Column, Dataset, DecimalValue, EmbeddingParams, MarkingConfig, Row,
//!     Schema, Scheme, SecretKey, Value,
//! };
//!
//! # fn example() -> datamark_core::Result<()> {
//! let schema = Schema::new(vec![
//!     Column::new("age", AttributeType::Integer),
//!     Column::new("income", AttributeType::Decimal),
//! ])?;
//! let rows = (0..1_000u64)
//!     .map(|pk| {
//!         let income: DecimalValue = format!("{}.50", 2_000 + pk).parse()?;
//!         Row::new(pk, vec![Value::Integer(20 + (pk % 50) as i64), Value::Decimal(income)])
//!     })
//!     .collect::<datamark_core::Result<Vec<_>>>()?;
//! let dataset = Dataset::new(schema, rows)?;
//!
//! let scheme = Scheme::new(MarkingConfig::new(EmbeddingParams::new(10, 1, 32)?), 16)?;
//! let key = SecretKey::new(1234);
//!
//! // Hand recipient 3 a fingerprinted copy
//! let copy = scheme.insert(&dataset, 3, &key)?.dataset;
//!
//! // Later, trace a leaked copy back to its recipient
//! let report = scheme.detect(&copy, &key)?;
//! assert_eq!(report.suspect, Some(3));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod dataset;
pub mod detection;
pub mod error;
pub mod fingerprint;
pub mod identify;
pub mod insertion;
pub mod key;
pub mod params;
pub mod record;
pub mod sampler;
pub mod scheme;

// Re-export main types for convenience
pub use dataset::{
    AttributeType, AttributeWeights, CategoryIndex, Column, ColumnSelection, Dataset,
    DecimalValue, MarkableColumns, Row, Schema, Value, PRIMARY_KEY_LIMIT,
};
pub use detection::{detect, Detection, DetectionStats, RecoveredTemplate, Symbol, VoteTable};
pub use error::{DatamarkError, Result};
pub use fingerprint::{Fingerprint, FingerprintCode, KeyedPseudorandomCode, RecipientId};
pub use identify::{identify, rank_candidates, CandidateScore};
pub use insertion::{insert, InsertionMetrics, InsertionOutcome};
pub use key::SecretKey;
pub use params::{EmbeddingParams, MarkingConfig, SchemeVersion, MAX_XI, PRIMARY_KEY_BITS};
pub use record::{RecordFormat, SchemeRecord};
pub use scheme::{DetectionReport, Scheme};

#[cfg(test)]
mod tests {
    use super::*;

    /// Full workflow through the free functions: generate, insert, detect,
    /// identify.
    #[test]
    fn test_full_fingerprint_workflow() {
        let schema = Schema::new(vec![
            Column::new("qty", AttributeType::Integer),
            Column::new("price", AttributeType::Decimal),
        ])
        .unwrap();
        let rows = (0..800u64)
            .map(|pk| {
                let price = DecimalValue::new(10_000 + pk as i64 * 13, 2).unwrap();
                Row::new(pk, vec![Value::Integer(pk as i64 % 97), Value::Decimal(price)]).unwrap()
            })
            .collect();
        let dataset = Dataset::new(schema, rows).unwrap();

        let config = MarkingConfig::new(EmbeddingParams::new(2, 1, 16).unwrap());
        let key = SecretKey::new(31337);
        let code = KeyedPseudorandomCode;
        let fingerprint = code.generate(&key, 2, 6, 16).unwrap();

        let outcome = insert(&dataset, &config, &key, &fingerprint).unwrap();
        assert!(outcome.metrics.marked > 0);

        let detection = detect(&outcome.dataset, &config, &key).unwrap();
        assert_eq!(detection.template.unknown_count(), 0);
        assert_eq!(detection.template.to_string(), fingerprint.to_string());
        assert_eq!(identify(&detection.template, &key, 6, &code).unwrap(), Some(2));
    }

    #[test]
    fn test_wrong_key_does_not_identify() {
        let schema = Schema::new(vec![Column::new("v", AttributeType::Integer)]).unwrap();
        let rows = (0..600u64)
            .map(|pk| Row::new(pk, vec![Value::Integer(pk as i64 * 11)]).unwrap())
            .collect();
        let dataset = Dataset::new(schema, rows).unwrap();
        let scheme = Scheme::new(MarkingConfig::new(EmbeddingParams::new(1, 2, 32).unwrap()), 4)
            .unwrap();

        let copy = scheme.insert(&dataset, 1, &SecretKey::new(1)).unwrap().dataset;
        let report = scheme.detect(&copy, &SecretKey::new(2)).unwrap();
        assert_ne!(report.suspect, Some(1));
    }
}
