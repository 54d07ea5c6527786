//! High-level fingerprinting scheme.
//!
//! [`Scheme`] bundles the marking configuration, the recipient count and the
//! fingerprint code, so callers only pass a dataset, a key and a recipient.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::detection::{self, DetectionStats, RecoveredTemplate, VoteTable};
use crate::error::{DatamarkError, Result};
use crate::fingerprint::{Fingerprint, FingerprintCode, KeyedPseudorandomCode, RecipientId};
use crate::identify::{rank_candidates, verdict, CandidateScore};
use crate::insertion::{self, InsertionOutcome};
use crate::key::SecretKey;
use crate::params::{check_recipient, MarkingConfig};

/// Outcome of running detection and identification on a suspect copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub template: RecoveredTemplate,
    pub votes: VoteTable,
    pub stats: DetectionStats,
    /// The single recipient matching every decided position, if any.
    pub suspect: Option<RecipientId>,
    /// All recipients, closest first. Informational only.
    pub ranking: Vec<CandidateScore>,
}

impl DetectionReport {
    /// Recipients whose fingerprint agrees with every decided position.
    pub fn exact_matches(&self) -> Vec<RecipientId> {
        self.ranking
            .iter()
            .filter(|score| score.is_exact())
            .map(|score| score.recipient)
            .collect()
    }
}

/// Fingerprinting scheme for a fixed set of recipients.
#[derive(Debug, Clone)]
pub struct Scheme<C = KeyedPseudorandomCode> {
    config: MarkingConfig,
    recipients: u32,
    code: C,
}

impl Scheme<KeyedPseudorandomCode> {
    /// Scheme using the default keyed pseudorandom code.
    pub fn new(config: MarkingConfig, recipients: u32) -> Result<Self> {
        Self::with_code(config, recipients, KeyedPseudorandomCode)
    }
}

impl<C: FingerprintCode> Scheme<C> {
    pub fn with_code(config: MarkingConfig, recipients: u32, code: C) -> Result<Self> {
        config.params.validate()?;
        if recipients == 0 {
            return Err(DatamarkError::InvalidParams(
                "number of recipients must be at least 1".into(),
            ));
        }
        Ok(Self {
            config,
            recipients,
            code,
        })
    }

    pub fn config(&self) -> &MarkingConfig {
        &self.config
    }

    pub fn recipients(&self) -> u32 {
        self.recipients
    }

    /// Fingerprint assigned to `recipient`.
    pub fn fingerprint(&self, key: &SecretKey, recipient: RecipientId) -> Result<Fingerprint> {
        check_recipient(recipient, self.recipients)?;
        self.code.generate(
            key,
            recipient,
            self.recipients,
            self.config.params.fingerprint_length,
        )
    }

    /// Produce the copy of `dataset` destined for `recipient`.
    pub fn insert(
        &self,
        dataset: &Dataset,
        recipient: RecipientId,
        key: &SecretKey,
    ) -> Result<InsertionOutcome> {
        let started = Instant::now();
        info!(
            recipient,
            rows = dataset.len(),
            gamma = self.config.params.gamma,
            xi = self.config.params.xi,
            fingerprint_length = self.config.params.fingerprint_length,
            "Inserting fingerprint"
        );

        let fingerprint = self.fingerprint(key, recipient)?;
        debug!(recipient, fingerprint = %fingerprint, "Generated fingerprint");
        let outcome = insertion::insert(dataset, &self.config, key, &fingerprint)?;

        let metrics = &outcome.metrics;
        info!(
            recipient,
            marked = metrics.marked,
            marked_ratio = %format!("{:.4}", metrics.marked_ratio()),
            mean_embeddings_per_bit = %format!("{:.2}", metrics.mean_embeddings_per_bit()),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fingerprint inserted"
        );
        if metrics.skipped() > 0 {
            warn!(
                no_parity = metrics.skipped_no_parity,
                missing = metrics.skipped_missing,
                overflow = metrics.skipped_overflow,
                "Some selected cells could not carry a mark"
            );
        }
        Ok(outcome)
    }

    /// Recover the template from a suspect copy and look for the recipient
    /// it was issued to.
    pub fn detect(&self, dataset: &Dataset, key: &SecretKey) -> Result<DetectionReport> {
        let started = Instant::now();
        info!(rows = dataset.len(), "Detecting fingerprint");

        let detection = detection::detect(dataset, &self.config, key)?;
        let ranking = rank_candidates(&detection.template, key, self.recipients, &self.code)?;
        let suspect = verdict(&ranking);

        info!(
            template = %detection.template,
            unknown = detection.template.unknown_count(),
            selected = detection.stats.selected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fingerprint detected"
        );
        match suspect {
            Some(recipient) => info!(recipient, "Recipient {recipient} is suspected"),
            None => info!("No one suspected"),
        }

        Ok(DetectionReport {
            template: detection.template,
            votes: detection.votes,
            stats: detection.stats,
            suspect,
            ranking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeType, Column, Row, Schema, Value};
    use crate::params::EmbeddingParams;

    fn dataset(rows: u64) -> Dataset {
        let schema = Schema::new(vec![
            Column::new("x", AttributeType::Integer),
            Column::new("y", AttributeType::Integer),
        ])
        .unwrap();
        let rows = (0..rows)
            .map(|pk| {
                Row::new(
                    pk,
                    vec![
                        Value::Integer(1_000 + pk as i64 * 7),
                        Value::Integer(50_000 - pk as i64 * 3),
                    ],
                )
                .unwrap()
            })
            .collect();
        Dataset::new(schema, rows).unwrap()
    }

    #[test]
    fn test_rejects_zero_recipients() {
        let config = MarkingConfig::new(EmbeddingParams::new(2, 1, 16).unwrap());
        assert!(Scheme::new(config, 0).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_recipient() {
        let config = MarkingConfig::new(EmbeddingParams::new(2, 1, 16).unwrap());
        let scheme = Scheme::new(config, 3).unwrap();
        let err = scheme
            .insert(&dataset(10), 3, &SecretKey::new(1))
            .unwrap_err();
        assert!(matches!(err, DatamarkError::InvalidRecipient { recipient: 3, total: 3 }));
    }

    #[test]
    fn test_insert_then_detect_names_recipient() {
        let config = MarkingConfig::new(EmbeddingParams::new(2, 2, 24).unwrap());
        let scheme = Scheme::new(config, 8).unwrap();
        let key = SecretKey::new(4242);
        let original = dataset(1_500);

        let outcome = scheme.insert(&original, 5, &key).unwrap();
        let report = scheme.detect(&outcome.dataset, &key).unwrap();

        assert_eq!(report.suspect, Some(5));
        assert_eq!(report.exact_matches(), vec![5]);
        assert_eq!(report.ranking[0].recipient, 5);
        assert_eq!(report.ranking.len(), 8);
        assert_eq!(report.stats.rows, 1_500);
    }

    #[test]
    fn test_report_serializes() {
        let config = MarkingConfig::new(EmbeddingParams::new(1, 1, 8).unwrap());
        let scheme = Scheme::new(config, 2).unwrap();
        let key = SecretKey::new(7);
        let report = scheme.detect(&dataset(40), &key).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: DetectionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
