//! Fingerprint insertion.
//!
//! Every row is handled on its own: the row sampler decides whether and where
//! to mark, the codec writes `mask_bit XOR fingerprint[i]` into the chosen
//! cell, and the result lands in a fresh output row. The input dataset is
//! never modified.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::{embed_bit, SkipReason};
use crate::dataset::{CategoryIndex, Dataset, Row};
use crate::error::{DatamarkError, Result};
use crate::fingerprint::Fingerprint;
use crate::key::SecretKey;
use crate::params::{MarkingConfig, MarkingPlan};
use crate::sampler::RowSampler;

/// Embedding statistics, for reporting only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionMetrics {
    /// Rows scanned.
    pub rows: usize,
    /// Rows whose selected cell now carries a mark.
    pub marked: usize,
    /// Successful embeddings per fingerprint position.
    pub per_bit: Vec<usize>,
    /// Selected categorical cells without a code of the required parity.
    pub skipped_no_parity: usize,
    /// Selected cells that were empty.
    pub skipped_missing: usize,
    /// Selected cells whose marked value would not fit.
    pub skipped_overflow: usize,
}

impl InsertionMetrics {
    fn new(rows: usize, fingerprint_length: usize) -> Self {
        Self {
            rows,
            per_bit: vec![0; fingerprint_length],
            ..Self::default()
        }
    }

    /// Selected rows that could not carry their mark.
    pub fn skipped(&self) -> usize {
        self.skipped_no_parity + self.skipped_missing + self.skipped_overflow
    }

    /// Fraction of rows carrying a mark.
    pub fn marked_ratio(&self) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.marked as f64 / self.rows as f64
    }

    /// Mean number of embeddings per fingerprint position.
    pub fn mean_embeddings_per_bit(&self) -> f64 {
        if self.per_bit.is_empty() {
            return 0.0;
        }
        self.per_bit.iter().sum::<usize>() as f64 / self.per_bit.len() as f64
    }

    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Untouched => {}
            RowOutcome::Marked { fingerprint_index } => {
                self.marked += 1;
                self.per_bit[fingerprint_index] += 1;
            }
            RowOutcome::Skipped(SkipReason::NoCodeWithParity) => self.skipped_no_parity += 1,
            RowOutcome::Skipped(SkipReason::Missing) => self.skipped_missing += 1,
            RowOutcome::Skipped(SkipReason::Overflow) => self.skipped_overflow += 1,
        }
    }
}

/// A fingerprinted copy and how it was produced.
#[derive(Debug, Clone)]
pub struct InsertionOutcome {
    pub dataset: Dataset,
    pub metrics: InsertionMetrics,
}

#[derive(Debug, Clone, Copy)]
enum RowOutcome {
    Untouched,
    Marked { fingerprint_index: usize },
    Skipped(SkipReason),
}

/// Embed `fingerprint` into a copy of `dataset`.
///
/// # Errors
///
/// Fails before touching any row when the configuration is invalid for the
/// dataset's schema or the fingerprint length differs from the configured one.
pub fn insert(
    dataset: &Dataset,
    config: &MarkingConfig,
    key: &SecretKey,
    fingerprint: &Fingerprint,
) -> Result<InsertionOutcome> {
    let plan = config.plan(dataset.schema())?;
    if fingerprint.len() != plan.params.fingerprint_length {
        return Err(DatamarkError::FingerprintLengthMismatch {
            expected: plan.params.fingerprint_length,
            actual: fingerprint.len(),
        });
    }

    let categories = CategoryIndex::build(dataset);
    let mark = |row: &Row| mark_row(row, &plan, key, fingerprint, &categories);

    #[cfg(feature = "parallel")]
    let processed: Vec<(Row, RowOutcome)> = dataset.rows().par_iter().map(mark).collect();
    #[cfg(not(feature = "parallel"))]
    let processed: Vec<(Row, RowOutcome)> = dataset.rows().iter().map(mark).collect();

    let mut metrics = InsertionMetrics::new(dataset.len(), plan.params.fingerprint_length);
    let mut rows = Vec::with_capacity(processed.len());
    for (row, outcome) in processed {
        metrics.record(outcome);
        rows.push(row);
    }

    debug!(
        rows = metrics.rows,
        marked = metrics.marked,
        skipped = metrics.skipped(),
        "Insertion pass complete"
    );

    Ok(InsertionOutcome {
        dataset: dataset.with_rows(rows),
        metrics,
    })
}

fn mark_row(
    row: &Row,
    plan: &MarkingPlan,
    key: &SecretKey,
    fingerprint: &Fingerprint,
    categories: &CategoryIndex,
) -> (Row, RowOutcome) {
    let mut sampler = RowSampler::new(plan.version, key, row.primary_key());
    let Some(decision) = sampler.decide(&plan.params, &plan.columns, plan.weights.as_ref()) else {
        return (row.clone(), RowOutcome::Untouched);
    };

    let (Some(column), Some(fingerprint_bit)) = (
        plan.columns.column(decision.attr_index),
        fingerprint.bit(decision.fingerprint_index),
    ) else {
        return (row.clone(), RowOutcome::Untouched);
    };
    let mark_bit = (decision.mask_bit + fingerprint_bit) % 2;

    let Some(value) = row.value(column) else {
        return (row.clone(), RowOutcome::Untouched);
    };
    let candidates = categories.candidates(column, mark_bit);
    let embedded = embed_bit(value, decision.bit_index, mark_bit, &candidates, |n| {
        sampler.draw_below(n as u64) as usize
    });

    match embedded {
        Ok(marked) => {
            trace!(
                primary_key = row.primary_key(),
                column,
                bit_index = decision.bit_index,
                fingerprint_index = decision.fingerprint_index,
                mark_bit,
                "Marked cell"
            );
            (
                row.with_value(column, marked),
                RowOutcome::Marked {
                    fingerprint_index: decision.fingerprint_index,
                },
            )
        }
        Err(reason) => {
            debug!(
                primary_key = row.primary_key(),
                column,
                reason = ?reason,
                "Skipped mark"
            );
            (row.clone(), RowOutcome::Skipped(reason))
        }
    }
}
