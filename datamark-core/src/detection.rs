//! Fingerprint detection by majority vote.
//!
//! Detection replays the insertion-side sampler for every row of a suspect
//! copy. Each selected row reads back its mark bit, unmasks it and casts one
//! vote for the fingerprint position it was assigned. Votes form a
//! commutative monoid, so rows can be processed in any order or partition.

use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::extract_bit;
use crate::dataset::{Dataset, Row};
use crate::error::Result;
use crate::key::SecretKey;
use crate::params::{MarkingConfig, MarkingPlan};
use crate::sampler::RowSampler;

/// One recovered fingerprint position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Zero,
    One,
    /// No votes, or an exact tie.
    Unknown,
}

impl Symbol {
    /// Majority decision over `(v0, v1)` vote counts.
    pub fn decide(v0: u64, v1: u64) -> Self {
        match v0.cmp(&v1) {
            std::cmp::Ordering::Greater => Self::Zero,
            std::cmp::Ordering::Less => Self::One,
            std::cmp::Ordering::Equal => Self::Unknown,
        }
    }

    /// The bit, if known.
    pub fn bit(self) -> Option<u8> {
        match self {
            Self::Zero => Some(0),
            Self::One => Some(1),
            Self::Unknown => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Zero => '0',
            Self::One => '1',
            Self::Unknown => '?',
        }
    }
}

/// Fingerprint recovered from a suspect dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredTemplate {
    symbols: Vec<Symbol>,
}

impl RecoveredTemplate {
    pub fn from_symbols(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Positions that could not be decided.
    pub fn unknown_count(&self) -> usize {
        self.symbols
            .iter()
            .filter(|s| **s == Symbol::Unknown)
            .count()
    }

    /// Positions carrying a decided bit.
    pub fn known_count(&self) -> usize {
        self.len() - self.unknown_count()
    }
}

impl fmt::Display for RecoveredTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

/// `fingerprint_length x 2` vote counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTable {
    votes: Vec<[u64; 2]>,
}

impl VoteTable {
    pub fn new(fingerprint_length: usize) -> Self {
        Self {
            votes: vec![[0; 2]; fingerprint_length],
        }
    }

    /// Record one vote for `bit` at `position`.
    pub fn cast(&mut self, position: usize, bit: u8) {
        if let Some(counts) = self.votes.get_mut(position) {
            counts[usize::from(bit & 1)] += 1;
        }
    }

    /// Fold another shard's votes into this one.
    pub fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.votes.iter_mut().zip(other.votes) {
            mine[0] += theirs[0];
            mine[1] += theirs[1];
        }
        self
    }

    /// `(v0, v1)` at a position.
    pub fn counts(&self, position: usize) -> Option<(u64, u64)> {
        self.votes.get(position).map(|c| (c[0], c[1]))
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Total votes cast.
    pub fn total(&self) -> u64 {
        self.votes.iter().map(|c| c[0] + c[1]).sum()
    }

    /// Majority-decode every position.
    pub fn decode(&self) -> RecoveredTemplate {
        RecoveredTemplate::from_symbols(
            self.votes
                .iter()
                .map(|c| Symbol::decide(c[0], c[1]))
                .collect(),
        )
    }
}

/// Counters gathered during a detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub rows: usize,
    /// Rows the sampler selected.
    pub selected: usize,
    /// Selected rows whose cell was empty or absent.
    pub abstained: usize,
}

impl DetectionStats {
    fn merge(self, other: Self) -> Self {
        Self {
            rows: self.rows + other.rows,
            selected: self.selected + other.selected,
            abstained: self.abstained + other.abstained,
        }
    }
}

/// Result of a detection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub template: RecoveredTemplate,
    pub votes: VoteTable,
    pub stats: DetectionStats,
}

/// Recover the fingerprint template embedded in `dataset`.
///
/// `config` and `key` must match the ones used at insertion.
///
/// # Errors
///
/// Fails before scanning rows when the configuration is invalid for the
/// dataset's schema.
pub fn detect(dataset: &Dataset, config: &MarkingConfig, key: &SecretKey) -> Result<Detection> {
    let plan = config.plan(dataset.schema())?;
    let length = plan.params.fingerprint_length;
    let empty = || (VoteTable::new(length), DetectionStats::default());
    let fold = |(mut votes, stats): (VoteTable, DetectionStats), row: &Row| {
        let stats = stats.merge(vote_row(row, &plan, key, &mut votes));
        (votes, stats)
    };

    #[cfg(feature = "parallel")]
    let (votes, stats) = dataset
        .rows()
        .par_iter()
        .fold(empty, fold)
        .reduce(empty, |(a, sa), (b, sb)| (a.merge(b), sa.merge(sb)));
    #[cfg(not(feature = "parallel"))]
    let (votes, stats) = dataset.rows().iter().fold(empty(), fold);

    let template = votes.decode();
    debug!(
        rows = stats.rows,
        selected = stats.selected,
        votes = votes.total(),
        unknown = template.unknown_count(),
        "Detection pass complete"
    );

    Ok(Detection {
        template,
        votes,
        stats,
    })
}

fn vote_row(row: &Row, plan: &MarkingPlan, key: &SecretKey, votes: &mut VoteTable) -> DetectionStats {
    let mut stats = DetectionStats {
        rows: 1,
        ..DetectionStats::default()
    };
    let mut sampler = RowSampler::new(plan.version, key, row.primary_key());
    let Some(decision) = sampler.decide(&plan.params, &plan.columns, plan.weights.as_ref()) else {
        return stats;
    };
    stats.selected = 1;

    let mark_bit = plan
        .columns
        .column(decision.attr_index)
        .and_then(|column| row.value(column))
        .and_then(|value| extract_bit(value, decision.bit_index));
    match mark_bit {
        Some(mark_bit) => {
            let fingerprint_bit = (mark_bit + decision.mask_bit) % 2;
            votes.cast(decision.fingerprint_index, fingerprint_bit);
        }
        None => stats.abstained = 1,
    }
    stats
}
