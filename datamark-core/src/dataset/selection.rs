//! Markable column resolution and attribute weights.

use serde::{Deserialize, Serialize};

use super::Schema;
use crate::error::{DatamarkError, Result};

/// Tolerance when checking that weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Which columns may carry marks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "columns")]
pub enum ColumnSelection {
    /// Every column except the target.
    #[default]
    All,
    /// Every column except the listed ones (and the target).
    Exclude(Vec<String>),
    /// Exactly the listed columns, in the listed order (minus the target).
    Include(Vec<String>),
}

impl ColumnSelection {
    /// Resolve to an ordered list of markable columns.
    ///
    /// The order defines attribute indices drawn by the sampler, so the same
    /// selection must resolve to the same names on both sides.
    pub fn resolve(&self, schema: &Schema) -> Result<MarkableColumns> {
        let lookup = |name: &String| {
            schema.column_index(name).ok_or_else(|| {
                DatamarkError::InvalidSelection(format!("unknown column {name:?}"))
            })
        };

        let candidates: Vec<usize> = match self {
            Self::All => (0..schema.len()).collect(),
            Self::Exclude(names) => {
                let excluded = names.iter().map(lookup).collect::<Result<Vec<_>>>()?;
                (0..schema.len())
                    .filter(|idx| !excluded.contains(idx))
                    .collect()
            }
            Self::Include(names) => {
                let mut included = Vec::with_capacity(names.len());
                for idx in names.iter().map(lookup) {
                    let idx = idx?;
                    if !included.contains(&idx) {
                        included.push(idx);
                    }
                }
                included
            }
        };

        let target = schema.target().and_then(|t| schema.column_index(t));
        let indices: Vec<usize> = candidates
            .into_iter()
            .filter(|idx| Some(*idx) != target)
            .collect();

        if indices.is_empty() {
            return Err(DatamarkError::InvalidSelection(
                "no markable columns remain".into(),
            ));
        }

        let names = indices
            .iter()
            .map(|&idx| schema.columns()[idx].name.clone())
            .collect();
        Ok(MarkableColumns { indices, names })
    }
}

/// Ordered markable columns: attribute index `i` refers to schema column
/// `indices[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkableColumns {
    indices: Vec<usize>,
    names: Vec<String>,
}

impl MarkableColumns {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Schema column for an attribute index.
    pub fn column(&self, attr_index: usize) -> Option<usize> {
        self.indices.get(attr_index).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Per-column relevance weights; heavier columns are marked less often.
///
/// The sampler picks attribute `i` with probability proportional to
/// `1 - weights[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct AttributeWeights {
    weights: Vec<f64>,
}

impl AttributeWeights {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(DatamarkError::InvalidWeights("no weights given".into()));
        }
        if let Some(w) = weights
            .iter()
            .find(|w| !w.is_finite() || **w < 0.0 || **w > 1.0)
        {
            return Err(DatamarkError::InvalidWeights(format!(
                "weight {w} outside [0, 1]"
            )));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DatamarkError::InvalidWeights(format!(
                "weights sum to {sum}, expected 1"
            )));
        }
        let complement: f64 = weights.iter().map(|w| 1.0 - w).sum();
        if complement <= 0.0 {
            return Err(DatamarkError::InvalidWeights(
                "every column has weight 1; nothing can be marked".into(),
            ));
        }
        Ok(Self { weights })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Ensure there is exactly one weight per markable column.
    pub fn check_columns(&self, columns: &MarkableColumns) -> Result<()> {
        if self.weights.len() != columns.len() {
            return Err(DatamarkError::InvalidWeights(format!(
                "{} weights given for {} markable columns",
                self.weights.len(),
                columns.len()
            )));
        }
        Ok(())
    }

    /// Map a unit-interval sample to an attribute index.
    ///
    /// Walks the cumulative `1 - w` mass; columns with weight 1 are never
    /// returned.
    pub(crate) fn pick(&self, unit: f64) -> usize {
        let total: f64 = self.weights.iter().map(|w| 1.0 - w).sum();
        let target = unit * total;
        let mut cumulative = 0.0;
        let mut last_eligible = 0;
        for (idx, w) in self.weights.iter().enumerate() {
            let mass = 1.0 - w;
            if mass <= 0.0 {
                continue;
            }
            cumulative += mass;
            last_eligible = idx;
            if target < cumulative {
                return idx;
            }
        }
        last_eligible
    }
}

impl TryFrom<Vec<f64>> for AttributeWeights {
    type Error = DatamarkError;

    fn try_from(weights: Vec<f64>) -> Result<Self> {
        Self::new(weights)
    }
}

impl From<AttributeWeights> for Vec<f64> {
    fn from(weights: AttributeWeights) -> Self {
        weights.weights
    }
}
