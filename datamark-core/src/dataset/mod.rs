//! Typed relational dataset model consumed by the fingerprinting engine.
//!
//! Loading files, classifying attribute types and encoding categorical
//! labels happen upstream; this module only carries the result:
//!
//! - **Schema**: ordered, named, typed columns plus primary-key and target names
//! - **Rows**: an explicit primary key and one [`Value`] per column
//! - **Category index**: distinct codes per categorical column, built once
//!   from the original data
//! - **Selection**: which columns may carry marks, and optional weights

mod decimal;
mod selection;

pub use decimal::{decimal_places, DecimalValue, MAX_DECIMAL_PLACES};
pub use selection::{AttributeWeights, ColumnSelection, MarkableColumns};

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DatamarkError, Result};
use crate::params::PRIMARY_KEY_BITS;

/// Exclusive upper bound for primary keys.
pub const PRIMARY_KEY_LIMIT: u64 = 1 << PRIMARY_KEY_BITS;

/// Attribute type tag attached once per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Integer,
    Decimal,
    /// Label-encoded to integer codes upstream.
    Categorical,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Integer(i64),
    Decimal(DecimalValue),
    Categorical(i64),
    /// Empty cell; never carries a mark.
    Missing,
}

impl Value {
    /// Type tag of the value, `None` for missing cells.
    pub fn kind(&self) -> Option<AttributeType> {
        match self {
            Self::Integer(_) => Some(AttributeType::Integer),
            Self::Decimal(_) => Some(AttributeType::Decimal),
            Self::Categorical(_) => Some(AttributeType::Categorical),
            Self::Missing => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) | Self::Categorical(v) => write!(f, "{v}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Missing => Ok(()),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: AttributeType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Column layout of a dataset.
///
/// The primary key is carried on each [`Row`] and is not one of the columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
    primary_key: Option<String>,
    target: Option<String>,
}

impl Schema {
    /// Create a schema, rejecting duplicate column names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DatamarkError::InvalidDataset(format!(
                    "duplicate column name {:?}",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            primary_key: None,
            target: None,
        })
    }

    /// Record the name of the primary-key attribute.
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Record the target (label) column, which is never marked.
    pub fn with_target(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if self.column_index(&name).is_none() {
            return Err(DatamarkError::InvalidDataset(format!(
                "target column {name:?} not found"
            )));
        }
        self.target = Some(name);
        Ok(self)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// One tuple: an explicit primary key and one value per schema column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    primary_key: u32,
    values: Vec<Value>,
}

impl Row {
    /// Create a row, rejecting primary keys of 2^20 and above.
    pub fn new(primary_key: u64, values: Vec<Value>) -> Result<Self> {
        if primary_key >= PRIMARY_KEY_LIMIT {
            return Err(DatamarkError::PrimaryKeyOutOfRange {
                key: primary_key,
                bits: PRIMARY_KEY_BITS,
            });
        }
        Ok(Self {
            primary_key: primary_key as u32,
            values,
        })
    }

    pub fn primary_key(&self) -> u32 {
        self.primary_key
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    /// Copy of the row with one cell replaced.
    pub(crate) fn with_value(&self, column: usize, value: Value) -> Self {
        let mut values = self.values.clone();
        values[column] = value;
        Self {
            primary_key: self.primary_key,
            values,
        }
    }
}

/// An immutable, validated relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, checking every row against the schema.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for row in &rows {
            if row.values.len() != schema.len() {
                return Err(DatamarkError::InvalidDataset(format!(
                    "row {} has {} values, schema has {} columns",
                    row.primary_key,
                    row.values.len(),
                    schema.len()
                )));
            }
            for (value, column) in row.values.iter().zip(schema.columns()) {
                if let Some(kind) = value.kind() {
                    if kind != column.kind {
                        return Err(DatamarkError::InvalidDataset(format!(
                            "row {}: column {:?} expects {} but holds {}",
                            row.primary_key, column.name, column.kind, kind
                        )));
                    }
                }
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Schema, Vec<Row>) {
        (self.schema, self.rows)
    }

    /// Same schema, new rows; rows produced by the engine are already valid.
    pub(crate) fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }
}

/// Distinct categorical codes per column, sorted ascending.
///
/// Built once from the original (unmarked) dataset and shared read-only by
/// every row computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    codes: Vec<Option<Vec<i64>>>,
}

impl CategoryIndex {
    pub fn build(dataset: &Dataset) -> Self {
        let codes = dataset
            .schema()
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                if column.kind != AttributeType::Categorical {
                    return None;
                }
                let distinct: BTreeSet<i64> = dataset
                    .rows()
                    .iter()
                    .filter_map(|row| match row.value(idx) {
                        Some(Value::Categorical(code)) => Some(*code),
                        _ => None,
                    })
                    .collect();
                Some(distinct.into_iter().collect())
            })
            .collect();
        Self { codes }
    }

    /// All distinct codes of a categorical column.
    pub fn codes(&self, column: usize) -> Option<&[i64]> {
        self.codes.get(column).and_then(|c| c.as_deref())
    }

    /// Distinct codes whose parity encodes `bit` (even for 0, odd for 1).
    pub fn candidates(&self, column: usize, bit: u8) -> Vec<i64> {
        self.codes(column)
            .map(|codes| {
                codes
                    .iter()
                    .copied()
                    .filter(|code| code.rem_euclid(2) == i64::from(bit))
                    .collect()
            })
            .unwrap_or_default()
    }
}
