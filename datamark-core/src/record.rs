//! Scheme records.
//!
//! A scheme record is the owner's note of one insertion. It pins the
//! parameters, the resolved markable columns and the generator version, so
//! detection replays exactly what insertion did. It holds nothing derived
//! from the secret key, but it does name the marked columns and the
//! recipient, so it stays with the owner and never ships with a copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{AttributeWeights, ColumnSelection, Dataset};
use crate::error::{DatamarkError, Result};
use crate::fingerprint::RecipientId;
use crate::insertion::InsertionMetrics;
use crate::params::{EmbeddingParams, MarkingConfig, SchemeVersion};

/// Upper bound on an encoded record accepted by [`SchemeRecord::from_bytes`].
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// On-disk encoding of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    #[default]
    Json,
    Cbor,
}

/// Everything needed to detect a fingerprint in a copy, minus the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeRecord {
    /// Raw generator version, checked on use rather than on decode.
    pub scheme_version: u8,
    pub params: EmbeddingParams,
    pub recipients: u32,
    pub recipient: RecipientId,
    /// Markable columns in sampler order.
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<AttributeWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Category labels per categorical column, indexed by code.
    ///
    /// Lets a reader re-encode a suspect copy with the codes used at
    /// insertion even when some labels no longer occur in it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Unix timestamp (seconds) of the insertion.
    pub created_at: u64,
    pub metrics: InsertionMetrics,
}

impl SchemeRecord {
    /// Describe an insertion of `dataset` for `recipient`.
    pub fn new(
        config: &MarkingConfig,
        recipients: u32,
        recipient: RecipientId,
        dataset: &Dataset,
        metrics: InsertionMetrics,
        created_at: u64,
    ) -> Result<Self> {
        let columns = config.selection.resolve(dataset.schema())?;
        Ok(Self {
            scheme_version: config.version.as_u8(),
            params: config.params,
            recipients,
            recipient,
            columns: columns.names().to_vec(),
            weights: config.weights.clone(),
            primary_key: dataset.schema().primary_key().map(str::to_owned),
            target: dataset.schema().target().map(str::to_owned),
            categories: BTreeMap::new(),
            created_at,
            metrics,
        })
    }

    pub fn with_categories(mut self, categories: BTreeMap<String, Vec<String>>) -> Self {
        self.categories = categories;
        self
    }

    /// Generator version, rejected if this build does not implement it.
    pub fn version(&self) -> Result<SchemeVersion> {
        SchemeVersion::try_from(self.scheme_version)
    }

    /// Configuration that replays the recorded insertion.
    pub fn marking_config(&self) -> Result<MarkingConfig> {
        let config = MarkingConfig {
            version: self.version()?,
            params: self.params,
            selection: ColumnSelection::Include(self.columns.clone()),
            weights: self.weights.clone(),
        };
        config.params.validate()?;
        Ok(config)
    }

    pub fn encode(&self, format: RecordFormat) -> Result<Vec<u8>> {
        match format {
            RecordFormat::Json => self.to_json(),
            RecordFormat::Cbor => self.to_cbor(),
        }
    }

    /// Serialize the record to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| DatamarkError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize a record from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| DatamarkError::SerializationError(e.to_string()))
    }

    /// Serialize the record to pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| DatamarkError::SerializationError(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| DatamarkError::SerializationError(e.to_string()))
    }

    /// Decode a record of either format, trying CBOR first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(DatamarkError::SerializationError(format!(
                "record of {} bytes exceeds the {MAX_RECORD_SIZE} byte limit",
                bytes.len()
            )));
        }
        Self::from_cbor(bytes).or_else(|cbor_err| {
            Self::from_json(bytes).map_err(|json_err| {
                DatamarkError::SerializationError(format!(
                    "not a scheme record (CBOR: {cbor_err}; JSON: {json_err})"
                ))
            })
        })
    }
}
