//! Embedding parameters and the versioned scheme policy.

use serde::{Deserialize, Serialize};

use crate::dataset::{AttributeWeights, ColumnSelection, MarkableColumns, Schema};
use crate::error::{DatamarkError, Result};

/// Number of bits reserved for the primary key in the per-row seed.
///
/// Supports datasets of up to 1,048,576 rows.
pub const PRIMARY_KEY_BITS: u32 = 20;

/// Largest accepted `xi`. Eligible bits are `0..xi`, so bit 62, the top bit
/// of a non-negative `i64` magnitude, is still reachable.
pub const MAX_XI: u32 = 63;

/// Versioned generator/code policy shared by insertion and detection.
///
/// Every installation that inserts or detects must agree on this value;
/// a mismatch silently yields noise templates, so it is stored in every
/// scheme record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SchemeVersion {
    /// SHA3-256 domain-separated seeds feeding a ChaCha20 stream.
    #[default]
    V1,
}

impl SchemeVersion {
    /// The version this build implements.
    pub const CURRENT: SchemeVersion = SchemeVersion::V1;

    pub fn as_u8(self) -> u8 {
        match self {
            Self::V1 => 1,
        }
    }
}

impl From<SchemeVersion> for u8 {
    fn from(version: SchemeVersion) -> Self {
        version.as_u8()
    }
}

impl TryFrom<u8> for SchemeVersion {
    type Error = DatamarkError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::V1),
            found => Err(DatamarkError::SchemeVersionMismatch {
                found,
                supported: Self::CURRENT.as_u8(),
            }),
        }
    }
}

impl std::fmt::Display for SchemeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

/// Marking density, bit depth and fingerprint length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingParams {
    /// Inverse marking density: roughly one row in `gamma` carries a bit.
    pub gamma: u32,
    /// Number of least significant bits eligible for marking.
    pub xi: u32,
    /// Length of every recipient fingerprint in bits.
    pub fingerprint_length: usize,
}

impl Default for EmbeddingParams {
    fn default() -> Self {
        Self {
            gamma: 10,
            xi: 1,
            fingerprint_length: 96,
        }
    }
}

impl EmbeddingParams {
    pub fn new(gamma: u32, xi: u32, fingerprint_length: usize) -> Result<Self> {
        let params = Self {
            gamma,
            xi,
            fingerprint_length,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject configurations that cannot drive the sampler.
    pub fn validate(&self) -> Result<()> {
        if self.gamma < 1 {
            return Err(DatamarkError::InvalidParams("gamma must be at least 1".into()));
        }
        if self.xi < 1 {
            return Err(DatamarkError::InvalidParams("xi must be at least 1".into()));
        }
        if self.xi > MAX_XI {
            return Err(DatamarkError::InvalidParams(format!(
                "xi must be at most {MAX_XI}, got {}",
                self.xi
            )));
        }
        if self.fingerprint_length < 1 {
            return Err(DatamarkError::InvalidParams(
                "fingerprint length must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Expected fraction of rows selected for marking.
    pub fn marking_density(&self) -> f64 {
        1.0 / f64::from(self.gamma.max(1))
    }
}

/// Everything insertion and detection must agree on, apart from the key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkingConfig {
    #[serde(default)]
    pub version: SchemeVersion,
    pub params: EmbeddingParams,
    #[serde(default)]
    pub selection: ColumnSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<AttributeWeights>,
}

impl MarkingConfig {
    pub fn new(params: EmbeddingParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selection: ColumnSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_weights(mut self, weights: AttributeWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Validate against a schema and resolve the markable columns.
    pub(crate) fn plan(&self, schema: &Schema) -> Result<MarkingPlan> {
        self.params.validate()?;
        let columns = self.selection.resolve(schema)?;
        if let Some(weights) = &self.weights {
            weights.check_columns(&columns)?;
        }
        Ok(MarkingPlan {
            version: self.version,
            params: self.params,
            columns,
            weights: self.weights.clone(),
        })
    }
}

/// A [`MarkingConfig`] resolved against one schema.
#[derive(Debug, Clone)]
pub(crate) struct MarkingPlan {
    pub version: SchemeVersion,
    pub params: EmbeddingParams,
    pub columns: MarkableColumns,
    pub weights: Option<AttributeWeights>,
}

/// Validate a recipient id against the recipient count.
pub(crate) fn check_recipient(recipient: u32, total: u32) -> Result<()> {
    if total == 0 {
        return Err(DatamarkError::InvalidParams(
            "number of recipients must be at least 1".into(),
        ));
    }
    if recipient >= total {
        return Err(DatamarkError::InvalidRecipient { recipient, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(EmbeddingParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_gamma() {
        let err = EmbeddingParams::new(0, 1, 8).unwrap_err();
        assert!(matches!(err, DatamarkError::InvalidParams(_)));
    }

    #[test]
    fn test_rejects_zero_xi_and_oversized_xi() {
        assert!(EmbeddingParams::new(1, 0, 8).is_err());
        assert!(EmbeddingParams::new(1, MAX_XI + 1, 8).is_err());
        assert!(EmbeddingParams::new(1, MAX_XI, 8).is_ok());
    }

    #[test]
    fn test_top_magnitude_bit_is_reachable() {
        let top = MAX_XI - 1;
        assert_eq!(top, 62);
        assert_eq!(
            crate::codec::set_magnitude_bit(0, top, 1),
            Some(1i64 << 62)
        );
        assert_eq!(crate::codec::set_magnitude_bit(0, MAX_XI, 1), None);
    }

    #[test]
    fn test_rejects_empty_fingerprint() {
        assert!(EmbeddingParams::new(1, 1, 0).is_err());
    }

    #[test]
    fn test_marking_density() {
        let params = EmbeddingParams::new(4, 1, 8).unwrap();
        assert!((params.marking_density() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scheme_version_roundtrip() {
        assert_eq!(SchemeVersion::try_from(1).unwrap(), SchemeVersion::V1);
        assert!(matches!(
            SchemeVersion::try_from(7),
            Err(DatamarkError::SchemeVersionMismatch { found: 7, supported: 1 })
        ));
        assert_eq!(SchemeVersion::CURRENT.to_string(), "v1");
    }

    #[test]
    fn test_marking_config_plan() {
        use crate::dataset::{AttributeType, Column};

        let schema = Schema::new(vec![
            Column::new("a", AttributeType::Integer),
            Column::new("b", AttributeType::Integer),
        ])
        .unwrap();
        let config = MarkingConfig::new(EmbeddingParams::new(2, 1, 8).unwrap());
        let plan = config.plan(&schema).unwrap();
        assert_eq!(plan.columns.len(), 2);

        let bad_weights = config
            .clone()
            .with_weights(AttributeWeights::new(vec![1.0 / 3.0; 3]).unwrap());
        assert!(matches!(
            bad_weights.plan(&schema),
            Err(DatamarkError::InvalidWeights(_))
        ));

        let mut bad_params = config;
        bad_params.params.gamma = 0;
        assert!(matches!(
            bad_params.plan(&schema),
            Err(DatamarkError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_check_recipient() {
        assert!(check_recipient(0, 1).is_ok());
        assert!(check_recipient(3, 4).is_ok());
        assert!(matches!(
            check_recipient(4, 4),
            Err(DatamarkError::InvalidRecipient { recipient: 4, total: 4 })
        ));
        assert!(check_recipient(0, 0).is_err());
    }
}
