use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatamarkError {
    #[error("Invalid embedding parameters: {0}")]
    InvalidParams(String),

    #[error("Primary key {key} out of range (must be below 2^{bits})")]
    PrimaryKeyOutOfRange { key: u64, bits: u32 },

    #[error("Invalid recipient {recipient}: expected an id below {total}")]
    InvalidRecipient { recipient: u32, total: u32 },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid column selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid attribute weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid decimal value: {0:?}")]
    InvalidDecimal(String),

    #[error("Fingerprint length mismatch: expected {expected}, got {actual}")]
    FingerprintLengthMismatch { expected: usize, actual: usize },

    #[error("Scheme version mismatch: record uses v{found}, this build supports v{supported}")]
    SchemeVersionMismatch { found: u8, supported: u8 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, DatamarkError>;
