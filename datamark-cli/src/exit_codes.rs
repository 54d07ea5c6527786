//! Exit codes following sysexits.h conventions.
//!
//! Scripts can tell a bad invocation apart from a malformed table or a
//! filesystem failure without parsing the error text.

use datamark_core::DatamarkError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments or parameters).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (malformed table or record, wrong key).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Cannot create output file.
/// Maps to EX_CANTCREAT from sysexits.h.
pub const CANT_CREATE: i32 = 73;

/// I/O error while writing output.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Library errors carry their own classification
        let core = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<DatamarkError>());

        let code = if let Some(core) = core {
            classify(core)
        } else if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("Failed to create") {
            CANT_CREATE
        } else if message.contains("Failed to write") {
            IO_ERROR
        } else if message.contains("Invalid option") || message.contains("No secret key") {
            USAGE_ERROR
        } else if message.contains("Malformed table") || message.contains("Malformed record") {
            DATA_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify(err: &DatamarkError) -> i32 {
    match err {
        DatamarkError::InvalidParams(_)
        | DatamarkError::InvalidRecipient { .. }
        | DatamarkError::InvalidSelection(_)
        | DatamarkError::InvalidWeights(_) => USAGE_ERROR,
        DatamarkError::PrimaryKeyOutOfRange { .. }
        | DatamarkError::InvalidDataset(_)
        | DatamarkError::InvalidDecimal(_)
        | DatamarkError::FingerprintLengthMismatch { .. }
        | DatamarkError::SchemeVersionMismatch { .. }
        | DatamarkError::SerializationError(_) => DATA_ERROR,
    }
}
