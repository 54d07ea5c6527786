#![no_main]

//! Fuzz target for SchemeRecord::from_bytes()
//!
//! Malformed records must be rejected with an error, never a panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_record

use datamark_core::SchemeRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = SchemeRecord::from_bytes(data) {
        let _ = record.marking_config();
    }
});
