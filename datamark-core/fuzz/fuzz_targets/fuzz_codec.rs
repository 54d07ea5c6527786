#![no_main]

//! Fuzz target for embed_bit()/extract_bit()
//!
//! Whenever a numeric cell accepts a mark, reading it back must return the
//! embedded bit.
//!
//! Run with: cargo +nightly fuzz run fuzz_codec

use datamark_core::codec::{embed_bit, extract_bit};
use datamark_core::{DecimalValue, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (i64, u8, u8, bool)| {
    let (raw, places, bit_index, bit) = input;
    let bit_index = u32::from(bit_index % 63);
    let bit = u8::from(bit);

    let mut cells = vec![Value::Integer(raw)];
    if let Ok(decimal) = DecimalValue::new(raw, u32::from(places % 19)) {
        cells.push(Value::Decimal(decimal));
    }
    for cell in cells {
        if let Ok(marked) = embed_bit(&cell, bit_index, bit, &[], |_| 0) {
            assert_eq!(extract_bit(&marked, bit_index), Some(bit));
        }
    }
});
