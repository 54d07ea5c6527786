#![no_main]

//! Fuzz target for DecimalValue::parse()
//!
//! Any accepted text must render back with the same number of decimal
//! places and reparse to the same value.
//!
//! Run with: cargo +nightly fuzz run fuzz_decimal_parse

use datamark_core::dataset::decimal_places;
use datamark_core::DecimalValue;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(value) = DecimalValue::parse(text) else {
        return;
    };
    let rendered = value.to_string();
    assert_eq!(decimal_places(&rendered), value.places());
    let reparsed = DecimalValue::parse(&rendered).expect("rendered decimal must parse");
    assert_eq!(reparsed, value);
});
