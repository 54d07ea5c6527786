//! Type-aware single-bit embedding and extraction.
//!
//! - **Integer**: overwrite one bit of the magnitude, keep the sign
//! - **Decimal**: scale by `10^places`, embed as an integer, keep `places`
//! - **Categorical**: substitute a code whose parity carries the bit
//!
//! Decimal places are never stored alongside a mark. Extraction uses the
//! place count of the observed value, so a copy whose textual precision
//! changed (for example `"2.50"` re-exported as `"2.5"`) no longer yields the
//! embedded bit for that cell.

use crate::dataset::{DecimalValue, Value};

/// Why a selected cell could not carry its mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The column has no distinct code of the required parity.
    NoCodeWithParity,
    /// The cell is empty.
    Missing,
    /// The new magnitude does not fit the value range.
    Overflow,
}

/// Overwrite bit `bit_index` of `|value|`, preserving the sign.
pub fn set_magnitude_bit(value: i64, bit_index: u32, bit: u8) -> Option<i64> {
    let magnitude = value.unsigned_abs();
    let mask = 1u64.checked_shl(bit_index)?;
    let marked = if bit == 1 {
        magnitude | mask
    } else {
        magnitude & !mask
    };
    let marked = i64::try_from(marked).ok()?;
    Some(if value < 0 { -marked } else { marked })
}

/// Bit `bit_index` of `|value|`.
pub fn magnitude_bit(value: i64, bit_index: u32) -> u8 {
    value
        .unsigned_abs()
        .checked_shr(bit_index)
        .map(|v| (v & 1) as u8)
        .unwrap_or(0)
}

/// Embed `bit` into a cell.
///
/// `candidates` are the column's codes whose parity carries `bit`, as given
/// by [`CategoryIndex::candidates`](crate::dataset::CategoryIndex::candidates);
/// they are only read for categorical cells. `choose(n)` must return an index
/// in `[0, n)`; it is called at most once, only for categorical cells.
pub fn embed_bit(
    value: &Value,
    bit_index: u32,
    bit: u8,
    candidates: &[i64],
    choose: impl FnOnce(usize) -> usize,
) -> Result<Value, SkipReason> {
    match value {
        Value::Integer(v) => set_magnitude_bit(*v, bit_index, bit)
            .map(Value::Integer)
            .ok_or(SkipReason::Overflow),
        Value::Decimal(d) => {
            let units =
                set_magnitude_bit(d.units(), bit_index, bit).ok_or(SkipReason::Overflow)?;
            DecimalValue::new(units, d.places())
                .map(Value::Decimal)
                .map_err(|_| SkipReason::Overflow)
        }
        Value::Categorical(_) => {
            if candidates.is_empty() {
                return Err(SkipReason::NoCodeWithParity);
            }
            let pick = choose(candidates.len()).min(candidates.len() - 1);
            Ok(Value::Categorical(candidates[pick]))
        }
        Value::Missing => Err(SkipReason::Missing),
    }
}

/// Recover the bit carried by a cell, `None` for empty cells.
pub fn extract_bit(value: &Value, bit_index: u32) -> Option<u8> {
    match value {
        Value::Integer(v) => Some(magnitude_bit(*v, bit_index)),
        Value::Decimal(d) => Some(magnitude_bit(d.units(), bit_index)),
        Value::Categorical(code) => Some(code.rem_euclid(2) as u8),
        Value::Missing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeType, CategoryIndex, Column, Dataset, Row, Schema};

    fn no_choice(_: usize) -> usize {
        panic!("numeric cells never choose")
    }

    fn dec(text: &str) -> Value {
        Value::Decimal(DecimalValue::parse(text).unwrap())
    }

    #[test]
    fn test_set_magnitude_bit() {
        assert_eq!(set_magnitude_bit(0b1010, 0, 1), Some(0b1011));
        assert_eq!(set_magnitude_bit(0b1011, 1, 0), Some(0b1001));
        assert_eq!(set_magnitude_bit(-6, 0, 1), Some(-7));
        assert_eq!(set_magnitude_bit(-7, 0, 0), Some(-6));
        assert_eq!(set_magnitude_bit(0, 3, 1), Some(8));
    }

    #[test]
    fn test_set_magnitude_bit_overflow() {
        assert_eq!(set_magnitude_bit(i64::MIN, 0, 1), None);
        assert_eq!(set_magnitude_bit(1, 64, 1), None);
    }

    #[test]
    fn test_integer_roundtrip_all_bits() {
        for value in [0i64, 1, 2, 37, -37, 1_000_003, -999_999, i64::MAX >> 1] {
            for bit_index in 0..8 {
                for bit in 0..2u8 {
                    let marked =
                        embed_bit(&Value::Integer(value), bit_index, bit, &[], no_choice).unwrap();
                    assert_eq!(extract_bit(&marked, bit_index), Some(bit));
                    if let Value::Integer(m) = marked {
                        if value != 0 && m != 0 {
                            assert_eq!(m.signum(), value.signum(), "sign preserved");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_decimal_roundtrip_keeps_places() {
        for text in ["3.20", "0.05", "-12.345", "7", "100.0"] {
            let original = dec(text);
            let places = DecimalValue::parse(text).unwrap().places();
            for bit_index in 0..3 {
                for bit in 0..2u8 {
                    let marked = embed_bit(&original, bit_index, bit, &[], no_choice).unwrap();
                    let Value::Decimal(d) = marked else {
                        panic!("decimal stays decimal");
                    };
                    assert_eq!(d.places(), places);
                    assert_eq!(
                        crate::dataset::decimal_places(&d.to_string()),
                        places,
                        "rendered text keeps its precision"
                    );
                    assert_eq!(extract_bit(&marked, bit_index), Some(bit));
                }
            }
        }
    }

    #[test]
    fn test_decimal_changes_last_digit_only() {
        // 3.20 -> 320 -> set bit 0 -> 321 -> 3.21
        let marked = embed_bit(&dec("3.20"), 0, 1, &[], no_choice).unwrap();
        assert_eq!(marked.to_string(), "3.21");
    }

    #[test]
    fn test_decimal_precision_loss_breaks_extraction() {
        // 2.51 marked to 2.50, then re-exported without the trailing zero
        let marked = embed_bit(&dec("2.51"), 0, 0, &[], no_choice).unwrap();
        assert_eq!(marked.to_string(), "2.50");
        let reexported = dec("2.5");
        // 25 is odd: the bit no longer reads back as 0
        assert_eq!(extract_bit(&reexported, 0), Some(1));
    }

    #[test]
    fn test_categorical_substitutes_a_candidate() {
        let even = [0, 2, 4];
        let marked = embed_bit(&Value::Categorical(1), 0, 0, &even, |n| {
            assert_eq!(n, 3);
            2
        })
        .unwrap();
        assert_eq!(marked, Value::Categorical(4));
        assert_eq!(extract_bit(&marked, 0), Some(0));

        let marked = embed_bit(&Value::Categorical(0), 0, 1, &[1, 3], |_| 0).unwrap();
        assert_eq!(marked, Value::Categorical(1));
        assert_eq!(extract_bit(&marked, 5), Some(1));

        // an out-of-range choice is clamped to the last candidate
        let marked = embed_bit(&Value::Categorical(0), 0, 1, &[1, 3], |_| 9).unwrap();
        assert_eq!(marked, Value::Categorical(3));
    }

    #[test]
    fn test_categorical_with_index_candidates() {
        let schema = Schema::new(vec![Column::new("city", AttributeType::Categorical)]).unwrap();
        let rows = [0i64, 1, 2, 3, 4]
            .iter()
            .enumerate()
            .map(|(pk, code)| Row::new(pk as u64, vec![Value::Categorical(*code)]).unwrap())
            .collect();
        let index = CategoryIndex::build(&Dataset::new(schema, rows).unwrap());

        for bit in 0..2u8 {
            let candidates = index.candidates(0, bit);
            let marked = embed_bit(&Value::Categorical(2), 0, bit, &candidates, |n| n - 1).unwrap();
            assert_eq!(extract_bit(&marked, 0), Some(bit));
        }
    }

    #[test]
    fn test_categorical_without_parity_is_skipped() {
        let schema = Schema::new(vec![Column::new("city", AttributeType::Categorical)]).unwrap();
        let rows = [0i64, 2, 4]
            .iter()
            .enumerate()
            .map(|(pk, code)| Row::new(pk as u64, vec![Value::Categorical(*code)]).unwrap())
            .collect();
        let index = CategoryIndex::build(&Dataset::new(schema, rows).unwrap());
        let result = embed_bit(&Value::Categorical(2), 0, 1, &index.candidates(0, 1), |_| 0);
        assert_eq!(result, Err(SkipReason::NoCodeWithParity));
    }

    #[test]
    fn test_negative_categorical_parity() {
        assert_eq!(extract_bit(&Value::Categorical(-3), 0), Some(1));
        assert_eq!(extract_bit(&Value::Categorical(-4), 0), Some(0));
    }

    #[test]
    fn test_missing_cells() {
        assert_eq!(
            embed_bit(&Value::Missing, 0, 1, &[], no_choice),
            Err(SkipReason::Missing)
        );
        assert_eq!(extract_bit(&Value::Missing, 0), None);
    }
}
