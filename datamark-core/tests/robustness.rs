//! Detection on copies that were shuffled, trimmed or lightly edited after
//! leaving the owner.

use datamark_core::{
    AttributeType, AttributeWeights, Column, Dataset, EmbeddingParams, Fingerprint, MarkingConfig,
    RecoveredTemplate, Row, Schema, Scheme, SecretKey, Value,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const ROWS: u64 = 2_000;
const RECIPIENTS: u32 = 10;
const RECIPIENT: u32 = 7;
const KEY: u64 = 987_654_321;

fn table() -> Dataset {
    let schema = Schema::new(vec![
        Column::new("a", AttributeType::Integer),
        Column::new("b", AttributeType::Integer),
        Column::new("c", AttributeType::Integer),
    ])
    .unwrap();
    let rows = (0..ROWS)
        .map(|pk| {
            let p = pk as i64;
            Row::new(
                pk,
                vec![
                    Value::Integer((p * 37) % 1_000 + 100),
                    Value::Integer((p * 13) % 500),
                    Value::Integer((p * 7) % 10_000 + 50_000),
                ],
            )
            .unwrap()
        })
        .collect();
    Dataset::new(schema, rows).unwrap()
}

fn configs() -> Vec<MarkingConfig> {
    let base = MarkingConfig::new(EmbeddingParams::new(5, 2, 32).unwrap());
    vec![
        base.clone(),
        base.clone()
            .with_weights(AttributeWeights::new(vec![0.5, 0.3, 0.2]).unwrap()),
        base.with_weights(AttributeWeights::new(vec![1.0, 0.0, 0.0]).unwrap()),
    ]
}

fn retain(dataset: &Dataset, keep: impl Fn(&Row) -> bool) -> Dataset {
    let rows = dataset.rows().iter().filter(|r| keep(r)).cloned().collect();
    Dataset::new(dataset.schema().clone(), rows).unwrap()
}

fn assert_consistent(template: &RecoveredTemplate, fingerprint: &Fingerprint) {
    for (i, symbol) in template.symbols().iter().enumerate() {
        if let Some(bit) = symbol.bit() {
            assert_eq!(Some(bit), fingerprint.bit(i), "position {i} disagrees");
        }
    }
}

struct Fixture {
    scheme: Scheme,
    key: SecretKey,
    fingerprint: Fingerprint,
    marked: Dataset,
}

fn fixtures() -> Vec<Fixture> {
    let original = table();
    configs()
        .into_iter()
        .map(|config| {
            let scheme = Scheme::new(config, RECIPIENTS).unwrap();
            let key = SecretKey::new(KEY);
            let fingerprint = scheme.fingerprint(&key, RECIPIENT).unwrap();
            let marked = scheme.insert(&original, RECIPIENT, &key).unwrap().dataset;
            Fixture {
                scheme,
                key,
                fingerprint,
                marked,
            }
        })
        .collect()
}

#[test]
fn test_full_copy() {
    for f in fixtures() {
        let report = f.scheme.detect(&f.marked, &f.key).unwrap();
        assert_eq!(report.template.unknown_count(), 0);
        assert_consistent(&report.template, &f.fingerprint);
        assert_eq!(report.suspect, Some(RECIPIENT));
    }
}

#[test]
fn test_shuffled_copy_gives_identical_votes() {
    for f in fixtures() {
        let (schema, mut rows) = f.marked.clone().into_parts();
        rows.shuffle(&mut ChaCha8Rng::seed_from_u64(7));
        let shuffled = Dataset::new(schema, rows).unwrap();

        let expected = f.scheme.detect(&f.marked, &f.key).unwrap();
        let report = f.scheme.detect(&shuffled, &f.key).unwrap();
        assert_eq!(report.votes, expected.votes);
        assert_eq!(report.suspect, Some(RECIPIENT));
    }
}

#[test]
fn test_every_third_row_reversed() {
    for f in fixtures() {
        let (schema, rows) = f.marked.clone().into_parts();
        let mut subset: Vec<Row> = rows.into_iter().step_by(3).collect();
        subset.reverse();
        let subset = Dataset::new(schema, subset).unwrap();

        let report = f.scheme.detect(&subset, &f.key).unwrap();
        assert_consistent(&report.template, &f.fingerprint);
        assert_eq!(report.suspect, Some(RECIPIENT));
    }
}

#[test]
fn test_majority_of_rows_deleted() {
    for f in fixtures() {
        let trimmed = retain(&f.marked, |row| row.primary_key() % 7 < 3);
        assert!(trimmed.len() < f.marked.len() / 2);

        let report = f.scheme.detect(&trimmed, &f.key).unwrap();
        assert_consistent(&report.template, &f.fingerprint);
        assert_eq!(report.suspect, Some(RECIPIENT));
    }
}

#[test]
fn test_sparse_value_edits_are_outvoted() {
    for f in fixtures() {
        let (schema, rows) = f.marked.clone().into_parts();
        let edited = rows
            .into_iter()
            .map(|row| {
                if row.primary_key() % 50 != 0 {
                    return row;
                }
                let mut values = row.values().to_vec();
                if let Value::Integer(v) = values[0] {
                    values[0] = Value::Integer(v ^ 1);
                }
                Row::new(u64::from(row.primary_key()), values).unwrap()
            })
            .collect();
        let edited = Dataset::new(schema, edited).unwrap();

        let report = f.scheme.detect(&edited, &f.key).unwrap();
        assert_consistent(&report.template, &f.fingerprint);
        assert_eq!(report.suspect, Some(RECIPIENT));
    }
}

#[test]
fn test_original_and_wrong_key_match_nobody() {
    let original = table();
    for f in fixtures() {
        let report = f.scheme.detect(&original, &f.key).unwrap();
        assert_eq!(report.suspect, None);

        let report = f.scheme.detect(&f.marked, &SecretKey::new(KEY + 1)).unwrap();
        assert_eq!(report.suspect, None);
    }
}

#[test]
fn test_full_weight_column_untouched() {
    let original = table();
    let f = fixtures().pop().unwrap();
    for (before, after) in original.rows().iter().zip(f.marked.rows()) {
        assert_eq!(before.value(0), after.value(0));
    }
}
