//! CSV table I/O.
//!
//! Columns are typed from their contents: all integers, then all decimals,
//! otherwise categorical. Categorical labels are encoded as their index in
//! a sorted dictionary and decoded again on write. Cells whose value is left
//! unchanged are written back with their text as read, so only marked cells
//! are re-rendered.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use datamark_core::{AttributeType, Column, Dataset, DecimalValue, Row, Schema, Value};
use tracing::debug;

/// How to interpret a table's columns.
#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    pub primary_key: String,
    pub target: Option<String>,
    /// Known label dictionaries, in code order. Listed columns are always
    /// categorical and keep these codes.
    pub categories: BTreeMap<String, Vec<String>>,
}

/// A loaded table: the typed dataset plus what is needed to write it back.
#[derive(Debug, Clone)]
pub struct Table {
    pub dataset: Dataset,
    headers: Vec<String>,
    primary_key_position: usize,
    /// Header position of each dataset column.
    positions: Vec<usize>,
    /// Label dictionary of each categorical dataset column.
    labels: Vec<Option<Vec<String>>>,
    /// Cell text of each row, as read, in header order.
    texts: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path, options: &TableOptions) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to read table: {}", path.display()))?;
        Self::from_reader(file, options)
            .with_context(|| format!("Malformed table: {}", path.display()))
    }

    pub fn from_reader<R: io::Read>(reader: R, options: &TableOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = reader
            .headers()
            .context("Malformed table: cannot read header row")?
            .iter()
            .map(str::to_owned)
            .collect();

        let Some(primary_key_position) = headers.iter().position(|h| *h == options.primary_key)
        else {
            bail!(
                "Invalid option: primary key column {:?} not found in table",
                options.primary_key
            );
        };
        if let Some(target) = &options.target {
            if !headers.contains(target) || *target == options.primary_key {
                bail!("Invalid option: target column {target:?} not found in table");
            }
        }

        let records = reader
            .records()
            .enumerate()
            .map(|(line, record)| {
                record
                    .map(|r| r.iter().map(str::to_owned).collect::<Vec<_>>())
                    .with_context(|| format!("Malformed table: data row {}", line + 1))
            })
            .collect::<Result<Vec<_>>>()?;

        let positions: Vec<usize> = (0..headers.len())
            .filter(|&i| i != primary_key_position)
            .collect();

        let mut columns = Vec::with_capacity(positions.len());
        let mut labels = Vec::with_capacity(positions.len());
        for &position in &positions {
            let name = &headers[position];
            let cells = records.iter().map(|r| r[position].as_str());
            let known = options.categories.get(name);
            let kind = match known {
                Some(_) => AttributeType::Categorical,
                None => classify(cells.clone()),
            };
            labels.push(match kind {
                AttributeType::Categorical => Some(dictionary(cells, known)),
                _ => None,
            });
            debug!(column = %name, kind = %kind, "Classified column");
            columns.push(Column::new(name.clone(), kind));
        }

        let mut schema = Schema::new(columns)?.with_primary_key(options.primary_key.clone());
        if let Some(target) = &options.target {
            schema = schema.with_target(target.clone())?;
        }

        let mut rows = Vec::with_capacity(records.len());
        for (line, record) in records.iter().enumerate() {
            let key_text = &record[primary_key_position];
            let Ok(primary_key) = key_text.parse::<u64>() else {
                bail!(
                    "Malformed table: data row {}: primary key {key_text:?} is not a non-negative integer",
                    line + 1
                );
            };
            let values = positions
                .iter()
                .zip(schema.columns())
                .zip(&labels)
                .map(|((&position, column), labels)| {
                    parse_cell(&record[position], column.kind, labels.as_deref())
                })
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Malformed table: data row {}", line + 1))?;
            rows.push(Row::new(primary_key, values)?);
        }

        let dataset = Dataset::new(schema, rows)?;
        debug!(
            rows = dataset.len(),
            columns = dataset.schema().len(),
            "Loaded table"
        );

        Ok(Self {
            dataset,
            headers,
            primary_key_position,
            positions,
            labels,
            texts: records,
        })
    }

    /// Label dictionaries of the categorical columns, keyed by column name.
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        self.dataset
            .schema()
            .columns()
            .iter()
            .zip(&self.labels)
            .filter_map(|(column, labels)| Some((column.name.clone(), labels.clone()?)))
            .collect()
    }

    /// Write `dataset` (this table's rows, possibly re-valued) as CSV.
    pub fn write(&self, dataset: &Dataset, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output: {}", path.display()))?;
        self.to_writer(dataset, file)
            .with_context(|| format!("Failed to write table: {}", path.display()))
    }

    pub fn to_writer<W: io::Write>(&self, dataset: &Dataset, writer: W) -> Result<()> {
        if dataset.len() != self.texts.len() {
            bail!(
                "dataset has {} rows, table has {}",
                dataset.len(),
                self.texts.len()
            );
        }
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;

        let mut record = vec![String::new(); self.headers.len()];
        for ((row, original), texts) in dataset
            .rows()
            .iter()
            .zip(self.dataset.rows())
            .zip(&self.texts)
        {
            record[self.primary_key_position].clone_from(&texts[self.primary_key_position]);
            for (column, &position) in self.positions.iter().enumerate() {
                let value = row.value(column).unwrap_or(&Value::Missing);
                record[position] = if original.value(column) == Some(value) {
                    texts[position].clone()
                } else {
                    render_cell(value, self.labels[column].as_deref())?
                };
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Pick the narrowest type that parses every non-empty cell.
fn classify<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> AttributeType {
    let mut present = cells.filter(|c| !c.is_empty());
    if present.clone().all(|c| c.parse::<i64>().is_ok()) {
        AttributeType::Integer
    } else if present.all(|c| DecimalValue::parse(c).is_ok()) {
        AttributeType::Decimal
    } else {
        AttributeType::Categorical
    }
}

/// Known labels first, in their recorded order, then new labels sorted.
fn dictionary<'a>(
    cells: impl Iterator<Item = &'a str>,
    known: Option<&Vec<String>>,
) -> Vec<String> {
    let mut labels = known.cloned().unwrap_or_default();
    let fresh: BTreeSet<&str> = cells
        .filter(|c| !c.is_empty() && !labels.iter().any(|l| l == *c))
        .collect();
    labels.extend(fresh.into_iter().map(str::to_owned));
    labels
}

fn parse_cell(text: &str, kind: AttributeType, labels: Option<&[String]>) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Missing);
    }
    Ok(match kind {
        AttributeType::Integer => Value::Integer(
            text.parse::<i64>()
                .with_context(|| format!("{text:?} is not an integer"))?,
        ),
        AttributeType::Decimal => Value::Decimal(DecimalValue::parse(text)?),
        AttributeType::Categorical => {
            let code = labels
                .and_then(|labels| labels.iter().position(|l| l == text))
                .with_context(|| format!("unknown category {text:?}"))?;
            Value::Categorical(code as i64)
        }
    })
}

fn render_cell(value: &Value, labels: Option<&[String]>) -> Result<String> {
    Ok(match value {
        Value::Categorical(code) => {
            let label = usize::try_from(*code)
                .ok()
                .and_then(|index| labels?.get(index));
            match label {
                Some(label) => label.clone(),
                None => bail!("category code {code} has no label"),
            }
        }
        Value::Missing => String::new(),
        other => other.to_string(),
    })
}
