use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, instrument};

use super::unreadable;
use crate::constants::NA_VALUES;
use crate::error::Result;
use crate::observability::metrics;
use crate::types::{dedupe_headers, Cell, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Empty,
    Int,
    Float,
    Bool,
    Text,
}

/// Read a comma-delimited file with a header row into a RawTable
#[instrument(skip(path), fields(path = %path.display()))]
pub fn read_csv_table(path: &Path, source: &str) -> Result<RawTable> {
    let started = Instant::now();
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let table = read_csv_from(file, source)?;

    metrics::ingestion::rows_read(source, table.len());
    metrics::ingestion::duration(source, started.elapsed().as_secs_f64());
    info!(
        "📥 Read {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Parse CSV content. Column types are inferred over each column's non-null
/// values, so a column is either all integers, all numbers, all booleans or text.
pub fn read_csv_from<R: Read>(reader: R, source: &str) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let headers = dedupe_headers(headers);

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                if NA_VALUES.contains(&field) {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        raw_rows.push(row);
    }

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|idx| infer_kind(raw_rows.iter().filter_map(|row| row.get(idx)?.as_deref())))
        .collect();
    debug!("Inferred column kinds for {}: {:?}", source, kinds);

    let mut table = RawTable::new(source, headers);
    for row in raw_rows {
        let cells = row
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                let kind = kinds.get(idx).copied().unwrap_or(ColumnKind::Text);
                to_cell(value, kind)
            })
            .collect();
        table.push_row(cells)?;
    }

    Ok(table)
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Empty;
    for value in values {
        let value_kind = if value.parse::<i64>().is_ok() {
            ColumnKind::Int
        } else if value.parse::<f64>().is_ok() {
            ColumnKind::Float
        } else if parse_bool(value).is_some() {
            ColumnKind::Bool
        } else {
            ColumnKind::Text
        };

        kind = match (kind, value_kind) {
            (ColumnKind::Empty, k) => k,
            (k, v) if k == v => k,
            (ColumnKind::Int, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        };
    }
    kind
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn to_cell(value: Option<String>, kind: ColumnKind) -> Cell {
    let Some(value) = value else {
        return Cell::Null;
    };
    match kind {
        ColumnKind::Int => value.parse().map(Cell::Int).unwrap_or(Cell::Text(value)),
        ColumnKind::Float => value
            .parse()
            .map(Cell::float)
            .unwrap_or(Cell::Text(value)),
        ColumnKind::Bool => parse_bool(&value).map(Cell::Bool).unwrap_or(Cell::Text(value)),
        ColumnKind::Empty | ColumnKind::Text => Cell::Text(value),
    }
}
