use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::unreadable;
use crate::error::{ConsolidationError, Result};
use crate::observability::metrics;
use crate::types::{Cell, RawTable};

/// Read a JSON document into a RawTable.
///
/// Accepted shapes:
/// - an array of objects, one per row
/// - an object wrapping exactly one such array, e.g. `{"products": [...]}`
/// - a column-oriented object, `{"column": {"row label": value, ...}, ...}`
///
/// Nested objects inside a row are flattened into dotted column labels.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn read_json_table(path: &Path, source: &str) -> Result<RawTable> {
    let started = Instant::now();
    let content = fs::read_to_string(path).map_err(|e| unreadable(path, e))?;
    let value: Value = serde_json::from_str(&content)?;
    let table = table_from_json(&value, source)?;

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

pub fn table_from_json(value: &Value, source: &str) -> Result<RawTable> {
    match value {
        Value::Array(items) => table_from_records(items, source),
        Value::Object(map) => {
            if let (1, Some(Value::Array(items))) = (map.len(), map.values().next()) {
                debug!("Unwrapping single top-level array for {}", source);
                return table_from_records(items, source);
            }
            if !map.is_empty() && map.values().all(Value::is_object) {
                return table_from_columns(map, source);
            }
            Err(malformed(
                source,
                "expected an array of objects or a column-oriented object",
            ))
        }
        _ => Err(malformed(source, "top-level value must be an array or object")),
    }
}

fn table_from_records(items: &[Value], source: &str) -> Result<RawTable> {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut flat_rows: Vec<Vec<(usize, Cell)>> = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
        let Value::Object(obj) = item else {
            return Err(malformed(source, format!("element {} is not an object", idx)));
        };

        let mut fields = Vec::new();
        flatten_object("", obj, &mut fields);

        let row = fields
            .into_iter()
            .map(|(key, cell)| {
                let pos = *positions.entry(key.clone()).or_insert_with(|| {
                    columns.push(key);
                    columns.len() - 1
                });
                (pos, cell)
            })
            .collect();
        flat_rows.push(row);
    }

    let width = columns.len();
    let mut table = RawTable::new(source, columns);
    for fields in flat_rows {
        let mut row = vec![Cell::Null; width];
        for (pos, cell) in fields {
            row[pos] = cell;
        }
        table.push_row(row)?;
    }
    Ok(table)
}

fn table_from_columns(map: &Map<String, Value>, source: &str) -> Result<RawTable> {
    let mut labels: Vec<&str> = Vec::new();
    let mut label_pos: HashMap<&str, usize> = HashMap::new();

    for column in map.values().filter_map(Value::as_object) {
        for label in column.keys() {
            if !label_pos.contains_key(label.as_str()) {
                label_pos.insert(label.as_str(), labels.len());
                labels.push(label.as_str());
            }
        }
    }

    let columns: Vec<String> = map.keys().cloned().collect();
    let mut rows = vec![vec![Cell::Null; columns.len()]; labels.len()];

    for (col_idx, column) in map.values().filter_map(Value::as_object).enumerate() {
        for (label, value) in column {
            if let Some(&row_idx) = label_pos.get(label.as_str()) {
                rows[row_idx][col_idx] = scalar_cell(value);
            }
        }
    }

    let mut table = RawTable::new(source, columns);
    for row in rows {
        table.push_row(row)?;
    }
    Ok(table)
}

fn flatten_object(prefix: &str, obj: &Map<String, Value>, out: &mut Vec<(String, Cell)>) {
    for (key, value) in obj {
        let label = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) => flatten_object(&label, inner, out),
            other => out.push((label, scalar_cell(other))),
        }
    }
}

fn scalar_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::float).unwrap_or(Cell::Null),
        },
        Value::String(s) => Cell::Text(s.clone()),
        // Arrays and objects in a scalar position are kept as their JSON text
        other => Cell::Text(other.to_string()),
    }
}

fn malformed(source: &str, reason: impl Into<String>) -> ConsolidationError {
    ConsolidationError::MalformedSource {
        source_name: source.to_string(),
        reason: reason.into(),
    }
}
