use crate::error::{ConsolidationError, Result};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single value as read from a source, before any typing
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Float constructor that stores NaN as null
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            Cell::Null
        } else {
            Cell::Float(value)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell. Text is parsed; `Ok(None)` means null.
    pub fn as_f64(&self) -> std::result::Result<Option<f64>, String> {
        match self {
            Cell::Null => Ok(None),
            Cell::Int(v) => Ok(Some(*v as f64)),
            Cell::Float(v) => Ok(Some(*v)),
            Cell::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(|v| if v.is_nan() { None } else { Some(v) })
                .map_err(|_| s.clone()),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => write!(f, "{}", v),
            Cell::DateTime(v) => write!(f, "{}", v),
        }
    }
}

/// Untyped table produced by the extraction stage: a source label, ordered
/// column labels and ordered rows. Every row has one cell per column.
///
/// Each row keeps its 1-based position among the source's data rows, so
/// errors raised after filtering still point at the row as it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub source: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    row_numbers: Vec<usize>,
}

impl RawTable {
    pub fn new(source: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            source: source.into(),
            columns,
            rows: Vec::new(),
            row_numbers: Vec::new(),
        }
    }

    /// Append the next data row, padding short rows with nulls and
    /// rejecting long ones
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        let number = self.row_numbers.last().map_or(1, |n| n + 1);
        self.push_numbered_row(number, row)
    }

    /// Append a row whose position in the source is already known, for
    /// readers that skip rows
    pub fn push_numbered_row(&mut self, number: usize, mut row: Vec<Cell>) -> Result<()> {
        if row.len() > self.columns.len() {
            return Err(ConsolidationError::MalformedSource {
                source_name: self.source.clone(),
                reason: format!(
                    "row {} has {} fields but the header has {}",
                    number,
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
        self.row_numbers.push(number);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Source position of the row currently at `index`
    pub fn row_number(&self, index: usize) -> usize {
        self.row_numbers[index]
    }

    /// Position of a column, matched exactly
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ConsolidationError::MissingColumn {
                source_name: self.source.clone(),
                column: name.to_string(),
            })
    }

    /// Keep only the rows for which `keep` returns true, preserving order
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Vec<Cell>) -> bool,
    {
        let rows = std::mem::take(&mut self.rows);
        let numbers = std::mem::take(&mut self.row_numbers);
        for (row, number) in rows.into_iter().zip(numbers) {
            if keep(&row) {
                self.rows.push(row);
                self.row_numbers.push(number);
            }
        }
    }

    pub fn column_cells_mut(&mut self, index: usize) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().map(move |row| &mut row[index])
    }

    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn rename_columns<F>(&mut self, rename: F) -> Result<()>
    where
        F: Fn(&str) -> String,
    {
        let renamed: Vec<String> = self.columns.iter().map(|c| rename(c)).collect();
        let mut seen = HashSet::new();
        for name in &renamed {
            if !seen.insert(name.as_str()) {
                return Err(ConsolidationError::DuplicateColumn {
                    source_name: self.source.clone(),
                    column: name.clone(),
                });
            }
        }
        self.columns = renamed;
        Ok(())
    }
}

/// Disambiguate repeated header labels as `x`, `x.1`, `x.2`, ...
pub fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for header in headers {
        let mut candidate = header.clone();
        if seen.contains(&candidate) {
            let n = next_suffix.entry(header.clone()).or_insert(1);
            loop {
                candidate = format!("{}.{}", header, n);
                *n += 1;
                if !seen.contains(&candidate) {
                    break;
                }
            }
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}
