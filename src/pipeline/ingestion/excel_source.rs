use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDateTime;
use tracing::{info, instrument};

use super::unreadable;
use crate::constants::NA_VALUES;
use crate::error::{ConsolidationError, Result};
use crate::observability::metrics;
use crate::types::{dedupe_headers, Cell, RawTable};

/// Read one worksheet of a workbook into a RawTable. The first sheet is used
/// when `sheet` is `None`; the first row of the used range is the header.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn read_excel_table(path: &Path, sheet: Option<&str>, source: &str) -> Result<RawTable> {
    let started = Instant::now();
    if !path.is_file() {
        return Err(unreadable(path, "no such file"));
    }
    let mut workbook = open_workbook_auto(path)?;

    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ConsolidationError::MalformedSource {
                source_name: source.to_string(),
                reason: "workbook has no worksheets".to_string(),
            })??,
    };

    let table = table_from_range(&range, source)?;

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

/// Convert a worksheet range into a RawTable. An empty sheet gives a table
/// with no columns.
pub fn table_from_range(range: &Range<Data>, source: &str) -> Result<RawTable> {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(idx, data)| header_label(data, idx))
            .collect(),
        None => Vec::new(),
    };

    let mut table = RawTable::new(source, dedupe_headers(headers));
    for (idx, row) in rows.enumerate() {
        let cells: Vec<Cell> = row.iter().map(cell_from_data).collect();
        // Rows inside the used range can be entirely blank
        if cells.iter().all(Cell::is_null) {
            continue;
        }
        table.push_numbered_row(idx + 1, cells)?;
    }

    Ok(table)
}

fn header_label(data: &Data, idx: usize) -> String {
    match cell_from_data(data) {
        Cell::Null => format!("Unnamed: {}", idx),
        Cell::Float(v) if v.fract() == 0.0 => format!("{}", v as i64),
        other => other.to_string(),
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::Int(v) => Cell::Int(*v),
        Data::Float(v) => Cell::float(*v),
        Data::Bool(v) => Cell::Bool(*v),
        Data::String(s) if NA_VALUES.contains(&s.as_str()) => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::float(dt.as_f64())),
        Data::DateTimeIso(s) => s
            .parse::<NaiveDateTime>()
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), value);
            }
        }
        range
    }

    #[test]
    fn test_table_from_range() {
        let r = range(vec![
            vec![
                Data::String("Date".into()),
                Data::String("Product_ID".into()),
                Data::String("Quantity".into()),
                Data::String("Sales".into()),
            ],
            vec![
                Data::String("2023-03-01".into()),
                Data::Float(1.0),
                Data::Float(3.0),
                Data::Empty,
            ],
            vec![
                Data::String("2023-03-02".into()),
                Data::Float(2.0),
                Data::Int(1),
                Data::Float(20.0),
            ],
        ]);

        let table = table_from_range(&r, "sales_2023").unwrap();
        assert_eq!(table.columns(), ["Date", "Product_ID", "Quantity", "Sales"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][1], Cell::Float(1.0));
        assert!(table.rows()[0][3].is_null());
        assert_eq!(table.rows()[1][2], Cell::Int(1));
    }

    #[test]
    fn test_blank_headers_and_rows() {
        let r = range(vec![
            vec![Data::String("a".into()), Data::Empty],
            vec![Data::Int(1), Data::Int(2)],
            vec![Data::Empty, Data::Empty],
        ]);

        let table = table_from_range(&r, "s").unwrap();
        assert_eq!(table.columns(), ["a", "Unnamed: 1"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_na_spellings_are_null() {
        let r = range(vec![
            vec![
                Data::String("date".into()),
                Data::String("product_id".into()),
                Data::String("sales".into()),
            ],
            vec![Data::String("N/A".into()), Data::Float(1.0), Data::String("NA".into())],
            vec![Data::String("2023-01-02".into()), Data::Float(2.0), Data::String("null".into())],
            vec![Data::String("2023-01-03".into()), Data::Float(3.0), Data::String("".into())],
        ]);

        let table = table_from_range(&r, "sales_2023").unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.rows()[0][0].is_null());
        assert!(table.rows()[0][2].is_null());
        assert!(table.rows()[1][2].is_null());
        assert!(table.rows()[2][2].is_null());
        assert_eq!(table.rows()[1][0], Cell::Text("2023-01-02".into()));
    }

    #[test]
    fn test_blank_rows_keep_sheet_numbering() {
        let r = range(vec![
            vec![Data::String("a".into())],
            vec![Data::Int(1)],
            vec![Data::Empty],
            vec![Data::Int(3)],
        ]);

        let table = table_from_range(&r, "s").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row_number(0), 1);
        assert_eq!(table.row_number(1), 3);
    }

    #[test]
    fn test_native_dates_become_timestamps() {
        // 45078 is 2023-06-01 in the 1900 date system
        let date = calamine::ExcelDateTime::new(
            45078.5,
            calamine::ExcelDateTimeType::DateTime,
            false,
        );
        assert_eq!(
            cell_from_data(&Data::DateTime(date)),
            Cell::DateTime(
                chrono::NaiveDate::from_ymd_opt(2023, 6, 1)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_error_cells_are_null() {
        assert!(cell_from_data(&Data::Error(calamine::CellErrorType::NA)).is_null());
        assert_eq!(
            cell_from_data(&Data::DateTimeIso("2023-05-01T10:00:00".into())),
            Cell::DateTime(
                chrono::NaiveDate::from_ymd_opt(2023, 5, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_missing_workbook_is_unreadable() {
        let result = read_excel_table(Path::new("/no/such/sales.xlsx"), None, "s");
        assert!(matches!(result, Err(ConsolidationError::Unreadable { .. })));
    }
}
