use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, info, instrument, warn};

use crate::constants::{CATEGORY_COLUMN, SALES_COLUMN, YEAR_COLUMN};
use crate::domain::{CategorySales, YearlyAverage};
use crate::error::Result;
use crate::observability::metrics;

/// Write both aggregates to a new workbook at `path`, one sheet each, and
/// return the number of bytes written.
///
/// The workbook is built in memory and moved into place with a rename, so a
/// failed run never leaves a partial file at `path`. The parent directory
/// must already exist.
#[instrument(skip(categories, yearly), fields(path = %path.display()))]
pub fn write_summary_workbook(
    path: &Path,
    category_sheet: &str,
    year_sheet: &str,
    categories: &[CategorySales],
    yearly: &[YearlyAverage],
) -> Result<usize> {
    let start = Instant::now();
    let header = Format::new().set_bold();

    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(category_sheet)?;
    write_header(sheet, &header, CATEGORY_COLUMN)?;
    for (i, group) in categories.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &group.category)?;
        sheet.write_number(row, 1, group.total_sales)?;
    }
    sheet.autofit();

    let sheet = workbook.add_worksheet();
    sheet.set_name(year_sheet)?;
    write_header(sheet, &header, YEAR_COLUMN)?;
    for (i, group) in yearly.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, f64::from(group.year))?;
        // no mean for the year: the cell stays empty
        if let Some(average) = group.average_sales {
            sheet.write_number(row, 1, average)?;
        }
    }
    sheet.autofit();

    let buffer = workbook.save_to_buffer()?;
    replace_file(path, &buffer)?;

    let elapsed = start.elapsed().as_secs_f64();
    metrics::export::written(buffer.len(), elapsed);
    info!(
        "💾 Wrote {} ({} categories, {} years, {} bytes)",
        path.display(),
        categories.len(),
        yearly.len(),
        buffer.len()
    );
    Ok(buffer.len())
}

fn write_header(sheet: &mut Worksheet, format: &Format, key: &str) -> Result<()> {
    sheet.write_string_with_format(0, 0, key, format)?;
    sheet.write_string_with_format(0, 1, SALES_COLUMN, format)?;
    Ok(())
}

/// Write `bytes` next to `path` and rename over it
fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);
    debug!("Staging workbook at {}", tmp.display());

    if let Err(e) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path)) {
        if tmp.exists() {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!("Could not remove {}: {}", tmp.display(), cleanup);
            }
        }
        return Err(e.into());
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.xlsx".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
