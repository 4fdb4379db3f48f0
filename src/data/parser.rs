use std::collections::{HashMap, HashSet};

use crate::data::datetime;
use crate::error::{Error, Result};

/// Rows scanned when looking for the header.
pub const HEADER_SCAN_ROWS: usize = 50;

/// Detect the header row index of CSV records.
///
/// Field-logger exports often carry a preamble above the real header, so the
/// header is taken to be the last row (within `max_lines`) that has the most
/// common column count and consists only of non-numeric, non-date text.
/// Falls back to row 0.
pub fn detect_csv_header(records: &[Vec<String>], max_lines: usize) -> Result<usize> {
    let rows: Vec<&Vec<String>> = records
        .iter()
        .take(max_lines)
        .filter(|r| !r.is_empty())
        .collect();

    if rows.is_empty() {
        return Err(Error::NoData("no records in file".to_string()));
    }

    // Find most common column count
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in &rows {
        *counts.entry(row.len()).or_insert(0) += 1;
    }
    let most_common = counts
        .into_iter()
        .max_by_key(|&(len, c)| (c, len))
        .map(|(len, _)| len)
        .unwrap_or(0);

    // Scan from bottom up for all-string row
    for (i, row) in records.iter().enumerate().take(max_lines).rev() {
        if row.len() != most_common {
            continue;
        }
        if row.iter().all(|cell| is_header_text(cell)) {
            return Ok(i);
        }
    }

    Ok(0)
}

/// Detect the header row index of worksheet rows (`None` = empty cell).
pub fn detect_excel_header(rows: &[Vec<Option<String>>], max_rows: usize) -> Result<usize> {
    let rows = &rows[..rows.len().min(max_rows)];
    if rows.is_empty() {
        return Err(Error::NoData("no rows in sheet".to_string()));
    }

    // Count non-empty columns
    let used_cols = rows
        .iter()
        .flat_map(|row| row.iter().enumerate().filter(|(_, c)| c.is_some()).map(|(i, _)| i))
        .collect::<HashSet<_>>()
        .len();

    // Scan from bottom up
    for i in (0..rows.len()).rev() {
        let row = &rows[i];
        let non_empty = row.iter().flatten().count();
        if non_empty < used_cols {
            continue;
        }
        if row.iter().flatten().all(|cell| is_header_text(cell)) {
            return Ok(i);
        }
    }

    Ok(0)
}

fn is_header_text(cell: &str) -> bool {
    let trimmed = cell.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_err() && !is_date_like(trimmed)
}

fn is_date_like(s: &str) -> bool {
    let has_separators = s.contains('/') || s.contains(':') || s.contains('-');
    if !has_separators {
        return false;
    }
    datetime::parse_calendar_day(s).is_some()
}
