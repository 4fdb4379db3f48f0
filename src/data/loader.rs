use std::io::Write;
use std::path::Path;

use chrono::NaiveTime;

use crate::data::datetime::iso_day;
use crate::data::parser::{self, HEADER_SCAN_ROWS};
use crate::data::table::{Cell, Row, Table};
use crate::error::{Error, Result};

/// Load a CSV or Excel file into a [`Table`].
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "xls" | "xlsx" => load_excel(path),
        _ => Err(Error::UnsupportedFormat(ext)),
    }?;

    tracing::info!(
        "Loaded {} rows x {} columns from {:?}",
        table.row_count(),
        table.columns.len(),
        path
    );
    Ok(table)
}

fn load_csv(path: &Path) -> Result<Table> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    read_csv(&content)
}

/// Parse CSV bytes, falling back to latin-1 when they are not UTF-8.
pub fn read_csv(content: &[u8]) -> Result<Table> {
    let text = match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        // latin1: each byte maps to the same Unicode code point
        Err(_) => content.iter().map(|&b| b as char).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => all_rows.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => tracing::warn!("Skipping unreadable CSV record: {e}"),
        }
    }

    let header_row = parser::detect_csv_header(&all_rows, HEADER_SCAN_ROWS)?;
    tracing::debug!("CSV header detected at row {header_row}");

    let columns: Vec<String> = all_rows[header_row].iter().map(|s| s.trim().to_string()).collect();
    let cells = all_rows[header_row + 1..]
        .iter()
        .map(|row| row.iter().map(|s| Cell::from_raw(s)).collect());

    Ok(assemble(columns, cells))
}

/// Worksheet value to cell. Date-formatted cells become ISO text so the
/// date parsers see a calendar day rather than the Excel serial number.
fn excel_cell(cell: &calamine::Data) -> Cell {
    use calamine::Data;

    match cell {
        Data::Empty => Cell::Null,
        Data::String(s) => Cell::from_raw(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) if value.time() == NaiveTime::MIN => Cell::Text(iso_day(value.date())),
            Some(value) => Cell::Text(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

fn load_excel(path: &Path) -> Result<Table> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::NoData("workbook has no sheets".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let all_rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();

    let header_scan: Vec<Vec<Option<String>>> = all_rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .map(|row| row.iter().map(Cell::as_text).collect())
        .collect();
    let header_row = parser::detect_excel_header(&header_scan, HEADER_SCAN_ROWS)?;
    tracing::debug!("Sheet {sheet_name:?} header detected at row {header_row}");

    let columns: Vec<String> = all_rows[header_row]
        .iter()
        .map(|c| c.as_text().unwrap_or_default())
        .collect();

    Ok(assemble(columns, all_rows.into_iter().skip(header_row + 1)))
}

/// Zip data rows onto the header, padding short rows with nulls and
/// dropping rows that are entirely blank.
fn assemble<I>(columns: Vec<String>, rows: I) -> Table
where
    I: IntoIterator<Item = Vec<Cell>>,
{
    let mut table = Table::new(columns);
    for cells in rows {
        if cells.iter().all(Cell::is_blank) {
            continue;
        }
        let mut cells = cells.into_iter();
        let row: Row = table
            .columns
            .iter()
            .map(|name| (name.clone(), cells.next().unwrap_or_default()))
            .collect();
        table.rows.push(row);
    }
    table
}

/// Write a table as CSV: header row, then each row in order.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&table.columns)?;
    for row in &table.rows {
        out.write_record(
            table
                .columns
                .iter()
                .map(|c| row.get(c).map(|cell| cell.to_string()).unwrap_or_default()),
        )?;
    }
    out.flush().map_err(|e| Error::io("<output>", e))?;
    Ok(())
}

/// Write a table to a CSV file.
pub fn save_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
    write_csv(table, file)?;
    tracing::info!("Exported CSV to {:?}", path);
    Ok(())
}
