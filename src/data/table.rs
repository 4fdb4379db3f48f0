use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column-name fragments that mark a column as non-measurement data.
pub const NON_NUMERIC_KEYWORDS: &[&str] =
    &["id", "date", "time", "datetime", "timestamp", "is_outlier"];

/// How many leading rows the numeric-column heuristic inspects.
pub const TYPE_SAMPLE_ROWS: usize = 100;

/// A single cell of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Cell for raw file text: blank is null, anything else is kept verbatim.
    ///
    /// Numeric-looking text stays text so ids like `0042` and values like
    /// `1.50` are written back unchanged; [`Cell::as_f64`] reads the number.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Numeric coercion. Only finite numbers and trimmed numeric strings qualify.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Text view of the cell, `None` for blanks.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(v) => Some(v.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Null
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// One record, keyed by column name. Absent keys read as null.
pub type Row = BTreeMap<String, Cell>;

/// A schema-less table: ordered header plus rows in file order.
///
/// Row order is significant. Outlier removal reports row indices into
/// `rows`, so nothing here reorders or deduplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and row-major cells.
    pub fn from_rows<I, R>(columns: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Cell>,
    {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|cells| columns.iter().cloned().zip(cells).collect::<Row>())
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Add a column name to the header if it is not already present.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// `(row_index, value)` for every cell of `column` that coerces to a number.
    pub fn numeric_column(&self, column: &str) -> Vec<(usize, f64)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(column).and_then(Cell::as_f64).map(|v| (i, v)))
            .collect()
    }
}

/// Guess which columns hold measurements, to pre-populate a column picker.
///
/// Columns whose lowercased name contains any of [`NON_NUMERIC_KEYWORDS`]
/// are skipped. A remaining column qualifies when every inspected cell is
/// blank or numeric, so an all-blank column is offered too.
pub fn detect_numerical_columns(table: &Table) -> Vec<String> {
    let sample = &table.rows[..table.rows.len().min(TYPE_SAMPLE_ROWS)];

    table
        .columns
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            !NON_NUMERIC_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .filter(|name| {
            sample.iter().all(|row| match row.get(name.as_str()) {
                None => true,
                Some(cell) => cell.is_blank() || cell.as_f64().is_some(),
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_cells_are_inferred() {
        assert_eq!(Cell::from_raw("  "), Cell::Null);
        assert_eq!(Cell::from_raw(" 4.5 "), Cell::Text(" 4.5 ".into()));
        assert_eq!(Cell::from_raw(" 4.5 ").as_f64(), Some(4.5));
        assert_eq!(Cell::from_raw("ALGA_F_L"), Cell::Text("ALGA_F_L".into()));
        assert_eq!(Cell::from_raw("NaN").as_f64(), None);
    }

    #[test]
    fn numeric_looking_ids_keep_their_text() {
        let id = Cell::from_raw("0042");
        assert_eq!(id.as_text().as_deref(), Some("0042"));
        assert_eq!(id.to_string(), "0042");
        assert_eq!(id.as_f64(), Some(42.0));
    }

    #[test]
    fn coercion_accepts_numeric_strings_only() {
        assert_eq!(Cell::Text(" 12.5".into()).as_f64(), Some(12.5));
        assert_eq!(Cell::Text("12abc".into()).as_f64(), None);
        assert_eq!(Cell::Number(f64::NAN).as_f64(), None);
        assert_eq!(Cell::Bool(true).as_f64(), None);
        assert_eq!(Cell::Null.as_f64(), None);
    }

    #[test]
    fn numeric_column_keeps_row_indices() {
        let table = Table::from_rows(
            &["depth"],
            vec![
                vec![Cell::Number(1.0)],
                vec![Cell::Text("n/a".into())],
                vec![Cell::Text("3".into())],
            ],
        );
        assert_eq!(table.numeric_column("depth"), vec![(0, 1.0), (2, 3.0)]);
    }

    #[test]
    fn numerical_columns_skip_keywords_and_text() {
        let table = Table::from_rows(
            &["sample_id", "Date", "temperature", "station", "salinity", "empty"],
            vec![
                vec![
                    "1".into(),
                    "2025-03-01".into(),
                    12.0.into(),
                    "A".into(),
                    "35.1".into(),
                    Cell::Null,
                ],
                vec![
                    "2".into(),
                    "2025-03-02".into(),
                    Cell::Null,
                    "B".into(),
                    "".into(),
                    Cell::Null,
                ],
            ],
        );
        assert_eq!(detect_numerical_columns(&table), vec!["temperature", "salinity", "empty"]);
    }

    #[test]
    fn all_blank_column_counts_as_numeric() {
        let table = Table::from_rows(
            &["temp", "empty"],
            vec![vec![Cell::Number(1.0), Cell::Null], vec![Cell::Number(2.0), "".into()]],
        );
        assert_eq!(detect_numerical_columns(&table), vec!["temp", "empty"]);
    }

    #[test]
    fn numerical_detection_only_inspects_leading_rows() {
        let mut rows: Vec<Vec<Cell>> = (0..TYPE_SAMPLE_ROWS)
            .map(|i| vec![Cell::Number(i as f64)])
            .collect();
        rows.push(vec![Cell::Text("late text".into())]);
        let table = Table::from_rows(&["chlorophyll"], rows);
        assert_eq!(detect_numerical_columns(&table), vec!["chlorophyll"]);
    }
}
