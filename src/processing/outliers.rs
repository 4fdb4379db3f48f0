use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::table::{Cell, Table};
use crate::processing::statistics::{self, quartiles, sorted_copy};

/// Name of the column added by [`HandlingStrategy::Flag`].
pub const OUTLIER_FLAG_COLUMN: &str = "is_outlier";

/// Consistency constant relating MAD to the standard deviation of a normal
/// distribution, as used by the Iglewicz-Hoaglin modified z-score.
const MODIFIED_ZSCORE_CONSTANT: f64 = 0.6745;

/// Outlier detection algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[default]
    #[serde(rename = "iqr")]
    Iqr,
    #[serde(rename = "stddev")]
    StdDev,
    #[serde(rename = "zscore")]
    ZScore,
    #[serde(rename = "modified-zscore")]
    ModifiedZScore,
}

impl DetectionMethod {
    /// Sensitivity used when the caller does not supply one.
    pub fn default_sensitivity(&self) -> f64 {
        match self {
            DetectionMethod::Iqr => 1.5,
            DetectionMethod::StdDev => 2.0,
            DetectionMethod::ZScore => 3.0,
            DetectionMethod::ModifiedZScore => 3.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DetectionMethod::Iqr => "IQR",
            DetectionMethod::StdDev => "Standard deviation",
            DetectionMethod::ZScore => "Z-score",
            DetectionMethod::ModifiedZScore => "Modified Z-score",
        }
    }
}

/// What to do with rows or cells flagged as outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlingStrategy {
    /// Drop any row that is an outlier in at least one selected column.
    Remove,
    /// Keep every row and add an `is_outlier` column.
    #[default]
    Flag,
    /// Replace outlier cells with the column median.
    Median,
    /// Replace outlier cells with the column mean.
    Mean,
    /// Clamp outlier cells to the IQR fences.
    Cap,
}

/// Classification of one value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierDetectionResult {
    pub value: f64,
    /// Position of the value in the input slice.
    pub index: usize,
    pub is_outlier: bool,
}

fn classify(data: &[f64], is_outlier: impl Fn(f64) -> bool) -> Vec<OutlierDetectionResult> {
    data.iter()
        .enumerate()
        .map(|(index, &value)| OutlierDetectionResult {
            value,
            index,
            is_outlier: is_outlier(value),
        })
        .collect()
}

/// Tukey fences: outside `Q1 - k*IQR ..= Q3 + k*IQR`.
pub fn detect_outliers_iqr(data: &[f64], sensitivity: f64) -> Vec<OutlierDetectionResult> {
    if data.is_empty() {
        return Vec::new();
    }
    let (lower, upper) = quartiles(&sorted_copy(data)).fences(sensitivity);
    classify(data, |v| v < lower || v > upper)
}

/// Outside `mean ± k*σ`, with the population standard deviation.
pub fn detect_outliers_std_dev(data: &[f64], sensitivity: f64) -> Vec<OutlierDetectionResult> {
    if data.is_empty() {
        return Vec::new();
    }
    let mean = statistics::mean(data);
    let sd = statistics::std_dev(data, mean);
    let (lower, upper) = (mean - sensitivity * sd, mean + sensitivity * sd);
    classify(data, |v| v < lower || v > upper)
}

/// `|v - mean| / σ > threshold`. A constant column has no outliers.
pub fn detect_outliers_z_score(data: &[f64], threshold: f64) -> Vec<OutlierDetectionResult> {
    if data.is_empty() {
        return Vec::new();
    }
    let mean = statistics::mean(data);
    let sd = statistics::std_dev(data, mean);
    if sd == 0.0 {
        return classify(data, |_| false);
    }
    classify(data, |v| ((v - mean) / sd).abs() > threshold)
}

/// `|0.6745 * (v - median) / MAD| > threshold`. Zero MAD means no outliers.
pub fn detect_outliers_modified_z_score(
    data: &[f64],
    threshold: f64,
) -> Vec<OutlierDetectionResult> {
    if data.is_empty() {
        return Vec::new();
    }
    let median = statistics::median(data);
    let mad = statistics::mad(data, median);
    if mad == 0.0 {
        return classify(data, |_| false);
    }
    classify(data, |v| (MODIFIED_ZSCORE_CONSTANT * (v - median) / mad).abs() > threshold)
}

/// Dispatch to the selected method; `None` uses the method's default sensitivity.
pub fn detect_outliers(
    data: &[f64],
    method: DetectionMethod,
    sensitivity: Option<f64>,
) -> Vec<OutlierDetectionResult> {
    let k = sensitivity.unwrap_or_else(|| method.default_sensitivity());
    match method {
        DetectionMethod::Iqr => detect_outliers_iqr(data, k),
        DetectionMethod::StdDev => detect_outliers_std_dev(data, k),
        DetectionMethod::ZScore => detect_outliers_z_score(data, k),
        DetectionMethod::ModifiedZScore => detect_outliers_modified_z_score(data, k),
    }
}

/// Per-column outlier report.
///
/// Quartiles, IQR and bounds are always the IQR framing at the effective
/// sensitivity, whichever method flagged the outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutlierStats {
    pub column_name: String,
    pub total_count: usize,
    pub outlier_count: usize,
    pub outlier_percentage: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Positions in the analysed slice.
    pub outlier_indices: Vec<usize>,
}

pub fn get_column_outlier_stats(
    column_name: &str,
    data: &[f64],
    method: DetectionMethod,
    sensitivity: Option<f64>,
) -> ColumnOutlierStats {
    let k = sensitivity.unwrap_or_else(|| method.default_sensitivity());
    let outlier_indices: Vec<usize> = detect_outliers(data, method, Some(k))
        .into_iter()
        .filter(|r| r.is_outlier)
        .map(|r| r.index)
        .collect();

    let sorted = sorted_copy(data);
    let q = quartiles(&sorted);
    let (lower_bound, upper_bound) = q.fences(k);

    let total_count = data.len();
    let outlier_count = outlier_indices.len();
    let outlier_percentage = if total_count == 0 {
        0.0
    } else {
        outlier_count as f64 * 100.0 / total_count as f64
    };

    ColumnOutlierStats {
        column_name: column_name.to_string(),
        total_count,
        outlier_count,
        outlier_percentage,
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        q1: q.q1,
        q3: q.q3,
        iqr: q.iqr(),
        lower_bound,
        upper_bound,
        outlier_indices,
    }
}

/// Output of [`clean_outliers`].
#[derive(Debug, Clone, PartialEq)]
pub struct CleanResult {
    pub cleaned: Table,
    /// Row indices (into the input table) dropped by [`HandlingStrategy::Remove`].
    /// Empty for every other strategy.
    pub removed_row_indices: BTreeSet<usize>,
    /// One entry per selected column that had at least one numeric value.
    pub stats: Vec<ColumnOutlierStats>,
}

/// Per-column detection outcome mapped back onto table rows.
struct ColumnOutliers {
    name: String,
    rows: BTreeSet<usize>,
    mean: f64,
    median: f64,
    lower_bound: f64,
    upper_bound: f64,
}

/// Detect outliers in each selected column and apply `strategy`.
///
/// Non-numeric cells are left out of a column's statistics but never cause
/// their row to be dropped. Columns with no numeric values are skipped. The
/// input table is not modified.
pub fn clean_outliers(
    table: &Table,
    columns: &[String],
    strategy: HandlingStrategy,
    method: DetectionMethod,
    sensitivity: Option<f64>,
) -> CleanResult {
    let mut stats = Vec::new();
    let mut per_column = Vec::new();

    for name in columns {
        let series = table.numeric_column(name);
        if series.is_empty() {
            tracing::debug!("Column {name:?} has no numeric values, skipping");
            continue;
        }
        let values: Vec<f64> = series.iter().map(|&(_, v)| v).collect();
        let column_stats = get_column_outlier_stats(name, &values, method, sensitivity);

        per_column.push(ColumnOutliers {
            name: name.clone(),
            rows: column_stats.outlier_indices.iter().map(|&i| series[i].0).collect(),
            mean: statistics::mean(&values),
            median: statistics::median(&values),
            lower_bound: column_stats.lower_bound,
            upper_bound: column_stats.upper_bound,
        });
        stats.push(column_stats);
    }

    let flagged: BTreeSet<usize> = per_column.iter().flat_map(|c| c.rows.iter().copied()).collect();
    let flagged_rows = flagged.len();
    let mut cleaned = table.clone();
    let mut removed_row_indices = BTreeSet::new();

    match strategy {
        HandlingStrategy::Remove => {
            cleaned.rows = table
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| !flagged.contains(i))
                .map(|(_, row)| row.clone())
                .collect();
            removed_row_indices = flagged;
        }
        HandlingStrategy::Flag => {
            cleaned.ensure_column(OUTLIER_FLAG_COLUMN);
            for (i, row) in cleaned.rows.iter_mut().enumerate() {
                row.insert(OUTLIER_FLAG_COLUMN.to_string(), Cell::Bool(flagged.contains(&i)));
            }
        }
        HandlingStrategy::Median | HandlingStrategy::Mean | HandlingStrategy::Cap => {
            for column in &per_column {
                for &i in &column.rows {
                    let Some(cell) = cleaned.rows[i].get_mut(&column.name) else {
                        continue;
                    };
                    let Some(original) = cell.as_f64() else {
                        continue;
                    };
                    let replacement = match strategy {
                        HandlingStrategy::Median => column.median,
                        HandlingStrategy::Mean => column.mean,
                        _ => original.max(column.lower_bound).min(column.upper_bound),
                    };
                    *cell = Cell::Number(replacement);
                }
            }
        }
    }

    tracing::debug!(
        "{} outlier rows across {} columns ({:?}, {})",
        flagged_rows,
        per_column.len(),
        strategy,
        method.label()
    );

    CleanResult {
        cleaned,
        removed_row_indices,
        stats,
    }
}
