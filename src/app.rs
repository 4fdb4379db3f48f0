use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use oceanplot::data::datetime::iso_day;
use oceanplot::data::loader;
use oceanplot::{
    clean_outliers, detect_numerical_columns, extract_edna_date, get_column_outlier_stats,
    parse_date_range_from_filename, DetectionMethod, Error, HandlingStrategy, Result, Settings,
    Table, TransformCache,
};

/// Overrides for the outlier defaults in [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct OutlierArgs {
    pub columns: Option<Vec<String>>,
    pub method: Option<DetectionMethod>,
    pub sensitivity: Option<f64>,
    pub strategy: Option<HandlingStrategy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    Stats,
    Prune,
}

/// Headless front end: loads files, runs a pipeline, writes the result.
pub struct App {
    settings: Settings,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Print the columns that look numeric, one per line.
    pub fn columns(&self, path: &Path, out: &mut dyn Write) -> Result<()> {
        let table = loader::load_file(path)?;
        for name in detect_numerical_columns(&table) {
            writeln!(out, "{name}").map_err(stdout_error)?;
        }
        Ok(())
    }

    /// Print per-column outlier statistics as JSON. `outlier_indices` are
    /// data-row indices into the file, blanks included.
    pub fn stats(&self, path: &Path, args: &OutlierArgs, out: &mut dyn Write) -> Result<()> {
        let table = loader::load_file(path)?;
        let columns = self.resolve_columns(&table, args)?;
        let (method, sensitivity) = self.detection(args)?;

        let stats: Vec<_> = columns
            .iter()
            .filter_map(|name| {
                let series = table.numeric_column(name);
                if series.is_empty() {
                    tracing::warn!("Column {name:?} has no numeric values");
                    return None;
                }
                let values: Vec<f64> = series.iter().map(|&(_, v)| v).collect();
                let mut stats = get_column_outlier_stats(name, &values, method, sensitivity);
                stats.outlier_indices = stats
                    .outlier_indices
                    .iter()
                    .map(|&i| series[i].0)
                    .collect();
                Some(stats)
            })
            .collect();

        write_json(out, &stats)
    }

    /// Clean the selected columns and write the table as CSV to `output`,
    /// or to `out` when no output path is given.
    pub fn clean(
        &self,
        path: &Path,
        args: &OutlierArgs,
        output: Option<&Path>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let table = loader::load_file(path)?;
        let columns = self.resolve_columns(&table, args)?;
        let (method, sensitivity) = self.detection(args)?;
        let strategy = args.strategy.unwrap_or(self.settings.outliers.strategy);

        let result = clean_outliers(&table, &columns, strategy, method, sensitivity);
        for s in &result.stats {
            tracing::info!(
                "{}: {} of {} values flagged ({:.1}%), bounds [{:.3}, {:.3}]",
                s.column_name,
                s.outlier_count,
                s.total_count,
                s.outlier_percentage,
                s.lower_bound,
                s.upper_bound
            );
        }
        if strategy == HandlingStrategy::Remove {
            tracing::info!("Removed {} rows", result.removed_row_indices.len());
        }

        match output {
            Some(target) => loader::save_csv(&result.cleaned, target),
            None => loader::write_csv(&result.cleaned, out),
        }
    }

    /// Group an eDNA metadata sheet and print the groups as JSON.
    pub fn edna(
        &self,
        path: &Path,
        sample_id_column: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let table = loader::load_file(path)?;
        let sample_id_column =
            sample_id_column.unwrap_or(self.settings.edna.sample_id_column.as_str());
        if !table.has_column(sample_id_column) {
            return Err(Error::UnknownColumn(sample_id_column.to_string()));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let groups = self
            .settings
            .edna
            .grouper()
            .group(&table, sample_id_column, file_name);
        tracing::info!("{} spot-sample groups from {file_name}", groups.len());

        write_json(out, &groups)
    }

    /// Print what both filename date conventions make of `name`.
    pub fn dates(&self, name: &str, out: &mut dyn Write) -> Result<()> {
        let report = json!({
            "file_name": name,
            "range": parse_date_range_from_filename(name),
            "edna_date": extract_edna_date(name).map(iso_day),
        });
        write_json(out, &report)
    }

    /// Inspect or prune a saved transform cache.
    pub fn cache(&self, path: &Path, action: CacheAction, out: &mut dyn Write) -> Result<()> {
        let mut cache = TransformCache::<serde_json::Value>::load(path, &self.settings.cache)?;
        if action == CacheAction::Prune {
            let removed = cache.prune_expired();
            cache.save(path)?;
            tracing::info!("Pruned {removed} expired cache entries");
        }
        write_json(out, &cache.stats())
    }

    fn detection(&self, args: &OutlierArgs) -> Result<(DetectionMethod, Option<f64>)> {
        let method = args.method.unwrap_or(self.settings.outliers.method);
        let sensitivity = args.sensitivity.or(self.settings.outliers.sensitivity);
        if let Some(k) = sensitivity {
            if !k.is_finite() || k <= 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "sensitivity must be positive, got {k}"
                )));
            }
        }
        Ok((method, sensitivity))
    }

    fn resolve_columns(&self, table: &Table, args: &OutlierArgs) -> Result<Vec<String>> {
        let columns = match &args.columns {
            Some(requested) => {
                if let Some(missing) = requested.iter().find(|c| !table.has_column(c)) {
                    return Err(Error::UnknownColumn(missing.clone()));
                }
                requested.clone()
            }
            None => detect_numerical_columns(table),
        };
        if columns.is_empty() {
            return Err(Error::NoData("no numeric columns to analyse".to_string()));
        }
        tracing::debug!("Analysing columns {columns:?}");
        Ok(columns)
    }
}

fn stdout_error(e: std::io::Error) -> Error {
    Error::io("<stdout>", e)
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out).map_err(stdout_error)
}
