//! Discrete-sample grouping for eDNA metadata sheets.
//!
//! A metadata sheet is wide: one row per sample with several concentration
//! columns. Charts want it long: one group per (sample, parameter), with the
//! same set of samples on every parameter's x-axis.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::datetime::{iso_day, parse_calendar_day};
use crate::data::table::{Row, Table};
use crate::processing::statistics::SeriesStats;

/// Negative-control sample names: `NEG`, `NEGATIVE` or `CONTROL` as a word.
static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(NEG|NEGATIVE|CONTROL)\b").unwrap());

pub fn is_control_sample(sample_id: &str) -> bool {
    CONTROL_RE.is_match(sample_id)
}

/// Project prefix of a data file: the stem up to its first underscore.
pub fn project_prefix(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    stem.split_once('_')
        .map(|(prefix, _)| prefix.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Shorten a station label for axis ticks.
///
/// `ALGA_Farm_ArcticSeaweed` with prefix `ALGA` becomes `F_AS`: the prefix is
/// stripped, then each underscore segment longer than two characters is
/// reduced to its capitals (when it has at least two) or to its first
/// letter, uppercased. Labels without underscores and control samples are
/// returned as they are after the prefix strip.
pub fn abbreviate_station_label(label: &str, project_prefix: Option<&str>) -> String {
    let mut rest = label;
    if let Some(prefix) = project_prefix.filter(|p| !p.is_empty()) {
        let marker = format!("{prefix}_");
        if let Some(head) = label.get(..marker.len()) {
            if head.eq_ignore_ascii_case(&marker) {
                rest = &label[marker.len()..];
            }
        }
    }

    if !rest.contains('_') || is_control_sample(rest) {
        return rest.to_string();
    }

    rest.split('_')
        .map(|segment| {
            if segment.chars().count() <= 2 {
                return segment.to_string();
            }
            let capitals: String = segment.chars().filter(|c| c.is_uppercase()).collect();
            if capitals.chars().count() >= 2 {
                capitals
            } else {
                segment.chars().take(1).flat_map(char::to_uppercase).collect()
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Axis label for a spot sample: `DD/MM/YY {label}`.
pub fn format_spot_sample_label(iso_date: &str, sample_label: &str) -> String {
    let date = NaiveDate::parse_from_str(iso_date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%y").to_string())
        .unwrap_or_else(|_| iso_date.to_string());
    format!("{date} {sample_label}")
}

/// A charted parameter and the sheet columns that may hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Candidate column names; the first holding a number wins.
    pub columns: Vec<String>,
}

impl ParameterSpec {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn value(&self, row: &Row) -> Option<f64> {
        self.columns.iter().find_map(|c| row.get(c).and_then(|cell| cell.as_f64()))
    }
}

/// Concentration parameters charted for eDNA metadata sheets.
pub fn default_parameters() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::new("DNA Concentration", &["dna_concentration", "ng_ul", "Conc (ng/ul)"]),
        ParameterSpec::new("A260/A280", &["a260_280", "260/280"]),
        ParameterSpec::new("A260/A230", &["a260_230", "260/230"]),
    ]
}

/// One sample after filtering, with its parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub date: NaiveDate,
    pub sample_id: String,
    pub values: BTreeMap<String, Option<f64>>,
}

/// One (sample, parameter) point set, ready for a chart panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotSampleGroup {
    /// ISO calendar day.
    pub date: String,
    pub sample_id: String,
    pub x_axis_label: String,
    pub parameter: String,
    pub values: Vec<f64>,
    pub count: usize,
    pub stats: SeriesStats,
}

/// Why a row did not become a sample.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropCounts {
    pub missing_id: usize,
    pub bad_date: usize,
    pub control: usize,
    pub no_values: usize,
}

/// Wide-to-long reshaping of eDNA metadata rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdnaGrouper {
    pub time_column: String,
    pub parameters: Vec<ParameterSpec>,
}

impl Default for EdnaGrouper {
    fn default() -> Self {
        Self {
            time_column: "time".to_string(),
            parameters: default_parameters(),
        }
    }
}

impl EdnaGrouper {
    pub fn new(time_column: &str, parameters: Vec<ParameterSpec>) -> Self {
        Self {
            time_column: time_column.to_string(),
            parameters,
        }
    }

    /// Filter rows down to usable samples.
    ///
    /// A row needs a sample id, a parseable date, a non-control id and at
    /// least one numeric parameter. Anything else is dropped and counted.
    pub fn collect_samples(
        &self,
        table: &Table,
        sample_id_column: &str,
    ) -> (Vec<Sample>, DropCounts) {
        let mut drops = DropCounts::default();
        let mut samples = Vec::new();

        for row in &table.rows {
            let Some(sample_id) = row.get(sample_id_column).and_then(|c| c.as_text()) else {
                drops.missing_id += 1;
                continue;
            };
            let Some(date) = row
                .get(&self.time_column)
                .and_then(|c| c.as_text())
                .and_then(|t| parse_calendar_day(&t))
            else {
                drops.bad_date += 1;
                continue;
            };
            if is_control_sample(&sample_id) {
                drops.control += 1;
                continue;
            }

            let values: BTreeMap<String, Option<f64>> = self
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.value(row)))
                .collect();
            if values.values().all(Option::is_none) {
                drops.no_values += 1;
                continue;
            }

            samples.push(Sample {
                date,
                sample_id,
                values,
            });
        }

        (samples, drops)
    }

    /// Reshape to one group per (sample, parameter), sorted by parameter,
    /// then date, then sample id.
    ///
    /// Every sample gets a group for every parameter, empty when the value is
    /// missing, so all parameter charts share one x-axis. Rows repeating a
    /// (date, sample id) pair are treated as replicates of one sample.
    pub fn group(
        &self,
        table: &Table,
        sample_id_column: &str,
        file_name: &str,
    ) -> Vec<SpotSampleGroup> {
        let (samples, drops) = self.collect_samples(table, sample_id_column);
        tracing::debug!(
            "{file_name}: {} of {} rows kept ({:?})",
            samples.len(),
            table.row_count(),
            drops
        );

        let prefix = project_prefix(file_name);

        let mut replicates: BTreeMap<(String, String), BTreeMap<&str, Vec<f64>>> = BTreeMap::new();
        for sample in &samples {
            let per_param = replicates
                .entry((iso_day(sample.date), sample.sample_id.clone()))
                .or_default();
            for param in &self.parameters {
                let values = per_param.entry(param.name.as_str()).or_default();
                if let Some(Some(v)) = sample.values.get(&param.name) {
                    values.push(*v);
                }
            }
        }

        let mut groups = Vec::with_capacity(replicates.len() * self.parameters.len());
        for ((date, sample_id), per_param) in replicates {
            let label = format_spot_sample_label(
                &date,
                &abbreviate_station_label(&sample_id, prefix.as_deref()),
            );
            for param in &self.parameters {
                let values = per_param.get(param.name.as_str()).cloned().unwrap_or_default();
                groups.push(SpotSampleGroup {
                    date: date.clone(),
                    sample_id: sample_id.clone(),
                    x_axis_label: label.clone(),
                    parameter: param.name.clone(),
                    count: values.len(),
                    stats: SeriesStats::compute_or_zero(&values),
                    values,
                });
            }
        }

        groups.sort_by(|a, b| {
            a.parameter
                .cmp(&b.parameter)
                .then_with(|| a.date.cmp(&b.date))
                .then_with(|| a.sample_id.cmp(&b.sample_id))
        });
        groups
    }
}

/// Group an eDNA metadata table with the default `time` column and parameters.
pub fn process_edna_meta_file(
    table: &Table,
    sample_id_column: &str,
    file_name: &str,
) -> Vec<SpotSampleGroup> {
    EdnaGrouper::default().group(table, sample_id_column, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Cell;

    const COLUMNS: &[&str] = &["sample_id", "time", "ng_ul", "260/280", "a260_230"];

    fn row(id: &str, time: &str, conc: Cell, r280: Cell, r230: Cell) -> Vec<Cell> {
        vec![Cell::from_raw(id), Cell::from_raw(time), conc, r280, r230]
    }

    fn meta_table() -> Table {
        Table::from_rows(
            COLUMNS,
            vec![
                row("ALGA_Farm_ArcticSeaweed", "2025-03-04", 12.5.into(), 1.8.into(), 2.1.into()),
                row("ALGA_Coast_West", "2025-03-04 10:15", 8.0.into(), Cell::Null, 1.9.into()),
                row("ALGA EXT NEG", "2025-03-04", 0.1.into(), 1.2.into(), 0.4.into()),
                row("", "2025-03-04", 3.0.into(), 1.5.into(), 1.5.into()),
                row("ALGA_Farm_Longline", "not a date", 3.0.into(), 1.5.into(), 1.5.into()),
                row("ALGA_Farm_Mussel", "2025-03-05", "n/a".into(), Cell::Null, Cell::Null),
            ],
        )
    }

    #[test]
    fn station_labels_are_abbreviated() {
        assert_eq!(abbreviate_station_label("ALGA_Farm_ArcticSeaweed", Some("ALGA")), "F_AS");
        assert_eq!(abbreviate_station_label("alga_Coast_west", Some("ALGA")), "C_W");
        assert_eq!(abbreviate_station_label("HVS_EXT NEG 1", Some("HVS")), "EXT NEG 1");
        assert_eq!(abbreviate_station_label("Station7", None), "Station7");
        assert_eq!(abbreviate_station_label("NORF_F_L_2", Some("NORF")), "F_L_2");
        assert_eq!(abbreviate_station_label("ALGA_Farm", Some("HVS")), "ALGA_F");
    }

    #[test]
    fn control_samples_match_whole_words() {
        assert!(is_control_sample("EXT NEG 1"));
        assert!(is_control_sample("negative control"));
        assert!(!is_control_sample("NEGRIL_Bay"));
        assert!(!is_control_sample("ALGA_Control_South"));
    }

    #[test]
    fn prefix_and_label_helpers() {
        assert_eq!(project_prefix("ALGA_EDNA_2503_Meta.csv"), Some("ALGA".to_string()));
        assert_eq!(project_prefix("meta.csv"), None);
        assert_eq!(format_spot_sample_label("2025-03-04", "F_AS"), "04/03/25 F_AS");
        assert_eq!(format_spot_sample_label("March", "F_AS"), "March F_AS");
    }

    #[test]
    fn rows_are_filtered_with_reasons() {
        let grouper = EdnaGrouper::default();
        let (samples, drops) = grouper.collect_samples(&meta_table(), "sample_id");
        assert_eq!(samples.len(), 2);
        assert_eq!(
            drops,
            DropCounts {
                missing_id: 1,
                bad_date: 1,
                control: 1,
                no_values: 1,
            }
        );
        assert_eq!(samples[1].values["A260/A280"], None);
    }

    #[test]
    fn every_sample_gets_every_parameter() {
        let groups = process_edna_meta_file(&meta_table(), "sample_id", "ALGA_EDNA_2503_Meta.csv");
        assert_eq!(groups.len(), 6);

        let order: Vec<(&str, &str)> = groups
            .iter()
            .map(|g| (g.parameter.as_str(), g.sample_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A260/A230", "ALGA_Coast_West"),
                ("A260/A230", "ALGA_Farm_ArcticSeaweed"),
                ("A260/A280", "ALGA_Coast_West"),
                ("A260/A280", "ALGA_Farm_ArcticSeaweed"),
                ("DNA Concentration", "ALGA_Coast_West"),
                ("DNA Concentration", "ALGA_Farm_ArcticSeaweed"),
            ]
        );

        let missing = &groups[2];
        assert!(missing.values.is_empty());
        assert_eq!(missing.count, 0);
        assert_eq!(missing.stats, SeriesStats::default());
        assert_eq!(missing.x_axis_label, "04/03/25 C_W");

        let conc = &groups[5];
        assert_eq!(conc.values, vec![12.5]);
        assert_eq!(conc.stats.mean, 12.5);
        assert_eq!(conc.date, "2025-03-04");
    }

    #[test]
    fn replicate_rows_share_a_group() {
        let table = Table::from_rows(
            COLUMNS,
            vec![
                row("HVS_Reef_North", "2025-06-01", 4.0.into(), Cell::Null, Cell::Null),
                row("HVS_Reef_North", "2025-06-01", 6.0.into(), Cell::Null, Cell::Null),
                row("HVS_Reef_North", "2025-05-01", 5.0.into(), Cell::Null, Cell::Null),
            ],
        );
        let groups = process_edna_meta_file(&table, "sample_id", "HVS_2505-2506.csv");
        assert_eq!(groups.len(), 6);
        let conc: Vec<_> = groups.iter().filter(|g| g.parameter == "DNA Concentration").collect();
        assert_eq!(conc[0].date, "2025-05-01");
        assert_eq!(conc[1].values, vec![4.0, 6.0]);
        assert_eq!(conc[1].stats.mean, 5.0);
        assert_eq!(conc[1].x_axis_label, "01/06/25 R_N");
    }

    #[test]
    fn custom_parameters_and_time_column() {
        let table = Table::from_rows(
            &["Sample", "Collected", "Turbidity"],
            vec![vec![Cell::from("S1"), Cell::from("2025-01-02"), Cell::Number(3.3)]],
        );
        let turbidity = ParameterSpec::new("Turbidity", &["Turbidity"]);
        let grouper = EdnaGrouper::new("Collected", vec![turbidity]);
        let groups = grouper.group(&table, "Sample", "site.csv");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].x_axis_label, "02/01/25 S1");
    }
}
