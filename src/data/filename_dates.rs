//! Dates encoded in data-file names.
//!
//! Two naming conventions coexist and are parsed independently:
//! project files carry a `YYMM-YYMM` sampling range anywhere in the name
//! (`ALGA_CROP_F_L_2503-2506_Indiv.csv`), while eDNA metadata sheets carry a
//! single `YYMM` token between underscores (`ALGA_EDNA_2503_Meta.csv`).

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9]{4})-([0-9]{4})").unwrap());

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Sampling period parsed from a `YYMM-YYMM` file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_month: String,
    pub end_month: String,
    pub start_year: String,
    pub end_year: String,
    pub display_format: String,
}

/// Split a `YYMM` group into (full year, month), rejecting months outside 1..=12.
fn parse_yymm(group: &str) -> Option<(i32, u32)> {
    if group.len() != 4 || !group.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = group[..2].parse().ok()?;
    let mm: u32 = group[2..].parse().ok()?;
    if !(1..=12).contains(&mm) {
        return None;
    }
    Some((2000 + yy, mm))
}

fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month - 1) as usize]
}

/// Parse the first `YYMM-YYMM` range found anywhere in `filename`.
///
/// Returns `None` when there is no range or either month is invalid.
pub fn parse_date_range_from_filename(filename: &str) -> Option<DateRange> {
    let caps = RANGE_RE.captures(filename)?;
    let (start_year, start_month) = parse_yymm(&caps[1])?;
    let (end_year, end_month) = parse_yymm(&caps[2])?;

    let start_name = month_name(start_month);
    let end_name = month_name(end_month);

    let display_format = if start_year == end_year && start_month == end_month {
        format!("{start_name} {start_year}")
    } else if start_year == end_year {
        format!("{start_name} - {end_name} {start_year}")
    } else {
        format!("{start_name} {start_year} - {end_name} {end_year}")
    };

    Some(DateRange {
        start_month: start_name.to_string(),
        end_month: end_name.to_string(),
        start_year: start_year.to_string(),
        end_year: end_year.to_string(),
        display_format,
    })
}

/// First day of the month named by the first bare `YYMM` token of an
/// underscore-delimited eDNA file name.
///
/// The extension is ignored. Only the first 4-digit token is considered; an
/// invalid month there yields `None`.
pub fn extract_edna_date(filename: &str) -> Option<NaiveDate> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let token = stem
        .split('_')
        .find(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))?;
    let (year, month) = parse_yymm(token)?;
    NaiveDate::from_ymd_opt(year, month, 1)
}
