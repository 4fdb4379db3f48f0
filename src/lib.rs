//! Statistical cleaning and sample regrouping for marine survey datasets.
//!
//! Two independent pipelines live here: the outlier engine
//! ([`processing::outliers`]) and the eDNA discrete-sample grouper
//! ([`processing::edna`]), plus the table, loader, settings and cache
//! plumbing the `oceanplot` binary wraps them in.

pub mod data;
pub mod error;
pub mod processing;
pub mod state;

pub use data::filename_dates::{extract_edna_date, parse_date_range_from_filename, DateRange};
pub use data::table::{detect_numerical_columns, Cell, Row, Table};
pub use error::{Error, Result};
pub use processing::edna::{
    abbreviate_station_label, format_spot_sample_label, process_edna_meta_file, EdnaGrouper,
    ParameterSpec, SpotSampleGroup,
};
pub use processing::outliers::{
    clean_outliers, detect_outliers, get_column_outlier_stats, CleanResult, ColumnOutlierStats,
    DetectionMethod, HandlingStrategy, OutlierDetectionResult,
};
pub use processing::statistics::{quartiles, Quartiles};
pub use state::settings::Settings;
pub use state::transform_cache::TransformCache;
