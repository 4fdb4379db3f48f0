use std::path::PathBuf;

/// Errors raised at the file and configuration boundaries.
///
/// The statistics and grouping pipelines never fail; they drop what they
/// cannot use. Only loading, saving and argument handling report errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot read Excel workbook: {0}")]
    Excel(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("no data found: {0}")]
    NoData(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
