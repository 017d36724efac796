use std::path::PathBuf;

use thiserror::Error;

use crate::data::header::Titles;

/// Everything that can go wrong while reading a timestep file set.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// A file could not be opened or read.
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Files in the set disagree on their column titles.
    #[error(
        "data array titles varied across file timesteps ({variants} distinct headers, e.g. {first:?} vs {second:?}); the data is invalid as a timeseries"
    )]
    InconsistentSchema {
        variants: usize,
        first: Titles,
        second: Titles,
    },

    /// A timestep index outside `[0, len)` was requested.
    #[error("timestep index {index} out of range for {len} file(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A data row does not have one field per title.
    #[error("{}:{line}: expected {expected} fields but found {found}", path.display())]
    RowShape {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The parsing primitive rejected the data section of a file.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The header block of a file does not follow its expected layout.
    #[error("malformed header in {}: {reason}", path.display())]
    MalformedHeader { path: PathBuf, reason: String },

    /// A read was requested before any file names were set.
    #[error("file names are not set")]
    NoFiles,

    /// The read parameters cannot be used for parsing.
    #[error("invalid read configuration: {0}")]
    InvalidConfig(String),

    /// Point selection needs at least one numeric column.
    #[error("frame has no numeric columns to use as point coordinates")]
    NoNumericColumns,

    /// A JSON configuration file could not be parsed.
    #[error("invalid configuration file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type Result<T> = std::result::Result<T, ReaderError>;

impl ReaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReaderError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReaderError::MalformedHeader {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
