//! Lazy, timestep-aware reader for series of delimited text files.
//!
//! Each file of an ordered set is one timestep of the same dataset. The
//! reader extracts a header from every file (explicit titles or synthesized
//! `Field i` names), checks that all files agree on it, parses the rows into
//! one [`TimestepFrame`] per file and serves them by timestep index. Reads are
//! lazy and cached until a read parameter actually changes.
//!
//! ```no_run
//! use timestep_reader::DelimitedTextReader;
//!
//! # fn main() -> timestep_reader::Result<()> {
//! let mut reader = DelimitedTextReader::new(["t0.csv", "t1.csv"]);
//! reader.set_delimiter(',');
//! let frame = reader.get_frame(1)?;
//! println!("{frame}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod reader;
pub mod state;

pub use config::{ReadConfig, Separator};
pub use data::header::{
    ensure_unique_titles, reconcile_headers, CommaTitles, GenericHeader, GravGradHeader,
    GravObsHeader, GsLibHeader, HeaderExtractor, MagObsHeader, MagSurvey, Titles, TopoHeader,
};
pub use data::model::{Column, ColumnValues, TimestepFrame};
pub use data::points::{select_points, PointFrame};
pub use error::{ReaderError, Result};
pub use reader::{DelimitedTextReader, PointSink, PointsReader, TableSink};
pub use state::{CacheState, ReadCache};
