use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;

use crate::config::ReadConfig;
use crate::data::header::{
    CommaTitles, GenericHeader, GravGradHeader, GravObsHeader, GsLibHeader, HeaderExtractor,
    MagObsHeader, Titles, TopoHeader,
};
use crate::data::model::TimestepFrame;
use crate::data::points::{select_points, PointFrame};
use crate::error::{ReaderError, Result};
use crate::state::ReadCache;

// ---------------------------------------------------------------------------
// Output sinks
// ---------------------------------------------------------------------------

/// Receives the table produced for a requested timestep.
pub trait TableSink {
    fn write_table(&mut self, index: usize, frame: &TimestepFrame) -> Result<()>;
}

/// Receives the points produced for a requested timestep.
pub trait PointSink {
    fn write_points(&mut self, index: usize, points: &PointFrame) -> Result<()>;
}

impl TableSink for Vec<RecordBatch> {
    fn write_table(&mut self, _index: usize, frame: &TimestepFrame) -> Result<()> {
        self.push(frame.to_record_batch()?);
        Ok(())
    }
}

impl PointSink for Vec<PointFrame> {
    fn write_points(&mut self, _index: usize, points: &PointFrame) -> Result<()> {
        self.push(points.clone());
        Ok(())
    }
}

/// Store `value` in `slot` and drop the cache, but only if it differs.
fn set_param<T: PartialEq>(cache: &mut ReadCache, slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    cache.invalidate();
    true
}

// ---------------------------------------------------------------------------
// DelimitedTextReader – the table request adapter
// ---------------------------------------------------------------------------

/// Reads an ordered set of delimited text files, one per timestep, into
/// tables.
///
/// Nothing is read until a frame is requested. The first request reads and
/// caches every file; later requests are served from the cache until a
/// parameter actually changes.
#[derive(Debug)]
pub struct DelimitedTextReader<H = GenericHeader> {
    files: Vec<PathBuf>,
    config: ReadConfig,
    extractor: H,
    cache: ReadCache,
    time_delta: f64,
}

impl DelimitedTextReader<GenericHeader> {
    pub fn new<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        Self::with_extractor(files, GenericHeader)
    }
}

impl DelimitedTextReader<CommaTitles> {
    /// Files with a comma-separated title line over delimited data, using `#`
    /// for comments.
    pub fn xyz_text<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        let mut reader = Self::with_extractor(files, CommaTitles);
        reader.config.comment = '#';
        reader
    }
}

impl DelimitedTextReader<GsLibHeader> {
    pub fn gslib<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        Self::with_extractor(files, GsLibHeader::default())
    }

    /// Title line of the last file read, once a read has happened.
    pub fn file_header(&self) -> Option<&str> {
        self.extractor.file_header()
    }
}

impl<H: HeaderExtractor> DelimitedTextReader<H> {
    pub fn with_extractor<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>, extractor: H) -> Self {
        let mut files_vec: Vec<PathBuf> = Vec::new();
        for f in files {
            let f = f.into();
            if !files_vec.contains(&f) {
                files_vec.push(f);
            }
        }
        Self {
            files: files_vec,
            config: ReadConfig::default(),
            extractor,
            cache: ReadCache::default(),
            time_delta: 1.0,
        }
    }

    // -- Reading --

    /// The frame for timestep `index`, reading the file set first if needed.
    pub fn get_frame(&mut self, index: usize) -> Result<&TimestepFrame> {
        let frames = self
            .cache
            .ensure_fresh(&self.files, &self.config, &mut self.extractor)?;
        frames.get(index).ok_or(ReaderError::IndexOutOfRange {
            index,
            len: frames.len(),
        })
    }

    /// Pipeline entry point: resolve the requested time to a timestep and
    /// hand its table to `sink`.
    pub fn request_data<S: TableSink>(&mut self, requested_time: Option<f64>, sink: &mut S) -> Result<()> {
        let index = self.index_for_time(requested_time);
        let frame = self.get_frame(index)?;
        sink.write_table(index, frame)
    }

    /// Titles shared by every file, if the cache is fresh.
    pub fn titles(&self) -> Option<&Titles> {
        self.cache.titles()
    }

    pub fn needs_read(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Number of full reads performed so far.
    pub fn reads_performed(&self) -> usize {
        self.cache.reads_performed()
    }

    pub fn extractor(&self) -> &H {
        &self.extractor
    }

    // -- File set --

    pub fn file_names(&self) -> &[PathBuf] {
        &self.files
    }

    /// Append a file as the next timestep. Returns `false` if it was already
    /// part of the set.
    pub fn add_file_name(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.files.iter().any(|f| f == path) {
            return false;
        }
        self.files.push(path.to_path_buf());
        self.cache.invalidate();
        true
    }

    /// Append several files; returns whether any was new.
    pub fn add_file_names<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> bool {
        let mut added = false;
        for p in paths {
            added |= self.add_file_name(p);
        }
        added
    }

    pub fn clear_file_names(&mut self) -> bool {
        if self.files.is_empty() {
            return false;
        }
        self.files.clear();
        self.cache.invalidate();
        true
    }

    // -- Parameters --

    pub fn config(&self) -> &ReadConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ReadConfig) -> bool {
        set_param(&mut self.cache, &mut self.config, config)
    }

    /// Field delimiter. Ignored while splitting on whitespace.
    pub fn set_delimiter(&mut self, delimiter: char) -> bool {
        set_param(&mut self.cache, &mut self.config.delimiter, delimiter)
    }

    /// Split fields on whitespace runs instead of the delimiter.
    pub fn set_split_on_whitespace(&mut self, flag: bool) -> bool {
        set_param(&mut self.cache, &mut self.config.split_on_whitespace, flag)
    }

    pub fn set_skip_rows(&mut self, skip: usize) -> bool {
        set_param(&mut self.cache, &mut self.config.skip_rows, skip)
    }

    pub fn set_comment(&mut self, comment: char) -> bool {
        set_param(&mut self.cache, &mut self.config.comment, comment)
    }

    pub fn set_has_titles(&mut self, flag: bool) -> bool {
        set_param(&mut self.cache, &mut self.config.has_titles, flag)
    }

    // -- Time --

    pub fn time_delta(&self) -> f64 {
        self.time_delta
    }

    /// Spacing between timesteps. Only affects time lookup, so the cache is
    /// kept.
    pub fn set_time_delta(&mut self, dt: f64) -> bool {
        if self.time_delta == dt {
            return false;
        }
        self.time_delta = dt;
        true
    }

    /// `[0, dt, 2dt, ...]`, one value per file; `None` for fewer than two
    /// files.
    pub fn timestep_values(&self) -> Option<Vec<f64>> {
        if self.files.len() < 2 {
            return None;
        }
        Some(
            (0..self.files.len())
                .map(|i| i as f64 * self.time_delta)
                .collect(),
        )
    }

    /// Index of the timestep closest to `time`; 0 when no time is requested.
    pub fn index_for_time(&self, time: Option<f64>) -> usize {
        match (time, self.timestep_values()) {
            (Some(t), Some(values)) => values
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (*a - t).abs().total_cmp(&(*b - t).abs()))
                .map_or(0, |(i, _)| i),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// PointsReader – the points-only request adapter
// ---------------------------------------------------------------------------

/// A [`DelimitedTextReader`] whose output is point coordinates rather than a
/// plain table.
#[derive(Debug)]
pub struct PointsReader<H = GenericHeader> {
    inner: DelimitedTextReader<H>,
    copy_z: bool,
}

impl PointsReader<GenericHeader> {
    pub fn new<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        Self::with_extractor(files, GenericHeader)
    }
}

impl PointsReader<CommaTitles> {
    /// Points from comma-titled files; same defaults as
    /// [`DelimitedTextReader::xyz_text`].
    pub fn xyz_text<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        Self {
            inner: DelimitedTextReader::xyz_text(files),
            copy_z: false,
        }
    }
}

impl PointsReader<TopoHeader> {
    /// UBC topography files: whitespace separated, Z copied as elevation.
    pub fn topo<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        let mut reader = Self::with_extractor(files, TopoHeader::default());
        reader.inner.set_has_titles(false);
        reader.inner.set_split_on_whitespace(true);
        reader.copy_z = true;
        reader
    }
}

impl PointsReader<GravObsHeader> {
    /// UBC gravity observation files.
    pub fn grav_obs<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        let mut reader = Self::with_extractor(files, GravObsHeader::default());
        reader.inner.set_has_titles(false);
        reader.inner.set_split_on_whitespace(true);
        reader
    }
}

impl PointsReader<GravGradHeader> {
    /// UBC gravity gradiometry files.
    pub fn grav_grad<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        let mut reader = Self::with_extractor(files, GravGradHeader::default());
        reader.inner.set_has_titles(false);
        reader.inner.set_split_on_whitespace(true);
        reader
    }
}

impl PointsReader<MagObsHeader> {
    /// UBC magnetic observation files. Location-only files keep Z as
    /// elevation whatever the copy-Z setting.
    pub fn mag_obs<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        let mut reader = Self::with_extractor(files, MagObsHeader::default());
        reader.inner.set_has_titles(false);
        reader.inner.set_split_on_whitespace(true);
        reader
    }
}

impl<H: HeaderExtractor> PointsReader<H> {
    pub fn with_extractor<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>, extractor: H) -> Self {
        Self {
            inner: DelimitedTextReader::with_extractor(files, extractor),
            copy_z: false,
        }
    }

    /// The underlying table reader, for file set and parsing parameters.
    pub fn reader(&self) -> &DelimitedTextReader<H> {
        &self.inner
    }

    pub fn reader_mut(&mut self) -> &mut DelimitedTextReader<H> {
        &mut self.inner
    }

    pub fn copy_z(&self) -> bool {
        self.copy_z
    }

    pub fn set_copy_z(&mut self, flag: bool) -> bool {
        set_param(&mut self.inner.cache, &mut self.copy_z, flag)
    }

    /// Points for timestep `index`.
    pub fn get_points(&mut self, index: usize) -> Result<PointFrame> {
        // Refresh first: the extracted layout can force copy-Z.
        self.inner.get_frame(index)?;
        let copy_z = self.copy_z || self.inner.extractor.forces_copy_z();
        let frame = self.inner.get_frame(index)?;
        select_points(frame, copy_z)
    }

    pub fn request_data<S: PointSink>(&mut self, requested_time: Option<f64>, sink: &mut S) -> Result<()> {
        let index = self.inner.index_for_time(requested_time);
        let points = self.get_points(index)?;
        sink.write_points(index, &points)
    }
}
