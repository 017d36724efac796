use std::path::PathBuf;

use crate::config::ReadConfig;
use crate::data::handles::open_all;
use crate::data::header::{ensure_unique_titles, reconcile_headers, HeaderExtractor, Titles};
use crate::data::materialize::materialize;
use crate::data::model::TimestepFrame;
use crate::error::{ReaderError, Result};

// ---------------------------------------------------------------------------
// Read cache
// ---------------------------------------------------------------------------

/// Whether the cached frames can be served as they are.
#[derive(Debug, Clone, Default)]
pub enum CacheState {
    /// Parameters changed or nothing was read yet; the next request re-reads
    /// every file.
    #[default]
    Dirty,
    /// One frame per file, all with columns named `titles`.
    Fresh {
        titles: Titles,
        frames: Vec<TimestepFrame>,
    },
}

/// The cached read result plus the bookkeeping around it.
#[derive(Debug, Default)]
pub struct ReadCache {
    state: CacheState,
    reads: usize,
}

impl ReadCache {
    pub fn is_dirty(&self) -> bool {
        matches!(self.state, CacheState::Dirty)
    }

    /// Drop the cached frames; the next request re-reads.
    pub fn invalidate(&mut self) {
        self.state = CacheState::Dirty;
    }

    /// Number of completed full reads since construction.
    pub fn reads_performed(&self) -> usize {
        self.reads
    }

    pub fn titles(&self) -> Option<&Titles> {
        match &self.state {
            CacheState::Fresh { titles, .. } => Some(titles),
            CacheState::Dirty => None,
        }
    }

    pub fn frames(&self) -> Option<&[TimestepFrame]> {
        match &self.state {
            CacheState::Fresh { frames, .. } => Some(frames),
            CacheState::Dirty => None,
        }
    }

    /// Make the cache fresh, reading the whole file set if it is dirty.
    ///
    /// On failure the cache stays dirty: a partially read set is never kept.
    pub fn ensure_fresh<H: HeaderExtractor>(
        &mut self,
        files: &[PathBuf],
        config: &ReadConfig,
        extractor: &mut H,
    ) -> Result<&[TimestepFrame]> {
        if self.is_dirty() {
            match read_file_set(files, config, extractor) {
                Ok((titles, frames)) => {
                    log::info!(
                        "read {} timestep(s) with columns {:?}",
                        frames.len(),
                        titles
                    );
                    self.state = CacheState::Fresh { titles, frames };
                    self.reads += 1;
                }
                Err(e) => {
                    log::warn!("read of {} file(s) failed: {e}", files.len());
                    return Err(e);
                }
            }
        }
        match &self.state {
            CacheState::Fresh { frames, .. } => Ok(frames),
            CacheState::Dirty => Err(ReaderError::NoFiles),
        }
    }
}

/// Open → extract headers → reconcile → materialize, for every file.
fn read_file_set<H: HeaderExtractor>(
    files: &[PathBuf],
    config: &ReadConfig,
    extractor: &mut H,
) -> Result<(Titles, Vec<TimestepFrame>)> {
    if files.is_empty() {
        return Err(ReaderError::NoFiles);
    }
    log::debug!("reading {} file(s) with {config:?}", files.len());
    let mut streams = open_all(files, config.skip_rows)?;
    let headers = streams
        .iter_mut()
        .map(|s| -> Result<Titles> {
            let titles = extractor.extract_header(s, config)?;
            ensure_unique_titles(s.path(), &titles)?;
            Ok(titles)
        })
        .collect::<Result<Vec<_>>>()?;
    let titles = reconcile_headers(headers)?;
    let frames = streams
        .into_iter()
        .map(|s| materialize(s, &titles, config))
        .collect::<Result<Vec<_>>>()?;
    Ok((titles, frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::header::GenericHeader;

    #[test]
    fn starts_dirty_and_refreshes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t0.txt");
        std::fs::write(&path, "a b\n1 2\n").unwrap();
        let files = vec![path];
        let cfg = ReadConfig::default();

        let mut cache = ReadCache::default();
        assert!(cache.is_dirty());
        assert_eq!(cache.ensure_fresh(&files, &cfg, &mut GenericHeader).unwrap().len(), 1);
        assert!(!cache.is_dirty());
        cache.ensure_fresh(&files, &cfg, &mut GenericHeader).unwrap();
        assert_eq!(cache.reads_performed(), 1);

        cache.invalidate();
        assert!(cache.titles().is_none());
        cache.ensure_fresh(&files, &cfg, &mut GenericHeader).unwrap();
        assert_eq!(cache.reads_performed(), 2);
    }

    #[test]
    fn empty_file_set_stays_dirty() {
        let mut cache = ReadCache::default();
        let err = cache
            .ensure_fresh(&[], &ReadConfig::default(), &mut GenericHeader)
            .unwrap_err();
        assert!(matches!(err, ReaderError::NoFiles));
        assert!(cache.is_dirty());
    }

    #[test]
    fn duplicate_titles_fail_the_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t0.txt");
        std::fs::write(&path, "a a\n1 2\n").unwrap();
        let files = vec![path.clone()];

        let mut cache = ReadCache::default();
        match cache.ensure_fresh(&files, &ReadConfig::default(), &mut GenericHeader) {
            Err(ReaderError::MalformedHeader { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(cache.is_dirty());
        assert_eq!(cache.reads_performed(), 0);
    }
}
