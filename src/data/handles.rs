use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{ReaderError, Result};

// ---------------------------------------------------------------------------
// Opening the file set
// ---------------------------------------------------------------------------

/// Open every file of the set, in order, each positioned after `skip_rows`
/// physical lines.
///
/// Nothing is left open on failure: streams opened before the failing path
/// are dropped while the error propagates.
pub fn open_all(paths: &[PathBuf], skip_rows: usize) -> Result<Vec<TextStream<BufReader<File>>>> {
    paths.iter().map(|path| open(path, skip_rows)).collect()
}

/// Open a single file and discard its first `skip_rows` lines.
pub fn open(path: &Path, skip_rows: usize) -> Result<TextStream<BufReader<File>>> {
    let file = File::open(path).map_err(|e| ReaderError::io(path, e))?;
    let mut stream = TextStream::new(path, BufReader::new(file));
    stream.skip_lines(skip_rows)?;
    log::debug!("opened {} (skipped {skip_rows} rows)", path.display());
    Ok(stream)
}

// ---------------------------------------------------------------------------
// Comment handling
// ---------------------------------------------------------------------------

/// Cut `line` at the first `comment` character and trim what is left.
///
/// Applying it again to its own output changes nothing.
pub fn strip_comment(line: &str, comment: char) -> &str {
    match line.find(comment) {
        Some(at) => line[..at].trim(),
        None => line.trim(),
    }
}

// ---------------------------------------------------------------------------
// TextStream – a line-oriented view over one open file
// ---------------------------------------------------------------------------

/// A readable, seekable line stream tied to the path it was opened from.
///
/// The underlying handle is closed when the stream is dropped.
#[derive(Debug)]
pub struct TextStream<R> {
    path: PathBuf,
    reader: R,
    /// 1-based number of the last physical line read.
    line: usize,
}

impl<R: BufRead + Seek> TextStream<R> {
    pub fn new(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
            line: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of the last physical line consumed (0 before any read).
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Discard up to `count` physical lines. Running out of input is not an
    /// error; the stream is just left empty.
    pub fn skip_lines(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            if self.read_physical_line()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Next raw line without its line terminator, `None` at end of input.
    pub fn read_physical_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let n = self
            .reader
            .read_line(&mut buf)
            .map_err(|e| ReaderError::io(&self.path, e))?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        let trimmed_len = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed_len);
        Ok(Some(buf))
    }

    /// Next logical line: whole-line comments and lines left empty after
    /// comment stripping are skipped.
    pub fn read_logical_line(&mut self, comment: char) -> Result<Option<String>> {
        while let Some(raw) = self.read_physical_line()? {
            if raw.starts_with(comment) {
                continue;
            }
            let content = strip_comment(&raw, comment);
            if !content.is_empty() {
                return Ok(Some(content.to_string()));
            }
        }
        Ok(None)
    }

    /// Like [`read_logical_line`](Self::read_logical_line) but leaves the
    /// stream where it was.
    pub fn preview_logical_line(&mut self, comment: char) -> Result<Option<String>> {
        let pos = self
            .reader
            .stream_position()
            .map_err(|e| ReaderError::io(&self.path, e))?;
        let line = self.line;
        let preview = self.read_logical_line(comment);
        self.reader
            .seek(SeekFrom::Start(pos))
            .map_err(|e| ReaderError::io(&self.path, e))?;
        self.line = line;
        preview
    }
}

#[cfg(test)]
pub(crate) fn memory_stream(text: &str) -> TextStream<std::io::Cursor<Vec<u8>>> {
    TextStream::new("memory.txt", std::io::Cursor::new(text.as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comment_is_idempotent() {
        let once = strip_comment("1 2 3 ! note", '!');
        assert_eq!(once, "1 2 3");
        assert_eq!(strip_comment(once, '!'), once);
        assert_eq!(strip_comment("  plain  ", '!'), "plain");
    }

    #[test]
    fn logical_lines_skip_comments_and_blanks() {
        let mut s = memory_stream("! header comment\n\n   ! indented comment\na b ! tail\nc d\n");
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("a b"));
        assert_eq!(s.line_number(), 4);
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("c d"));
        assert_eq!(s.read_logical_line('!').unwrap(), None);
    }

    #[test]
    fn preview_does_not_consume() {
        let mut s = memory_stream("# c\n1,2\n3,4\n");
        assert_eq!(s.preview_logical_line('#').unwrap().as_deref(), Some("1,2"));
        assert_eq!(s.line_number(), 0);
        assert_eq!(s.read_logical_line('#').unwrap().as_deref(), Some("1,2"));
        assert_eq!(s.read_logical_line('#').unwrap().as_deref(), Some("3,4"));
    }

    #[test]
    fn skip_counts_physical_lines() {
        for k in 0..4 {
            let mut s = memory_stream("l1\n! l2\n\nl4\nl5\n");
            s.skip_lines(k).unwrap();
            assert_eq!(s.line_number(), k);
        }
        let mut s = memory_stream("only\n");
        s.skip_lines(10).unwrap();
        assert_eq!(s.read_physical_line().unwrap(), None);
    }

    #[test]
    fn crlf_terminators_are_removed() {
        let mut s = memory_stream("a\r\nb\r\n");
        assert_eq!(s.read_physical_line().unwrap().as_deref(), Some("a"));
        assert_eq!(s.read_physical_line().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn open_all_reports_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("t0.txt");
        std::fs::write(&good, "a\n").unwrap();
        let missing = dir.path().join("t1.txt");
        match open_all(&[good, missing.clone()], 0) {
            Err(ReaderError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
