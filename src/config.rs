use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};

// ---------------------------------------------------------------------------
// ReadConfig – parameters that control how every file is parsed
// ---------------------------------------------------------------------------

/// Parameters controlling the read. Changing any of them through the reader's
/// setters invalidates the cached frames.
///
/// Can be loaded from JSON; missing keys fall back to the defaults:
///
/// ```json
/// { "delimiter": ",", "skip_rows": 2, "comment": "#", "has_titles": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Single-character field separator.
    pub delimiter: char,
    /// Split on runs of whitespace instead of `delimiter`.
    pub split_on_whitespace: bool,
    /// Physical lines discarded at the top of every file.
    pub skip_rows: usize,
    /// Comment marker; whole-line and trailing comments are removed.
    pub comment: char,
    /// Whether the first logical line holds the column titles.
    pub has_titles: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            delimiter: ' ',
            split_on_whitespace: false,
            skip_rows: 0,
            comment: '!',
            has_titles: true,
        }
    }
}

/// The effective field separator after resolving the whitespace override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Char(char),
    Whitespace,
}

impl ReadConfig {
    pub fn separator(&self) -> Separator {
        if self.split_on_whitespace {
            Separator::Whitespace
        } else {
            Separator::Char(self.delimiter)
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReaderError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| ReaderError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
