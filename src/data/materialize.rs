use std::io::{BufRead, Seek};
use std::path::Path;

use crate::config::{ReadConfig, Separator};
use crate::data::handles::TextStream;
use crate::data::model::TimestepFrame;
use crate::error::{ReaderError, Result};

/// A data row tagged with the physical line it came from.
type NumberedRow = (usize, Vec<String>);

/// Parse everything left in `stream` into a frame whose columns are `titles`.
///
/// The stream is taken by value: whether parsing succeeds or fails, the file
/// handle is closed by the time this returns.
///
/// Rows must have exactly one field per title; the first row that does not
/// fails the call with [`ReaderError::RowShape`].
pub fn materialize<R: BufRead + Seek>(
    mut stream: TextStream<R>,
    titles: &[String],
    config: &ReadConfig,
) -> Result<TimestepFrame> {
    let path = stream.path().to_path_buf();
    let mut lines = Vec::new();
    while let Some(line) = stream.read_logical_line(config.comment)? {
        lines.push((stream.line_number(), line));
    }
    drop(stream);

    let rows: Vec<NumberedRow> = match config.separator() {
        Separator::Whitespace => lines
            .into_iter()
            .map(|(n, line)| (n, line.split_whitespace().map(str::to_string).collect()))
            .collect(),
        Separator::Char(delimiter) => split_delimited(&path, &lines, delimiter)?,
    };

    let mut cells = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        if row.len() != titles.len() {
            return Err(ReaderError::RowShape {
                path,
                line,
                expected: titles.len(),
                found: row.len(),
            });
        }
        cells.push(row);
    }

    let frame = TimestepFrame::from_rows(titles, cells);
    log::debug!("{}: {frame}", path.display());
    Ok(frame)
}

/// Split one logical line the way data rows are split: whitespace runs, or
/// the csv parser (quotes respected, fields trimmed) for a delimiter.
pub fn split_fields(path: &Path, line: &str, separator: Separator) -> Result<Vec<String>> {
    match separator {
        Separator::Whitespace => Ok(line.split_whitespace().map(str::to_string).collect()),
        Separator::Char(delimiter) => {
            let mut reader = delimited_reader(delimiter, line.as_bytes())?;
            match reader.records().next() {
                Some(record) => {
                    let record = record.map_err(|source| ReaderError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    Ok(record.iter().map(str::to_string).collect())
                }
                None => Ok(Vec::new()),
            }
        }
    }
}

fn delimited_reader<R: std::io::Read>(delimiter: char, input: R) -> Result<csv::Reader<R>> {
    if !delimiter.is_ascii() {
        return Err(ReaderError::InvalidConfig(format!(
            "delimiter {delimiter:?} is not a single-byte character"
        )));
    }
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input))
}

/// Run logical lines through the csv parser with a single-byte delimiter.
fn split_delimited(path: &Path, lines: &[(usize, String)], delimiter: char) -> Result<Vec<NumberedRow>> {
    let text = lines
        .iter()
        .map(|(_, l)| l.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let mut reader = delimited_reader(delimiter, text.as_bytes())?;

    let mut rows = Vec::with_capacity(lines.len());
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|source| ReaderError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        // Map back from the joined text to the file's own line numbers.
        let line = record
            .position()
            .and_then(|p| (p.line() as usize).checked_sub(1))
            .and_then(|at| lines.get(at))
            .or_else(|| lines.get(i))
            .map_or(0, |(n, _)| *n);
        rows.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::handles::memory_stream;
    use crate::data::model::ColumnValues;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn whitespace_rows_with_comments() {
        let cfg = ReadConfig {
            split_on_whitespace: true,
            ..Default::default()
        };
        let s = memory_stream("1  2\t3 ! note\n! skipped\n4 5 6\n");
        let frame = materialize(s, &names(&["a", "b", "c"]), &cfg).unwrap();
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.column("c"), Some(&ColumnValues::Numeric(vec![3.0, 6.0])));
    }

    #[test]
    fn delimited_rows_keep_text_columns() {
        let cfg = ReadConfig {
            delimiter: ',',
            ..Default::default()
        };
        let s = memory_stream("1, well-a ,0.5\n2,\"well, b\",0.7\n");
        let frame = materialize(s, &names(&["id", "well", "por"]), &cfg).unwrap();
        assert_eq!(
            frame.column("well"),
            Some(&ColumnValues::Text(names(&["well-a", "well, b"])))
        );
        assert_eq!(frame.column("id"), Some(&ColumnValues::Numeric(vec![1.0, 2.0])));
    }

    #[test]
    fn row_width_mismatch_names_the_line() {
        let cfg = ReadConfig {
            delimiter: ',',
            ..Default::default()
        };
        let s = memory_stream("1,2,3\n! c\n4,5\n");
        match materialize(s, &names(&["a", "b", "c"]), &cfg) {
            Err(ReaderError::RowShape {
                line,
                expected,
                found,
                ..
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let cfg = ReadConfig {
            delimiter: '§',
            ..Default::default()
        };
        let s = memory_stream("1§2\n");
        assert!(matches!(
            materialize(s, &names(&["a", "b"]), &cfg),
            Err(ReaderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn split_fields_respects_quotes() {
        let path = Path::new("memory.txt");
        assert_eq!(
            split_fields(path, r#"1,"a,b", 3"#, Separator::Char(',')).unwrap(),
            names(&["1", "a,b", "3"])
        );
        assert_eq!(
            split_fields(path, "a,,b", Separator::Char(',')).unwrap(),
            names(&["a", "", "b"])
        );
        assert_eq!(
            split_fields(path, "1 \t 2   3", Separator::Whitespace).unwrap(),
            names(&["1", "2", "3"])
        );
    }

    #[test]
    fn no_rows_gives_empty_frame() {
        let s = memory_stream("! nothing here\n");
        let frame = materialize(s, &names(&["a"]), &ReadConfig::default()).unwrap();
        assert_eq!(frame.num_rows(), 0);
        assert_eq!(frame.column_names(), vec!["a"]);
    }
}
