use std::io::{BufRead, Seek};
use std::path::Path;

use crate::config::ReadConfig;
use crate::data::handles::TextStream;
use crate::data::materialize::split_fields;
use crate::error::{ReaderError, Result};

/// Ordered column titles, one per column.
pub type Titles = Vec<String>;

/// Positional titles `Field 0 .. Field {count-1}`.
pub fn synthesize_titles(count: usize) -> Titles {
    (0..count).map(|i| format!("Field {i}")).collect()
}

// ---------------------------------------------------------------------------
// HeaderExtractor – how a file's header block becomes titles
// ---------------------------------------------------------------------------

/// Consumes the header block at the head of a stream and returns the titles.
///
/// On return the stream must be positioned at the first data line. Variants
/// differ only in how the header block is laid out; reconciliation and table
/// materialization never look at which variant produced the titles.
pub trait HeaderExtractor {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles>;

    /// Whether the last extracted layout only carries locations, so point
    /// output should keep Z as an attribute regardless of the copy-Z setting.
    fn forces_copy_z(&self) -> bool {
        false
    }
}

/// Reject titles that name the same column twice; such a column could not be
/// looked up by name.
pub fn ensure_unique_titles(path: &Path, titles: &[String]) -> Result<()> {
    for (i, title) in titles.iter().enumerate() {
        if let Some(j) = titles[..i].iter().position(|t| t == title) {
            return Err(ReaderError::malformed(
                path,
                format!("duplicate title {title:?} in columns {j} and {i}"),
            ));
        }
    }
    Ok(())
}

fn next_logical<R: BufRead + Seek>(
    stream: &mut TextStream<R>,
    comment: char,
    what: &str,
) -> Result<String> {
    stream
        .read_logical_line(comment)?
        .ok_or_else(|| ReaderError::malformed(stream.path(), format!("missing {what}")))
}

/// Split a header line with the same rules as the data rows.
fn split_line<R: BufRead + Seek>(
    stream: &TextStream<R>,
    line: &str,
    config: &ReadConfig,
) -> Result<Vec<String>> {
    split_fields(stream.path(), line, config.separator())
}

/// Field count of the first data line, without consuming it.
fn first_row_width<R: BufRead + Seek>(stream: &mut TextStream<R>, config: &ReadConfig) -> Result<usize> {
    let first = stream
        .preview_logical_line(config.comment)?
        .ok_or_else(|| ReaderError::malformed(stream.path(), "no data lines"))?;
    Ok(split_line(stream, &first, config)?.len())
}

// ---------------------------------------------------------------------------
// Generic delimited header
// ---------------------------------------------------------------------------

/// Titles on the first logical line, split like the data; or, without titles,
/// `Field i` names sized from the first data line.
#[derive(Debug, Clone, Default)]
pub struct GenericHeader;

impl HeaderExtractor for GenericHeader {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles> {
        if config.has_titles {
            let line = next_logical(stream, config.comment, "title line")?;
            let titles = split_line(stream, &line, config)?;
            return Ok(titles.into_iter().map(|t| t.trim().to_string()).collect());
        }
        Ok(synthesize_titles(first_row_width(stream, config)?))
    }
}

// ---------------------------------------------------------------------------
// Comma titles over space-delimited data ("XYZ" text files)
// ---------------------------------------------------------------------------

/// First raw line holds comma-separated titles, optionally behind a leading
/// `!` marker (`! X, Y, Z`). The data delimiter is whatever the config says.
#[derive(Debug, Clone, Default)]
pub struct CommaTitles;

impl HeaderExtractor for CommaTitles {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        _config: &ReadConfig,
    ) -> Result<Titles> {
        let raw = stream
            .read_physical_line()?
            .ok_or_else(|| ReaderError::malformed(stream.path(), "missing title line"))?;
        let body = raw.trim().trim_start_matches('!').trim();
        if body.is_empty() {
            return Err(ReaderError::malformed(stream.path(), "empty title line"));
        }
        Ok(body.split(',').map(|t| t.trim().to_string()).collect())
    }
}

// ---------------------------------------------------------------------------
// GSLIB / GeoEAS
// ---------------------------------------------------------------------------

/// GSLIB layout: a free-text title line, the number of columns `n`, then `n`
/// lines with one column name each.
#[derive(Debug, Clone, Default)]
pub struct GsLibHeader {
    file_header: Option<String>,
}

impl GsLibHeader {
    /// Title line of the most recently extracted file.
    pub fn file_header(&self) -> Option<&str> {
        self.file_header.as_deref()
    }
}

impl HeaderExtractor for GsLibHeader {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles> {
        let title = next_logical(stream, config.comment, "title line")?;
        let count_line = next_logical(stream, config.comment, "column count")?;
        let count: usize = count_line.parse().map_err(|_| {
            ReaderError::malformed(
                stream.path(),
                format!("column count {count_line:?} is not an integer; not a GSLIB file"),
            )
        })?;
        let mut titles = Vec::with_capacity(count);
        for i in 0..count {
            titles.push(next_logical(stream, config.comment, &format!("name of column {i}"))?);
        }
        log::debug!("{}: GSLIB header {title:?}", stream.path().display());
        self.file_header = Some(title);
        Ok(titles)
    }
}

// ---------------------------------------------------------------------------
// UBC point files: a point count, then fixed columns
// ---------------------------------------------------------------------------

fn read_point_count<R: BufRead + Seek>(stream: &mut TextStream<R>, config: &ReadConfig) -> Result<usize> {
    let count_line = next_logical(stream, config.comment, "point count")?;
    count_line.parse().map_err(|_| {
        ReaderError::malformed(stream.path(), format!("point count {count_line:?} is not an integer"))
    })
}

fn improperly_formatted<R: BufRead + Seek>(stream: &TextStream<R>, found: usize) -> ReaderError {
    ReaderError::malformed(
        stream.path(),
        format!("data improperly formatted: unexpected row width {found}"),
    )
}

fn point_count_header<R: BufRead + Seek>(
    stream: &mut TextStream<R>,
    config: &ReadConfig,
    titles: &[&str],
) -> Result<(usize, Titles)> {
    let count = read_point_count(stream, config)?;
    let found = first_row_width(stream, config)?;
    if found != titles.len() {
        return Err(improperly_formatted(stream, found));
    }
    Ok((count, titles.iter().map(|t| t.to_string()).collect()))
}

/// UBC topography: point count, then `X Y Z` rows.
#[derive(Debug, Clone, Default)]
pub struct TopoHeader {
    point_count: Option<usize>,
}

impl TopoHeader {
    pub fn point_count(&self) -> Option<usize> {
        self.point_count
    }
}

impl HeaderExtractor for TopoHeader {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles> {
        let (count, titles) = point_count_header(stream, config, &["X", "Y", "Z"])?;
        self.point_count = Some(count);
        Ok(titles)
    }
}

/// UBC gravity observations: point count, then `X Y Z Grav Err` rows.
#[derive(Debug, Clone, Default)]
pub struct GravObsHeader {
    point_count: Option<usize>,
}

impl GravObsHeader {
    pub fn point_count(&self) -> Option<usize> {
        self.point_count
    }
}

impl HeaderExtractor for GravObsHeader {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles> {
        let (count, titles) =
            point_count_header(stream, config, &["X", "Y", "Z", "Grav", "Err"])?;
        self.point_count = Some(count);
        Ok(titles)
    }
}

/// UBC gravity gradiometry: a `key=c1,c2,...` component line, the point
/// count, then `X Y Z` plus one column per component, optionally followed by
/// one `Stn_<component>` uncertainty column per component.
#[derive(Debug, Clone, Default)]
pub struct GravGradHeader {
    components: Vec<String>,
    point_count: Option<usize>,
}

impl GravGradHeader {
    /// Components named on the first header line.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn point_count(&self) -> Option<usize> {
        self.point_count
    }
}

impl HeaderExtractor for GravGradHeader {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles> {
        let line = next_logical(stream, config.comment, "component line")?;
        let components: Vec<String> = match line.split_once('=') {
            Some((_, comps)) => comps
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            None => Vec::new(),
        };
        if components.is_empty() {
            return Err(ReaderError::malformed(
                stream.path(),
                format!("component line {line:?} has no `key=c1,c2` list"),
            ));
        }
        let count = read_point_count(stream, config)?;

        let mut titles: Titles = ["X", "Y", "Z"].iter().map(|t| t.to_string()).collect();
        titles.extend(components.iter().cloned());
        let found = first_row_width(stream, config)?;
        if found == titles.len() + components.len() {
            titles.extend(components.iter().map(|c| format!("Stn_{c}")));
        } else if found != titles.len() {
            return Err(improperly_formatted(stream, found));
        }

        self.components = components;
        self.point_count = Some(count);
        Ok(titles)
    }
}

/// Inducing field and anomaly projection from a UBC magnetic header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagSurvey {
    pub inclination: f64,
    pub declination: f64,
    pub geomagnetic_strength: f64,
    pub anomaly_inclination: f64,
    pub anomaly_declination: f64,
    pub direction: f64,
}

/// UBC magnetic observations: `incl decl geomag`, `ainc adec dir`, the point
/// count, then rows whose width picks the titles (3, 4, 5 or 7 columns).
#[derive(Debug, Clone, Default)]
pub struct MagObsHeader {
    survey: Option<MagSurvey>,
    point_count: Option<usize>,
    locations_only: bool,
}

impl MagObsHeader {
    pub fn survey(&self) -> Option<&MagSurvey> {
        self.survey.as_ref()
    }

    pub fn point_count(&self) -> Option<usize> {
        self.point_count
    }

    /// The last file held only `X Y Z` locations.
    pub fn locations_only(&self) -> bool {
        self.locations_only
    }
}

fn read_triple<R: BufRead + Seek>(
    stream: &mut TextStream<R>,
    config: &ReadConfig,
    what: &str,
) -> Result<[f64; 3]> {
    let line = next_logical(stream, config.comment, what)?;
    let values = split_line(stream, &line, config)?
        .iter()
        .map(|v| v.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .ok()
        .filter(|v| v.len() == 3);
    match values {
        Some(v) => Ok([v[0], v[1], v[2]]),
        None => Err(ReaderError::malformed(
            stream.path(),
            format!("{what} {line:?} is not three numbers"),
        )),
    }
}

impl HeaderExtractor for MagObsHeader {
    fn extract_header<R: BufRead + Seek>(
        &mut self,
        stream: &mut TextStream<R>,
        config: &ReadConfig,
    ) -> Result<Titles> {
        let [inclination, declination, geomagnetic_strength] =
            read_triple(stream, config, "inducing field line")?;
        let [anomaly_inclination, anomaly_declination, direction] =
            read_triple(stream, config, "anomaly projection line")?;
        let count = read_point_count(stream, config)?;

        let found = first_row_width(stream, config)?;
        let titles: &[&str] = match found {
            3 => &["X", "Y", "Z"],
            4 => &["X", "Y", "Z", "Mag"],
            5 => &["X", "Y", "Z", "Mag", "Err"],
            7 => &["X", "Y", "Z", "ainc_1", "ainc_2", "Mag", "Err"],
            _ => return Err(improperly_formatted(stream, found)),
        };

        self.survey = Some(MagSurvey {
            inclination,
            declination,
            geomagnetic_strength,
            anomaly_inclination,
            anomaly_declination,
            direction,
        });
        self.point_count = Some(count);
        self.locations_only = found == 3;
        Ok(titles.iter().map(|t| t.to_string()).collect())
    }

    fn forces_copy_z(&self) -> bool {
        self.locations_only
    }
}

// ---------------------------------------------------------------------------
// Reconciliation across the file set
// ---------------------------------------------------------------------------

/// Collapse per-file titles into the one sequence shared by every file.
///
/// A timeseries is the same shape of data over time, so any drift in titles
/// is an error rather than something to coerce.
pub fn reconcile_headers(headers: Vec<Titles>) -> Result<Titles> {
    let mut distinct: Vec<Titles> = Vec::new();
    for titles in headers {
        if !distinct.contains(&titles) {
            distinct.push(titles);
        }
    }
    match distinct.len() {
        0 => Err(ReaderError::NoFiles),
        1 => Ok(distinct.remove(0)),
        variants => Err(ReaderError::InconsistentSchema {
            variants,
            second: distinct.remove(1),
            first: distinct.remove(0),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::handles::memory_stream;

    fn titles(names: &[&str]) -> Titles {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn generic_reads_title_line() {
        let cfg = ReadConfig {
            delimiter: ',',
            ..Default::default()
        };
        let mut s = memory_stream("! comment\nx, y ,z ! trailing\n1,2,3\n");
        let t = GenericHeader.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["x", "y", "z"]));
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("1,2,3"));
    }

    #[test]
    fn generic_synthesizes_without_consuming() {
        let cfg = ReadConfig {
            split_on_whitespace: true,
            has_titles: false,
            ..Default::default()
        };
        let mut s = memory_stream("1 2   3 4\n5 6 7 8\n");
        let t = GenericHeader.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["Field 0", "Field 1", "Field 2", "Field 3"]));
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("1 2   3 4"));
    }

    #[test]
    fn generic_empty_stream_is_malformed() {
        let mut s = memory_stream("! only comments\n");
        let err = GenericHeader
            .extract_header(&mut s, &ReadConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReaderError::MalformedHeader { .. }));
    }

    #[test]
    fn comma_titles_accept_marker() {
        let cfg = ReadConfig::default();
        let mut s = memory_stream("! X, Y, Z, Value\n1 2 3 4\n");
        let t = CommaTitles.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["X", "Y", "Z", "Value"]));

        let mut s = memory_stream("x,y,z\n1 2 3\n");
        let t = CommaTitles.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["x", "y", "z"]));
    }

    #[test]
    fn gslib_header_block() {
        let cfg = ReadConfig::default();
        let mut s = memory_stream("Sample data (10 x 1 x 1)\n3\nX\nY\nporosity\n0 0 0.21\n");
        let mut h = GsLibHeader::default();
        let t = h.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["X", "Y", "porosity"]));
        assert_eq!(h.file_header(), Some("Sample data (10 x 1 x 1)"));
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("0 0 0.21"));
    }

    #[test]
    fn gslib_rejects_bad_count() {
        let mut s = memory_stream("title\nthree\nX\n");
        let err = GsLibHeader::default()
            .extract_header(&mut s, &ReadConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReaderError::MalformedHeader { .. }));
    }

    #[test]
    fn topo_checks_first_row_width() {
        let cfg = ReadConfig {
            split_on_whitespace: true,
            has_titles: false,
            ..Default::default()
        };
        let mut h = TopoHeader::default();
        let mut s = memory_stream("2\n0.0 0.0 10.0\n1.0 0.0 11.0\n");
        assert_eq!(h.extract_header(&mut s, &cfg).unwrap(), titles(&["X", "Y", "Z"]));
        assert_eq!(h.point_count(), Some(2));
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("0.0 0.0 10.0"));

        let mut s = memory_stream("1\n0.0 0.0\n");
        assert!(h.extract_header(&mut s, &cfg).is_err());
    }

    #[test]
    fn grav_obs_titles() {
        let cfg = ReadConfig {
            split_on_whitespace: true,
            ..Default::default()
        };
        let mut h = GravObsHeader::default();
        let mut s = memory_stream("1\n0 0 5 0.12 0.01\n");
        assert_eq!(
            h.extract_header(&mut s, &cfg).unwrap(),
            titles(&["X", "Y", "Z", "Grav", "Err"])
        );
    }

    #[test]
    fn quoted_delimiter_in_first_row() {
        let mut cfg = ReadConfig {
            delimiter: ',',
            ..Default::default()
        };
        let mut s = memory_stream("id,\"name, full\",z\n1,\"a,b\",3\n");
        let t = GenericHeader.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["id", "name, full", "z"]));

        cfg.has_titles = false;
        let mut s = memory_stream("1,\"a,b\",3\n4,\"c\",6\n");
        let t = GenericHeader.extract_header(&mut s, &cfg).unwrap();
        assert_eq!(t, titles(&["Field 0", "Field 1", "Field 2"]));
    }

    #[test]
    fn duplicate_titles_are_rejected() {
        let path = std::path::Path::new("memory.txt");
        assert!(ensure_unique_titles(path, &titles(&["a", "b"])).is_ok());
        match ensure_unique_titles(path, &titles(&["a", "b", "a"])) {
            Err(ReaderError::MalformedHeader { reason, .. }) => {
                assert!(reason.contains("\"a\""), "{reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn grav_grad_components_and_uncertainties() {
        let cfg = ReadConfig {
            split_on_whitespace: true,
            has_titles: false,
            ..Default::default()
        };
        let mut h = GravGradHeader::default();
        let mut s = memory_stream("datacomp=dxx,dyy\n2\n0 0 1 5 6\n1 0 1 7 8\n");
        assert_eq!(
            h.extract_header(&mut s, &cfg).unwrap(),
            titles(&["X", "Y", "Z", "dxx", "dyy"])
        );
        assert_eq!(h.components(), ["dxx", "dyy"]);
        assert_eq!(h.point_count(), Some(2));
        assert_eq!(s.read_logical_line('!').unwrap().as_deref(), Some("0 0 1 5 6"));

        let mut s = memory_stream("datacomp=dxx,dyy\n1\n0 0 1 5 6 0.1 0.2\n");
        assert_eq!(
            h.extract_header(&mut s, &cfg).unwrap(),
            titles(&["X", "Y", "Z", "dxx", "dyy", "Stn_dxx", "Stn_dyy"])
        );

        let mut s = memory_stream("datacomp=dxx,dyy\n1\n0 0 1 5\n");
        assert!(matches!(
            h.extract_header(&mut s, &cfg),
            Err(ReaderError::MalformedHeader { .. })
        ));
        let mut s = memory_stream("no components\n1\n0 0 1\n");
        assert!(h.extract_header(&mut s, &cfg).is_err());
    }

    #[test]
    fn mag_obs_titles_follow_row_width() {
        let cfg = ReadConfig {
            split_on_whitespace: true,
            has_titles: false,
            ..Default::default()
        };
        let header = "65 25 50000\n65 25 1\n1\n";
        let cases: [(&str, &[&str]); 4] = [
            ("0 0 1", &["X", "Y", "Z"]),
            ("0 0 1 12.5", &["X", "Y", "Z", "Mag"]),
            ("0 0 1 12.5 0.5", &["X", "Y", "Z", "Mag", "Err"]),
            ("0 0 1 60 20 12.5 0.5", &["X", "Y", "Z", "ainc_1", "ainc_2", "Mag", "Err"]),
        ];
        for (row, expected) in cases {
            let mut h = MagObsHeader::default();
            let text = format!("{header}{row}\n");
            let mut s = memory_stream(&text);
            assert_eq!(h.extract_header(&mut s, &cfg).unwrap(), titles(expected));
            assert_eq!(h.forces_copy_z(), expected.len() == 3);
        }

        let mut h = MagObsHeader::default();
        let mut s = memory_stream("65 25 50000\n60 20 1\n2\n0 0 1 12.5\n");
        h.extract_header(&mut s, &cfg).unwrap();
        let survey = h.survey().unwrap();
        assert_eq!(survey.geomagnetic_strength, 50000.0);
        assert_eq!(survey.anomaly_inclination, 60.0);
        assert_eq!(h.point_count(), Some(2));

        let mut s = memory_stream("65 25 50000\n65 25 1\n1\n0 0 1 2 3 4\n");
        assert!(matches!(
            h.extract_header(&mut s, &cfg),
            Err(ReaderError::MalformedHeader { .. })
        ));
        let mut s = memory_stream("65 25\n65 25 1\n1\n0 0 1\n");
        assert!(h.extract_header(&mut s, &cfg).is_err());
    }

    #[test]
    fn reconcile_identical_headers() {
        let h = titles(&["a", "b", "c"]);
        assert_eq!(reconcile_headers(vec![h.clone(), h.clone(), h.clone()]).unwrap(), h);
    }

    #[test]
    fn reconcile_detects_drift() {
        let err = reconcile_headers(vec![
            titles(&["x", "y", "z"]),
            titles(&["x", "y", "w"]),
            titles(&["x", "y", "z"]),
        ])
        .unwrap_err();
        match err {
            ReaderError::InconsistentSchema { variants, first, second } => {
                assert_eq!(variants, 2);
                assert_eq!(first, titles(&["x", "y", "z"]));
                assert_eq!(second, titles(&["x", "y", "w"]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(reconcile_headers(vec![]), Err(ReaderError::NoFiles)));
    }
}
