use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::parse::{parse_row, DemographicRecord};
use crate::vocab::{DEFAULT_SESSION_ATTRIBUTES, REQUIRED_COLUMNS, SESSION_COLUMN};

/// The surviving records of one CSV pass plus the header they were read
/// against.
#[derive(Debug)]
pub struct ParsedCsv {
    pub records: Vec<DemographicRecord>,
    pub header: Vec<String>,
}

/// Read the whole CSV in one forward pass.
///
/// The header comes from `format` when supplied (every file line is then
/// data), otherwise from the first line. `extra_session_vars` is unioned
/// with the built-in session attribute list to decide which columns are
/// session-level.
///
/// Header problems are soft: a header missing `project_id` or
/// `subject_label` yields zero records, and `age` without a
/// `session_label` column only warns.
pub fn read_csv(
    path: &Path,
    delimiter: u8,
    format: Option<&[String]>,
    extra_session_vars: &[String],
) -> Result<ParsedCsv> {
    let mut session_vars: HashSet<String> = DEFAULT_SESSION_ATTRIBUTES
        .iter()
        .map(|s| s.to_string())
        .collect();
    session_vars.extend(extra_session_vars.iter().cloned());

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening csv file {}", path.display()))?;
    let mut rows = reader.records();

    let (header, mut line) = match format {
        Some(columns) => (columns.to_vec(), 0usize),
        None => {
            let first = match rows.next() {
                Some(rec) => rec.context("reading csv header line")?,
                None => {
                    warn!("csv file is empty");
                    return Ok(ParsedCsv {
                        records: Vec::new(),
                        header: Vec::new(),
                    });
                }
            };
            (first.iter().map(|f| f.trim().to_string()).collect(), 1usize)
        }
    };

    for required in REQUIRED_COLUMNS {
        if !header.iter().any(|c| c == required) {
            warn!(column = *required, "required column missing from header, nothing to upload");
            return Ok(ParsedCsv {
                records: Vec::new(),
                header,
            });
        }
    }
    if header.iter().any(|c| c == "age") && !header.iter().any(|c| c == SESSION_COLUMN) {
        warn!("header has an age column but no session_label, age cannot be uploaded");
    }

    let mut records = Vec::new();
    for rec in rows {
        line += 1;
        let rec = rec.with_context(|| format!("reading csv line {line}"))?;
        let values: Vec<String> = rec.iter().map(|f| f.to_string()).collect();
        if let Some(record) = parse_row(&values, &header, line, &session_vars) {
            records.push(record);
        }
    }

    info!(records = records.len(), "parsed csv {}", path.display());
    Ok(ParsedCsv { records, header })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;
    use tracing_subscriber::fmt::MakeWriter;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        tmp
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn warn_count(&self) -> usize {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).matches("WARN").count()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;
        fn make_writer(&'a self) -> LogBuffer {
            self.clone()
        }
    }

    fn capture_warnings(f: impl FnOnce()) -> usize {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.warn_count()
    }

    #[test]
    fn end_to_end_single_row() {
        let tmp = write_csv(
            "project_id,subject_label,session_label,handedness,gender,age\nP1,S1,S1_1,L,M,34\n",
        );
        let parsed = read_csv(tmp.path(), b',', None, &[]).unwrap();
        assert_eq!(parsed.records.len(), 1);
        let rec = &parsed.records[0];
        assert_eq!(rec.project_id, "P1");
        assert_eq!(rec.subject_label, "S1");
        assert_eq!(rec.session_label.as_deref(), Some("S1_1"));
        assert_eq!(rec.subject_attributes["handedness"], "left");
        assert_eq!(rec.subject_attributes["gender"], "male");
        assert_eq!(rec.session_attributes["age"], "34");
    }

    #[test]
    fn short_row_is_dropped_with_one_warning() {
        let tmp = write_csv(
            "project_id,subject_label,session_label,handedness,gender,age\nP1,S1,S1_1,L,M\n",
        );
        let mut parsed = None;
        let warnings = capture_warnings(|| {
            parsed = Some(read_csv(tmp.path(), b',', None, &[]).unwrap());
        });
        assert!(parsed.unwrap().records.is_empty());
        assert_eq!(warnings, 1);
    }

    #[test]
    fn header_missing_required_column_yields_no_records() {
        let tmp = write_csv("project_id,handedness\nP1,L\n");
        let parsed = read_csv(tmp.path(), b',', None, &[]).unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn age_without_session_label_warns_but_still_parses() {
        let tmp = write_csv("project_id,subject_label,age\nP1,S1,34\n");
        let mut parsed = None;
        let warnings = capture_warnings(|| {
            parsed = Some(read_csv(tmp.path(), b',', None, &[]).unwrap());
        });
        let parsed = parsed.unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].session_attributes["age"], "34");
        assert!(parsed.records[0].session_label.is_none());
        assert_eq!(warnings, 1);
    }

    #[test]
    fn explicit_format_treats_every_line_as_data() {
        let tmp = write_csv("P1,S1,R\nP2,S2,L\n");
        let format: Vec<String> = ["project_id", "subject_label", "handedness"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let parsed = read_csv(tmp.path(), b',', Some(&format), &[]).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].subject_attributes["handedness"], "right");
    }

    #[test]
    fn sessformat_routes_extra_columns_to_session() {
        let tmp = write_csv(
            "project_id,subject_label,session_label,coil\nP1,S1,S1_1,32ch\n",
        );
        let parsed = read_csv(tmp.path(), b',', None, &["coil".to_string()]).unwrap();
        assert_eq!(parsed.records[0].session_attributes["coil"], "32ch");
        assert!(parsed.records[0].subject_attributes.is_empty());
    }

    #[test]
    fn alternate_delimiter() {
        let tmp = write_csv("project_id;subject_label;gender\nP1;S1;F\n");
        let parsed = read_csv(tmp.path(), b';', None, &[]).unwrap();
        assert_eq!(parsed.records[0].subject_attributes["gender"], "female");
    }
}
