use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::parse::DemographicRecord;
use crate::vocab::{normalize_gender, normalize_handedness, normalize_yob, SESSION_COLUMN};

/// Parse one data row against the header.
///
/// Returns `None` when the row cannot be kept: a column-count mismatch with
/// the header, or a missing required identifier. Both are warnings, never
/// errors, so one bad line does not sink the file.
///
/// Non-required columns with a non-empty value are routed to the subject or
/// session attribute map depending on membership in `session_vars`.
pub fn parse_row(
    values: &[String],
    header: &[String],
    row: usize,
    session_vars: &HashSet<String>,
) -> Option<DemographicRecord> {
    if values.len() != header.len() {
        warn!(
            row,
            found = values.len(),
            expected = header.len(),
            "column count does not match header, dropping row"
        );
        return None;
    }

    let mut project_id = String::new();
    let mut subject_label = String::new();
    let mut session_label = None;
    let mut subject_attributes = BTreeMap::new();
    let mut session_attributes = BTreeMap::new();

    for (column, raw) in header.iter().zip(values) {
        let value = raw.trim();
        match column.as_str() {
            "project_id" => project_id = value.to_string(),
            "subject_label" => subject_label = value.to_string(),
            SESSION_COLUMN => {
                if !value.is_empty() {
                    session_label = Some(value.to_string());
                }
            }
            _ => {
                if value.is_empty() {
                    continue;
                }
                let normalized = match column.as_str() {
                    "handedness" => normalize_handedness(value, row),
                    "gender" => normalize_gender(value, row),
                    "yob" => normalize_yob(value, row),
                    _ => value.to_string(),
                };
                if session_vars.contains(column) {
                    session_attributes.insert(column.clone(), normalized);
                } else {
                    subject_attributes.insert(column.clone(), normalized);
                }
            }
        }
    }

    if project_id.is_empty() || subject_label.is_empty() {
        warn!(row, "missing project_id or subject_label, dropping row");
        return None;
    }

    Some(DemographicRecord {
        project_id,
        subject_label,
        session_label,
        subject_attributes,
        session_attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        ["project_id", "subject_label", "session_label", "handedness", "gender", "age"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn session_vars() -> HashSet<String> {
        HashSet::from(["age".to_string()])
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn well_formed_row_is_split_into_subject_and_session_maps() {
        let rec = parse_row(
            &row(&["P1", "S1", "S1_1", "L", "M", "34"]),
            &header(),
            2,
            &session_vars(),
        )
        .unwrap();
        assert_eq!(rec.project_id, "P1");
        assert_eq!(rec.subject_label, "S1");
        assert_eq!(rec.session_label.as_deref(), Some("S1_1"));
        assert_eq!(rec.subject_attributes["handedness"], "left");
        assert_eq!(rec.subject_attributes["gender"], "male");
        assert_eq!(rec.session_attributes["age"], "34");
        assert!(!rec.session_attributes.contains_key("handedness"));
    }

    #[test]
    fn column_count_mismatch_drops_row() {
        let rec = parse_row(
            &row(&["P1", "S1", "S1_1", "L", "M"]),
            &header(),
            2,
            &session_vars(),
        );
        assert!(rec.is_none());
    }

    #[test]
    fn missing_required_identifier_drops_row() {
        let rec = parse_row(
            &row(&["P1", "", "S1_1", "L", "M", "34"]),
            &header(),
            3,
            &session_vars(),
        );
        assert!(rec.is_none());
    }

    #[test]
    fn empty_values_are_not_stored() {
        let rec = parse_row(
            &row(&["P1", "S1", "", "", "", ""]),
            &header(),
            2,
            &session_vars(),
        )
        .unwrap();
        assert!(rec.session_label.is_none());
        assert!(rec.subject_attributes.is_empty());
        assert!(rec.session_attributes.is_empty());
    }

    #[test]
    fn bad_yob_is_stored_as_empty_string() {
        let header: Vec<String> = ["project_id", "subject_label", "yob"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rec = parse_row(
            &row(&["P1", "S1", "21/03/eighty"]),
            &header,
            2,
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(rec.subject_attributes["yob"], "");
    }
}
