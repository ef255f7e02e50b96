pub mod reader;
pub mod row;

use std::collections::BTreeMap;

pub use reader::{read_csv, ParsedCsv};
pub use row::parse_row;

/// One subject's demographic values from a single CSV row.
///
/// Immutable after creation; consumed once by either the reporter or the
/// uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemographicRecord {
    pub project_id: String,
    pub subject_label: String,
    pub session_label: Option<String>,
    /// Attributes written to the subject resource, keyed by CSV column name.
    pub subject_attributes: BTreeMap<String, String>,
    /// Attributes written to the session resource, keyed by CSV column name.
    pub session_attributes: BTreeMap<String, String>,
}
