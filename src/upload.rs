use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use crate::parse::DemographicRecord;
use crate::remote::{ExperimentResource, Remote, SubjectResource};
use crate::vocab::{DEFAULT_SESSION_ATTRIBUTES, DEFAULT_SUBJECT_ATTRIBUTES};

/// What one upload pass accomplished, for the final progress line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub subjects_updated: usize,
    pub sessions_updated: usize,
    pub skipped: usize,
}

/// Field path for a subject-level attribute. Default vocabulary goes through
/// the fixed demographics schema path, anything else through a custom field.
fn subject_attribute_path(key: &str) -> String {
    let key = key.to_lowercase();
    if DEFAULT_SUBJECT_ATTRIBUTES.contains(&key.as_str()) {
        format!("xnat:subjectData/demographics[@xsi:type=xnat:demographicData]/{key}")
    } else {
        format!("xnat:subjectData/fields/field[name={key}]/field")
    }
}

/// Field path for a session-level attribute, addressed under the
/// experiment's xsi type.
fn session_attribute_path(xsi_type: &str, key: &str) -> String {
    let key = key.to_lowercase();
    if DEFAULT_SESSION_ATTRIBUTES.contains(&key.as_str()) {
        format!("{xsi_type}/{key}")
    } else {
        format!("{xsi_type}/fields/field[name={key}]/field")
    }
}

fn subject_paths(attrs: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    attrs
        .iter()
        .map(|(k, v)| (subject_attribute_path(k), v.clone()))
        .collect()
}

fn session_paths(xsi_type: &str, attrs: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    attrs
        .iter()
        .map(|(k, v)| (session_attribute_path(xsi_type, k), v.clone()))
        .collect()
}

/// Push every record's attributes onto the platform, one record at a time.
///
/// A subject that does not exist skips the whole record; a session that
/// does not exist skips only the session attributes, the subject write
/// having already been applied. Remote failures on one record never stop
/// the following records.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn upload_records<R: Remote>(remote: &R, records: &[DemographicRecord]) -> Result<UploadSummary> {
    let mut summary = UploadSummary::default();

    for record in records {
        let subject = remote.subject(&record.project_id, &record.subject_label)?;
        match subject.exists() {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    project = %record.project_id,
                    subject = %record.subject_label,
                    "subject not found on the platform, skipping record"
                );
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(
                    project = %record.project_id,
                    subject = %record.subject_label,
                    error = %e,
                    "could not resolve subject, skipping record"
                );
                summary.skipped += 1;
                continue;
            }
        }

        if !record.subject_attributes.is_empty() {
            match subject.set_many(&subject_paths(&record.subject_attributes)) {
                Ok(()) => {
                    info!(
                        project = %record.project_id,
                        subject = %record.subject_label,
                        fields = record.subject_attributes.len(),
                        "subject attributes set"
                    );
                    summary.subjects_updated += 1;
                }
                Err(e) => {
                    warn!(
                        project = %record.project_id,
                        subject = %record.subject_label,
                        error = %e,
                        "subject attribute update failed"
                    );
                    continue;
                }
            }
        }

        let session_label = match &record.session_label {
            Some(label) if !record.session_attributes.is_empty() => label,
            _ => continue,
        };
        if let Err(e) = upload_session(&subject, record, session_label, &mut summary) {
            warn!(
                project = %record.project_id,
                session = session_label.as_str(),
                error = %e,
                "session attribute update failed"
            );
        }
    }

    info!(
        subjects = summary.subjects_updated,
        sessions = summary.sessions_updated,
        skipped = summary.skipped,
        "upload pass complete"
    );
    Ok(summary)
}

fn upload_session<S: SubjectResource>(
    subject: &S,
    record: &DemographicRecord,
    label: &str,
    summary: &mut UploadSummary,
) -> Result<()> {
    let experiment = subject.experiment(label)?;
    if !experiment.exists()? {
        warn!(
            project = %record.project_id,
            subject = %record.subject_label,
            session = label,
            "session not found on the platform, skipping session attributes"
        );
        return Ok(());
    }
    let xsi_type = experiment.xsi_type()?;
    experiment.set_many(&session_paths(&xsi_type, &record.session_attributes))?;
    info!(
        session = label,
        fields = record.session_attributes.len(),
        "session attributes set"
    );
    summary.sessions_updated += 1;
    Ok(())
}
