//! Recognized demographic attributes and their value vocabularies.
//!
//! These lists mirror what the platform accepts on its demographic schema:
//! anything outside them is still uploaded, but through the generic
//! custom-field path instead of the fixed schema path.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::warn;

/// Columns every CSV must carry for a row to be usable.
pub const REQUIRED_COLUMNS: &[&str] = &["project_id", "subject_label"];

/// Column naming the imaging session a row's session-level values belong to.
pub const SESSION_COLUMN: &str = "session_label";

/// Attributes written to the subject resource through the fixed
/// demographics schema path.
pub const DEFAULT_SUBJECT_ATTRIBUTES: &[&str] = &["handedness", "gender", "yob"];

/// Attributes written to the session resource by default.
pub const DEFAULT_SESSION_ATTRIBUTES: &[&str] = &[
    "age",
    "scanner",
    "scanner_manufacturer",
    "scanner_model",
    "acquisition_site",
];

static HANDEDNESS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("left", "left"),
        ("l", "left"),
        ("right", "right"),
        ("r", "right"),
        ("ambidextrous", "ambidextrous"),
        ("a", "ambidextrous"),
    ])
});

static GENDER: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("male", "male"),
        ("m", "male"),
        ("female", "female"),
        ("f", "female"),
    ])
});

/// Map a raw handedness value onto the platform vocabulary. Unrecognized
/// values pass through unchanged with a warning.
pub fn normalize_handedness(raw: &str, row: usize) -> String {
    match HANDEDNESS.get(raw.trim().to_lowercase().as_str()) {
        Some(v) => (*v).to_string(),
        None => {
            warn!(row, value = raw, "unrecognized handedness value, uploading as-is");
            raw.to_string()
        }
    }
}

/// Map a raw gender value onto the platform vocabulary. Unrecognized
/// values pass through unchanged with a warning.
pub fn normalize_gender(raw: &str, row: usize) -> String {
    match GENDER.get(raw.trim().to_lowercase().as_str()) {
        Some(v) => (*v).to_string(),
        None => {
            warn!(row, value = raw, "unrecognized gender value, uploading as-is");
            raw.to_string()
        }
    }
}

/// Reduce a year-of-birth value to a plain integer year.
///
/// Slash-formatted dates are stripped down to their final segment (so
/// `03/21/1985` becomes `1985`). Anything that still fails to parse as an
/// integer is rejected to the empty string.
pub fn normalize_yob(raw: &str, row: usize) -> String {
    let mut value = raw.trim();
    if value.contains('/') {
        warn!(row, value = raw, "yob looks like a date, keeping only the year");
        value = value.rsplit('/').next().unwrap_or("");
    }
    if value.parse::<i64>().is_ok() {
        value.to_string()
    } else {
        warn!(row, value = raw, "yob is not an integer, storing empty value");
        String::new()
    }
}
