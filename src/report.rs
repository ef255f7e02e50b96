use crate::parse::DemographicRecord;
use crate::vocab::SESSION_COLUMN;

/// Render one record back into a delimited row following header column
/// order. Missing fields render as the empty string.
pub fn render_row(record: &DemographicRecord, header: &[String], delimiter: char) -> String {
    let fields: Vec<&str> = header
        .iter()
        .map(|column| match column.as_str() {
            "project_id" => record.project_id.as_str(),
            "subject_label" => record.subject_label.as_str(),
            SESSION_COLUMN => record.session_label.as_deref().unwrap_or(""),
            _ => record
                .subject_attributes
                .get(column)
                .or_else(|| record.session_attributes.get(column))
                .map(String::as_str)
                .unwrap_or(""),
        })
        .collect();
    fields.join(&delimiter.to_string())
}

/// Dry-run output: header line plus one row per record, for human review.
/// Records are expected to arrive already sorted by project.
pub fn print_report(records: &[DemographicRecord], header: &[String], delimiter: char) {
    println!("{}", header.join(&delimiter.to_string()));
    for record in records {
        println!("{}", render_row(record, header, delimiter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::read_csv;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn report_round_trips_a_well_formed_row() {
        // no normalization fires here: values are already vocabulary terms
        let line = "P1,S1,S1_1,left,male,34";
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "project_id,subject_label,session_label,handedness,gender,age").unwrap();
        writeln!(tmp, "{line}").unwrap();

        let parsed = read_csv(tmp.path(), b',', None, &[]).unwrap();
        assert_eq!(render_row(&parsed.records[0], &parsed.header, ','), line);
    }

    #[test]
    fn missing_fields_render_empty() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "project_id,subject_label,session_label,gender").unwrap();
        writeln!(tmp, "P1,S1,,").unwrap();

        let parsed = read_csv(tmp.path(), b',', None, &[]).unwrap();
        assert_eq!(render_row(&parsed.records[0], &parsed.header, ','), "P1,S1,,");
    }
}
