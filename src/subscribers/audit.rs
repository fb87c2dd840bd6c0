use std::fs::OpenOptions;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::UnsubscribeRequest;
use crate::errors::Error;

/// One line of the opt-out audit file.
#[derive(Debug, Serialize)]
pub struct AuditRecord<'a> {
    pub email: &'a str,
    pub reasons: String,
    pub comments: &'a str,
    pub preference: &'a str,
    pub timestamp: String,
}

impl<'a> AuditRecord<'a> {
    pub fn new(email: &'a str, request: &'a UnsubscribeRequest, at: DateTime<Local>) -> Self {
        Self {
            email,
            reasons: request.reasons.join(", "),
            comments: request.comments.as_str(),
            preference: request.preference.as_str(),
            timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Appends `record` to the CSV file at `path`, writing the header first when
/// the file is new.
pub fn append(path: &Path, record: &AuditRecord<'_>) -> Result<(), Error> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::UnsubscribePreference;

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unsubscribes.csv");
        let request = UnsubscribeRequest {
            email: "a@x.com".into(),
            reasons: vec!["too-many".into(), "not-relevant".into()],
            comments: "bye".into(),
            preference: UnsubscribePreference::UnsubscribeAll,
        };
        let at = Local.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();

        append(&path, &AuditRecord::new("a@x.com", &request, at)).unwrap();
        append(&path, &AuditRecord::new("a@x.com", &request, at)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let line = "a@x.com,\"too-many, not-relevant\",bye,unsubscribe-all,2025-03-01 09:30:00";
        assert_eq!(
            content,
            format!("email,reasons,comments,preference,timestamp\n{line}\n{line}\n")
        );
    }
}
