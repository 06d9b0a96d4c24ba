//! Generated output files (e.g. spreadsheets) produced by the current run.

use std::path::Path;

use chrono::{DateTime, Utc};

/// File names directly inside `output_dir` with `extension` whose
/// modification time is strictly after `since`, sorted by name.
///
/// With no known start time nothing can be attributed to the run, so the
/// result is empty.
#[must_use]
pub fn list_generated_outputs(
    output_dir: &Path,
    extension: &str,
    since: Option<DateTime<Utc>>,
) -> Vec<String> {
    let Some(since) = since else {
        return Vec::new();
    };
    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %output_dir.display(), error = %e, "Output dir not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .is_ok_and(|mtime| DateTime::<Utc>::from(mtime) > since)
        })
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn counts_only_files_after_run_start() {
        let dir = tempfile::tempdir().unwrap();
        let before = dir.path().join("previous_run.xlsx");
        let after = dir.path().join("CAI_station.xlsx");
        std::fs::write(&before, "x").unwrap();
        std::fs::write(&after, "x").unwrap();
        std::fs::write(dir.path().join("notes.csv"), "x").unwrap();

        let start = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&before)
            .unwrap()
            .set_modified(start - Duration::from_secs(60))
            .unwrap();

        let files = list_generated_outputs(dir.path(), "xlsx", Some(DateTime::from(start)));
        assert_eq!(files, vec!["CAI_station.xlsx"]);
    }

    #[test]
    fn unknown_start_counts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xlsx"), "x").unwrap();
        assert!(list_generated_outputs(dir.path(), "xlsx", None).is_empty());
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        assert!(list_generated_outputs(&gone, "xlsx", Some(Utc::now())).is_empty());
    }
}
