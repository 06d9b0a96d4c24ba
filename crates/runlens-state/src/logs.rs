//! Tail of the newest rotating log file.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use runlens_types::snapshot::LogTail;

use crate::scan::{self, ScanLimits};

const LOG_EXTENSION: &str = "log";
const NO_LOGS: &str = "No log files found";

/// Most recently modified `*.log` file anywhere under `logs_dir`.
#[must_use]
pub fn find_latest_log(logs_dir: &Path, limits: ScanLimits) -> Option<PathBuf> {
    scan::files_under(logs_dir, limits)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == LOG_EXTENSION)
        })
        .filter_map(|entry| {
            let mtime = entry.metadata().ok()?.modified().ok()?;
            Some((mtime, entry.into_path()))
        })
        .max()
        .map(|(_, path)| path)
}

/// Last `max_lines` non-blank lines of `latest`, as found by
/// [`find_latest_log`].
///
/// Reads the file as a stream so large logs are never held in memory.
/// Invalid UTF-8 is replaced rather than rejected.
#[must_use]
pub fn tail_log(latest: Option<&Path>, max_lines: usize) -> LogTail {
    let Some(path) = latest else {
        return LogTail::unavailable(NO_LOGS);
    };

    match read_tail(path, max_lines) {
        Ok((lines, total_lines)) => LogTail {
            lines,
            file: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            total_lines,
            error: None,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read log file");
            LogTail::unavailable(e.to_string())
        }
    }
}

fn read_tail(path: &Path, max_lines: usize) -> std::io::Result<(Vec<String>, usize)> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let mut tail: VecDeque<String> = VecDeque::with_capacity(max_lines);
    let mut total = 0usize;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        total += 1;
        if tail.len() == max_lines {
            tail.pop_front();
        }
        if max_lines > 0 {
            let line = String::from_utf8_lossy(&buf);
            tail.push_back(line.trim_end_matches(['\n', '\r']).to_string());
        }
    }

    let lines = tail
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    Ok((lines, total))
}
