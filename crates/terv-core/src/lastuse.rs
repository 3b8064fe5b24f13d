//! Last-use stamping of installed versions.
//!
//! Every proxy execution and install stamps the version directory with the
//! current date, giving cleanup tooling a signal for which versions are
//! still alive. Day granularity keeps the write-per-execution cost at one
//! file write per day.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::reporter::Reporter;

const LAST_USE_NAME: &str = "last-use.txt";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Record that the version in `version_dir` was used today.
pub fn touch(version_dir: &Path, reporter: &dyn Reporter) {
    let today = chrono::Utc::now().date_naive();
    if read(version_dir) == Some(today) {
        return;
    }
    let path = version_dir.join(LAST_USE_NAME);
    if let Err(err) = fs::write(&path, today.format(DATE_FORMAT).to_string()) {
        // best effort; never fail the surrounding operation over a stamp
        reporter.debug(&format!("Unable to write {}: {err}", path.display()));
    }
}

/// The recorded last-use date of the version in `version_dir`, if any.
pub fn read(version_dir: &Path) -> Option<NaiveDate> {
    let content = fs::read_to_string(version_dir.join(LAST_USE_NAME)).ok()?;
    NaiveDate::parse_from_str(content.trim(), DATE_FORMAT).ok()
}
