// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Summary mode: total elapsed time over a file or a directory tree.
//!
//! Each entry's duration is recovered by inverting the file's own
//! `format_entry` and parsing the capture with its `format_duration`.
//! Entries that do not match contribute nothing.
//!
//! Verbosity:
//!
//! | Level | Output |
//! |-------|--------|
//! | 1     | Grand total only. |
//! | 2     | Per tracked file: path, total, separator. |
//! | 3     | As 2, plus every raw entry. |

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::clock::{self, DurationParser};
use crate::error::{Error, Result};
use crate::options::{self, Options, DEFAULTS_FILE};
use crate::store::{self, TrackedFile};
use crate::template::Template;

const SEPARATOR: &str = "----------------------------------------";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTotal {
    pub path: PathBuf,
    pub seconds: i64,
    /// Entries whose duration could be read.
    pub matched: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: Vec<FileTotal>,
    pub seconds: i64,
}

/// Every file under `path` (or `path` itself), sorted. Symlinked
/// directories are not followed; unreadable directories are skipped.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::io(path, e),
    })?;
    if !meta.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut out = Vec::new();
    walk(path, &mut out);
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let mut children: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(rd) => rd.flatten().map(|e| e.path()).collect(),
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };
    children.sort();
    for child in children {
        let Ok(meta) = fs::symlink_metadata(&child) else {
            continue;
        };
        if meta.is_dir() {
            walk(&child, out);
        } else if meta.is_file() || fs::metadata(&child).map(|m| m.is_file()).unwrap_or(false) {
            out.push(child);
        }
    }
}

/// Sum of the durations recorded in `file`'s entries.
pub fn file_total(file: &TrackedFile) -> Result<FileTotal> {
    let template = Template::parse(&file.options.format_entry);
    if !template.contains("duration") {
        warn!(path = %file.path.display(), "format_entry has no %{{duration}}; nothing to total");
    } else if template.is_adjacent("duration") {
        warn!(
            path = %file.path.display(),
            format_entry = %file.options.format_entry,
            "duration placeholder touches another placeholder; totals may be wrong"
        );
    }
    let inversion = template.invert("duration")?;
    let parser = DurationParser::new(&file.options.format_duration)?;
    let mut total = FileTotal {
        path: file.path.clone(),
        seconds: 0,
        matched: 0,
    };
    for entry in &file.entries {
        let Some(secs) = inversion
            .extract(entry)
            .and_then(|d| parser.parse(d))
            .and_then(|hms| hms.total_seconds())
        else {
            continue;
        };
        total.seconds = total.seconds.saturating_add(secs);
        total.matched += 1;
    }
    debug!(
        path = %file.path.display(),
        pattern = inversion.as_str(),
        matched = total.matched,
        entries = file.entries.len(),
        seconds = total.seconds,
        "file total"
    );
    Ok(total)
}

/// Loads `candidate` if it is a readable tracked file.
fn load_tracked(candidate: &Path, cascade: bool) -> Option<TrackedFile> {
    match store::is_tracked(candidate) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            debug!(path = %candidate.display(), error = %e, "skipping unreadable file");
            return None;
        }
    }
    match store::load(candidate, &options::chain_for(candidate, cascade)) {
        Ok(file) => Some(file),
        Err(e) => {
            debug!(error = %e, "skipping unreadable file");
            None
        }
    }
}

/// Options that format the grand total: the file's own when `path` is a
/// tracked file, otherwise the (possibly cascaded) defaults.
fn total_options(path: &Path, cascade: bool) -> Options {
    if path.is_dir() {
        let chain = options::chain_for(&path.join(DEFAULTS_FILE), cascade);
        return options::resolve(&Options::default(), &chain, &Vec::new());
    }
    match load_tracked(path, cascade) {
        Some(file) => file.options,
        None => options::resolve(&Options::default(), &options::chain_for(path, cascade), &Vec::new()),
    }
}

/// Summarizes `path`, writing the report to `out`. Returns the grand total.
pub fn run<W: Write>(path: &Path, verbosity: u8, cascade: bool, out: &mut W) -> Result<Summary> {
    let verbosity = verbosity.max(1);
    let mut summary = Summary::default();
    for candidate in discover(path)? {
        let Some(file) = load_tracked(&candidate, cascade) else {
            continue;
        };
        let total = file_total(&file)?;
        if verbosity >= 2 {
            writeln!(out, "{}", total.path.display()).map_err(Error::Output)?;
        }
        if verbosity >= 3 {
            for entry in &file.entries {
                writeln!(out, "{}", entry).map_err(Error::Output)?;
            }
        }
        if verbosity >= 2 {
            writeln!(out, "{}", clock::format_duration(total.seconds, &file.options.format_total))
                .map_err(Error::Output)?;
            writeln!(out, "{}", SEPARATOR).map_err(Error::Output)?;
        }
        summary.seconds = summary.seconds.saturating_add(total.seconds);
        summary.files.push(total);
    }
    let options = total_options(path, cascade);
    writeln!(out, "{}", clock::format_duration(summary.seconds, &options.format_total))
        .map_err(Error::Output)?;
    debug!(path = %path.display(), files = summary.files.len(), seconds = summary.seconds, "summary done");
    Ok(summary)
}
