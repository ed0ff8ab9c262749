// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Reading and writing tracked files.
//!
//! ## Layout
//!
//! ```text
//! #tt
//!
//! refresh_time="0.2"
//! ...the other five options...
//! <preserved header lines>
//!
//! entries:
//! <entry>
//! <entry>
//! ```
//!
//! Before `entries:` the parser consumes recognized `name="value"` lines as
//! options. The marker line and empty lines are layout. Every other header
//! line is kept verbatim, in order, and written back after the options.
//! After `entries:` every line, blank or not, is an entry.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::options::{self, Options, Overrides};

/// Leading bytes that identify a tracked file.
pub const MARKER: &str = "#tt";

/// How much of a candidate's first line [`is_tracked`] looks at.
const FIRST_LINE_LIMIT: u64 = 256;

/// Line that starts the entries section.
pub const ENTRIES: &str = "entries:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub options: Options,
    /// Header lines that are neither layout nor recognized options.
    pub header: Vec<String>,
    pub entries: Vec<String>,
}

impl TrackedFile {
    /// A file with default options and no entries.
    pub fn empty(path: &Path, chain: &[Overrides]) -> TrackedFile {
        TrackedFile {
            path: path.to_path_buf(),
            options: options::resolve(&Options::default(), chain, &Vec::new()),
            header: Vec::new(),
            entries: Vec::new(),
        }
    }
}

/// Parses file content. `chain` holds directory-level defaults, outermost first.
pub fn parse(path: &Path, content: &str, chain: &[Overrides]) -> TrackedFile {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if content.is_empty() || content.ends_with('\n') {
        lines.pop();
    }
    let mut file = TrackedFile::empty(path, chain);
    let mut overrides: Overrides = Vec::new();
    let mut in_entries = false;
    for (i, line) in lines.into_iter().enumerate() {
        if in_entries {
            file.entries.push(line.to_string());
            continue;
        }
        if line == ENTRIES {
            in_entries = true;
        } else if line == MARKER || line.is_empty() || (i == 0 && is_marker_line(line)) {
            continue;
        } else if let Some((key, value)) =
            options::parse_assignment(line).filter(|(k, _)| options::is_known(k))
        {
            overrides.push((key.to_string(), value.to_string()));
        } else {
            file.header.push(line.to_string());
        }
    }
    file.options = options::resolve(&file.options, &[], &overrides);
    file
}

/// A first line that carries the marker after a prefix (BOM, indentation).
fn is_marker_line(line: &str) -> bool {
    line.contains(MARKER) && options::parse_assignment(line).is_none()
}

/// On-disk text for `file`.
pub fn serialize(file: &TrackedFile) -> String {
    let mut out = String::new();
    out.push_str(MARKER);
    out.push_str("\n\n");
    for (key, value) in file.options.iter() {
        out.push_str(&format!("{}=\"{}\"\n", key, value));
    }
    for line in &file.header {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(ENTRIES);
    out.push('\n');
    for entry in &file.entries {
        out.push_str(entry);
        out.push('\n');
    }
    out
}

/// Creates the parent directories and the file if needed, then reads it.
/// Creation failures are fatal.
pub fn open(path: &Path, chain: &[Overrides]) -> Result<TrackedFile> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    load(path, chain)
}

/// Reads an existing file without creating anything.
pub fn load(path: &Path, chain: &[Overrides]) -> Result<TrackedFile> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let file = parse(path, &content, chain);
    debug!(
        path = %path.display(),
        entries = file.entries.len(),
        header = file.header.len(),
        "loaded tracked file"
    );
    Ok(file)
}

/// Replaces the whole file: writes a sibling temp file, then renames it over the target.
pub fn write(file: &TrackedFile) -> Result<()> {
    let path = &file.path;
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, serialize(file)).map_err(|e| Error::io(&tmp, e))?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(&tmp, meta.permissions()).map_err(|e| Error::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::io(path, e)
    })?;
    debug!(path = %path.display(), entries = file.entries.len(), "wrote tracked file");
    Ok(())
}

/// True if the file starts with [`MARKER`] or its first line contains it
/// (a leading byte-order mark or indentation).
pub fn is_tracked(path: &Path) -> io::Result<bool> {
    let mut first = Vec::new();
    BufReader::new(File::open(path)?)
        .take(FIRST_LINE_LIMIT)
        .read_until(b'\n', &mut first)?;
    if first.starts_with(MARKER.as_bytes()) {
        return Ok(true);
    }
    Ok(String::from_utf8_lossy(&first).contains(MARKER))
}
