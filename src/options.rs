// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! The six recognized options and how their values are layered.
//!
//! Effective options are resolved once per opened file from three tiers:
//! built-in defaults, then `.tt-defaults` files in ancestor directories
//! (outermost first, only when cascading is enabled), then the assignments
//! found in the file's own header.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// File name holding directory-level defaults.
pub const DEFAULTS_FILE: &str = ".tt-defaults";

/// Recognized option names, in the order they are written.
pub const KEYS: [&str; 6] = [
    "refresh_time",
    "format_duration",
    "format_time",
    "format_date",
    "format_entry",
    "format_total",
];

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^([A-Za-z_]+)="(.*)"$"#).expect("static pattern"));

/// Splits a `name="value"` header line. The value is returned raw.
pub fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let caps = ASSIGNMENT.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

pub fn is_known(key: &str) -> bool {
    KEYS.contains(&key)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub refresh_time: String,
    pub format_duration: String,
    pub format_time: String,
    pub format_date: String,
    pub format_entry: String,
    pub format_total: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            refresh_time: "0.2".to_string(),
            format_duration: "%H:%M:%S".to_string(),
            format_time: "%H:%M:%S".to_string(),
            format_date: "%a %b %d %Y".to_string(),
            format_entry: "  %{duration} | %{last_date} | %{last_time} - %{curr_time}".to_string(),
            format_total: "total: %H:%M:%S".to_string(),
        }
    }
}

impl Options {
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "refresh_time" => &self.refresh_time,
            "format_duration" => &self.format_duration,
            "format_time" => &self.format_time,
            "format_date" => &self.format_date,
            "format_entry" => &self.format_entry,
            "format_total" => &self.format_total,
            _ => return None,
        };
        Some(value)
    }

    /// Sets a recognized option; returns false (and changes nothing) for any other key.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "refresh_time" => &mut self.refresh_time,
            "format_duration" => &mut self.format_duration,
            "format_time" => &mut self.format_time,
            "format_date" => &mut self.format_date,
            "format_entry" => &mut self.format_entry,
            "format_total" => &mut self.format_total,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    /// `(key, value)` pairs in write order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        KEYS.iter().filter_map(move |k| self.get(k).map(|v| (*k, v)))
    }

    /// Sleep between live redraws. Must be a positive, finite number of seconds.
    pub fn refresh_interval(&self) -> Result<Duration> {
        let invalid = || Error::InvalidOption {
            key: "refresh_time".to_string(),
            value: self.refresh_time.clone(),
        };
        let secs: f64 = self.refresh_time.trim().parse().map_err(|_| invalid())?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(invalid());
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

/// Assignments from one configuration source, in the order they appeared.
pub type Overrides = Vec<(String, String)>;

/// Layers `chain` (outermost first) and then `file` over `defaults`.
/// Unknown keys are ignored here; the store keeps them for round-tripping.
pub fn resolve(defaults: &Options, chain: &[Overrides], file: &Overrides) -> Options {
    let mut options = defaults.clone();
    for (key, value) in chain.iter().flatten().chain(file.iter()) {
        options.set(key, value);
    }
    options
}

/// Reads `.tt-defaults` from every ancestor directory of `path`, outermost
/// first. A relative `path` is taken from the working directory. Missing
/// files are skipped; unreadable ones are skipped with a debug log.
pub fn directory_chain(path: &Path) -> Vec<Overrides> {
    let cwd = env::current_dir().unwrap_or_else(|e| {
        debug!(error = %e, "no working directory; using path as given");
        PathBuf::new()
    });
    directory_chain_from(&cwd, path)
}

fn directory_chain_from(cwd: &Path, path: &Path) -> Vec<Overrides> {
    let mut anchored = PathBuf::new();
    for part in cwd.join(path).components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                anchored.pop();
            }
            other => anchored.push(other),
        }
    }
    let mut dirs: Vec<PathBuf> = anchored
        .parent()
        .map(|p| p.ancestors().map(Path::to_path_buf).collect())
        .unwrap_or_default();
    dirs.reverse();
    let mut chain = Vec::new();
    for dir in dirs {
        let candidate = dir.join(DEFAULTS_FILE);
        if !candidate.is_file() {
            continue;
        }
        match fs::read_to_string(&candidate) {
            Ok(content) => {
                let overrides: Overrides = content
                    .lines()
                    .filter_map(parse_assignment)
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                debug!(path = %candidate.display(), count = overrides.len(), "read directory defaults");
                chain.push(overrides);
            }
            Err(e) => debug!(path = %candidate.display(), error = %e, "skipping unreadable defaults"),
        }
    }
    chain
}

/// The directory chain for `path` when cascading is enabled, otherwise empty.
pub fn chain_for(path: &Path, cascade: bool) -> Vec<Overrides> {
    if cascade {
        directory_chain(path)
    } else {
        Vec::new()
    }
}
