// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Error type shared by every `tt` operation.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure on a specific path (create, read, write).
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An option holds a value that cannot be used (e.g. a non-numeric `refresh_time`).
    #[error("invalid value for {key}: \"{value}\"")]
    InvalidOption { key: String, value: String },

    /// A template or duration format could not be turned into a pattern.
    #[error("cannot build pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Writing to the terminal or report output failed.
    #[error("cannot write output: {0}")]
    Output(#[source] io::Error),

    #[error("{}: no such file or directory", .0.display())]
    NotFound(PathBuf),
}

impl Error {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = Error::io(
            Path::new("/no/such/log.tt"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("/no/such/log.tt: "));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_invalid_option_message() {
        let err = Error::InvalidOption {
            key: "refresh_time".to_string(),
            value: "soon".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for refresh_time: \"soon\"");
    }
}
