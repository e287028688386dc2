/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for YAML-to-CUE decoding.
//!
//! Every error renders as `<filename>:<line>: <message>`, dropping the
//! line when the parser did not report one.

use std::fmt;

use yaml_rust2::scanner::ScanError;

/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A positioned decoding error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub filename: String,
    pub line: Option<usize>,
    pub kind: ErrorKind,
}

/// The kinds of failure the decoder reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Opaque syntax error from the YAML parser.
    #[error("{0}")]
    Syntax(String),

    #[error("cannot unmarshal tag {tag:?}")]
    UnsupportedTag { tag: String },

    #[error("cannot decode {value:?} as {tag}: {reason}")]
    MalformedNumber {
        value: String,
        tag: String,
        reason: String,
    },

    #[error("!!binary value contains invalid base64 data")]
    InvalidBase64,

    #[error("invalid map key: {tag}")]
    InvalidKey { tag: String },

    #[error("invalid label {label}")]
    InvalidLabel { label: String },

    #[error("map merge requires map or sequence of maps as the value")]
    InvalidMerge,

    #[error("anchor {anchor:?} value contains itself")]
    AnchorCycle { anchor: String },

    #[error("expected a single YAML document")]
    MultipleDocuments,
}

impl Error {
    pub(crate) fn new(filename: &str, line: Option<usize>, kind: ErrorKind) -> Error {
        Error {
            filename: filename.to_string(),
            line,
            kind,
        }
    }

    /// Converts a parser error, replacing the scanner's own trailing
    /// position text with the filename and line.
    pub(crate) fn from_scan(filename: &str, err: &ScanError) -> Error {
        let mut message = err.to_string();
        if let Some(at) = message.rfind(" at byte ") {
            message.truncate(at);
        }
        let line = err.marker().line();
        Error::new(
            filename,
            (line > 0).then_some(line),
            ErrorKind::Syntax(message),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.filename, line, self.kind),
            None => write!(f, "{}: {}", self.filename, self.kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_line() {
        let err = Error::new(
            "foo.yaml",
            Some(3),
            ErrorKind::UnsupportedTag {
                tag: "!bar".to_string(),
            },
        );
        assert_eq!(err.to_string(), "foo.yaml:3: cannot unmarshal tag \"!bar\"");
    }

    #[test]
    fn test_display_without_line() {
        let err = Error::new("foo.yaml", None, ErrorKind::Syntax("bad input".to_string()));
        assert_eq!(err.to_string(), "foo.yaml: bad input");
    }

    #[test]
    fn test_merge_message() {
        let err = Error::new("f.yaml", Some(1), ErrorKind::InvalidMerge);
        assert_eq!(
            err.to_string(),
            "f.yaml:1: map merge requires map or sequence of maps as the value"
        );
    }
}
