//! Error types for the analysis front-end.
//!
//! Fatal conditions (malformed XML, unreadable files) are reported through
//! this type rather than by panicking, so that a caller embedding the
//! analyzer in a larger tool can decide how to surface them.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error produced while reading or analyzing an SCXML document.
#[derive(Debug)]
pub enum AnalysisError {
    /// The file could not be opened or read.
    Io { path: PathBuf, source: io::Error },
    /// The document was not well-formed XML.
    Xml { path: PathBuf, message: String },
    /// The document was well-formed XML but not a usable SCXML document
    /// (e.g. missing root element).
    InvalidDocument { path: PathBuf, message: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Io { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            AnalysisError::Xml { path, message } => {
                write!(f, "{}: xml error: {}", path.display(), message)
            }
            AnalysisError::InvalidDocument { path, message } => {
                write!(f, "{}: invalid document: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
