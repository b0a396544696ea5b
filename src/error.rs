//! Error types for docdiff
//!
//! Only caller mistakes and collaborator failures are errors. Partial
//! translation coverage and inconsistent anchors are the normal state of a
//! documentation tree, so those surface as [`Diagnostic`] values instead.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by docdiff operations
#[derive(Error, Debug)]
pub enum DocDiffError {
    /// Optimizer or matcher configuration violates its own bounds
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A similarity score that is not a finite value in `[0.0, 1.0]`
    #[error("Invalid similarity score: {0}")]
    InvalidSimilarity(f64),

    /// Empty or malformed language code
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// Failure reported by a node store
    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for docdiff operations
pub type DocDiffResult<T> = Result<T, DocDiffError>;

/// Severity of a non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A recovered data inconsistency, reported next to the result it affected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Node the diagnostic refers to, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, node_id: Option<&str>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            node_id: node_id.map(str::to_string),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        match &self.node_id {
            Some(id) => write!(f, "{}: {} (node {})", level, self.message, id),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocDiffError::InvalidConfig("min_size > max_size".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: min_size > max_size");

        let err = DocDiffError::InvalidSimilarity(f64::NAN);
        assert!(err.to_string().starts_with("Invalid similarity score"));
    }

    #[test]
    fn test_io_error_converts() {
        fn read() -> DocDiffResult<String> {
            Ok(std::fs::read_to_string("/nonexistent/docdiff/file.json")?)
        }
        assert!(matches!(read(), Err(DocDiffError::Io(_))));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning("duplicate label 'intro'", Some("ja-3"));
        assert_eq!(
            diag.to_string(),
            "warning: duplicate label 'intro' (node ja-3)"
        );

        let diag = Diagnostic::warning("orphan", None);
        assert_eq!(diag.to_string(), "warning: orphan");
    }
}
