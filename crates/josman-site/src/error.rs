//! Error types for site generation.
//!
//! Every failure maps to one [`ErrorKind`], which decides whether lenient
//! mode may degrade it to a warning.

use std::path::{Path, PathBuf};

use josman_renderer::HtmlError;

use crate::evaluator::EvaluationError;

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed path, blank document, bad expression syntax. Always fatal.
    InvalidInput,
    /// Expression result or required file missing.
    MissingData,
    /// A registered callable could not be resolved or failed.
    EvaluationFailure,
    /// Reading sources or writing output failed. Always fatal.
    IoFailure,
}

/// Site generation error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("{rel_path}: document is blank")]
    MeaninglessContent { rel_path: String },

    #[error("{rel_path}: document is not valid UTF-8")]
    InvalidEncoding { rel_path: String },

    #[error("{rel_path}: malformed expression '{expr}'")]
    MalformedExpression { expr: String, rel_path: String },

    #[error(
        "{rel_path}: expression '{expr}' has arguments, only zero-argument methods and fields are supported"
    )]
    UnsupportedExpression { expr: String, rel_path: String },

    #[error("{rel_path}: no precomputed result for expression '{expr}' (run `josman eval` first)")]
    ExprNotFound { expr: String, rel_path: String },

    #[error("{rel_path}: evaluating '{expr}' failed: {source}")]
    Evaluation {
        expr: String,
        rel_path: String,
        #[source]
        source: EvaluationError,
    },

    #[error("{rel_path}: malformed link '{href}'")]
    MalformedLink { href: String, rel_path: String },

    #[error("invalid sidebar input: {0}")]
    InvalidSidebarInput(String),

    #[error("missing data: {0}")]
    MissingData(String),

    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("target already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("version source failed: {0}")]
    Source(String),

    #[error(transparent)]
    Html(#[from] HtmlError),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. }
            | Self::InvalidVersion { .. }
            | Self::MeaninglessContent { .. }
            | Self::InvalidEncoding { .. }
            | Self::MalformedExpression { .. }
            | Self::UnsupportedExpression { .. }
            | Self::MalformedLink { .. }
            | Self::InvalidSidebarInput(_)
            | Self::Html(_) => ErrorKind::InvalidInput,
            Self::ExprNotFound { .. } | Self::MissingData(_) | Self::MissingFile(_) => {
                ErrorKind::MissingData
            }
            Self::Evaluation { .. } => ErrorKind::EvaluationFailure,
            Self::TargetExists(_) | Self::Io { .. } | Self::Csv { .. } | Self::Source(_) => {
                ErrorKind::IoFailure
            }
        }
    }

    /// Whether lenient mode may turn this error into a warning.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingData | ErrorKind::EvaluationFailure
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
