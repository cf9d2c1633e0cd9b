//! Errors raised along the text-to-feed pipeline.
//!
//! Format and range errors are fatal to a run: a single bad index shifts
//! every coordinate after it, so nothing is skipped and retried.

use std::io;
use thiserror::Error;

/// The broad class of a [`FeedError`], independent of any line context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed line or token.
    Format,
    /// Feature or field index outside the configured bounds or too large
    /// for its integer type.
    Range,
    /// The underlying text source could not be read.
    Source,
    /// Invalid configuration.
    Config,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("format error: {reason}")]
    Format { reason: String },

    #[error("{what} {} out of range for configured count {count}", .index + 1)]
    Range {
        /// Either "field" or "feature".
        what: &'static str,
        /// The offending 0-based index; reported 1-based, as written.
        index: u64,
        count: u64,
        /// Position of the offending record within its batch.
        row: usize,
    },

    /// A numeric index too large for its integer type, caught before any
    /// configured count applies.
    #[error("{what} {token} out of range")]
    IndexOverflow { what: &'static str, token: String },

    #[error("source error: {0}")]
    Source(#[from] io::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("line {line}: {source}")]
    AtLine {
        line: u64,
        #[source]
        source: Box<FeedError>,
    },
}

pub type Result<T> = std::result::Result<T, FeedError>;

impl FeedError {
    pub(crate) fn format<S: Into<String>>(reason: S) -> Self {
        FeedError::Format {
            reason: reason.into(),
        }
    }

    /// Attaches a 1-based line number. Errors that already carry one are
    /// returned as-is.
    pub fn at_line(self, line: u64) -> Self {
        match self {
            e @ FeedError::AtLine { .. } => e,
            e => FeedError::AtLine {
                line,
                source: Box::new(e),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Format { .. } => ErrorKind::Format,
            FeedError::Range { .. } | FeedError::IndexOverflow { .. } => ErrorKind::Range,
            FeedError::Source(_) => ErrorKind::Source,
            FeedError::Config(_) => ErrorKind::Config,
            FeedError::AtLine { source, .. } => source.kind(),
        }
    }

    /// For range errors not yet tied to a line, the offending record's
    /// position within its batch.
    pub fn batch_row(&self) -> Option<usize> {
        match self {
            FeedError::Range { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// The 1-based source line this error was raised on, if known.
    pub fn line(&self) -> Option<u64> {
        match self {
            FeedError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }
}
