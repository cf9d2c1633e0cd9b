//! Read-only settings shared by every stage of the pipeline.

use crate::error::{FeedError, Result};
use std::convert::TryFrom;

pub const DEFAULT_BATCH_SIZE: usize = 256;
pub const DEFAULT_ID_SEPARATOR: u8 = b'%';

/// How feature tokens are split apart on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSeparator {
    /// Any run of ASCII whitespace.
    Whitespace,
    /// A single byte. Adjacent separators produce empty tokens, which the
    /// parser skips.
    Byte(u8),
}

impl Default for ColumnSeparator {
    fn default() -> Self {
        ColumnSeparator::Whitespace
    }
}

impl ColumnSeparator {
    pub(crate) fn matches(self, b: u8) -> bool {
        match self {
            ColumnSeparator::Whitespace => b.is_ascii_whitespace(),
            ColumnSeparator::Byte(sep) => b == sep,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Number of distinct features; every 0-based feature index must be below it.
    pub feature_count: u64,
    /// Number of fields; every 0-based field id must be below it.
    pub field_count: u32,
    pub batch_size: usize,
    pub col_separator: ColumnSeparator,
    pub id_separator: u8,
}

impl FeedConfig {
    pub fn new(feature_count: u64, field_count: u32) -> Self {
        FeedConfig {
            feature_count,
            field_count,
            batch_size: DEFAULT_BATCH_SIZE,
            col_separator: ColumnSeparator::default(),
            id_separator: DEFAULT_ID_SEPARATOR,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_col_separator(mut self, col_separator: ColumnSeparator) -> Self {
        self.col_separator = col_separator;
        self
    }

    pub fn with_id_separator(mut self, id_separator: u8) -> Self {
        self.id_separator = id_separator;
        self
    }

    /// Checks the settings are usable, including that the largest possible
    /// batch still has int64-representable shapes.
    pub fn validate(&self) -> Result<()> {
        if self.feature_count == 0 {
            return Err(FeedError::Config("feature_count must be positive".into()));
        }
        if self.field_count == 0 {
            return Err(FeedError::Config("field_count must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(FeedError::Config("batch_size must be positive".into()));
        }
        if i64::try_from(self.feature_count).is_err() {
            return Err(FeedError::Config(format!(
                "feature_count {} does not fit an int64 shape",
                self.feature_count
            )));
        }
        let rows = (self.batch_size as u128) * (self.field_count as u128);
        if rows > i64::MAX as u128 {
            return Err(FeedError::Config(format!(
                "batch_size {} * field_count {} does not fit an int64 shape",
                self.batch_size, self.field_count
            )));
        }
        if self.col_separator.matches(self.id_separator) || self.id_separator == b':' {
            return Err(FeedError::Config(format!(
                "id separator {:?} collides with the token grammar",
                self.id_separator as char
            )));
        }
        if let ColumnSeparator::Byte(b':') = self.col_separator {
            return Err(FeedError::Config(
                "column separator cannot be ':'".into(),
            ));
        }
        Ok(())
    }
}
