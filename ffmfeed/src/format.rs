//! An interface module which abstracts over input formats that can be
//! turned into feed payloads.
//!
//! A format knows how to parse one line, how to encode a batch of parsed
//! records into sparse views, and how to package those views. Loading a
//! source and streaming payloads are provided on top of those operations,
//! so a new text format only has to supply the per-line and per-batch parts.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::Path;

use crate::config::FeedConfig;
use crate::encoder::{SparseEncoder, SparseViews};
use crate::error::Result;
use crate::parser::LineParser;
use crate::payload::FeedPayload;
use crate::record::{Batch, Record};
use crate::scanner::{self, BatchScanner, ScanStats};

pub trait FeedFormat {
    /// Maximum number of records per batch.
    fn batch_size(&self) -> usize;

    fn parse_line(&self, line: &[u8]) -> Result<Record>;

    fn convert_batch(&self, batch: &Batch) -> Result<SparseViews>;

    fn assemble_feed(&self, batch: &Batch, views: SparseViews) -> FeedPayload;

    /// Lazily splits `source` into batches of parsed records.
    fn load_from_source<R: BufRead>(&self, source: R) -> BatchScanner<'_, Self, R>
    where
        Self: Sized,
    {
        BatchScanner::new(self, source)
    }

    fn load_from_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<BatchScanner<'_, Self, BufReader<File>>>
    where
        Self: Sized,
    {
        Ok(self.load_from_source(scanner::open_source(path)?))
    }

    /// Lazily turns `source` into one payload per batch.
    fn feed_from_source<R: BufRead>(&self, source: R) -> FeedStream<'_, Self, R>
    where
        Self: Sized,
    {
        FeedStream::new(self, self.load_from_source(source))
    }

    fn feed_from_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<FeedStream<'_, Self, BufReader<File>>>
    where
        Self: Sized,
    {
        Ok(self.feed_from_source(scanner::open_source(path)?))
    }
}

/// The field-aware text format:
/// `<label> <field>:<index>:<weight> ...%<id>`.
#[derive(Debug, Clone)]
pub struct FfmTextFormat {
    config: FeedConfig,
    parser: LineParser,
    encoder: SparseEncoder,
}

impl FfmTextFormat {
    pub fn new(config: FeedConfig) -> Result<Self> {
        config.validate()?;
        Ok(FfmTextFormat {
            parser: LineParser::from_config(&config),
            encoder: SparseEncoder::new(config.feature_count, config.field_count),
            config,
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn encoder(&self) -> &SparseEncoder {
        &self.encoder
    }
}

impl FeedFormat for FfmTextFormat {
    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn parse_line(&self, line: &[u8]) -> Result<Record> {
        self.parser.parse(line)
    }

    fn convert_batch(&self, batch: &Batch) -> Result<SparseViews> {
        self.encoder.encode(batch)
    }

    fn assemble_feed(&self, batch: &Batch, views: SparseViews) -> FeedPayload {
        FeedPayload::assemble(batch.labels(), views)
    }
}

/// Payloads for each batch of a source, produced on demand.
///
/// Errors carry the source line they were raised on. The stream ends after
/// the first error.
pub struct FeedStream<'f, F: ?Sized, R> {
    format: &'f F,
    batches: BatchScanner<'f, F, R>,
    failed: bool,
}

impl<'f, F, R> FeedStream<'f, F, R>
where
    F: FeedFormat + ?Sized,
    R: BufRead,
{
    pub fn new(format: &'f F, batches: BatchScanner<'f, F, R>) -> Self {
        FeedStream {
            format,
            batches,
            failed: false,
        }
    }

    pub fn stats(&self) -> ScanStats {
        self.batches.stats()
    }

    fn encode(&self, batch: Batch) -> Result<FeedPayload> {
        let views = self.format.convert_batch(&batch).map_err(|e| {
            match e.batch_row() {
                Some(row) => {
                    let first_line = self.batches.stats().lines + 1 - batch.len() as u64;
                    e.at_line(first_line + row as u64)
                }
                None => e,
            }
        })?;
        Ok(self.format.assemble_feed(&batch, views))
    }
}

impl<'f, F, R> Iterator for FeedStream<'f, F, R>
where
    F: FeedFormat + ?Sized,
    R: BufRead,
{
    type Item = Result<FeedPayload>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match self.batches.next()? {
            Ok(batch) => self.encode(batch),
            Err(e) => Err(e),
        };
        self.failed = item.is_err();
        Some(item)
    }
}

impl<'f, F, R> FusedIterator for FeedStream<'f, F, R>
where
    F: FeedFormat + ?Sized,
    R: BufRead,
{
}
