//! This module turns a line-oriented text source into a lazy sequence of
//! record batches.
//!
//! Lines are read one at a time from a [`BufRead`] into a reusable buffer,
//! parsed, and buffered until a full batch is collected. The scanner never
//! reads past the last line of the batch it is producing.
//!
//! The scanner owns its reader. Once the source is exhausted or an error is
//! raised the reader is dropped right away, and dropping the scanner early
//! drops it as well, so file handles never outlive the scan.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{FeedError, Result};
use crate::format::FeedFormat;
use crate::record::Batch;

const BUFSIZE: usize = 64 * 1024;

/// Opens a file source with the buffering used for all on-disk inputs.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let file = File::open(path)?;
    Ok(BufReader::with_capacity(BUFSIZE, file))
}

/// Running counts for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lines read so far, including the one an error was raised on.
    pub lines: u64,
    /// Batches handed out so far.
    pub batches: u64,
}

/// A single-pass iterator of batches over a text source.
///
/// Every batch holds `batch_size` records except possibly the last, and
/// records appear in source line order. An empty source yields nothing.
/// After the first error the scanner is finished.
pub struct BatchScanner<'f, F: ?Sized, R> {
    format: &'f F,
    // None once the scan is done.
    reader: Option<R>,
    line: Vec<u8>,
    stats: ScanStats,
}

impl<'f, F, R> BatchScanner<'f, F, R>
where
    F: FeedFormat + ?Sized,
    R: BufRead,
{
    pub fn new(format: &'f F, reader: R) -> Self {
        BatchScanner {
            format,
            reader: Some(reader),
            line: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn is_done(&self) -> bool {
        self.reader.is_none()
    }

    fn finish(&mut self) {
        if self.reader.take().is_some() {
            debug!(
                lines = self.stats.lines,
                batches = self.stats.batches,
                "text source closed"
            );
        }
    }

    fn fail(&mut self, e: FeedError, line: u64) -> Option<Result<Batch>> {
        self.finish();
        Some(Err(e.at_line(line)))
    }
}

impl<'f, F, R> Iterator for BatchScanner<'f, F, R>
where
    F: FeedFormat + ?Sized,
    R: BufRead,
{
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch_size = self.format.batch_size();
        let mut records = Vec::new();
        while records.len() < batch_size {
            self.line.clear();
            let read = match self.reader.as_mut() {
                Some(reader) => reader.read_until(b'\n', &mut self.line),
                None => break,
            };
            match read {
                Ok(0) => self.finish(),
                Ok(_) => {
                    self.stats.lines += 1;
                    match self.format.parse_line(&self.line) {
                        Ok(record) => records.push(record),
                        Err(e) => return self.fail(e, self.stats.lines),
                    }
                }
                Err(e) => return self.fail(e.into(), self.stats.lines + 1),
            }
        }

        if records.is_empty() {
            return None;
        }
        self.stats.batches += 1;
        trace!(
            batch = self.stats.batches,
            records = records.len(),
            "batch collected"
        );
        Some(Ok(Batch::new(records)))
    }
}

impl<'f, F, R> FusedIterator for BatchScanner<'f, F, R>
where
    F: FeedFormat + ?Sized,
    R: BufRead,
{
}
