//! Main file runs the command-line application for `ffmfeed`, which streams
//! field-aware text files through the feed encoder and reports what a
//! training run would receive.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::iter::{ParallelBridge, ParallelIterator};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ffmfeed::{ColumnSeparator, FeedConfig, FeedError, FeedFormat, FeedPayload, FfmTextFormat};

/// Reads field-aware text files, one record per line:
///
/// <label> <field>:<index>:<weight> <field>:<index>:<weight> ...%<id>
///
/// Fields and indices are 1-based. Each file is split into batches and
/// every batch is encoded into its FM and DNN sparse views, exactly as a
/// training run would consume them. Any malformed line or out-of-range
/// index stops the run and is reported with its line number.
///
/// With --parallel, batches are still read in order but encoded on the
/// rayon pool; use the `RAYON_NUM_THREADS` env variable to control thread
/// count. Logging is controlled with `RUST_LOG`.
#[derive(Debug, StructOpt)]
#[structopt(name = "ffmfeed")]
struct Opt {
    /// Input files, each scanned on its own (space separated).
    #[structopt(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of distinct features; 1-based indices must not exceed it.
    #[structopt(long)]
    feature_count: u64,

    /// Number of fields; 1-based fields must not exceed it.
    #[structopt(long)]
    field_count: u32,

    #[structopt(long, default_value = "256")]
    batch_size: usize,

    /// Single-character column separator. If not set, any run of
    /// whitespace separates columns.
    #[structopt(long)]
    col_separator: Option<char>,

    /// Separates the optional trailing identifier from the features.
    #[structopt(long, default_value = "%")]
    id_separator: char,

    /// Encode batches in parallel.
    #[structopt(long)]
    parallel: bool,
}

/// Totals over the payloads of one input.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Summary {
    batches: u64,
    records: u64,
    triples: u64,
    max_dnn_width: i64,
}

impl Summary {
    fn of(payload: &FeedPayload) -> Self {
        Summary {
            batches: 1,
            records: payload.nrecords() as u64,
            triples: payload.fm_feat_values.data().len() as u64,
            max_dnn_width: payload.dnn_width(),
        }
    }

    fn merge(self, other: Self) -> Self {
        Summary {
            batches: self.batches + other.batches,
            records: self.records + other.records,
            triples: self.triples + other.triples,
            max_dnn_width: self.max_dnn_width.max(other.max_dnn_width),
        }
    }
}

fn ascii_byte(c: char, what: &str) -> Result<u8, FeedError> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(FeedError::Config(format!("{} {:?} must be ascii", what, c)))
    }
}

fn scan_serial(format: &FfmTextFormat, path: &Path) -> ffmfeed::Result<Summary> {
    let mut summary = Summary::default();
    for payload in format.feed_from_file(path)? {
        summary = summary.merge(Summary::of(&payload?));
    }
    Ok(summary)
}

/// Ties a batch-relative range error to its source line. Every batch before
/// the last is full, so the first line of batch `index` is
/// `index * batch_size + 1`.
fn locate(e: FeedError, index: usize, batch_size: usize) -> FeedError {
    match e.batch_row() {
        Some(row) => e.at_line((index * batch_size + row + 1) as u64),
        None => e,
    }
}

/// Of two errors, the one raised on the earlier line.
fn earliest(a: FeedError, b: FeedError) -> FeedError {
    match (a.line(), b.line()) {
        (Some(x), Some(y)) if y < x => b,
        (None, Some(_)) => b,
        _ => a,
    }
}

/// Encodes batches on the rayon pool. Batches finish out of order, so every
/// batch is encoded and the error on the lowest line is the one reported,
/// the same error a serial scan would stop at.
fn scan_parallel(format: &FfmTextFormat, path: &Path) -> ffmfeed::Result<Summary> {
    let batch_size = format.batch_size();
    format
        .load_from_file(path)?
        .enumerate()
        .par_bridge()
        .map(|(i, batch)| -> ffmfeed::Result<Summary> {
            let batch = batch?;
            let views = format
                .convert_batch(&batch)
                .map_err(|e| locate(e, i, batch_size))?;
            Ok(Summary::of(&format.assemble_feed(&batch, views)))
        })
        .reduce(
            || Ok(Summary::default()),
            |a, b| match (a, b) {
                (Ok(a), Ok(b)) => Ok(a.merge(b)),
                (Err(a), Err(b)) => Err(earliest(a, b)),
                (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            },
        )
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("ffmfeed=info".parse()?))
        .init();

    let opt = Opt::from_args();

    let mut config = FeedConfig::new(opt.feature_count, opt.field_count)
        .with_batch_size(opt.batch_size)
        .with_id_separator(ascii_byte(opt.id_separator, "id separator")?);
    if let Some(c) = opt.col_separator {
        let sep = ascii_byte(c, "column separator")?;
        config = config.with_col_separator(ColumnSeparator::Byte(sep));
    }
    let format = FfmTextFormat::new(config)?;
    let config = format.config();
    info!(
        feature_count = config.feature_count,
        field_count = config.field_count,
        batch_size = config.batch_size,
        parallel = opt.parallel,
        "ffmfeed starting"
    );

    let e2e = Instant::now();
    for path in &opt.inputs {
        let start = Instant::now();
        let summary = if opt.parallel {
            scan_parallel(&format, path)
        } else {
            scan_serial(&format, path)
        }
        .map_err(|e| format!("{}: {}", path.display(), e))?;
        info!(
            path = %path.display(),
            "encode {:.0?}",
            Instant::now().duration_since(start)
        );

        println!("file {}", path.display());
        println!("num batches {}", summary.batches);
        println!("num records {}", summary.records);
        println!("num triples {}", summary.triples);
        println!("max dnn width {}", summary.max_dnn_width);
    }
    info!("e2e {:.0?}", Instant::now().duration_since(e2e));

    Ok(())
}
