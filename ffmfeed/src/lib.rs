//! `ffmfeed` streams field-aware sparse text data into the sparse tensor
//! feeds of a hybrid factorization-machine / deep-network model.
//!
//! Input lines look like
//!
//! <label> <field>:<index>:<weight> <field>:<index>:<weight> ...%<id>
//!
//! with 1-based fields and indices. Lines are grouped into fixed-size
//! batches, and each batch becomes one [`FeedPayload`] holding a flat
//! record x feature view (the "FM" view) and a field-grouped view (the "DNN"
//! view) whose width is inferred per batch.
//!
//! ```
//! use ffmfeed::{FeedConfig, FeedFormat, FfmTextFormat};
//! use std::io::Cursor;
//!
//! let format = FfmTextFormat::new(FeedConfig::new(10, 2).with_batch_size(32)).unwrap();
//! let text = "1 1:3:1.0 1:5:2.0 2:9:0.5\n0 2:1:1.0\n";
//! for payload in format.feed_from_source(Cursor::new(text)) {
//!     let payload = payload.unwrap();
//!     assert_eq!(payload.dnn_feat_shape.data(), &[4, 2]);
//! }
//! ```
//!
//! Everything is pull-based: a batch is read only when the next payload is
//! requested, and batches share nothing but the read-only configuration, so
//! callers are free to encode them on separate threads.

pub mod config;
pub mod encoder;
pub mod error;
pub mod format;
pub mod parser;
pub mod payload;
pub mod record;
pub mod scanner;

pub use config::{ColumnSeparator, FeedConfig};
pub use encoder::{FieldGroupedView, FlatView, SparseEncoder, SparseViews};
pub use error::{ErrorKind, FeedError, Result};
pub use format::{FeedFormat, FeedStream, FfmTextFormat};
pub use parser::LineParser;
pub use payload::{FeedPayload, Tensor, TensorRef};
pub use record::{Batch, FeatureTriple, Record};
pub use scanner::{BatchScanner, ScanStats};
