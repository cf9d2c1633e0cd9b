//! Conversion of a batch into its two sparse coordinate views.
//!
//! The flat ("FM") view has one row per record and one column per feature:
//! entry (i, feature) holds the token's weight.
//!
//! The field-grouped ("DNN") view has `field_count` rows per record. Row
//! `i * field_count + f` collects the features of field `f` in record `i`,
//! and its column is the position of the feature among that record's
//! occurrences of `f`, in textual order. So a record with three features in
//! field 0 fills columns 0, 1 and 2 of its first row. The view stores the
//! feature index as the entry value, alongside a parallel weight.
//!
//! The width of the DNN view is the largest per-field position seen in the
//! batch, plus one, and so changes from batch to batch.

use itertools::izip;

use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::record::Batch;

/// Record x feature coordinates, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatView {
    pub indices: Vec<[i64; 2]>,
    pub values: Vec<f32>,
    pub shape: [i64; 2],
}

/// (record, field) x position coordinates, sorted by (row, col).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldGroupedView {
    pub indices: Vec<[i64; 2]>,
    /// Feature index of each entry.
    pub values: Vec<i64>,
    pub weights: Vec<f32>,
    pub shape: [i64; 2],
}

impl FieldGroupedView {
    /// Iterates over (index, feature, weight).
    pub fn iter(&self) -> impl Iterator<Item = (&[i64; 2], &i64, &f32)> {
        izip!(&self.indices, &self.values, &self.weights)
    }

    /// The dynamic width of this view: one past the largest position.
    pub fn width(&self) -> i64 {
        self.shape[1]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseViews {
    pub flat: FlatView,
    pub grouped: FieldGroupedView,
}

/// A pending DNN entry; sorted per record before being split into the
/// view's parallel arrays.
#[derive(Debug, Clone, Copy)]
struct GroupedEntry {
    row: i64,
    col: i64,
    feature: i64,
    weight: f32,
}

/// Encodes batches against a fixed feature and field count.
///
/// The encoder keeps no state between calls, so one instance can be shared
/// across threads encoding different batches.
#[derive(Debug, Clone, Copy)]
pub struct SparseEncoder {
    feature_count: u64,
    field_count: u32,
}

impl SparseEncoder {
    /// Counts must already be validated; see [`FeedConfig::validate`].
    pub(crate) fn new(feature_count: u64, field_count: u32) -> Self {
        SparseEncoder {
            feature_count,
            field_count,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        config.validate()?;
        Ok(SparseEncoder::new(config.feature_count, config.field_count))
    }

    pub fn feature_count(&self) -> u64 {
        self.feature_count
    }

    pub fn field_count(&self) -> u32 {
        self.field_count
    }

    pub fn encode(&self, batch: &Batch) -> Result<SparseViews> {
        let ntriples = batch.ntriples();
        let nfields = self.field_count as usize;
        let field_count = self.field_count as i64;

        let mut flat_indices = Vec::with_capacity(ntriples);
        let mut flat_values = Vec::with_capacity(ntriples);
        let mut entries: Vec<GroupedEntry> = Vec::with_capacity(ntriples);

        // Occurrences of each field in the current record. Only the fields
        // listed in `touched` are nonzero.
        let mut occurrences = vec![0u32; nfields];
        let mut touched: Vec<u32> = Vec::with_capacity(nfields);
        let mut width = 0u32;

        for (i, record) in batch.iter().enumerate() {
            let row = i as i64;
            let start = entries.len();
            for triple in &record.features {
                self.check_range(i, triple.field, triple.feature)?;
                let feature = triple.feature as i64;

                flat_indices.push([row, feature]);
                flat_values.push(triple.weight);

                let seen = &mut occurrences[triple.field as usize];
                if *seen == 0 {
                    touched.push(triple.field);
                }
                let position = *seen;
                *seen += 1;
                width = width.max(position + 1);

                entries.push(GroupedEntry {
                    row: row * field_count + triple.field as i64,
                    col: position as i64,
                    feature,
                    weight: triple.weight,
                });
            }
            for &f in touched.iter() {
                occurrences[f as usize] = 0;
            }
            touched.clear();

            // This record's rows all lie in [i * F, (i + 1) * F), after every
            // earlier record's rows, so sorting its segment sorts the whole.
            entries[start..].sort_by_key(|e| (e.row, e.col));
        }
        debug_assert!(entries
            .windows(2)
            .all(|s| (s[0].row, s[0].col) < (s[1].row, s[1].col)));

        let nrecords = batch.len() as i64;
        let flat = FlatView {
            indices: flat_indices,
            values: flat_values,
            shape: [nrecords, self.feature_count as i64],
        };

        let mut grouped = FieldGroupedView {
            indices: Vec::with_capacity(entries.len()),
            values: Vec::with_capacity(entries.len()),
            weights: Vec::with_capacity(entries.len()),
            shape: [nrecords * field_count, width as i64],
        };
        for e in entries {
            grouped.indices.push([e.row, e.col]);
            grouped.values.push(e.feature);
            grouped.weights.push(e.weight);
        }

        Ok(SparseViews { flat, grouped })
    }

    fn check_range(&self, row: usize, field: u32, feature: u64) -> Result<()> {
        if field >= self.field_count {
            return Err(FeedError::Range {
                what: "field",
                index: field as u64,
                count: self.field_count as u64,
                row,
            });
        }
        if feature >= self.feature_count {
            return Err(FeedError::Range {
                what: "feature",
                index: feature,
                count: self.feature_count,
                row,
            });
        }
        Ok(())
    }
}
