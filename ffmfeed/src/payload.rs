//! The named payload handed to a training backend for each batch.
//!
//! | key              | type    | shape |
//! |------------------|---------|-------|
//! | labels           | float32 | [N,1] |
//! | fm_feat_indices  | int64   | [K,2] |
//! | fm_feat_values   | float32 | [K]   |
//! | fm_feat_shape    | int64   | [2]   |
//! | dnn_feat_indices | int64   | [M,2] |
//! | dnn_feat_values  | int64   | [M]   |
//! | dnn_feat_weights | float32 | [M]   |
//! | dnn_feat_shape   | int64   | [2]   |

use crate::encoder::SparseViews;

pub const LABELS: &str = "labels";
pub const FM_FEAT_INDICES: &str = "fm_feat_indices";
pub const FM_FEAT_VALUES: &str = "fm_feat_values";
pub const FM_FEAT_SHAPE: &str = "fm_feat_shape";
pub const DNN_FEAT_INDICES: &str = "dnn_feat_indices";
pub const DNN_FEAT_VALUES: &str = "dnn_feat_values";
pub const DNN_FEAT_WEIGHTS: &str = "dnn_feat_weights";
pub const DNN_FEAT_SHAPE: &str = "dnn_feat_shape";

/// Payload keys, in schema order.
pub static KEYS: [&str; 8] = [
    LABELS,
    FM_FEAT_INDICES,
    FM_FEAT_VALUES,
    FM_FEAT_SHAPE,
    DNN_FEAT_INDICES,
    DNN_FEAT_VALUES,
    DNN_FEAT_WEIGHTS,
    DNN_FEAT_SHAPE,
];

/// A dense row-major array with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    shape: Vec<usize>,
}

impl<T> Tensor<T> {
    /// Panics if the shape does not cover `data` exactly; callers in this
    /// crate always derive the shape from the data.
    fn new(data: Vec<T>, shape: Vec<usize>) -> Self {
        assert_eq!(data.len(), shape.iter().product::<usize>());
        Tensor { data, shape }
    }

    fn vector(data: Vec<T>) -> Self {
        let n = data.len();
        Tensor::new(data, vec![n])
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl<T: Copy> Tensor<T> {
    fn pairs(pairs: &[[T; 2]]) -> Self {
        let data = pairs.iter().flat_map(|p| p.iter().copied()).collect();
        Tensor::new(data, vec![pairs.len(), 2])
    }
}

/// A borrowed, type-tagged view of one payload entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TensorRef<'a> {
    F32(&'a Tensor<f32>),
    I64(&'a Tensor<i64>),
}

impl<'a> TensorRef<'a> {
    pub fn shape(&self) -> &'a [usize] {
        match *self {
            TensorRef::F32(t) => t.shape(),
            TensorRef::I64(t) => t.shape(),
        }
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            TensorRef::F32(_) => "float32",
            TensorRef::I64(_) => "int64",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPayload {
    pub labels: Tensor<f32>,
    pub fm_feat_indices: Tensor<i64>,
    pub fm_feat_values: Tensor<f32>,
    pub fm_feat_shape: Tensor<i64>,
    pub dnn_feat_indices: Tensor<i64>,
    pub dnn_feat_values: Tensor<i64>,
    pub dnn_feat_weights: Tensor<f32>,
    pub dnn_feat_shape: Tensor<i64>,
}

impl FeedPayload {
    /// Packages labels and both sparse views. Pure; performs no I/O.
    pub fn assemble(labels: Vec<f32>, views: SparseViews) -> Self {
        let SparseViews { flat, grouped } = views;
        let n = labels.len();
        FeedPayload {
            labels: Tensor::new(labels, vec![n, 1]),
            fm_feat_indices: Tensor::pairs(&flat.indices),
            fm_feat_values: Tensor::vector(flat.values),
            fm_feat_shape: Tensor::vector(flat.shape.to_vec()),
            dnn_feat_indices: Tensor::pairs(&grouped.indices),
            dnn_feat_values: Tensor::vector(grouped.values),
            dnn_feat_weights: Tensor::vector(grouped.weights),
            dnn_feat_shape: Tensor::vector(grouped.shape.to_vec()),
        }
    }

    pub fn get(&self, key: &str) -> Option<TensorRef<'_>> {
        let t = match key {
            LABELS => TensorRef::F32(&self.labels),
            FM_FEAT_INDICES => TensorRef::I64(&self.fm_feat_indices),
            FM_FEAT_VALUES => TensorRef::F32(&self.fm_feat_values),
            FM_FEAT_SHAPE => TensorRef::I64(&self.fm_feat_shape),
            DNN_FEAT_INDICES => TensorRef::I64(&self.dnn_feat_indices),
            DNN_FEAT_VALUES => TensorRef::I64(&self.dnn_feat_values),
            DNN_FEAT_WEIGHTS => TensorRef::F32(&self.dnn_feat_weights),
            DNN_FEAT_SHAPE => TensorRef::I64(&self.dnn_feat_shape),
            _ => return None,
        };
        Some(t)
    }

    /// All entries, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, TensorRef<'_>)> + '_ {
        KEYS.iter().filter_map(move |&k| self.get(k).map(|t| (k, t)))
    }

    /// Number of records (N).
    pub fn nrecords(&self) -> usize {
        self.labels.shape()[0]
    }

    /// Width of the field-grouped view for this batch.
    pub fn dnn_width(&self) -> i64 {
        self.dnn_feat_shape.data()[1]
    }
}
