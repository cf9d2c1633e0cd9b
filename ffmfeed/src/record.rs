//! Parsed records and the batches they are grouped into.

/// One `field:index:weight` token, with field and index already 0-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureTriple {
    pub field: u32,
    pub feature: u64,
    pub weight: f32,
}

impl FeatureTriple {
    pub fn new(field: u32, feature: u64, weight: f32) -> Self {
        Self {
            field,
            feature,
            weight,
        }
    }
}

/// A single parsed line: label, triples in textual order, and an optional
/// identifier that is carried along but never encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub label: f32,
    pub features: Vec<FeatureTriple>,
    pub id: Option<String>,
}

/// An ordered group of records, in source line order.
///
/// Batches hold no reference to the source or to each other.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Total number of feature triples across all records.
    pub fn ntriples(&self) -> usize {
        self.records.iter().map(|r| r.features.len()).sum()
    }

    pub fn labels(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.label).collect()
    }

    pub fn ids(&self) -> Vec<Option<&str>> {
        self.records.iter().map(|r| r.id.as_deref()).collect()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: f32, nfeatures: usize, id: Option<&str>) -> Record {
        Record {
            label,
            features: (0..nfeatures)
                .map(|i| FeatureTriple::new(0, i as u64, 1.0))
                .collect(),
            id: id.map(str::to_owned),
        }
    }

    #[test]
    fn batch_accessors() {
        let batch = Batch::new(vec![
            record(1.0, 2, Some("a")),
            record(0.0, 0, None),
            record(1.0, 3, None),
        ]);
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert_eq!(batch.ntriples(), 5);
        assert_eq!(batch.labels(), vec![1.0, 0.0, 1.0]);
        assert_eq!(batch.ids(), vec![Some("a"), None, None]);
        assert_eq!((&batch).into_iter().count(), 3);
    }

    #[test]
    fn empty_batch() {
        let batch = Batch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.ntriples(), 0);
        assert!(batch.labels().is_empty());
    }
}
