use std::io::Write;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tempfile::NamedTempFile;

use ffmfeed::payload::KEYS;
use ffmfeed::{
    ErrorKind, FeatureTriple, FeedConfig, FeedFormat, FfmTextFormat, Record, SparseEncoder,
};

const FEATURES: u64 = 50;
const FIELDS: u32 = 4;

fn format(batch_size: usize) -> FfmTextFormat {
    FfmTextFormat::new(FeedConfig::new(FEATURES, FIELDS).with_batch_size(batch_size)).unwrap()
}

fn write_lines(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn random_record(rng: &mut StdRng, with_id: bool) -> Record {
    let nfeatures: usize = rng.gen_range(0, 8);
    Record {
        label: if rng.gen::<bool>() { 1.0 } else { 0.0 },
        features: (0..nfeatures)
            .map(|_| {
                let eighths: u32 = rng.gen_range(1, 64);
                FeatureTriple::new(
                    rng.gen_range(0, FIELDS),
                    rng.gen_range(0, FEATURES),
                    eighths as f32 / 8.0,
                )
            })
            .collect(),
        id: if with_id {
            Some(format!("imp{}", rng.gen_range(0u32, 1000)))
        } else {
            None
        },
    }
}

/// Writes a record back out in text form, 1-based.
fn to_line(record: &Record) -> String {
    let mut line = format!("{}", record.label);
    for t in &record.features {
        line.push_str(&format!(" {}:{}:{}", t.field + 1, t.feature + 1, t.weight));
    }
    if let Some(id) = &record.id {
        line.push_str(&format!("%{}", id));
    }
    line
}

fn random_records(seed: u64, n: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|i| random_record(&mut rng, i % 3 == 0)).collect()
}

#[test]
fn parsing_is_lossless() {
    let records = random_records(1234, 200);
    let lines: Vec<_> = records.iter().map(to_line).collect();
    let file = write_lines(&lines);

    let format = format(16);
    let parsed: Vec<Record> = format
        .load_from_file(file.path())
        .unwrap()
        .flat_map(|b| b.unwrap().into_records())
        .collect();
    assert_eq!(parsed, records);
}

#[test]
fn batch_counts_over_files() {
    let format_lines = |n: usize| -> Vec<String> {
        random_records(n as u64, n).iter().map(to_line).collect()
    };
    for &(nlines, batch_size) in &[(0, 4), (1, 4), (7, 7), (8, 3), (9, 3), (100, 32)] {
        let file = write_lines(&format_lines(nlines));
        let format = format(batch_size);
        let sizes: Vec<usize> = format
            .load_from_file(file.path())
            .unwrap()
            .map(|b| b.unwrap().len())
            .collect();

        let nbatches = (nlines + batch_size - 1) / batch_size;
        assert_eq!(sizes.len(), nbatches, "{} lines by {}", nlines, batch_size);
        if let Some((last, full)) = sizes.split_last() {
            assert!(full.iter().all(|&s| s == batch_size));
            let rem = nlines % batch_size;
            assert_eq!(*last, if rem == 0 { batch_size } else { rem });
        }
    }
}

#[test]
fn payload_invariants_hold_for_random_batches() {
    let records = random_records(99, 300);
    let lines: Vec<_> = records.iter().map(to_line).collect();
    let file = write_lines(&lines);
    let format = format(25);

    let mut seen = 0;
    for payload in format.feed_from_file(file.path()).unwrap() {
        let payload = payload.unwrap();
        let batch = &records[seen..seen + payload.nrecords()];
        seen += payload.nrecords();

        assert_eq!(payload.iter().map(|(k, _)| k).collect::<Vec<_>>(), KEYS.to_vec());

        let ntriples: usize = batch.iter().map(|r| r.features.len()).sum();
        let labels: Vec<f32> = batch.iter().map(|r| r.label).collect();
        assert_eq!(payload.labels.data(), &labels[..]);
        assert_eq!(payload.fm_feat_values.data().len(), ntriples);
        assert_eq!(payload.fm_feat_indices.shape(), &[ntriples, 2]);
        assert_eq!(
            payload.fm_feat_shape.data(),
            &[batch.len() as i64, FEATURES as i64]
        );
        assert_eq!(payload.dnn_feat_values.data().len(), ntriples);
        assert_eq!(payload.dnn_feat_weights.data().len(), ntriples);
        assert_eq!(payload.dnn_feat_indices.shape(), &[ntriples, 2]);

        let dnn: Vec<(i64, i64)> = payload
            .dnn_feat_indices
            .data()
            .chunks(2)
            .map(|c| (c[0], c[1]))
            .collect();
        assert!(dnn.windows(2).all(|w| w[0] < w[1]), "dnn indices unsorted");

        // Positions per (record, field) row are 0, 1, 2, ... in textual order.
        let mut expected = Vec::new();
        let mut max_position = -1i64;
        for (i, record) in batch.iter().enumerate() {
            for field in 0..FIELDS {
                let row = i as i64 * FIELDS as i64 + field as i64;
                for (k, t) in record.features.iter().filter(|t| t.field == field).enumerate() {
                    expected.push(((row, k as i64), t.feature as i64, t.weight));
                    max_position = max_position.max(k as i64);
                }
            }
        }
        let actual: Vec<_> = dnn
            .iter()
            .copied()
            .zip(payload.dnn_feat_values.data().iter().copied())
            .zip(payload.dnn_feat_weights.data().iter().copied())
            .map(|((idx, v), w)| (idx, v, w))
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(
            payload.dnn_feat_shape.data(),
            &[(batch.len() * FIELDS as usize) as i64, max_position + 1]
        );
    }
    assert_eq!(seen, records.len());
}

#[test]
fn encoding_is_independent_across_threads() {
    let records = random_records(7, 120);
    let lines: Vec<_> = records.iter().map(to_line).collect();
    let file = write_lines(&lines);
    let format = format(10);

    let batches: Vec<_> = format
        .load_from_file(file.path())
        .unwrap()
        .map(|b| b.unwrap())
        .collect();
    let serial: Vec<_> = batches
        .iter()
        .map(|b| format.convert_batch(b).unwrap())
        .collect();

    let encoder = *format.encoder();
    let threaded: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = batches
            .iter()
            .map(|b| s.spawn(move || encoder.encode(b).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(serial, threaded);
}

#[test]
fn corrupt_line_stops_the_run() {
    let mut lines: Vec<_> = random_records(5, 10).iter().map(to_line).collect();
    lines[6] = "1 abc:1:1.0".to_owned();
    let file = write_lines(&lines);
    let format = format(4);

    let results: Vec<_> = format.feed_from_file(file.path()).unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    let err = results[1].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(err.line(), Some(7));
}

#[test]
fn out_of_range_feature_stops_the_run() {
    let file = write_lines(&["1 1:3:1.0".to_owned(), "0 1:51:1.0".to_owned()]);
    let format = format(8);
    let err = format
        .feed_from_file(file.path())
        .unwrap()
        .find_map(|p| p.err())
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert_eq!(err.line(), Some(2));
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = format(4)
        .feed_from_file(dir.path().join("absent.txt"))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Source);
}

#[test]
fn standalone_encoder_matches_format() {
    let records = random_records(11, 5);
    let batch = ffmfeed::Batch::new(records);
    let format = format(5);
    assert_eq!(
        SparseEncoder::from_config(&FeedConfig::new(FEATURES, FIELDS))
            .unwrap()
            .encode(&batch)
            .unwrap(),
        format.convert_batch(&batch).unwrap()
    );
}
