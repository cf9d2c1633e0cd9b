//! Parsing of single field-aware text lines.
//!
//! Each line is expected to look like:
//!
//! <label> <field>:<index>:<weight> <field>:<index>:<weight> ...%<id>
//!
//! Fields and indices are 1-based in the text and 0-based once parsed.
//! The identifier suffix is optional; it is only recognized when the id
//! separator occurs exactly once on the line.

use bstr::ByteSlice;
use std::convert::TryFrom;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::config::{ColumnSeparator, FeedConfig};
use crate::error::{FeedError, Result};
use crate::record::{FeatureTriple, Record};

/// An iterator over byte slices separated by a column separator.
/// The iterated-over slices won't contain the separator, but may be empty.
#[derive(Clone)]
pub struct DelimIter<'a> {
    bytes: &'a [u8],
    pos: usize,
    delim: ColumnSeparator,
}

impl<'a> DelimIter<'a> {
    pub fn new<'b>(bytes: &'b [u8], delim: ColumnSeparator) -> DelimIter<'b> {
        DelimIter {
            bytes,
            pos: 0,
            delim,
        }
    }
}

impl<'a> Iterator for DelimIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos == self.bytes.len() {
            None
        } else {
            let start = self.pos;
            let bytes = &self.bytes[start..];
            let found = match self.delim {
                ColumnSeparator::Byte(b) => bytes.find_byte(b),
                ColumnSeparator::Whitespace => bytes.iter().position(u8::is_ascii_whitespace),
            };
            let (end, new_pos) = match found {
                None => (bytes.len(), bytes.len()),
                Some(next_word) => (next_word, next_word + 1),
            };
            self.pos = start + new_pos;
            Some(&bytes[..end])
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LineParser {
    col_separator: ColumnSeparator,
    id_separator: u8,
}

impl Default for LineParser {
    fn default() -> Self {
        LineParser::new(ColumnSeparator::default(), b'%')
    }
}

impl LineParser {
    pub fn new(col_separator: ColumnSeparator, id_separator: u8) -> Self {
        LineParser {
            col_separator,
            id_separator,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        LineParser::new(config.col_separator, config.id_separator)
    }

    pub fn parse(&self, line: &[u8]) -> Result<Record> {
        let line = line.trim();
        let (body, id) = self.split_id(line)?;

        let mut words = DelimIter::new(body.trim(), self.col_separator);
        let label = match words.next() {
            Some(word) if !word.trim().is_empty() => parse_number::<f32>(word, "label")?,
            _ => return Err(FeedError::format("missing label")),
        };

        let features = words
            .filter(|word| !word.trim().is_empty())
            .map(parse_triple)
            .collect::<Result<Vec<_>>>()?;

        Ok(Record {
            label,
            features,
            id,
        })
    }

    /// Splits off the identifier if the id separator occurs exactly once.
    fn split_id<'a>(&self, line: &'a [u8]) -> Result<(&'a [u8], Option<String>)> {
        let first = line.find_byte(self.id_separator);
        let last = line.rfind_byte(self.id_separator);
        match (first, last) {
            (Some(pos), Some(rpos)) if pos == rpos => {
                let id = line[pos + 1..].trim().to_str().map_err(|_| {
                    FeedError::format(format!(
                        "identifier {:?} is not utf-8",
                        line[pos + 1..].as_bstr()
                    ))
                })?;
                Ok((&line[..pos], Some(id.to_owned())))
            }
            (Some(pos), _) => Ok((&line[..pos], None)),
            _ => Ok((line, None)),
        }
    }
}

fn parse_triple(word: &[u8]) -> Result<FeatureTriple> {
    let mut parts = word.split(|&b| b == b':');
    let (field, feature, weight) = match (parts.next(), parts.next(), parts.next(), parts.next())
    {
        (Some(field), Some(feature), Some(weight), None) => (field, feature, weight),
        _ => {
            return Err(FeedError::format(format!(
                "token {:?} is not field:index:weight",
                word.as_bstr()
            )))
        }
    };
    let field = parse_index(field, "field")?;
    let feature = parse_index(feature, "feature")?;
    let weight = parse_number::<f32>(weight, "weight")?;
    let field = u32::try_from(field).map_err(|_| FeedError::IndexOverflow {
        what: "field",
        token: (field + 1).to_string(),
    })?;
    Ok(FeatureTriple::new(field, feature, weight))
}

/// Parses a 1-based index into its 0-based value.
fn parse_index(word: &[u8], what: &'static str) -> Result<u64> {
    let text = word.trim();
    let value = text
        .to_str()
        .map_err(|_| FeedError::format(format!("bad {} {:?}", what, word.as_bstr())))?
        .parse::<u64>()
        .map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => FeedError::IndexOverflow {
                what,
                token: text.to_str_lossy().into_owned(),
            },
            _ => FeedError::format(format!("bad {} {:?}", what, word.as_bstr())),
        })?;
    match value.checked_sub(1) {
        Some(index) => Ok(index),
        None => Err(FeedError::format(format!(
            "{} 0 in {:?}, text form is 1-based",
            what,
            word.as_bstr()
        ))),
    }
}

fn parse_number<T: FromStr>(word: &[u8], what: &str) -> Result<T> {
    word.trim()
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FeedError::format(format!("bad {} {:?}", what, word.as_bstr())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(line: &str) -> Result<Record> {
        LineParser::default().parse(line.as_bytes())
    }

    #[test]
    fn delim_iter_keeps_empty_words() {
        let words: Vec<_> = DelimIter::new(b"a,,b", ColumnSeparator::Byte(b',')).collect();
        assert_eq!(words, vec![&b"a"[..], &b""[..], &b"b"[..]]);
        let words: Vec<_> = DelimIter::new(b"a \tb", ColumnSeparator::Whitespace).collect();
        assert_eq!(words, vec![&b"a"[..], &b""[..], &b"b"[..]]);
    }

    #[test]
    fn parses_label_triples_and_id() {
        let record = parse("1 1:3:1.0 1:5:2.0 2:9:0.5%imp-42").unwrap();
        assert_eq!(record.label, 1.0);
        assert_eq!(
            record.features,
            vec![
                FeatureTriple::new(0, 2, 1.0),
                FeatureTriple::new(0, 4, 2.0),
                FeatureTriple::new(1, 8, 0.5),
            ]
        );
        assert_eq!(record.id.as_deref(), Some("imp-42"));
    }

    #[test]
    fn id_is_trimmed() {
        let record = parse("0 1:1:1 %  abc  \n").unwrap();
        assert_eq!(record.id.as_deref(), Some("abc"));
        assert_eq!(record.features.len(), 1);
    }

    #[test]
    fn repeated_id_separator_means_no_id() {
        let record = parse("0 1:1:1%a%b").unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.features, vec![FeatureTriple::new(0, 0, 1.0)]);
    }

    #[test]
    fn label_only_line_is_valid() {
        let record = parse("0.5").unwrap();
        assert_eq!(record.label, 0.5);
        assert!(record.features.is_empty());
        assert_eq!(record.id, None);
    }

    #[test]
    fn empty_tokens_are_skipped() {
        let parser = LineParser::new(ColumnSeparator::Byte(b' '), b'%');
        let record = parser.parse(b"1  2:2:1.5   3:1:2\r\n").unwrap();
        assert_eq!(
            record.features,
            vec![FeatureTriple::new(1, 1, 1.5), FeatureTriple::new(2, 0, 2.0)]
        );
    }

    #[test]
    fn custom_separators() {
        let parser = LineParser::new(ColumnSeparator::Byte(b','), b'#');
        let record = parser.parse(b"-1,1:7:0.25,,2:1:1#row9").unwrap();
        assert_eq!(record.label, -1.0);
        assert_eq!(
            record.features,
            vec![FeatureTriple::new(0, 6, 0.25), FeatureTriple::new(1, 0, 1.0)]
        );
        assert_eq!(record.id.as_deref(), Some("row9"));
    }

    #[test]
    fn malformed_tokens_are_format_errors() {
        for line in &[
            "1 abc:1:1.0",
            "1 1:2",
            "1 1:2:",
            "1 1:x:1",
            "1 1:2:w",
            "1 1:2:3:4",
            "1 0:2:1",
            "1 1:0:1",
            "1 -1:2:1",
            "x 1:2:1",
            "",
            "   ",
            "%id",
        ] {
            let err = parse(line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{:?}", line);
        }
    }

    #[test]
    fn oversized_indices_are_range_errors() {
        for line in &[
            "1 4294967297:1:1",
            "1 1:18446744073709551616:1",
            "1 1:99999999999999999999999:1",
        ] {
            let err = parse(line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Range, "{:?}", line);
        }
        let err = parse("1 4294967297:1:1").unwrap_err();
        assert_eq!(err.to_string(), "field 4294967297 out of range");
    }

    #[test]
    fn largest_indices_still_parse() {
        let record = parse("1 4294967296:18446744073709551615:1").unwrap();
        assert_eq!(
            record.features,
            vec![FeatureTriple::new(u32::MAX, u64::MAX - 1, 1.0)]
        );
    }

    #[test]
    fn non_utf8_id_is_rejected() {
        let err = LineParser::default().parse(b"1 1:1:1%\xff\xfe").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
