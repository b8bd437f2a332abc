//! Record decoding with an explicit outcome.
//!
//! Model output is untrusted and arrives in pieces. Instead of swallowing parse
//! errors, every attempt yields a [`DecodeOutcome`] that the streaming parsers
//! branch on.

use rext_types::{Annotation, ErrorRecord, RecordRejection};
use serde_json::{Map, Value};

/// Result of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome<T> {
    /// A complete, valid record.
    Decoded(T),
    /// The text ends before the value does; more input may complete it.
    Incomplete,
    /// The text is not valid JSON and no amount of additional input will fix it.
    Malformed,
    /// Valid JSON that does not have the record's shape.
    Rejected(RecordRejection),
}

/// A record type that can be built from a decoded JSON value.
pub trait FromRecord: Sized {
    fn from_record(value: Value) -> Result<Self, RecordRejection>;
}

impl FromRecord for Annotation {
    fn from_record(value: Value) -> Result<Self, RecordRejection> {
        let Value::Object(map) = value else {
            return Err(RecordRejection::NotAnObject);
        };
        let line = positive_u32(&map, "line")?;
        let suggestion = string_field(&map, "suggestion")?;
        Annotation::new(line, suggestion)
    }
}

impl FromRecord for ErrorRecord {
    fn from_record(value: Value) -> Result<Self, RecordRejection> {
        let Value::Object(map) = value else {
            return Err(RecordRejection::NotAnObject);
        };
        let line = positive_u32(&map, "line")?;
        let column = positive_u32(&map, "column")?;
        let message = string_field(&map, "message")?;
        ErrorRecord::new(line, column, message)
    }
}

fn required<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, RecordRejection> {
    match map.get(field) {
        None | Some(Value::Null) => Err(RecordRejection::MissingField(field)),
        Some(value) => Ok(value),
    }
}

/// Positive integer; integral floats such as `2.0` are accepted.
fn positive_u32(map: &Map<String, Value>, field: &'static str) -> Result<u32, RecordRejection> {
    let value = required(map, field)?;
    let number = match value.as_u64() {
        Some(n) => Some(n),
        None => value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
            .map(|f| f as u64),
    };
    number
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or(RecordRejection::InvalidField(field))
}

fn string_field(map: &Map<String, Value>, field: &'static str) -> Result<String, RecordRejection> {
    match required(map, field)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(RecordRejection::InvalidField(field)),
    }
}

fn classify<T: FromRecord>(value: Value) -> DecodeOutcome<T> {
    match T::from_record(value) {
        Ok(record) => DecodeOutcome::Decoded(record),
        Err(rejection) => DecodeOutcome::Rejected(rejection),
    }
}

/// Decode `text` as exactly one JSON value (surrounding whitespace allowed).
#[must_use]
pub fn decode_exact<T: FromRecord>(text: &str) -> DecodeOutcome<T> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => classify(value),
        Err(e) if e.is_eof() => DecodeOutcome::Incomplete,
        Err(_) => DecodeOutcome::Malformed,
    }
}

/// Decode the first JSON value at the start of `text` (after leading whitespace).
///
/// Returns the outcome and the number of bytes the value occupied, including the
/// leading whitespace. The byte count is only meaningful for `Decoded` and
/// `Rejected`; trailing text after the value is left for the caller.
#[must_use]
pub fn decode_prefix<T: FromRecord>(text: &str) -> (DecodeOutcome<T>, usize) {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => (classify(value), values.byte_offset()),
        Some(Err(e)) if e.is_eof() => (DecodeOutcome::Incomplete, 0),
        Some(Err(_)) => (DecodeOutcome::Malformed, 0),
        None => (DecodeOutcome::Incomplete, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeOutcome, decode_exact, decode_prefix};
    use rext_types::{Annotation, ErrorRecord, RecordRejection};

    #[test]
    fn decodes_annotation() {
        let outcome = decode_exact::<Annotation>(r#"{ "line": 1, "suggestion": "a" }"#);
        assert_eq!(
            outcome,
            DecodeOutcome::Decoded(Annotation::new(1, "a").unwrap())
        );
    }

    #[test]
    fn missing_suggestion_is_rejected() {
        let outcome = decode_exact::<Annotation>(r#"{ "line": 1 }"#);
        assert_eq!(
            outcome,
            DecodeOutcome::Rejected(RecordRejection::MissingField("suggestion"))
        );
    }

    #[test]
    fn null_field_counts_as_missing() {
        let outcome = decode_exact::<Annotation>(r#"{ "line": null, "suggestion": "a" }"#);
        assert_eq!(
            outcome,
            DecodeOutcome::Rejected(RecordRejection::MissingField("line"))
        );
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert_eq!(
            decode_exact::<Annotation>(r#"{ "line": "2", "suggestion": "a" }"#),
            DecodeOutcome::Rejected(RecordRejection::InvalidField("line"))
        );
        assert_eq!(
            decode_exact::<Annotation>(r#"{ "line": 2, "suggestion": 7 }"#),
            DecodeOutcome::Rejected(RecordRejection::InvalidField("suggestion"))
        );
        assert_eq!(
            decode_exact::<Annotation>(r#"{ "line": 2.5, "suggestion": "a" }"#),
            DecodeOutcome::Rejected(RecordRejection::InvalidField("line"))
        );
        assert_eq!(
            decode_exact::<Annotation>("[1, 2]"),
            DecodeOutcome::Rejected(RecordRejection::NotAnObject)
        );
    }

    #[test]
    fn integral_float_line_is_accepted() {
        let outcome = decode_exact::<Annotation>(r#"{ "line": 4.0, "suggestion": "a" }"#);
        assert_eq!(
            outcome,
            DecodeOutcome::Decoded(Annotation::new(4, "a").unwrap())
        );
    }

    #[test]
    fn truncated_text_is_incomplete() {
        assert_eq!(
            decode_exact::<Annotation>(r#"{ "line": 1, "suggestion": "use {}"#),
            DecodeOutcome::Incomplete
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            decode_exact::<Annotation>("{ line: 1 }"),
            DecodeOutcome::Malformed
        );
        assert_eq!(
            decode_exact::<Annotation>(r#"{ "line": 1, "suggestion": "a" } trailing"#),
            DecodeOutcome::Malformed
        );
    }

    #[test]
    fn error_record_requires_truthy_column() {
        assert_eq!(
            decode_exact::<ErrorRecord>(r#"{"line": 3, "column": 0, "message": "X"}"#),
            DecodeOutcome::Rejected(RecordRejection::InvalidField("column"))
        );
        assert_eq!(
            decode_exact::<ErrorRecord>(r#"{"line": 3, "column": 10, "message": "X"}"#),
            DecodeOutcome::Decoded(ErrorRecord::new(3, 10, "X").unwrap())
        );
    }

    #[test]
    fn prefix_reports_consumed_bytes() {
        let text = r#"  {"line": 1, "suggestion": "a"}{"line": 2"#;
        let (outcome, consumed) = decode_prefix::<Annotation>(text);
        assert_eq!(
            outcome,
            DecodeOutcome::Decoded(Annotation::new(1, "a").unwrap())
        );
        assert_eq!(&text[consumed..], r#"{"line": 2"#);
    }

    #[test]
    fn prefix_of_partial_value_is_incomplete() {
        let (outcome, consumed) = decode_prefix::<Annotation>(r#"{"line": 1, "sugg"#);
        assert_eq!(outcome, DecodeOutcome::Incomplete);
        assert_eq!(consumed, 0);
    }
}
