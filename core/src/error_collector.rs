//! Line-oriented collection of review errors with duplicate suppression.
//!
//! The review prompt asks for one JSON object per line, so records are decoded
//! line by line rather than by brace scanning. Completed lines are decoded once
//! and dropped from the buffer; the trailing unterminated line is re-attempted
//! after every fragment so a final record without a newline is still seen.
//! Because a record that decodes while partial can only reappear unchanged once
//! its line completes, the identity set keeps the output identical to a full
//! re-scan of the accumulated text.

use std::collections::HashSet;

use rext_types::{ErrorKey, ErrorRecord};

use crate::decode::{DecodeOutcome, decode_exact};

/// Accumulates [`ErrorRecord`]s for one review pass.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    buffer: String,
    seen: HashSet<ErrorKey>,
    records: Vec<ErrorRecord>,
    duplicates: usize,
}

impl ErrorCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment; returns how many new records it produced.
    pub fn push(&mut self, fragment: &str) -> usize {
        let before = self.records.len();
        self.buffer.push_str(fragment);

        let mut consumed = 0;
        while let Some(newline) = self.buffer[consumed..].find('\n') {
            let line = &self.buffer[consumed..consumed + newline];
            consider(line, &mut self.seen, &mut self.records, &mut self.duplicates);
            consumed += newline + 1;
        }
        self.buffer.drain(..consumed);

        consider(
            &self.buffer,
            &mut self.seen,
            &mut self.records,
            &mut self.duplicates,
        );

        self.records.len() - before
    }

    /// Records collected so far, in first-seen order.
    #[must_use]
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// End of stream: the finished, ordered, de-duplicated list.
    pub fn finish(self) -> Vec<ErrorRecord> {
        tracing::debug!(
            records = self.records.len(),
            duplicates = self.duplicates,
            "Review response collected"
        );
        self.records
    }
}

fn consider(
    line: &str,
    seen: &mut HashSet<ErrorKey>,
    records: &mut Vec<ErrorRecord>,
    duplicates: &mut usize,
) {
    let line = line.trim();
    if !line.starts_with('{') {
        return;
    }

    match decode_exact::<ErrorRecord>(line) {
        DecodeOutcome::Decoded(record) => {
            if seen.insert(record.key()) {
                records.push(record);
            } else {
                *duplicates += 1;
            }
        }
        DecodeOutcome::Rejected(reason) => {
            tracing::debug!(%reason, "Skipping review record");
        }
        DecodeOutcome::Incomplete | DecodeOutcome::Malformed => {}
    }
}
