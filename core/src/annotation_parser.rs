//! Incremental extraction of annotations from a model's text stream.
//!
//! Fragments are appended to a parse buffer. After every append the parser looks
//! for the last `}` in the buffer and treats everything before it as a
//! candidate: complete records are emitted in source order and removed from
//! the buffer, while text after the last brace (a record still being written)
//! stays buffered for the next fragment.
//!
//! ```text
//! buffer:  ..prose..{"line":2,...}{"line":5,"sugg
//!          |------- candidate ---||-- kept ----|
//! ```
//!
//! Within the candidate each value is classified by [`DecodeOutcome`]:
//!
//! | Outcome      | Buffer effect                                 |
//! |--------------|-----------------------------------------------|
//! | `Decoded`    | emitted, consumed                             |
//! | `Rejected`   | dropped (valid JSON, wrong shape), consumed   |
//! | `Malformed`  | skipped up to the next `{`                    |
//! | `Incomplete` | extraction stops; buffer kept from here on    |

use rext_types::Annotation;

use crate::decode::{DecodeOutcome, decode_prefix};

/// Counters for one streaming response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub fragments: usize,
    pub emitted: usize,
    pub rejected: usize,
    /// Bytes of non-record text skipped (prose, code fences, broken JSON).
    pub skipped_bytes: usize,
}

/// Parse buffer plus extraction state for one streaming response.
#[derive(Debug, Default)]
pub struct AnnotationParser {
    buffer: String,
    stats: ParseStats,
}

enum Step {
    Record(DecodeOutcome<Annotation>, usize),
    Skip(usize),
    Wait,
}

impl AnnotationParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every annotation it completed, in order.
    pub fn push(&mut self, fragment: &str) -> Vec<Annotation> {
        self.stats.fragments += 1;
        self.buffer.push_str(fragment);
        self.extract()
    }

    /// Text received but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// End of stream: whatever is still buffered is discarded.
    pub fn finish(self) -> ParseStats {
        if !self.buffer.trim().is_empty() {
            tracing::debug!(
                discarded_bytes = self.buffer.len(),
                "Discarding unterminated trailing model output"
            );
        }
        self.stats
    }

    fn extract(&mut self) -> Vec<Annotation> {
        let Some(last_close) = self.buffer.rfind('}') else {
            return Vec::new();
        };
        let candidate_end = last_close + 1;

        let mut annotations = Vec::new();
        let mut consumed = 0;

        while consumed < candidate_end {
            match next_step(&self.buffer[consumed..candidate_end]) {
                Step::Record(DecodeOutcome::Decoded(annotation), len) => {
                    self.stats.emitted += 1;
                    annotations.push(annotation);
                    consumed += len;
                }
                Step::Record(DecodeOutcome::Rejected(reason), len) => {
                    tracing::debug!(%reason, "Skipping model record");
                    self.stats.rejected += 1;
                    consumed += len;
                }
                Step::Record(DecodeOutcome::Incomplete | DecodeOutcome::Malformed, _)
                | Step::Wait => break,
                Step::Skip(len) => {
                    self.stats.skipped_bytes += len;
                    consumed += len;
                }
            }
        }

        self.buffer.drain(..consumed);
        annotations
    }
}

/// Classify the text at the start of `candidate`.
fn next_step(candidate: &str) -> Step {
    let body = candidate.trim_start();
    let leading = candidate.len() - body.len();

    if body.is_empty() {
        return Step::Skip(leading);
    }

    if !body.starts_with('{') {
        // Prose before the next record.
        return Step::Skip(leading + skip_to_next_open(body, 0));
    }

    match decode_prefix::<Annotation>(body) {
        (DecodeOutcome::Malformed, _) => {
            tracing::debug!("Skipping malformed record text");
            Step::Skip(leading + skip_to_next_open(body, 1))
        }
        (DecodeOutcome::Incomplete, _) => Step::Wait,
        (outcome, len) => Step::Record(outcome, leading + len),
    }
}

/// Offset of the next `{` at or after `from`, or the whole text if none.
fn skip_to_next_open(text: &str, from: usize) -> usize {
    text[from..]
        .find('{')
        .map_or(text.len(), |offset| from + offset)
}
