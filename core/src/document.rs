//! Document access and the line extractor.
//!
//! The host editor owns the real text buffer; the core only reads it through
//! [`Document`]. [`TextDocument`] is the in-memory implementation used by the
//! terminal host and by tests.

use std::fmt::Write;

use rext_types::{LineRecord, Viewport};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("line index {index} is out of range (document has {line_count} lines)")]
    LineOutOfRange { index: usize, line_count: usize },
}

/// Read access to a live text buffer, addressed by zero-based line index.
pub trait Document {
    fn line_count(&self) -> usize;

    /// Raw text of the line at `index`, without its line terminator.
    fn line_at(&self, index: usize) -> Result<&str, DocumentError>;
}

/// Line-oriented in-memory document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<String>,
}

impl TextDocument {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split `text` on `\n` / `\r\n`. A trailing newline does not add an empty line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl<S: Into<String>> FromIterator<S> for TextDocument {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_at(&self, index: usize) -> Result<&str, DocumentError> {
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or(DocumentError::LineOutOfRange {
                index,
                line_count: self.lines.len(),
            })
    }
}

/// Lines of `viewport` in ascending order, numbered from 1.
pub fn line_records<D>(document: &D, viewport: Viewport) -> Result<Vec<LineRecord>, DocumentError>
where
    D: Document + ?Sized,
{
    viewport
        .indices()
        .map(|index| {
            Ok(LineRecord {
                number: index + 1,
                text: document.line_at(index)?.to_string(),
            })
        })
        .collect()
}

/// The review subject sent to the model: one `"<n>: <text> \n"` entry per line.
pub fn visible_code_with_line_numbers<D>(
    document: &D,
    viewport: Viewport,
) -> Result<String, DocumentError>
where
    D: Document + ?Sized,
{
    tracing::debug!(
        start = viewport.start(),
        end = viewport.end(),
        "Extracting visible code"
    );

    let mut code = String::new();
    for index in viewport.indices() {
        let text = document.line_at(index)?;
        let _ = writeln!(code, "{}: {text} ", index + 1);
    }
    Ok(code)
}
