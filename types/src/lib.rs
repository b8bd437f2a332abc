//! Core domain types for rext.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the parsers in
//! `rext-core`, the transport in `rext-providers`, and the editor hosts.

#![allow(clippy::missing_errors_doc)]

mod sanitize;
mod text;

pub use sanitize::sanitize_display_text;
pub use text::preview_with_ellipsis;

use std::ops::Range as IndexRange;
use thiserror::Error;

// ============================================================================
// Viewport & Line Records
// ============================================================================

/// A contiguous range of zero-based line indices `[start, end)` over a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    start: usize,
    end: usize,
}

impl Viewport {
    /// Build a viewport. An `end` before `start` yields an empty viewport at `start`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Viewport covering every line of a document with `line_count` lines.
    #[must_use]
    pub fn whole(line_count: usize) -> Self {
        Self::new(0, line_count)
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Zero-based line indices covered by this viewport.
    #[must_use]
    pub fn indices(&self) -> IndexRange<usize> {
        self.start..self.end
    }
}

/// One source line of an extracted excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// 1-based line number.
    pub number: usize,
    pub text: String,
}

// ============================================================================
// Model Records
// ============================================================================

/// Why a structurally valid JSON value was not accepted as a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordRejection {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("record field `{0}` has the wrong type or value")]
    InvalidField(&'static str),
}

/// An inline suggestion for one line, produced by the annotate pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    line: u32,
    suggestion: String,
}

impl Annotation {
    /// `line` is 1-based and must be positive.
    pub fn new(line: u32, suggestion: impl Into<String>) -> Result<Self, RecordRejection> {
        if line == 0 {
            return Err(RecordRejection::InvalidField("line"));
        }
        Ok(Self {
            line,
            suggestion: suggestion.into(),
        })
    }

    /// 1-based line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// 0-based line index into the document.
    #[must_use]
    pub const fn line_index(&self) -> usize {
        (self.line - 1) as usize
    }

    #[must_use]
    pub fn suggestion(&self) -> &str {
        &self.suggestion
    }
}

/// An error reported by the review pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    line: u32,
    column: u32,
    message: String,
}

/// Identity of an [`ErrorRecord`] within one review pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorKey {
    line: u32,
    column: u32,
    message: String,
}

impl ErrorRecord {
    /// All three fields must be truthy: non-zero positions and a non-empty message.
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Result<Self, RecordRejection> {
        let message = message.into();
        if line == 0 {
            return Err(RecordRejection::InvalidField("line"));
        }
        if column == 0 {
            return Err(RecordRejection::InvalidField("column"));
        }
        if message.is_empty() {
            return Err(RecordRejection::InvalidField("message"));
        }
        Ok(Self {
            line,
            column,
            message,
        })
    }

    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn key(&self) -> ErrorKey {
        ErrorKey {
            line: self.line,
            column: self.column,
            message: self.message.clone(),
        }
    }
}

// ============================================================================
// Decoration Geometry
// ============================================================================

/// Zero-based position in a document, `character` counted in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// Half-open span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// A zero-width range at `at`.
    #[must_use]
    pub const fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Rendering style of a trailing inline decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationStyle {
    /// Text rendered after the end of the anchored line.
    pub after_text: String,
    /// Host color name for `after_text`.
    pub color: String,
}

/// Where a decoration is attached, plus its hover payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationPlacement {
    pub range: Range,
    pub hover_text: String,
}

/// Column of the editor area a panel opens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewColumn {
    Active,
    #[default]
    Beside,
}

// ============================================================================
// Streaming Events
// ============================================================================

/// Streaming event from the model transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text content delta.
    TextDelta(String),
    /// Stream completed.
    Done,
    /// Error occurred; no further events follow.
    Error(String),
}
