//! Streaming review core for rext.
//!
//! Turns an incrementally arriving model response into validated records and
//! manages the inline decorations they become.
//!
//! - [`document`] - document access and the line extractor
//! - [`decode`] - JSON record decoding with an explicit outcome type
//! - [`annotation_parser`] - brace-delimited incremental annotation extraction
//! - [`error_collector`] - line-delimited error collection with deduplication
//! - [`decorations`] - decoration lifecycle for one editor
//! - [`report`] - static rendering of a finished review
//!
//! Nothing here performs IO or awaits; the async pass loops live in `rext-engine`.

pub mod annotation_parser;
pub mod decode;
pub mod decorations;
pub mod document;
pub mod error_collector;
pub mod report;

pub use annotation_parser::{AnnotationParser, ParseStats};
pub use decode::{DecodeOutcome, FromRecord};
pub use decorations::{
    ApplyError, DecorationHost, DecorationId, DecorationManager, DecorationOptions,
};
pub use document::{
    Document, DocumentError, TextDocument, line_records, visible_code_with_line_numbers,
};
pub use error_collector::ErrorCollector;
pub use report::{Panel, PanelHost, REPORT_TITLE, render_html, render_text};

pub use rext_types;
