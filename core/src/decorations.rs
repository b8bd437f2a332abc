//! Decoration lifecycle for one editor.
//!
//! [`DecorationManager`] is the only owner of decoration handles between their
//! creation and disposal. Handles are returned to the host by value when
//! disposed, so each one is released exactly once; clearing an empty manager
//! is a no-op.

use rext_types::{
    Annotation, DecorationPlacement, DecorationStyle, Position, Range, preview_with_ellipsis,
};
use thiserror::Error;

use crate::document::Document;

/// Characters of the suggestion shown inline before the ellipsis.
pub const DEFAULT_PREVIEW_CHARS: usize = 25;
/// Host color of the inline preview.
pub const DEFAULT_DECORATION_COLOR: &str = "grey";

/// Rendering side of the host editor.
pub trait DecorationHost {
    /// Opaque host resource backing one decoration.
    type Handle;

    fn create_decoration(&mut self, style: DecorationStyle) -> Self::Handle;

    fn set_decorations(&mut self, handle: &Self::Handle, placements: Vec<DecorationPlacement>);

    /// Release the rendering resource. Takes the handle by value.
    fn dispose_decoration(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("annotation line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange { line: u32, line_count: usize },
}

/// Identifier of a decoration applied by a [`DecorationManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationId(u64);

/// How inline previews look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationOptions {
    pub preview_chars: usize,
    pub color: String,
}

impl Default for DecorationOptions {
    fn default() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
            color: DEFAULT_DECORATION_COLOR.to_string(),
        }
    }
}

#[derive(Debug)]
struct LiveDecoration<H> {
    id: DecorationId,
    line: u32,
    handle: H,
}

/// Live decorations of one editor session.
#[derive(Debug)]
pub struct DecorationManager<H> {
    options: DecorationOptions,
    live: Vec<LiveDecoration<H>>,
    last_applied: Option<DecorationId>,
    next_id: u64,
}

impl<H> Default for DecorationManager<H> {
    fn default() -> Self {
        Self::new(DecorationOptions::default())
    }
}

impl<H> DecorationManager<H> {
    #[must_use]
    pub fn new(options: DecorationOptions) -> Self {
        Self {
            options,
            live: Vec::new(),
            last_applied: None,
            next_id: 0,
        }
    }

    #[must_use]
    pub fn options(&self) -> &DecorationOptions {
        &self.options
    }

    /// Attach `annotation` at the end of its line.
    ///
    /// The inline text is a preview of the suggestion; the full text is the hover
    /// payload. Fails without creating anything when the line does not exist.
    pub fn apply_annotation<E>(
        &mut self,
        editor: &mut E,
        annotation: &Annotation,
    ) -> Result<DecorationId, ApplyError>
    where
        E: Document + DecorationHost<Handle = H>,
    {
        let index = annotation.line_index();
        let end_of_line = match editor.line_at(index) {
            Ok(text) => text.chars().count(),
            Err(_) => {
                return Err(ApplyError::LineOutOfRange {
                    line: annotation.line(),
                    line_count: editor.line_count(),
                });
            }
        };

        let style = DecorationStyle {
            after_text: format!(
                " {}",
                preview_with_ellipsis(annotation.suggestion(), self.options.preview_chars)
            ),
            color: self.options.color.clone(),
        };
        let placement = DecorationPlacement {
            range: Range::point(Position::new(index, end_of_line)),
            hover_text: annotation.suggestion().to_string(),
        };

        let handle = editor.create_decoration(style);
        editor.set_decorations(&handle, vec![placement]);

        let id = DecorationId(self.next_id);
        self.next_id += 1;
        self.live.push(LiveDecoration {
            id,
            line: annotation.line(),
            handle,
        });
        self.last_applied = Some(id);

        tracing::debug!(line = annotation.line(), "Applied annotation");
        Ok(id)
    }

    /// Dispose every tracked decoration. Returns how many were disposed.
    pub fn clear_all<D>(&mut self, host: &mut D) -> usize
    where
        D: DecorationHost<Handle = H>,
    {
        let disposed = self.live.len();
        for live in self.live.drain(..) {
            host.dispose_decoration(live.handle);
        }
        self.last_applied = None;
        if disposed > 0 {
            tracing::debug!(disposed, "Cleared decorations");
        }
        disposed
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// The most recently applied decoration, if it is still live.
    #[must_use]
    pub fn last_applied(&self) -> Option<DecorationId> {
        self.last_applied
    }

    /// 1-based lines of the live decorations, in application order.
    pub fn live_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.live.iter().map(|live| live.line)
    }

    #[must_use]
    pub fn contains(&self, id: DecorationId) -> bool {
        self.live.iter().any(|live| live.id == id)
    }
}

impl<H> Drop for DecorationManager<H> {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            tracing::warn!(
                live = self.live.len(),
                "Decoration manager dropped with live decorations"
            );
        }
    }
}
