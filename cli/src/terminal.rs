//! A read-only terminal editor: prints the visible lines with their decorations.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use unicode_width::UnicodeWidthStr;

use rext_core::{DecorationHost, Document, DocumentError, TextDocument};
use rext_engine::EditorHost;
use rext_types::{DecorationPlacement, DecorationStyle, Viewport, sanitize_display_text};

/// Handle of one decoration drawn by [`TerminalEditor`].
#[derive(Debug, PartialEq, Eq)]
pub struct DecorationHandle(u64);

#[derive(Debug)]
struct Drawn {
    style: DecorationStyle,
    placements: Vec<DecorationPlacement>,
}

#[derive(Debug)]
pub struct TerminalEditor {
    document: TextDocument,
    visible: Viewport,
    decorations: BTreeMap<u64, Drawn>,
    next: u64,
}

impl TerminalEditor {
    pub fn new(document: TextDocument, visible: Viewport) -> Self {
        Self {
            document,
            visible,
            decorations: BTreeMap::new(),
            next: 0,
        }
    }

    /// Trailing texts anchored on line `index`, in creation order.
    fn trailing(&self, index: usize) -> impl Iterator<Item = (&DecorationStyle, &str)> {
        self.decorations.values().flat_map(move |drawn| {
            drawn
                .placements
                .iter()
                .filter(move |p| p.range.start.line == index)
                .map(move |p| (&drawn.style, p.hover_text.as_str()))
        })
    }

    /// Print the visible lines, each followed by its inline previews, then the
    /// full text of every suggestion.
    pub fn render<W: Write>(&self, out: &mut W, color: bool) -> io::Result<()> {
        let gutter = self.visible.end().to_string().width();
        let mut notes = Vec::new();

        for index in self.visible.indices() {
            let text = self.document.line_at(index).unwrap_or_default();
            queue!(
                out,
                Print(format!("{:>gutter$} | {}", index + 1, sanitize_display_text(text)))
            )?;
            for (style, hover) in self.trailing(index) {
                let after = sanitize_display_text(&style.after_text);
                if color {
                    queue!(
                        out,
                        SetForegroundColor(parse_color(&style.color)),
                        Print(after),
                        ResetColor
                    )?;
                } else {
                    queue!(out, Print(after))?;
                }
                notes.push((index + 1, hover));
            }
            queue!(out, Print("\n"))?;
        }

        if !notes.is_empty() {
            queue!(out, Print("\nSuggestions:\n"))?;
            for (line, hover) in notes {
                queue!(
                    out,
                    Print(format!("  {line:>gutter$}: {}\n", sanitize_display_text(hover)))
                )?;
            }
        }
        out.flush()
    }

    #[cfg(test)]
    fn live(&self) -> usize {
        self.decorations.len()
    }
}

/// Host color name to a terminal color; unknown names fall back to grey.
fn parse_color(name: &str) -> Color {
    match name.trim().to_ascii_lowercase().as_str() {
        "grey" | "gray" => Color::Grey,
        "darkgrey" | "darkgray" => Color::DarkGrey,
        other => Color::try_from(other).unwrap_or(Color::Grey),
    }
}

impl Document for TerminalEditor {
    fn line_count(&self) -> usize {
        self.document.line_count()
    }

    fn line_at(&self, index: usize) -> Result<&str, DocumentError> {
        self.document.line_at(index)
    }
}

impl DecorationHost for TerminalEditor {
    type Handle = DecorationHandle;

    fn create_decoration(&mut self, style: DecorationStyle) -> DecorationHandle {
        let id = self.next;
        self.next += 1;
        self.decorations.insert(
            id,
            Drawn {
                style,
                placements: Vec::new(),
            },
        );
        DecorationHandle(id)
    }

    fn set_decorations(&mut self, handle: &DecorationHandle, placements: Vec<DecorationPlacement>) {
        if let Some(drawn) = self.decorations.get_mut(&handle.0) {
            drawn.placements = placements;
        }
    }

    fn dispose_decoration(&mut self, handle: DecorationHandle) {
        self.decorations.remove(&handle.0);
    }
}

impl EditorHost for TerminalEditor {
    fn visible_range(&self) -> Viewport {
        self.visible
    }
}
