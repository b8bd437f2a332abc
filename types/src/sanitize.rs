//! Display sanitization for untrusted model text.
//!
//! Suggestions and error messages come straight from a language model and are
//! shown by terminal hosts. Escape sequences in that text could move the cursor,
//! rewrite the screen, or reach the clipboard (OSC 52), so they are stripped
//! before display.

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';
const C1_CSI: char = '\u{009b}';

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Text,
    /// Just saw ESC.
    Escape,
    /// Inside `ESC [` (or C1 CSI) parameters, until a final byte `@`..=`~`.
    Csi,
    /// Inside `ESC ]`, `ESC P`, `ESC ^` or `ESC _`, until BEL or `ESC \`.
    String { saw_esc: bool },
}

/// Strip ANSI escape sequences and control characters other than `\n` and `\t`.
///
/// Returns `Cow::Borrowed` when the input is already clean.
///
/// ```
/// use rext_types::sanitize_display_text;
///
/// assert_eq!(sanitize_display_text("plain"), "plain");
/// assert_eq!(sanitize_display_text("a\x1b[2Jb"), "ab");
/// ```
#[must_use]
pub fn sanitize_display_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_unsafe) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut state = Scan::Text;

    for c in input.chars() {
        state = match state {
            Scan::Text => match c {
                ESC => Scan::Escape,
                C1_CSI => Scan::Csi,
                c if is_unsafe(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Escape => match c {
                '[' => Scan::Csi,
                ']' | 'P' | '^' | '_' => Scan::String { saw_esc: false },
                // Two-character sequence: the introducer is dropped with ESC.
                _ => Scan::Text,
            },
            Scan::Csi => {
                if ('@'..='~').contains(&c) {
                    Scan::Text
                } else {
                    Scan::Csi
                }
            }
            Scan::String { saw_esc } => match c {
                BEL => Scan::Text,
                '\\' if saw_esc => Scan::Text,
                ESC => Scan::String { saw_esc: true },
                _ => Scan::String { saw_esc: false },
            },
        };
    }

    Cow::Owned(out)
}

fn is_unsafe(c: char) -> bool {
    match c {
        '\n' | '\t' => false,
        c if c <= '\x1f' => true,
        '\x7f' => true,
        c => ('\u{0080}'..='\u{009f}').contains(&c),
    }
}
