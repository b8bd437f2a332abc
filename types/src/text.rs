//! Small pure text helpers.

const ELLIPSIS: &str = "...";

/// Keep the first `take` characters of `raw` and always append `...`.
///
/// The ellipsis marks the text as a preview of a longer payload, so it is added
/// even when nothing was cut. Counts `char`s, never splitting a scalar value.
#[must_use]
pub fn preview_with_ellipsis(raw: &str, take: usize) -> String {
    let mut preview: String = raw.chars().take(take).collect();
    preview.push_str(ELLIPSIS);
    preview
}
