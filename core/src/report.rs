//! Static rendering of a finished review.

use std::fmt::Write;

use rext_types::{ErrorRecord, ViewColumn};
use unicode_width::UnicodeWidthStr;

/// Title of the review panel.
pub const REPORT_TITLE: &str = "Code Review";

/// A panel that displays an HTML document.
pub trait Panel {
    fn set_html(&mut self, html: String);
}

/// Panel side of the host editor.
pub trait PanelHost {
    type Panel: Panel;

    fn create_panel(&mut self, title: &str, column: ViewColumn) -> Self::Panel;
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <style>
        body { font-family: sans-serif; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ccc; padding: 8px; }
        th { background: #383838; }
    </style>
</head>
<body>
    <h2>Code Errors</h2>
    <table>
        <thead>
            <tr>
                <th>Line</th>
                <th>Column</th>
                <th>Error</th>
            </tr>
        </thead>
        <tbody>
"#;

const PAGE_TAIL: &str = r"        </tbody>
    </table>
</body>
</html>
";

/// HTML page with one table row per record, in list order.
#[must_use]
pub fn render_html(errors: &[ErrorRecord]) -> String {
    let mut html = String::from(PAGE_HEAD);
    for error in errors {
        let _ = writeln!(
            html,
            "            <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            error.line(),
            error.column(),
            escape_html(error.message())
        );
    }
    html.push_str(PAGE_TAIL);
    html
}

/// Plain-text table for terminal hosts.
#[must_use]
pub fn render_text(errors: &[ErrorRecord]) -> String {
    const HEADERS: [&str; 3] = ["Line", "Column", "Error"];

    if errors.is_empty() {
        return "No errors found.\n".to_string();
    }

    let rows: Vec<[String; 3]> = errors
        .iter()
        .map(|e| {
            [
                e.line().to_string(),
                e.column().to_string(),
                e.message().to_string(),
            ]
        })
        .collect();

    let width = |col: usize| {
        rows.iter()
            .map(|row| row[col].width())
            .chain(std::iter::once(HEADERS[col].width()))
            .max()
            .unwrap_or(0)
    };
    let (line_w, column_w) = (width(0), width(1));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<line_w$}  {:<column_w$}  {}",
        HEADERS[0], HEADERS[1], HEADERS[2]
    );
    let _ = writeln!(
        out,
        "{}  {}  {}",
        "-".repeat(line_w),
        "-".repeat(column_w),
        "-".repeat(HEADERS[2].len())
    );
    for [line, column, message] in &rows {
        let _ = writeln!(out, "{line:>line_w$}  {column:>column_w$}  {message}");
    }
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{render_html, render_text};
    use pretty_assertions::assert_eq;
    use rext_types::ErrorRecord;

    fn record(line: u32, column: u32, message: &str) -> ErrorRecord {
        ErrorRecord::new(line, column, message).unwrap()
    }

    #[test]
    fn html_has_one_row_per_record_in_order() {
        let html = render_html(&[record(3, 10, "first"), record(1, 2, "second")]);
        assert_eq!(html.matches("<tr><td>").count(), 2);
        let first = html.find("first").unwrap();
        let second = html.find("second").unwrap();
        assert!(first < second);
        assert!(html.contains("<tr><td>3</td><td>10</td><td>first</td></tr>"));
        assert!(html.contains("<h2>Code Errors</h2>"));
    }

    #[test]
    fn html_escapes_messages() {
        let html = render_html(&[record(1, 1, "<script>alert('x')</script> & co")]);
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; co"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn empty_html_has_no_rows() {
        let html = render_html(&[]);
        assert!(html.contains("<tbody>"));
        assert!(!html.contains("<tr><td>"));
    }

    #[test]
    fn text_table_aligns_columns() {
        let text = render_text(&[record(3, 10, "X"), record(12, 1, "Y")]);
        assert_eq!(
            text,
            "Line  Column  Error\n----  ------  -----\n   3      10  X\n  12       1  Y\n"
        );
    }

    #[test]
    fn empty_text_table() {
        assert_eq!(render_text(&[]), "No errors found.\n");
    }
}
