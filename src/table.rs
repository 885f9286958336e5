//! Markdown table rows.
//!
//! Catalogs kept as Markdown carry one entry per table row:
//!
//! ```text
//! | Alternative              | Replaces | Notes          |
//! |--------------------------|----------|----------------|
//! | [Tuta](https://tuta.com) | Gmail    | Encrypted mail |
//! ```
//!
//! The first cell names the entry and the remaining cells are joined into
//! its description. Delimiter rows, the header row above each delimiter,
//! and rows with fewer than two non-empty cells are skipped.

use crate::fields::ExtractedFields;
use crate::models::{Field, FieldValue};

/// A `|---|:---:|` style row.
pub fn is_delimiter_row(line: &str) -> bool {
    let line = line.trim();
    line.contains('|')
        && line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

pub fn has_table(text: &str) -> bool {
    text.lines().any(is_delimiter_row)
}

/// Trimmed, non-empty cells of every data row, in document order.
pub fn table_rows(text: &str) -> Vec<Vec<&str>> {
    let lines: Vec<&str> = text.lines().collect();
    lines
        .iter()
        .enumerate()
        .filter(|&(i, line)| {
            line.contains('|')
                && !is_delimiter_row(line)
                && !lines.get(i + 1).is_some_and(|next| is_delimiter_row(next))
        })
        .map(|(_, line)| cells(line))
        .filter(|cells| cells.len() >= 2)
        .collect()
}

fn cells(line: &str) -> Vec<&str> {
    line.split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Fields of one row: identity (and link, for `[name](url)` cells) from
/// the first cell, description from the rest joined with ` | `.
pub fn row_fields(cells: &[&str]) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    let Some((first, rest)) = cells.split_first() else {
        return fields;
    };

    let (name, link) = split_link(first);
    if !name.is_empty() {
        fields.set(Field::Identity, FieldValue::Scalar(name.to_string()));
    }
    if let Some(link) = link {
        fields.set(Field::Link, FieldValue::Scalar(link.to_string()));
    }
    if !rest.is_empty() {
        fields.set(Field::Description, FieldValue::Scalar(rest.join(" | ")));
    }
    fields
}

/// `**[Tuta](https://tuta.com)**` → (`Tuta`, `https://tuta.com`).
fn split_link(cell: &str) -> (&str, Option<&str>) {
    let cell = cell.trim_matches(|c| c == '*' || c == '_').trim();
    let parsed = cell
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(')'))
        .and_then(|inner| inner.split_once("]("));
    match parsed {
        Some((name, url)) => {
            let url = url.trim();
            (name.trim(), (!url.is_empty()).then_some(url))
        }
        None => (cell, None),
    }
}
