//! Top-level literal block extraction.
//!
//! Carves a document into the object literals that sit directly inside its
//! enclosing list, e.g. every `{ ... }` in
//!
//! ```text
//! export const alternatives = [
//!   { name: "Proton Mail", replaces: ["Gmail"] },
//!   { name: "Tuta", replaces: ["Outlook"] },
//! ];
//! ```
//!
//! Blocks are emitted in document order, never overlap, and are always
//! brace-balanced. Deeper nesting stays inside its block verbatim.

use crate::models::RawBlock;
use crate::scanner::{matching_close, skip_trivia, Depth, Scanner};

/// Locate the `[` that opens the document's literal collection.
///
/// The marker is the first unquoted top-level `[` whose next character,
/// past whitespace and comments, is `{`. When `anchor` is given and present
/// in the text the search starts right after its first occurrence.
pub fn find_list_marker(text: &str, anchor: Option<&str>) -> Option<usize> {
    let start = anchor
        .filter(|a| !a.is_empty())
        .and_then(|a| text.find(a).map(|i| i + a.len()))
        .unwrap_or(0);

    Scanner::starting_at(text, start)
        .filter(|step| step.is_code() && step.ch == '[' && step.before == Depth::default())
        .find(|step| text[skip_trivia(text, step.end())..].starts_with('{'))
        .map(|step| step.offset)
}

/// Split `text` into its top-level object literals.
///
/// With a list marker the scan is limited to the list's interior; without
/// one the whole document is scanned. A block still open at the end of the
/// scanned region is discarded.
pub fn extract_blocks<'a>(text: &'a str, anchor: Option<&str>) -> Vec<RawBlock<'a>> {
    let (start, limit) = match find_list_marker(text, anchor) {
        Some(open) => (open + 1, matching_close(text, open).unwrap_or(text.len())),
        None => (0, text.len()),
    };

    let mut blocks = Vec::new();
    let mut open_at: Option<usize> = None;

    for step in Scanner::starting_at(text, start) {
        if step.offset >= limit {
            break;
        }
        if !step.is_code() {
            continue;
        }
        match step.ch {
            '{' if step.before.braces == 0 => open_at = Some(step.offset),
            '}' if step.before.braces == 1 => {
                if let Some(offset) = open_at.take() {
                    blocks.push(RawBlock {
                        offset,
                        text: &text[offset..step.end()],
                    });
                }
            }
            _ => {}
        }
    }

    blocks
}
