//! Declarative field extraction from raw blocks.
//!
//! Each canonical field is described by a [`FieldSpec`]: an ordered list of
//! accepted key names and the [`FieldKind`] that decides how the value after
//! the colon is read. Adding a key variant is a data change, never new
//! control flow.
//!
//! Keys are only recognised at the block's own top level and outside string
//! literals, either bare (`name:`) or quoted (`"name":`). Matching is ASCII
//! case-insensitive.
//!
//! Extraction never fails; anything that cannot be read is
//! [`FieldValue::Absent`].

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::{Field, FieldValue, RawBlock};
use crate::scanner::{is_quote, matching_close, skip_trivia, string_end, Depth, Scanner};

/// How the text following a key is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A quoted string immediately after the colon.
    Scalar,
    /// A bracketed list of quoted strings, or a single quoted string.
    List,
    /// A quoted string, else the first quoted string inside the raw value
    /// (covers wrappers such as `t("...")`).
    Fallback,
    /// A quoted string, else the raw unquoted token (numbers, identifiers).
    Bare,
}

/// Extraction rule for one canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    /// Accepted keys in priority order.
    pub synonyms: Vec<String>,
    pub kind: FieldKind,
    /// Collapse internal whitespace runs to a single space.
    pub collapse_whitespace: bool,
}

impl FieldSpec {
    pub fn new(field: Field, synonyms: &[&str], kind: FieldKind) -> Self {
        Self {
            field,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            kind,
            collapse_whitespace: false,
        }
    }

    pub fn collapsed(mut self) -> Self {
        self.collapse_whitespace = true;
        self
    }

    /// Read this field from a block.
    ///
    /// Synonyms are tried in order. The first one present with a readable
    /// value wins, even when a later synonym appears earlier in the text.
    pub fn extract(&self, block: &RawBlock<'_>) -> FieldValue {
        for key in &self.synonyms {
            let Some(value_at) = find_key(block.text, key) else {
                continue;
            };
            let value = read_value(block.text, value_at, self.kind, self.collapse_whitespace);
            if !value.is_absent() {
                return value;
            }
        }
        FieldValue::Absent
    }
}

/// The full set of field rules applied to every block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    specs: Vec<FieldSpec>,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self {
            specs: vec![
                FieldSpec::new(
                    Field::Identity,
                    &["name", "title", "service"],
                    FieldKind::Fallback,
                ),
                FieldSpec::new(
                    Field::Aliases,
                    &["replaces", "replacesServices", "alternativeTo", "alternatives"],
                    FieldKind::List,
                ),
                FieldSpec::new(
                    Field::Description,
                    &["description", "desc", "summary"],
                    FieldKind::Scalar,
                )
                .collapsed(),
                FieldSpec::new(
                    Field::Link,
                    &["url", "website", "link", "homepage"],
                    FieldKind::Fallback,
                ),
                FieldSpec::new(
                    Field::Category,
                    &["category", "categoryId", "group"],
                    FieldKind::Scalar,
                ),
                FieldSpec::new(Field::Rank, &["rank", "score", "rating"], FieldKind::Bare),
            ],
        }
    }
}

impl FieldSet {
    /// Default rules with the synonym lists of some fields replaced.
    pub fn with_synonyms(overrides: &HashMap<Field, Vec<String>>) -> Self {
        let mut set = Self::default();
        for spec in &mut set.specs {
            if let Some(keys) = overrides.get(&spec.field) {
                spec.synonyms = keys.clone();
            }
        }
        set
    }

    pub fn get(&self, field: Field) -> Option<&FieldSpec> {
        self.specs.iter().find(|s| s.field == field)
    }

    /// Apply every rule to `block`.
    pub fn extract(&self, block: &RawBlock<'_>) -> ExtractedFields {
        ExtractedFields {
            values: self
                .specs
                .iter()
                .map(|spec| (spec.field, spec.extract(block)))
                .collect(),
        }
    }
}

/// Values read from one block, keyed by canonical field.
///
/// Only lives between extraction and normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    values: HashMap<Field, FieldValue>,
}

impl ExtractedFields {
    pub fn get(&self, field: Field) -> &FieldValue {
        const ABSENT: &FieldValue = &FieldValue::Absent;
        self.values.get(&field).unwrap_or(ABSENT)
    }

    pub fn take(&mut self, field: Field) -> FieldValue {
        self.values.remove(&field).unwrap_or_default()
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Byte offset just past the colon following `key`, if `key` appears as a
/// top-level key of the block.
fn find_key(text: &str, key: &str) -> Option<usize> {
    if key.is_empty() {
        return None;
    }
    let mut prev: Option<char> = None;
    let mut prev_in_string = false;

    for step in Scanner::new(text) {
        let at_top = step.before.braces == 1 && !step.in_comment;
        let candidate = if !at_top {
            None
        } else if !step.in_string {
            let boundary = prev.map_or(true, |p| !is_ident_char(p));
            if boundary {
                key_end(text, step.offset, key, None)
            } else {
                None
            }
        } else if !prev_in_string && is_quote(step.ch) {
            key_end(text, step.end(), key, Some(step.ch))
        } else {
            None
        };

        if let Some(after_key) = candidate {
            let colon = skip_trivia(text, after_key);
            if text[colon..].starts_with(':') {
                return Some(colon + 1);
            }
        }

        prev = Some(step.ch);
        prev_in_string = step.in_string;
    }
    None
}

/// If `key` starts at `at`, the offset where the key token ends.
fn key_end(text: &str, at: usize, key: &str, quote: Option<char>) -> Option<usize> {
    let slice = text.get(at..at + key.len())?;
    if !slice.eq_ignore_ascii_case(key) {
        return None;
    }
    let end = at + key.len();
    let next = text[end..].chars().next();
    match quote {
        Some(q) if next == Some(q) => Some(end + q.len_utf8()),
        Some(_) => None,
        None if next.map_or(true, |c| !is_ident_char(c)) => Some(end),
        None => None,
    }
}

fn read_value(text: &str, at: usize, kind: FieldKind, collapse: bool) -> FieldValue {
    let at = skip_trivia(text, at);
    let scalar = || quoted_at(text, at, collapse).map(FieldValue::Scalar);

    let value = match kind {
        FieldKind::Scalar => scalar(),
        FieldKind::List => list_at(text, at, collapse)
            .map(FieldValue::List)
            .or_else(|| quoted_at(text, at, collapse).map(|s| FieldValue::List(vec![s]))),
        FieldKind::Fallback => scalar().or_else(|| {
            let raw = raw_token(text, at);
            first_quoted(raw, collapse).map(FieldValue::Scalar)
        }),
        FieldKind::Bare => scalar().or_else(|| {
            let raw = raw_token(text, at).trim();
            (!raw.is_empty()).then(|| FieldValue::Scalar(raw.to_string()))
        }),
    };
    value.unwrap_or(FieldValue::Absent)
}

/// The cleaned contents of the string literal opening at `at`.
fn quoted_at(text: &str, at: usize, collapse: bool) -> Option<String> {
    let quote = text.get(at..)?.chars().next()?;
    let end = string_end(text, at)?;
    clean(&text[at + quote.len_utf8()..end], quote, collapse)
}

/// Every non-empty string literal inside the `[...]` opening at `at`.
fn list_at(text: &str, at: usize, collapse: bool) -> Option<Vec<String>> {
    if !text.get(at..)?.starts_with('[') {
        return None;
    }
    let close = matching_close(text, at).unwrap_or(text.len());
    let mut items = Vec::new();
    let mut i = at + 1;
    while i < close {
        let next = skip_trivia(text, i);
        if next != i {
            i = next;
            continue;
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        if is_quote(ch) {
            let Some(end) = string_end(text, i).filter(|&e| e < close) else {
                break;
            };
            if let Some(item) = clean(&text[i + ch.len_utf8()..end], ch, collapse) {
                items.push(item);
            }
            i = end + ch.len_utf8();
        } else {
            i += ch.len_utf8();
        }
    }
    Some(items)
}

/// Raw value text up to the next unquoted comma, line break, closer, or
/// comment.
fn raw_token(text: &str, at: usize) -> &str {
    for step in Scanner::starting_at(text, at) {
        if step.in_comment {
            return &text[at..step.offset];
        }
        if step.in_string {
            continue;
        }
        let stop = match step.ch {
            ',' | '\n' | '\r' => step.before == Depth::default(),
            '}' => step.before.braces == 0,
            ']' => step.before.brackets == 0,
            _ => false,
        };
        if stop {
            return &text[at..step.offset];
        }
    }
    &text[at..]
}

fn first_quoted(raw: &str, collapse: bool) -> Option<String> {
    let (open, _) = raw.char_indices().find(|(_, c)| is_quote(*c))?;
    quoted_at(raw, open, collapse)
}

/// Unescape the delimiter and backslashes, trim, and optionally collapse.
fn clean(inner: &str, quote: char, collapse: bool) -> Option<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some(&next) if next == quote || next == '\\' => {
                    out.push(next);
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(ch);
    }

    let value = if collapse {
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        out.trim().to_string()
    };
    (!value.is_empty()).then_some(value)
}
