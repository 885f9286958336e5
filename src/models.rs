//! Core data models used throughout altnav.
//!
//! These types represent the blocks, field values, and records that flow
//! through the extraction and search pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Description used when a record carries none.
pub const NO_DESCRIPTION: &str = "no description available";

/// One top-level literal carved out of a source document.
///
/// The text is an exact substring of the document, braces included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    /// Byte offset of the opening brace in the document.
    pub offset: usize,
    pub text: &'a str,
}

impl RawBlock<'_> {
    /// Byte offset just past the closing brace.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// A value recovered by the field extractor.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Trimmed, never empty.
    Scalar(String),
    /// Source order, never containing empty strings.
    List(Vec<String>),
    #[default]
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::List(items) => items.first().map(String::as_str),
            FieldValue::Absent => None,
        }
    }

    /// Consume into a list; a scalar becomes a single entry.
    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::Scalar(s) => vec![s],
            FieldValue::List(items) => items,
            FieldValue::Absent => Vec::new(),
        }
    }
}

/// Canonical fields of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Identity,
    Aliases,
    Description,
    Link,
    Category,
    Rank,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Identity,
        Field::Aliases,
        Field::Description,
        Field::Link,
        Field::Category,
        Field::Rank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Identity => "identity",
            Field::Aliases => "aliases",
            Field::Description => "description",
            Field::Link => "link",
            Field::Category => "category",
            Field::Rank => "rank",
        }
    }
}

impl std::str::FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown field: '{}'. Must be identity, aliases, description, link, category, or rank.",
                    s
                )
            })
    }
}

/// A normalized, searchable entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub identity: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub link: String,
    pub category: String,
    pub rank: f64,
    pub source_document: String,
}

/// How a document's text is carved into entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Markdown table when the text has a table and no literal list,
    /// literal blocks otherwise.
    #[default]
    Auto,
    /// Object literals, one entry per top-level `{ ... }`.
    Literal,
    /// Markdown table, one entry per data row.
    Table,
}

/// Where the bytes of a document come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentLocation {
    Url(String),
    Path(PathBuf),
}

impl std::fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentLocation::Url(url) => f.write_str(url),
            DocumentLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A source document declared in configuration or found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    pub id: String,
    pub location: DocumentLocation,
    /// Category given to records that do not name their own.
    pub category: Option<String>,
}
