//! Mapping extracted fields onto canonical [`Record`]s.
//!
//! The [`Normalizer`] is fed blocks in ingestion order and keeps the first
//! record seen for each identity (compared case-insensitively). Blocks
//! without an identity are dropped. Every other field falls back to a
//! default, so a partially written block still produces a record.

use std::collections::HashSet;

use crate::fields::ExtractedFields;
use crate::models::{Field, Record, NO_DESCRIPTION};

/// What happened to a block handed to [`Normalizer::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    /// No identity could be extracted.
    Malformed,
    /// An earlier record already claimed this identity.
    Duplicate,
}

/// Accumulates records across every document of one ingestion run.
#[derive(Debug, Default)]
pub struct Normalizer {
    seen: HashSet<String>,
    records: Vec<Record>,
    pub malformed: usize,
    pub duplicates: usize,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one block's fields.
    ///
    /// `default_category` is used when the block names no category of its
    /// own.
    pub fn push(
        &mut self,
        mut fields: ExtractedFields,
        source_document: &str,
        default_category: Option<&str>,
    ) -> Outcome {
        let Some(identity) = fields.get(Field::Identity).as_scalar().map(str::to_string) else {
            self.malformed += 1;
            return Outcome::Malformed;
        };

        if !self.seen.insert(identity_key(&identity)) {
            self.duplicates += 1;
            return Outcome::Duplicate;
        }

        let scalar_or = |fields: &ExtractedFields, field: Field, default: &str| {
            fields
                .get(field)
                .as_scalar()
                .unwrap_or(default)
                .to_string()
        };

        let record = Record {
            aliases: fields.take(Field::Aliases).into_list(),
            description: scalar_or(&fields, Field::Description, NO_DESCRIPTION),
            link: scalar_or(&fields, Field::Link, ""),
            category: scalar_or(&fields, Field::Category, default_category.unwrap_or("")),
            rank: parse_rank(fields.get(Field::Rank).as_scalar()),
            source_document: source_document.to_string(),
            identity,
        };
        self.records.push(record);
        Outcome::Accepted
    }

    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    pub fn finish(self) -> Vec<Record> {
        self.records
    }
}

/// Case-insensitive dedup key for an identity.
pub fn identity_key(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Parse a rank; anything unusable is 0.0.
pub fn parse_rank(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}
