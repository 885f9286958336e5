//! Immutable in-memory search index.
//!
//! Holds normalized records in ingestion order with lower-cased copies of
//! the searchable fields. Queries are linear scans; at catalog sizes of a
//! few hundred records that is faster than maintaining any auxiliary
//! structure.
//!
//! # Ranking
//!
//! Matches are ordered by `rank` descending. The sort is stable, so records
//! with equal rank keep their ingestion order and a given index always
//! answers a given term the same way.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::models::{Field, Record};

/// Fields a query term is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFields {
    fields: Vec<Field>,
}

impl Default for SearchFields {
    fn default() -> Self {
        Self {
            fields: vec![Field::Identity, Field::Aliases, Field::Description],
        }
    }
}

impl SearchFields {
    /// Validate a configured field list. Rank is not text and cannot be
    /// searched.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        if fields.is_empty() {
            bail!("search.fields must name at least one field");
        }
        if fields.contains(&Field::Rank) {
            bail!("search.fields cannot include 'rank'");
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Lower-cased text of the participating fields of one record.
#[derive(Debug, Clone)]
struct Haystack {
    terms: Vec<String>,
    category: String,
}

impl Haystack {
    fn build(record: &Record, fields: &SearchFields) -> Self {
        let mut terms = Vec::new();
        for field in fields.fields() {
            match field {
                Field::Identity => terms.push(record.identity.to_lowercase()),
                Field::Aliases => terms.extend(record.aliases.iter().map(|a| a.to_lowercase())),
                Field::Description => terms.push(record.description.to_lowercase()),
                Field::Link => terms.push(record.link.to_lowercase()),
                Field::Category => terms.push(record.category.to_lowercase()),
                Field::Rank => {}
            }
        }
        Self {
            terms,
            category: record.category.to_lowercase(),
        }
    }

    fn contains(&self, needle: &str) -> bool {
        self.terms.iter().any(|t| t.contains(needle))
    }
}

/// A read-only snapshot of normalized records.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    records: Vec<Record>,
    haystacks: Vec<Haystack>,
}

impl SearchIndex {
    pub fn new(records: Vec<Record>, fields: &SearchFields) -> Self {
        let haystacks = records.iter().map(|r| Haystack::build(r, fields)).collect();
        Self { records, haystacks }
    }

    /// Records matching `term` in any participating field.
    ///
    /// An empty or blank term matches nothing. Otherwise the term is
    /// matched as given, surrounding spaces included.
    pub fn query(&self, term: &str) -> Vec<Record> {
        if term.trim().is_empty() {
            return Vec::new();
        }
        let needle = term.to_lowercase();
        self.ranked(|h| h.contains(&needle))
    }

    /// Records whose category equals `category`, ignoring case.
    pub fn query_by_category(&self, category: &str) -> Vec<Record> {
        let wanted = category.trim().to_lowercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.ranked(|h| h.category == wanted)
    }

    fn ranked(&self, matches: impl Fn(&Haystack) -> bool) -> Vec<Record> {
        let mut hits: Vec<&Record> = self
            .records
            .iter()
            .zip(&self.haystacks)
            .filter(|(_, h)| matches(h))
            .map(|(r, _)| r)
            .collect();
        hits.sort_by(|a, b| {
            b.rank
                .partial_cmp(&a.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.into_iter().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Non-empty categories with their record counts, sorted by name.
    ///
    /// Categories differing only in case share a bucket, shown with the
    /// first spelling seen.
    pub fn categories(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, (&str, usize)> = BTreeMap::new();
        for (record, haystack) in self.records.iter().zip(&self.haystacks) {
            if !record.category.is_empty() {
                counts
                    .entry(haystack.category.clone())
                    .or_insert((record.category.as_str(), 0))
                    .1 += 1;
            }
        }
        counts
            .into_values()
            .map(|(name, n)| (name.to_string(), n))
            .collect()
    }
}
