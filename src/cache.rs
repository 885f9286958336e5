//! Freshness-bounded cache of fetched document text.
//!
//! One [`DocumentCache`] is owned by the catalog for its whole lifetime.
//! Entries are keyed by document id and remember when they were fetched and
//! a SHA-256 digest of the text, so a refresh can tell whether a document
//! actually changed.
//!
//! Expired entries are not evicted: they remain available through
//! [`DocumentCache::get`] so a failed re-fetch can fall back to the last
//! good text.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub text: Arc<str>,
    pub fetched_at: DateTime<Utc>,
    pub digest: String,
}

#[derive(Debug)]
pub struct DocumentCache {
    ttl: TimeDelta,
    entries: HashMap<String, CacheEntry>,
}

impl DocumentCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// The entry for `id` if it was fetched less than one TTL before `now`.
    pub fn fresh(&self, id: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries
            .get(id)
            .filter(|entry| now.signed_duration_since(entry.fetched_at) < self.ttl)
    }

    /// The entry for `id`, fresh or not.
    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Record freshly fetched text. Returns true when the text differs from
    /// what was cached before (or nothing was).
    pub fn store(&mut self, id: &str, text: Arc<str>, now: DateTime<Utc>) -> bool {
        let digest = digest(&text);
        let changed = self
            .entries
            .get(id)
            .map_or(true, |previous| previous.digest != digest);
        self.entries.insert(
            id.to_string(),
            CacheEntry {
                text,
                fetched_at: now,
                digest,
            },
        );
        changed
    }

    /// Drop entries for documents that are no longer part of the catalog.
    pub fn retain_ids(&mut self, ids: &HashSet<&str>) {
        self.entries.retain(|id, _| ids.contains(id.as_str()));
    }
}

fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
