//! Ingestion pipeline and live catalog.
//!
//! A refresh fetches every document, carves it into blocks, extracts
//! fields, and normalizes the result into a new [`SearchIndex`]:
//!
//! ```text
//! fetch ──▶ blocks ──▶ fields      (one task per document, in parallel)
//!                        │
//!                        ▼
//!          normalize in declaration order ──▶ Snapshot ──▶ ArcSwap
//! ```
//!
//! Readers load the current [`Snapshot`] without locking and always see a
//! complete index. Refreshes are serialized by the cache mutex.
//!
//! Failures degrade instead of propagating: an unreachable document
//! contributes no records (or its last cached text), and a refresh that
//! reaches no document at all keeps the previous snapshot when one exists.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::blocks::{extract_blocks, find_list_marker};
use crate::cache::DocumentCache;
use crate::config::Config;
use crate::discovery::resolve_documents;
use crate::error::SourceError;
use crate::fields::{ExtractedFields, FieldSet};
use crate::index::{SearchFields, SearchIndex};
use crate::models::{DocumentFormat, DocumentSpec, Record};
use crate::normalize::{Normalizer, Outcome};
use crate::sources::{DocumentSource, HttpSource, RoutingSource};
use crate::table::{has_table, row_fields, table_rows};

/// Whether a snapshot holds usable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Ready,
    /// No document could be read and there was no earlier snapshot.
    Unavailable,
}

/// Where the text used for a document came from during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Fetched during this refresh.
    Fetched,
    /// Served from a cache entry still inside its freshness window.
    Cached,
    /// Re-fetch failed; the last good text was used.
    Stale,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub id: String,
    pub status: DocumentStatus,
    pub blocks: usize,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub documents: Vec<DocumentReport>,
    pub records: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

impl IngestReport {
    pub fn available(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.status != DocumentStatus::Unavailable)
            .count()
    }

    pub fn unavailable(&self) -> usize {
        self.documents.len() - self.available()
    }

    pub fn blocks(&self) -> usize {
        self.documents.iter().map(|d| d.blocks).sum()
    }
}

/// An immutable, complete view of the catalog.
#[derive(Debug)]
pub struct Snapshot {
    pub index: SearchIndex,
    pub status: SnapshotStatus,
    /// `None` until the first refresh.
    pub built_at: Option<DateTime<Utc>>,
    pub report: IngestReport,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            index: SearchIndex::default(),
            status: SnapshotStatus::Unavailable,
            built_at: None,
            report: IngestReport::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SnapshotStatus::Ready
    }
}

/// How document text is carved into entries and which keys are read.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub fields: FieldSet,
    /// Text preceding the literal list.
    pub list_anchor: Option<String>,
    pub format: DocumentFormat,
}

impl Extraction {
    /// Resolve [`DocumentFormat::Auto`] against the text.
    pub fn format_for(&self, text: &str) -> DocumentFormat {
        match self.format {
            DocumentFormat::Auto => {
                let list = find_list_marker(text, self.list_anchor.as_deref());
                if has_table(text) && list.is_none() {
                    DocumentFormat::Table
                } else {
                    DocumentFormat::Literal
                }
            }
            format => format,
        }
    }
}

/// Tunables for a [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub extraction: Extraction,
    pub search_fields: SearchFields,
    pub ttl: Duration,
    pub serve_stale: bool,
    /// Upper bound on a single document fetch.
    pub fetch_timeout: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            extraction: Extraction::default(),
            search_fields: SearchFields::default(),
            ttl: Duration::from_secs(3600),
            serve_stale: true,
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

impl CatalogOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            extraction: config.extraction.extraction()?,
            search_fields: config.search.search_fields()?,
            ttl: Duration::from_secs(config.cache.ttl_secs),
            serve_stale: config.cache.serve_stale,
            fetch_timeout: Duration::from_secs(config.fetch.timeout_secs),
        })
    }
}

/// Field values read from one document's blocks or table rows.
pub struct Harvest {
    pub blocks: usize,
    pub fields: Vec<ExtractedFields>,
}

/// Carve `text` into entries and extract every field from each.
pub fn harvest(text: &str, extraction: &Extraction) -> Harvest {
    let fields: Vec<ExtractedFields> = match extraction.format_for(text) {
        DocumentFormat::Table => table_rows(text).iter().map(|row| row_fields(row)).collect(),
        _ => extract_blocks(text, extraction.list_anchor.as_deref())
            .iter()
            .map(|b| extraction.fields.extract(b))
            .collect(),
    };
    Harvest {
        blocks: fields.len(),
        fields,
    }
}

/// Normalize a single document's text into records, with no cache or
/// dedup across documents.
pub fn records_from_text(
    text: &str,
    doc: &DocumentSpec,
    extraction: &Extraction,
) -> (Vec<Record>, IngestReport) {
    let harvested = harvest(text, extraction);
    let blocks = harvested.blocks;
    let mut normalizer = Normalizer::new();
    for f in harvested.fields {
        normalizer.push(f, &doc.id, doc.category.as_deref());
    }
    let report = IngestReport {
        documents: vec![DocumentReport {
            id: doc.id.clone(),
            status: DocumentStatus::Fetched,
            blocks,
            records: normalizer.accepted(),
            error: None,
        }],
        records: normalizer.accepted(),
        malformed: normalizer.malformed,
        duplicates: normalizer.duplicates,
    };
    (normalizer.finish(), report)
}

/// Result of one per-document task.
struct DocumentRun {
    status: DocumentStatus,
    fetched: Option<Arc<str>>,
    harvest: Harvest,
    error: Option<String>,
}

/// The live, refreshable catalog.
///
/// Owns the document list, the byte source, the text cache and the current
/// snapshot.
pub struct Catalog {
    documents: Vec<DocumentSpec>,
    source: Arc<dyn DocumentSource>,
    extraction: Arc<Extraction>,
    search_fields: SearchFields,
    serve_stale: bool,
    fetch_timeout: Duration,
    cache: Mutex<DocumentCache>,
    current: ArcSwap<Snapshot>,
}

impl Catalog {
    pub fn new(
        documents: Vec<DocumentSpec>,
        source: Arc<dyn DocumentSource>,
        options: CatalogOptions,
    ) -> Self {
        Self {
            documents,
            source,
            extraction: Arc::new(options.extraction),
            search_fields: options.search_fields,
            serve_stale: options.serve_stale,
            fetch_timeout: options.fetch_timeout,
            cache: Mutex::new(DocumentCache::new(options.ttl)),
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// Build a catalog over the configured and discovered documents,
    /// fetched through HTTP or the local filesystem.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let source = RoutingSource::new(HttpSource::new(&config.fetch)?);
        let documents = resolve_documents(config, source.http()).await?;
        Ok(Self::new(
            documents,
            Arc::new(source),
            CatalogOptions::from_config(config)?,
        ))
    }

    /// The current complete snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn query(&self, term: &str) -> Vec<Record> {
        self.current.load().index.query(term)
    }

    pub fn size(&self) -> usize {
        self.current.load().index.size()
    }

    /// Whether the snapshot is missing, unavailable, or older than the
    /// freshness window.
    pub async fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let cache = self.cache.lock().await;
        self.stale_under(&cache, now)
    }

    fn stale_under(&self, cache: &DocumentCache, now: DateTime<Utc>) -> bool {
        let current = self.current.load();
        if !current.is_ready() {
            return true;
        }
        match current.built_at {
            None => true,
            Some(built) => now.signed_duration_since(built) >= cache.ttl(),
        }
    }

    /// Rebuild only when the snapshot has expired. Returns the new snapshot
    /// if a rebuild happened.
    pub async fn refresh_if_stale(&self, now: DateTime<Utc>) -> Option<Arc<Snapshot>> {
        let mut cache = self.cache.lock().await;
        if !self.stale_under(&cache, now) {
            return None;
        }
        Some(self.rebuild(&mut cache, now).await)
    }

    /// Rebuild unconditionally. Documents with fresh cache entries are not
    /// re-fetched.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Arc<Snapshot> {
        let mut cache = self.cache.lock().await;
        self.rebuild(&mut cache, now).await
    }

    async fn rebuild(&self, cache: &mut DocumentCache, now: DateTime<Utc>) -> Arc<Snapshot> {
        let mut tasks = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            let fresh = cache.fresh(&doc.id, now).map(|e| e.text.clone());
            let fallback = if self.serve_stale {
                cache.get(&doc.id).map(|e| e.text.clone())
            } else {
                None
            };
            tasks.push(tokio::spawn(run_document(
                doc.clone(),
                self.source.clone(),
                self.extraction.clone(),
                self.fetch_timeout,
                fresh,
                fallback,
            )));
        }

        let mut normalizer = Normalizer::new();
        let mut report = IngestReport::default();

        // Awaited in declaration order so first-seen-wins does not depend
        // on which fetch finished first.
        for (doc, task) in self.documents.iter().zip(tasks) {
            let run = match task.await {
                Ok(run) => run,
                Err(e) => {
                    tracing::error!(document = %doc.id, error = %e, "document task failed");
                    DocumentRun {
                        status: DocumentStatus::Unavailable,
                        fetched: None,
                        harvest: Harvest {
                            blocks: 0,
                            fields: Vec::new(),
                        },
                        error: Some(e.to_string()),
                    }
                }
            };

            if let Some(text) = run.fetched {
                if cache.store(&doc.id, text, now) {
                    tracing::debug!(document = %doc.id, "document text changed");
                }
            }

            let before = normalizer.accepted();
            for (i, fields) in run.harvest.fields.into_iter().enumerate() {
                if normalizer.push(fields, &doc.id, doc.category.as_deref()) == Outcome::Malformed {
                    tracing::debug!(document = %doc.id, block = i, "block has no identity; dropped");
                }
            }

            report.documents.push(DocumentReport {
                id: doc.id.clone(),
                status: run.status,
                blocks: run.harvest.blocks,
                records: normalizer.accepted() - before,
                error: run.error,
            });
        }

        let ids: HashSet<&str> = self.documents.iter().map(|d| d.id.as_str()).collect();
        cache.retain_ids(&ids);

        report.records = normalizer.accepted();
        report.malformed = normalizer.malformed;
        report.duplicates = normalizer.duplicates;

        let previous = self.current.load_full();
        if report.available() == 0 && previous.is_ready() {
            tracing::warn!(
                documents = report.documents.len(),
                "no document could be read; keeping previous snapshot"
            );
            return previous;
        }

        let status = if report.available() == 0 {
            tracing::warn!(
                documents = report.documents.len(),
                "no document could be read; catalog unavailable"
            );
            SnapshotStatus::Unavailable
        } else {
            SnapshotStatus::Ready
        };

        tracing::info!(
            documents = report.documents.len(),
            unavailable = report.unavailable(),
            records = report.records,
            malformed = report.malformed,
            duplicates = report.duplicates,
            "catalog refreshed"
        );

        let snapshot = Arc::new(Snapshot {
            index: SearchIndex::new(normalizer.finish(), &self.search_fields),
            status,
            built_at: Some(now),
            report,
        });
        self.current.store(snapshot.clone());
        snapshot
    }
}

/// Fetch (or reuse) one document's text and extract its fields.
async fn run_document(
    doc: DocumentSpec,
    source: Arc<dyn DocumentSource>,
    extraction: Arc<Extraction>,
    fetch_timeout: Duration,
    fresh: Option<Arc<str>>,
    fallback: Option<Arc<str>>,
) -> DocumentRun {
    let (status, text, fetched, error) = match fresh {
        Some(text) => (DocumentStatus::Cached, Some(text), None, None),
        None => match fetch_with_timeout(source.as_ref(), &doc, fetch_timeout).await {
            Ok(text) => {
                let text: Arc<str> = Arc::from(text);
                (DocumentStatus::Fetched, Some(text.clone()), Some(text), None)
            }
            Err(e) => {
                tracing::warn!(
                    document = %doc.id,
                    source = source.name(),
                    location = %doc.location,
                    error = %e,
                    "document unavailable"
                );
                let status = if fallback.is_some() {
                    DocumentStatus::Stale
                } else {
                    DocumentStatus::Unavailable
                };
                (status, fallback, None, Some(e.to_string()))
            }
        },
    };

    let harvest = match &text {
        Some(text) => harvest(text, &extraction),
        None => Harvest {
            blocks: 0,
            fields: Vec::new(),
        },
    };

    tracing::debug!(document = %doc.id, blocks = harvest.blocks, ?status, "document harvested");

    DocumentRun {
        status,
        fetched,
        harvest,
        error,
    }
}

async fn fetch_with_timeout(
    source: &dyn DocumentSource,
    doc: &DocumentSpec,
    limit: Duration,
) -> Result<String, SourceError> {
    match tokio::time::timeout(limit, source.fetch(doc)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(limit)),
    }
}

/// Run one refresh and print the report.
///
/// With `check`, an unavailable catalog is an error so scripts can detect
/// it from the exit status.
pub async fn run_ingest(config: &Config, check: bool, json: bool) -> Result<()> {
    let catalog = Catalog::from_config(config).await?;
    let snapshot = catalog.refresh(Utc::now()).await;
    let report = &snapshot.report;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": snapshot.status,
                "report": report,
            }))?
        );
    } else {
        println!("ingest");
        for doc in &report.documents {
            let status = format!("{:?}", doc.status).to_lowercase();
            println!(
                "  {:<28} {:<12} blocks: {:<5} records: {}",
                doc.id, status, doc.blocks, doc.records
            );
        }
        println!("  documents available: {}", report.available());
        println!("  documents unavailable: {}", report.unavailable());
        println!("  blocks: {}", report.blocks());
        println!("  records: {}", report.records);
        println!("  malformed blocks: {}", report.malformed);
        println!("  duplicates: {}", report.duplicates);
        match snapshot.status {
            SnapshotStatus::Ready => println!("ok"),
            SnapshotStatus::Unavailable => println!("data unavailable"),
        }
    }

    if check && !snapshot.is_ready() {
        anyhow::bail!("catalog unavailable: no document could be read");
    }
    Ok(())
}
