//! End-to-end catalog tests over in-memory and scripted sources.
//!
//! These drive [`Catalog`] through whole refresh cycles: parallel fetches,
//! cross-document dedup, cache freshness, stale serving, and degradation
//! when documents disappear.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use altnav::error::SourceError;
use altnav::ingest::{Catalog, CatalogOptions, DocumentStatus, SnapshotStatus};
use altnav::models::{DocumentLocation, DocumentSpec, NO_DESCRIPTION};
use altnav::sources::{DocumentSource, MemorySource};

// ─── Helpers ────────────────────────────────────────────────────────

fn doc(id: &str, category: Option<&str>) -> DocumentSpec {
    DocumentSpec {
        id: id.to_string(),
        location: DocumentLocation::Url(format!("mem://{id}")),
        category: category.map(str::to_string),
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn options(ttl_secs: u64) -> CatalogOptions {
    CatalogOptions {
        ttl: Duration::from_secs(ttl_secs),
        ..CatalogOptions::default()
    }
}

/// Serves fixed text per document after a per-document delay.
struct DelayedSource {
    docs: HashMap<String, (Duration, String)>,
}

impl DelayedSource {
    fn new(entries: &[(&str, u64, &str)]) -> Self {
        Self {
            docs: entries
                .iter()
                .map(|(id, ms, text)| {
                    (
                        id.to_string(),
                        (Duration::from_millis(*ms), text.to_string()),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentSource for DelayedSource {
    fn name(&self) -> &str {
        "delayed"
    }

    async fn fetch(&self, doc: &DocumentSpec) -> Result<String, SourceError> {
        let Some((delay, text)) = self.docs.get(&doc.id) else {
            return Err(SourceError::Missing(doc.id.clone()));
        };
        tokio::time::sleep(*delay).await;
        Ok(text.clone())
    }
}

const EMAIL: &str = r#"
import { Alternative } from "../types";

export const alternatives: Alternative[] = [
  {
    name: "Tuta",
    replaces: ["Gmail", "Outlook"],
    description: "Encrypted mail
      hosted in Germany.",
    url: 'https://tuta.com',
    rank: 9,
  },
  {
    "name": "Proton Mail",
    "replacesServices": ["Gmail"],
    "desc": "Swiss mail provider with {braces} in its blurb",
    "website": "https://proton.me",
    "rank": "8.5",
  },
  {
    // still being written
    replaces: ["Yahoo Mail"],
  },
  {
    title: `Posteo`,
    alternativeTo: 'Gmail',
    category: "Mail",
  },
];
"#;

const SEARCH: &str = r#"
export const list = [
  { name: 'DuckDuckGo', replaces: ['Google Search'], rank: 7 },
  { name: 'tuta', description: 'duplicate from another file' },
  { name: 'Startpage', replaces: ['Google Search'], description: "Google results, privately", rank: 7 },
];
"#;

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_catalog_end_to_end() {
    let source = MemorySource::new()
        .with("email", EMAIL)
        .with("search", SEARCH);
    let catalog = Catalog::new(
        vec![doc("email", Some("Email")), doc("search", Some("Search"))],
        Arc::new(source),
        options(3600),
    );

    let snapshot = catalog.refresh(t0()).await;
    assert_eq!(snapshot.status, SnapshotStatus::Ready);
    assert_eq!(catalog.size(), 5);
    assert_eq!(snapshot.report.malformed, 1);
    assert_eq!(snapshot.report.duplicates, 1);
    assert_eq!(snapshot.report.documents[0].blocks, 4);
    assert_eq!(snapshot.report.documents[0].records, 3);
    assert_eq!(snapshot.report.documents[1].records, 2);

    let tuta = &catalog.query("tuta")[0];
    assert_eq!(tuta.identity, "Tuta");
    assert_eq!(tuta.aliases, vec!["Gmail", "Outlook"]);
    assert_eq!(tuta.description, "Encrypted mail hosted in Germany.");
    assert_eq!(tuta.link, "https://tuta.com");
    assert_eq!(tuta.category, "Email");
    assert_eq!(tuta.rank, 9.0);
    assert_eq!(tuta.source_document, "email");

    let proton = &catalog.query("proton")[0];
    assert_eq!(proton.rank, 8.5);
    assert_eq!(proton.link, "https://proton.me");
    assert_eq!(
        proton.description,
        "Swiss mail provider with {braces} in its blurb"
    );

    let posteo = &catalog.query("posteo")[0];
    assert_eq!(posteo.category, "Mail");
    assert_eq!(posteo.aliases, vec!["Gmail"]);
    assert_eq!(posteo.description, NO_DESCRIPTION);
    assert_eq!(posteo.rank, 0.0);
}

#[tokio::test]
async fn test_query_orders_by_rank_and_matches_aliases() {
    let source = MemorySource::new()
        .with("email", EMAIL)
        .with("search", SEARCH);
    let catalog = Catalog::new(
        vec![doc("email", None), doc("search", None)],
        Arc::new(source),
        options(3600),
    );
    catalog.refresh(t0()).await;

    let names: Vec<String> = catalog
        .query("GMAIL")
        .into_iter()
        .map(|r| r.identity)
        .collect();
    assert_eq!(names, vec!["Tuta", "Proton Mail", "Posteo"]);

    // Equal ranks keep ingestion order.
    let names: Vec<String> = catalog
        .query("google")
        .into_iter()
        .map(|r| r.identity)
        .collect();
    assert_eq!(names, vec!["DuckDuckGo", "Startpage"]);

    assert!(catalog.query("").is_empty());
    assert!(catalog.query("   ").is_empty());
    assert!(catalog.query("nothing matches this").is_empty());
}

#[tokio::test]
async fn test_category_browse() {
    let source = MemorySource::new()
        .with("email", EMAIL)
        .with("search", SEARCH);
    let catalog = Catalog::new(
        vec![doc("email", Some("Email")), doc("search", Some("Search"))],
        Arc::new(source),
        options(3600),
    );
    let snapshot = catalog.refresh(t0()).await;

    let search: Vec<String> = snapshot
        .index
        .query_by_category("search")
        .into_iter()
        .map(|r| r.identity)
        .collect();
    assert_eq!(search, vec!["DuckDuckGo", "Startpage"]);
    assert_eq!(snapshot.index.query_by_category("Mail").len(), 1);
    assert_eq!(
        snapshot.index.categories(),
        vec![
            ("Email".to_string(), 2),
            ("Mail".to_string(), 1),
            ("Search".to_string(), 2)
        ]
    );
}

#[tokio::test]
async fn test_dedup_follows_declaration_order_not_completion_order() {
    // "first" is declared first but finishes last.
    let source = DelayedSource::new(&[
        ("first", 80, "[{ name: 'Tuta', description: 'from first' }]"),
        ("second", 0, "[{ name: 'TUTA', description: 'from second' }]"),
    ]);
    let catalog = Catalog::new(
        vec![doc("first", None), doc("second", None)],
        Arc::new(source),
        options(3600),
    );

    let snapshot = catalog.refresh(t0()).await;
    assert_eq!(catalog.size(), 1);
    assert_eq!(snapshot.report.duplicates, 1);
    let record = &catalog.query("tuta")[0];
    assert_eq!(record.identity, "Tuta");
    assert_eq!(record.description, "from first");
    assert_eq!(record.source_document, "first");
}

#[tokio::test]
async fn test_all_documents_unavailable() {
    let catalog = Catalog::new(
        vec![doc("a", None), doc("b", None)],
        Arc::new(MemorySource::new()),
        options(3600),
    );

    let snapshot = catalog.refresh(t0()).await;
    assert_eq!(snapshot.status, SnapshotStatus::Unavailable);
    assert_eq!(catalog.size(), 0);
    assert_eq!(snapshot.report.unavailable(), 2);
    assert!(catalog.query("anything").is_empty());
}

#[tokio::test]
async fn test_unavailable_catalog_recovers_before_ttl() {
    let source = Arc::new(MemorySource::new());
    let catalog = Catalog::new(vec![doc("search", None)], source.clone(), options(3600));

    let first = catalog.refresh(t0()).await;
    assert_eq!(first.status, SnapshotStatus::Unavailable);

    source.insert("search", SEARCH);
    let snapshot = catalog
        .refresh_if_stale(t0() + TimeDelta::seconds(300))
        .await
        .expect("unavailable snapshot should be rebuilt");
    assert_eq!(snapshot.status, SnapshotStatus::Ready);
    assert!(catalog.size() > 0);
    assert!(catalog
        .refresh_if_stale(t0() + TimeDelta::seconds(301))
        .await
        .is_none());
}

#[tokio::test]
async fn test_one_document_unavailable_others_still_indexed() {
    let source = MemorySource::new().with("search", SEARCH);
    let catalog = Catalog::new(
        vec![doc("email", None), doc("search", None)],
        Arc::new(source),
        options(3600),
    );

    let snapshot = catalog.refresh(t0()).await;
    assert_eq!(snapshot.status, SnapshotStatus::Ready);
    assert_eq!(
        snapshot.report.documents[0].status,
        DocumentStatus::Unavailable
    );
    assert_eq!(snapshot.report.documents[1].status, DocumentStatus::Fetched);
    assert_eq!(catalog.size(), 3);
}

#[tokio::test]
async fn test_cache_serves_within_ttl_and_refetches_after() {
    let source = Arc::new(MemorySource::new().with("search", SEARCH));
    let catalog = Catalog::new(vec![doc("search", None)], source.clone(), options(60));

    catalog.refresh(t0()).await;
    assert_eq!(source.fetches(), 1);

    // Inside the window: nothing to do.
    let later = t0() + TimeDelta::seconds(30);
    assert!(!catalog.is_stale(later).await);
    assert!(catalog.refresh_if_stale(later).await.is_none());
    assert_eq!(source.fetches(), 1);

    // A forced refresh inside the window reuses cached text.
    let snapshot = catalog.refresh(later).await;
    assert_eq!(snapshot.report.documents[0].status, DocumentStatus::Cached);
    assert_eq!(source.fetches(), 1);

    // Past the window the snapshot is rebuilt from a fresh fetch.
    source.insert("search", "[{ name: 'Mojeek' }]");
    let expired = later + TimeDelta::seconds(61);
    assert!(catalog.is_stale(expired).await);
    let snapshot = catalog
        .refresh_if_stale(expired)
        .await
        .expect("snapshot should be rebuilt");
    assert_eq!(snapshot.report.documents[0].status, DocumentStatus::Fetched);
    assert_eq!(source.fetches(), 2);
    assert_eq!(catalog.size(), 1);
    assert_eq!(catalog.query("mojeek").len(), 1);
}

#[tokio::test]
async fn test_stale_text_served_when_refetch_fails() {
    let source = Arc::new(
        MemorySource::new()
            .with("email", EMAIL)
            .with("search", SEARCH),
    );
    let catalog = Catalog::new(
        vec![doc("email", None), doc("search", None)],
        source.clone(),
        options(60),
    );
    catalog.refresh(t0()).await;

    source.remove("email");
    let snapshot = catalog.refresh(t0() + TimeDelta::seconds(120)).await;
    assert_eq!(snapshot.status, SnapshotStatus::Ready);
    assert_eq!(snapshot.report.documents[0].status, DocumentStatus::Stale);
    assert!(snapshot.report.documents[0].error.is_some());
    assert_eq!(catalog.size(), 5);
}

#[tokio::test]
async fn test_without_stale_serving_failed_document_drops_out() {
    let source = Arc::new(
        MemorySource::new()
            .with("email", EMAIL)
            .with("search", SEARCH),
    );
    let catalog = Catalog::new(
        vec![doc("email", None), doc("search", None)],
        source.clone(),
        CatalogOptions {
            serve_stale: false,
            ..options(60)
        },
    );
    catalog.refresh(t0()).await;
    assert_eq!(catalog.size(), 5);

    source.remove("email");
    let snapshot = catalog.refresh(t0() + TimeDelta::seconds(120)).await;
    assert_eq!(
        snapshot.report.documents[0].status,
        DocumentStatus::Unavailable
    );
    // "tuta" from the search document now wins the identity.
    assert_eq!(catalog.size(), 3);
    assert_eq!(catalog.query("tuta")[0].source_document, "search");
}

#[tokio::test]
async fn test_previous_snapshot_kept_when_everything_fails() {
    let source = Arc::new(MemorySource::new().with("search", SEARCH));
    let catalog = Catalog::new(
        vec![doc("search", None)],
        source.clone(),
        CatalogOptions {
            serve_stale: false,
            ..options(60)
        },
    );
    let first = catalog.refresh(t0()).await;

    source.remove("search");
    let second = catalog.refresh(t0() + TimeDelta::seconds(120)).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.status, SnapshotStatus::Ready);
    assert_eq!(catalog.size(), 3);
}

#[tokio::test]
async fn test_readers_keep_their_snapshot_across_refresh() {
    let source = Arc::new(MemorySource::new().with("search", SEARCH));
    let catalog = Catalog::new(vec![doc("search", None)], source.clone(), options(60));
    catalog.refresh(t0()).await;

    let held = catalog.snapshot();
    source.insert("search", "[{ name: 'Mojeek' }]");
    catalog.refresh(t0() + TimeDelta::seconds(120)).await;

    assert_eq!(held.index.size(), 3);
    assert_eq!(catalog.size(), 1);
}

#[tokio::test]
async fn test_concurrent_refreshes_are_serialized() {
    let source = Arc::new(MemorySource::new().with("search", SEARCH));
    let catalog = Arc::new(Catalog::new(
        vec![doc("search", None)],
        source.clone(),
        options(60),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move {
            catalog.refresh_if_stale(t0()).await.is_some()
        }));
    }
    let mut rebuilt = 0;
    for h in handles {
        if h.await.unwrap() {
            rebuilt += 1;
        }
    }

    assert_eq!(rebuilt, 1);
    assert_eq!(source.fetches(), 1);
    assert_eq!(catalog.size(), 3);
}

const TABLE: &str = "\
# Cloud

Europe's best storage providers, don't miss them:

| Alternative | Replaces | Notes |
|-------------|----------|-------|
| [Nextcloud](https://nextcloud.com) | Google Drive | Self-hosted |
| **Syncthing** | Dropbox | Peer-to-peer |
| Tuta | Gmail | Listed again |
";

#[tokio::test]
async fn test_markdown_table_documents_share_the_pipeline() {
    let source = MemorySource::new()
        .with("email", EMAIL)
        .with("cloud", TABLE);
    let catalog = Catalog::new(
        vec![doc("email", Some("Email")), doc("cloud", Some("Cloud"))],
        Arc::new(source),
        options(3600),
    );

    let snapshot = catalog.refresh(t0()).await;
    assert_eq!(snapshot.status, SnapshotStatus::Ready);
    assert_eq!(snapshot.report.documents[1].blocks, 3);
    assert_eq!(snapshot.report.documents[1].records, 2);

    let hits = catalog.query("dropbox");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].identity, "Syncthing");
    assert_eq!(hits[0].category, "Cloud");
    assert_eq!(hits[0].description, "Dropbox | Peer-to-peer");

    let nextcloud = &catalog.query("nextcloud")[0];
    assert_eq!(nextcloud.link, "https://nextcloud.com");
}
