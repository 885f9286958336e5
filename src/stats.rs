//! Catalog statistics.
//!
//! Summarizes what a refresh produced: per-document block and record
//! counts, and record counts per category. Used by `altnav stats` and the
//! server's `GET /stats`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::ingest::{Catalog, DocumentReport, Snapshot, SnapshotStatus};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub status: SnapshotStatus,
    pub built_at: Option<DateTime<Utc>>,
    pub records: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub documents: Vec<DocumentReport>,
    pub categories: Vec<CategoryCount>,
}

impl CatalogStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            status: snapshot.status,
            built_at: snapshot.built_at,
            records: snapshot.index.size(),
            malformed: snapshot.report.malformed,
            duplicates: snapshot.report.duplicates,
            documents: snapshot.report.documents.clone(),
            categories: snapshot
                .index
                .categories()
                .into_iter()
                .map(|(category, records)| CategoryCount { category, records })
                .collect(),
        }
    }
}

/// Run the stats command: refresh once and print a summary.
pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let catalog = Catalog::from_config(config).await?;
    let snapshot = catalog.refresh(Utc::now()).await;
    let stats = CatalogStats::from_snapshot(&snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("altnav: Catalog Stats");
    println!("======================");
    println!();
    match stats.status {
        SnapshotStatus::Ready => println!("  Status:      ready"),
        SnapshotStatus::Unavailable => println!("  Status:      data unavailable"),
    }
    println!("  Records:     {}", stats.records);
    println!("  Malformed:   {}", stats.malformed);
    println!("  Duplicates:  {}", stats.duplicates);
    println!();

    if !stats.documents.is_empty() {
        println!("  By document:");
        println!(
            "  {:<28} {:>8} {:>8}  STATUS",
            "DOCUMENT", "BLOCKS", "RECORDS"
        );
        for doc in &stats.documents {
            println!(
                "  {:<28} {:>8} {:>8}  {}",
                doc.id,
                doc.blocks,
                doc.records,
                format!("{:?}", doc.status).to_lowercase()
            );
        }
        println!();
    }

    if !stats.categories.is_empty() {
        println!("  By category:");
        for c in &stats.categories {
            println!("  {:<28} {:>8}", c.category, c.records);
        }
        println!();
    }

    Ok(())
}
