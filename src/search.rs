//! `altnav search`: one-shot query against a freshly built catalog.

use anyhow::Result;
use chrono::Utc;

use crate::config::Config;
use crate::ingest::Catalog;
use crate::models::Record;

/// Build the catalog, run the query, and print the results.
///
/// With `category` set the term is ignored and records are browsed by
/// category instead.
pub async fn run_search(
    config: &Config,
    term: &str,
    category: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    if category.is_none() && term.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let catalog = Catalog::from_config(config).await?;
    let snapshot = catalog.refresh(Utc::now()).await;

    if !snapshot.is_ready() {
        println!("Data unavailable: none of the configured documents could be read.");
        return Ok(());
    }

    let mut results = match &category {
        Some(c) => snapshot.index.query_by_category(c),
        None => snapshot.index.query(term),
    };
    let total = results.len();
    results.truncate(limit.unwrap_or(config.search.limit));

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "total": total,
                "results": results,
            }))?
        );
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{} result(s):", total);
    println!();
    for (i, record) in results.iter().enumerate() {
        print_record(i + 1, record);
    }
    if total > results.len() {
        println!("... {} more", total - results.len());
    }

    Ok(())
}

fn print_record(position: usize, record: &Record) {
    if record.category.is_empty() {
        println!("{}. {}", position, record.identity);
    } else {
        println!("{}. {} [{}]", position, record.identity, record.category);
    }
    println!("    {}", record.description);
    if !record.aliases.is_empty() {
        println!("    replaces: {}", record.aliases.join(", "));
    }
    if !record.link.is_empty() {
        println!("    {}", record.link);
    }
    println!("    source: {}", record.source_document);
    println!();
}
