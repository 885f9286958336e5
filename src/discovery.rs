//! Document discovery.
//!
//! Extends the declared `[[documents]]` list with documents found
//! automatically, either by listing a remote repository tree or by walking a
//! local directory. Discovered documents get their file stem, capitalized,
//! as default category, so `data/email.md` becomes category `Email`.
//!
//! Discovery is best-effort: a failed listing is logged and contributes no
//! documents.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::{Config, DiscoveryConfig};
use crate::models::{DocumentLocation, DocumentSpec};
use crate::sources::HttpSource;

/// Response shape of a recursive git tree listing.
#[derive(Debug, Deserialize)]
struct TreeListing {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Declared documents followed by discovered ones, in a stable order.
///
/// Discovered documents whose id collides with a declared one are skipped.
pub async fn resolve_documents(config: &Config, http: &HttpSource) -> Result<Vec<DocumentSpec>> {
    let mut documents = config.document_specs()?;

    let Some(discovery) = &config.discovery else {
        return Ok(documents);
    };

    let found = match discover(discovery, http).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "document discovery failed");
            Vec::new()
        }
    };

    let mut ids: HashSet<String> = documents.iter().map(|d| d.id.clone()).collect();
    for doc in found {
        if ids.insert(doc.id.clone()) {
            documents.push(doc);
        }
    }
    Ok(documents)
}

async fn discover(discovery: &DiscoveryConfig, http: &HttpSource) -> Result<Vec<DocumentSpec>> {
    let filter = PathFilter::new(&discovery.include_globs, &discovery.exclude_globs)?;

    match (&discovery.tree_url, &discovery.raw_base_url, &discovery.root) {
        (Some(tree_url), Some(raw_base), _) => {
            let body = http.get_text(tree_url).await?;
            let listing: TreeListing = serde_json::from_str(&body)?;
            Ok(documents_from_tree(&listing, raw_base, &filter))
        }
        (_, _, Some(root)) => scan_root(root, &filter),
        _ => bail!("discovery is not configured"),
    }
}

fn documents_from_tree(
    listing: &TreeListing,
    raw_base: &str,
    filter: &PathFilter,
) -> Vec<DocumentSpec> {
    let base = raw_base.trim_end_matches('/');
    listing
        .tree
        .iter()
        .filter(|entry| entry.kind.as_deref().map_or(true, |k| k == "blob"))
        .filter(|entry| filter.accepts(&entry.path))
        .map(|entry| DocumentSpec {
            id: entry.path.clone(),
            location: DocumentLocation::Url(format!("{}/{}", base, entry.path)),
            category: category_for(&entry.path),
        })
        .collect()
}

fn scan_root(root: &Path, filter: &PathFilter) -> Result<Vec<DocumentSpec>> {
    if !root.exists() {
        bail!("discovery root does not exist: {}", root.display());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if !filter.accepts(&rel_str) {
            continue;
        }
        documents.push(DocumentSpec {
            category: category_for(&rel_str),
            id: rel_str,
            location: DocumentLocation::Path(path.to_path_buf()),
        });
    }
    Ok(documents)
}

struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    fn accepts(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// `dir/email-services.md` → `Email-services`.
fn category_for(path: &str) -> Option<String> {
    let stem = Path::new(path).file_stem()?.to_string_lossy().to_string();
    let mut chars = stem.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}
