//! TOML configuration.
//!
//! ```toml
//! [[documents]]
//! id = "email"
//! url = "https://example.org/data/email.ts"
//! category = "Email"
//!
//! [extraction]
//! list_anchor = "alternatives"
//! format = "auto"   # or "literal", "table"
//!
//! [extraction.synonyms]
//! identity = ["name", "title"]
//!
//! [search]
//! fields = ["identity", "aliases", "description"]
//!
//! [cache]
//! ttl_secs = 3600
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! Every section is optional. A document takes either `url` or `path`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::fields::FieldSet;
use crate::index::SearchFields;
use crate::ingest::Extraction;
use crate::models::{DocumentFormat, DocumentLocation, DocumentSpec, Field};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub documents: Vec<DocumentConfig>,
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub category: Option<String>,
}

impl DocumentConfig {
    pub fn to_spec(&self) -> Result<DocumentSpec> {
        let location = match (&self.url, &self.path) {
            (Some(url), None) => DocumentLocation::Url(url.clone()),
            (None, Some(path)) => DocumentLocation::Path(path.clone()),
            _ => bail!(
                "document '{}' must set exactly one of `url` or `path`",
                self.id
            ),
        };
        Ok(DocumentSpec {
            id: self.id.clone(),
            location,
            category: self.category.clone(),
        })
    }
}

/// Automatic document listing, either from a remote tree or a local root.
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// JSON tree listing, e.g. the GitHub `git/trees/<ref>?recursive=1` API.
    #[serde(default)]
    pub tree_url: Option<String>,
    /// Prefix joined with each tree path to form a raw download URL.
    #[serde(default)]
    pub raw_base_url: Option<String>,
    /// Local directory walked instead of a remote tree.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

fn default_exclude_globs() -> Vec<String> {
    vec!["**/*ISSUE*".to_string(), "**/*ISSUE*/**".to_string()]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractionConfig {
    /// Text preceding the literal list, used to pick the right `[`.
    #[serde(default)]
    pub list_anchor: Option<String>,
    /// Literal blocks, Markdown table rows, or whichever the text holds.
    #[serde(default)]
    pub format: DocumentFormat,
    /// Per-field replacement key lists, highest priority first.
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

impl ExtractionConfig {
    pub fn extraction(&self) -> Result<Extraction> {
        Ok(Extraction {
            fields: self.field_set()?,
            list_anchor: self.list_anchor.clone(),
            format: self.format,
        })
    }

    pub fn field_set(&self) -> Result<FieldSet> {
        let mut overrides = HashMap::new();
        for (name, keys) in &self.synonyms {
            let field: Field = name.parse()?;
            let keys: Vec<String> = keys
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if keys.is_empty() {
                bail!("extraction.synonyms.{} must list at least one key", name);
            }
            overrides.insert(field, keys);
        }
        Ok(FieldSet::with_synonyms(&overrides))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_fields")]
    pub fields: Vec<Field>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fields: default_search_fields(),
            limit: default_limit(),
        }
    }
}

fn default_search_fields() -> Vec<Field> {
    SearchFields::default().fields().to_vec()
}
fn default_limit() -> usize {
    25
}

impl SearchConfig {
    pub fn search_fields(&self) -> Result<SearchFields> {
        SearchFields::new(self.fields.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Serve the last good text of a document whose re-fetch failed.
    #[serde(default = "default_serve_stale")]
    pub serve_stale: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            serve_stale: default_serve_stale(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    3600
}
fn default_serve_stale() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}
fn default_user_agent() -> String {
    format!("altnav/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// How often the server checks whether the snapshot has expired.
    #[serde(default = "default_refresh_check_secs")]
    pub refresh_check_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            refresh_check_secs: default_refresh_check_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}
fn default_refresh_check_secs() -> u64 {
    60
}

impl Config {
    /// Configuration with no documents and every default.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Declared documents in declaration order.
    pub fn document_specs(&self) -> Result<Vec<DocumentSpec>> {
        self.documents.iter().map(DocumentConfig::to_spec).collect()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let mut ids = HashSet::new();
    for doc in &config.documents {
        if doc.id.trim().is_empty() {
            bail!("documents[].id must not be empty");
        }
        if !ids.insert(doc.id.as_str()) {
            bail!("duplicate document id: '{}'", doc.id);
        }
        doc.to_spec()?;
    }

    if let Some(discovery) = &config.discovery {
        match (&discovery.tree_url, &discovery.raw_base_url, &discovery.root) {
            (Some(_), Some(_), None) | (None, None, Some(_)) => {}
            _ => bail!(
                "discovery needs either `tree_url` + `raw_base_url` or `root`, not both"
            ),
        }
    }

    config.extraction.field_set()?;
    config.search.search_fields()?;

    if config.search.limit == 0 {
        bail!("search.limit must be >= 1");
    }
    if config.cache.ttl_secs == 0 {
        bail!("cache.ttl_secs must be > 0");
    }
    if config.fetch.timeout_secs == 0 {
        bail!("fetch.timeout_secs must be > 0");
    }
    if config.server.refresh_check_secs == 0 {
        bail!("server.refresh_check_secs must be > 0");
    }

    Ok(())
}
