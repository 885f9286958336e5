//! Byte sources for catalog documents.
//!
//! A [`DocumentSource`] turns a [`DocumentSpec`] into raw text. Sources
//! report failures as [`SourceError`]; the ingestion pipeline treats any
//! error as "this document is unavailable" and carries on.
//!
//! | Source | Location | Notes |
//! |--------|----------|-------|
//! | [`HttpSource`] | `url` | `reqwest`, non-2xx is an error |
//! | [`FileSource`] | `path` | local file read |
//! | [`RoutingSource`] | both | dispatches on the location kind |
//! | [`MemorySource`] | any | in-memory text keyed by document id |

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Config, FetchConfig};
use crate::discovery::resolve_documents;
use crate::error::SourceError;
use crate::models::{DocumentLocation, DocumentSpec};

/// Something that can produce the text of a document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Fetch the full text of `doc`.
    async fn fetch(&self, doc: &DocumentSpec) -> Result<String, SourceError>;
}

/// Fetches `url` documents over HTTP(S).
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }

    /// GET `url` and return the body of a successful response.
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await.map_err(|e| self.map_err(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| self.map_err(e))
    }

    fn map_err(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Transport(err)
        }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, doc: &DocumentSpec) -> Result<String, SourceError> {
        match &doc.location {
            DocumentLocation::Url(url) => self.get_text(url).await,
            DocumentLocation::Path(_) => Err(SourceError::Missing(doc.id.clone())),
        }
    }
}

/// Reads `path` documents from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

#[async_trait]
impl DocumentSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, doc: &DocumentSpec) -> Result<String, SourceError> {
        match &doc.location {
            DocumentLocation::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Io {
                        path: path.display().to_string(),
                        source,
                    })
            }
            DocumentLocation::Url(_) => Err(SourceError::Missing(doc.id.clone())),
        }
    }
}

/// Sends URLs to [`HttpSource`] and paths to [`FileSource`].
#[derive(Clone)]
pub struct RoutingSource {
    http: HttpSource,
    file: FileSource,
}

impl RoutingSource {
    pub fn new(http: HttpSource) -> Self {
        Self {
            http,
            file: FileSource,
        }
    }

    pub fn http(&self) -> &HttpSource {
        &self.http
    }
}

#[async_trait]
impl DocumentSource for RoutingSource {
    fn name(&self) -> &str {
        "routing"
    }

    async fn fetch(&self, doc: &DocumentSpec) -> Result<String, SourceError> {
        match doc.location {
            DocumentLocation::Url(_) => self.http.fetch(doc).await,
            DocumentLocation::Path(_) => self.file.fetch(doc).await,
        }
    }
}

/// Serves text registered by document id, ignoring the location.
///
/// Documents can be added or removed between refreshes to simulate a
/// source coming and going.
#[derive(Default)]
pub struct MemorySource {
    docs: RwLock<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, id: &str, text: &str) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&self, id: &str, text: &str) {
        if let Ok(mut docs) = self.docs.write() {
            docs.insert(id.to_string(), text.to_string());
        }
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut docs) = self.docs.write() {
            docs.remove(id);
        }
    }

    /// Number of fetch calls served so far, successful or not.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, doc: &DocumentSpec) -> Result<String, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.docs
            .read()
            .ok()
            .and_then(|docs| docs.get(&doc.id).cloned())
            .ok_or_else(|| SourceError::Missing(doc.id.clone()))
    }
}

/// Print every declared and discovered document, optionally fetching each
/// one to report whether it is reachable.
pub async fn list_sources(config: &Config, check: bool) -> Result<()> {
    let source = RoutingSource::new(HttpSource::new(&config.fetch)?);
    let documents = resolve_documents(config, source.http()).await?;

    if documents.is_empty() {
        println!("No documents configured.");
        return Ok(());
    }

    if check {
        println!("{:<28} {:<14} {:<12} LOCATION", "DOCUMENT", "CATEGORY", "STATUS");
    } else {
        println!("{:<28} {:<14} LOCATION", "DOCUMENT", "CATEGORY");
    }

    for doc in &documents {
        let category = doc.category.as_deref().unwrap_or("-");
        if check {
            let status = match source.fetch(doc).await {
                Ok(text) => format!("OK {}B", text.len()),
                Err(e) => {
                    tracing::warn!(document = %doc.id, error = %e, "document unavailable");
                    "UNAVAILABLE".to_string()
                }
            };
            println!(
                "{:<28} {:<14} {:<12} {}",
                doc.id, category, status, doc.location
            );
        } else {
            println!("{:<28} {:<14} {}", doc.id, category, doc.location);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(id: &str, location: DocumentLocation) -> DocumentSpec {
        DocumentSpec {
            id: id.to_string(),
            location,
            category: None,
        }
    }

    #[tokio::test]
    async fn test_memory_source_add_and_remove() {
        let source = MemorySource::new().with("a", "{ name: 'x' }");
        let doc = spec("a", DocumentLocation::Url("ignored".to_string()));

        assert_eq!(source.fetch(&doc).await.unwrap(), "{ name: 'x' }");
        source.remove("a");
        assert!(matches!(
            source.fetch(&doc).await,
            Err(SourceError::Missing(id)) if id == "a"
        ));
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_file_source_reads_and_reports_io() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.ts");
        std::fs::write(&path, "[{ name: 'Tuta' }]").unwrap();

        let found = FileSource
            .fetch(&spec("doc", DocumentLocation::Path(path)))
            .await
            .unwrap();
        assert_eq!(found, "[{ name: 'Tuta' }]");

        let missing = FileSource
            .fetch(&spec("gone", DocumentLocation::Path(PathBuf::from("/nonexistent/x.ts"))))
            .await;
        assert!(matches!(missing, Err(SourceError::Io { .. })));
    }

    #[tokio::test]
    async fn test_file_source_rejects_urls() {
        let result = FileSource
            .fetch(&spec("u", DocumentLocation::Url("https://example.org".to_string())))
            .await;
        assert!(matches!(result, Err(SourceError::Missing(_))));
    }
}
