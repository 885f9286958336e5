//! HTTP API tests against a live router on an ephemeral port.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use altnav::ingest::{Catalog, CatalogOptions};
use altnav::models::{DocumentLocation, DocumentSpec};
use altnav::server::router;
use altnav::sources::MemorySource;

// ─── Helpers ────────────────────────────────────────────────────────

const TOOLS: &str = r#"
export const alternatives = [
  { name: "Nextcloud", replaces: ["Google Drive", "Dropbox"], rank: 9 },
  { name: "Syncthing", replaces: ["Dropbox"], description: "Peer-to-peer file sync", rank: 8 },
  { name: "Cryptpad", replaces: ["Google Docs"], category: "Office", rank: 7 },
];
"#;

fn doc(id: &str, category: &str) -> DocumentSpec {
    DocumentSpec {
        id: id.to_string(),
        location: DocumentLocation::Url(format!("mem://{id}")),
        category: Some(category.to_string()),
    }
}

/// Serve `catalog` on 127.0.0.1:0 and return the base URL.
async fn spawn_app(catalog: Arc<Catalog>, default_limit: usize) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(catalog, default_limit);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn ready_catalog() -> Arc<Catalog> {
    let source = MemorySource::new().with("storage", TOOLS);
    let catalog = Catalog::new(
        vec![doc("storage", "Storage")],
        Arc::new(source),
        CatalogOptions::default(),
    );
    catalog.refresh(Utc::now()).await;
    Arc::new(catalog)
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let base = spawn_app(ready_catalog().await, 25).await;
    let (status, body) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_search_ranked_with_limit() {
    let base = spawn_app(ready_catalog().await, 25).await;

    let (status, body) = get_json(&format!("{base}/search?q=dropbox")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"][0]["identity"], "Nextcloud");
    assert_eq!(body["results"][1]["identity"], "Syncthing");
    assert_eq!(body["results"][1]["category"], "Storage");

    let (_, body) = get_json(&format!("{base}/search?q=dropbox&limit=1")).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_rejects_empty_query_and_zero_limit() {
    let base = spawn_app(ready_catalog().await, 25).await;

    let (status, body) = get_json(&format!("{base}/search?q=")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = get_json(&format!("{base}/search")).await;
    assert_eq!(status, 400);

    let (status, body) = get_json(&format!("{base}/search?q=x&limit=0")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_category_endpoint() {
    let base = spawn_app(ready_catalog().await, 25).await;

    let (status, body) = get_json(&format!("{base}/category/office")).await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["identity"], "Cryptpad");

    let (_, body) = get_json(&format!("{base}/category/nope")).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let base = spawn_app(ready_catalog().await, 25).await;

    let (status, body) = get_json(&format!("{base}/stats")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["records"], 3);
    assert_eq!(body["documents"][0]["id"], "storage");
    assert_eq!(body["documents"][0]["status"], "fetched");
    assert_eq!(body["categories"][0]["category"], "Office");
}

#[tokio::test]
async fn test_unavailable_catalog_answers_with_empty_results() {
    let catalog = Catalog::new(
        vec![doc("storage", "Storage")],
        Arc::new(MemorySource::new()),
        CatalogOptions::default(),
    );
    catalog.refresh(Utc::now()).await;
    let base = spawn_app(Arc::new(catalog), 25).await;

    let (status, body) = get_json(&format!("{base}/search?q=dropbox")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["total"], 0);
}
