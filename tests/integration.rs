use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn altnav_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("altnav");
    path
}

const EMAIL_MD: &str = r#"# Email

export const alternatives = [
  { name: "Tuta", replaces: ["Gmail", "Outlook"], description: "Encrypted mail", url: "https://tuta.com", rank: 9 },
  { name: "Posteo", replaces: ["Gmail"], rank: 6 },
  { description: "an entry without a name" },
];
"#;

const SEARCH_MD: &str = r#"# Search

export const alternatives = [
  { name: 'DuckDuckGo', replaces: ['Google Search'], rank: 7 },
  { name: 'tuta', description: 'listed twice' },
];
"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("email.md"), EMAIL_MD).unwrap();
    fs::write(data_dir.join("search.md"), SEARCH_MD).unwrap();
    fs::write(data_dir.join("ISSUE_TEMPLATE.md"), "[{ name: 'Ignored' }]").unwrap();

    let config_content = format!(
        r#"[discovery]
root = "{}/data"

[cache]
ttl_secs = 3600

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("altnav.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_altnav(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = altnav_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run altnav binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_sources_lists_discovered_documents() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_altnav(&config_path, &["sources"]);
    assert!(success, "sources failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("email.md"));
    assert!(stdout.contains("search.md"));
    assert!(stdout.contains("Email"));
    assert!(!stdout.contains("ISSUE_TEMPLATE"));
}

#[test]
fn test_sources_check() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_altnav(&config_path, &["sources", "--check"]);
    assert!(success);
    assert!(stdout.contains("OK"));
    assert!(!stdout.contains("UNAVAILABLE"));
}

#[test]
fn test_ingest_report() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_altnav(&config_path, &["ingest"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents available: 2"));
    assert!(stdout.contains("records: 3"));
    assert!(stdout.contains("malformed blocks: 1"));
    assert!(stdout.contains("duplicates: 1"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_json() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_altnav(&config_path, &["ingest", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["status"], "ready");
    assert_eq!(value["report"]["records"], 3);
}

#[test]
fn test_ingest_check_fails_when_nothing_readable() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("data/email.md")).unwrap();
    fs::remove_file(tmp.path().join("data/search.md")).unwrap();
    fs::write(
        &config_path,
        format!(
            "[[documents]]\nid = \"gone\"\npath = \"{}/data/gone.md\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (stdout, _, success) = run_altnav(&config_path, &["ingest"]);
    assert!(success, "ingest without --check should not fail");
    assert!(stdout.contains("data unavailable"));

    let (_, stderr, success) = run_altnav(&config_path, &["ingest", "--check"]);
    assert!(!success, "ingest --check should fail");
    assert!(stderr.contains("unavailable"));
}

#[test]
fn test_search_by_alias() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_altnav(&config_path, &["search", "gmail"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("2 result(s)"));
    let tuta = stdout.find("Tuta").unwrap();
    let posteo = stdout.find("Posteo").unwrap();
    assert!(tuta < posteo, "results should be ordered by rank: {}", stdout);
}

#[test]
fn test_search_by_category() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_altnav(&config_path, &["search", "--category", "search"]);
    assert!(success);
    assert!(stdout.contains("DuckDuckGo"));
    assert!(!stdout.contains("Posteo"));
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_altnav(&config_path, &["search", ""]);
    assert!(success, "Empty query should not panic");
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_altnav(&config_path, &["search", "xyznonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout1, _, _) = run_altnav(&config_path, &["search", "tuta"]);
    let (stdout2, _, _) = run_altnav(&config_path, &["search", "tuta"]);
    assert_eq!(
        stdout1, stdout2,
        "Search results should be deterministic across runs"
    );
}

#[test]
fn test_stats_json() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_altnav(&config_path, &["stats", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["records"], 3);
    assert_eq!(value["documents"].as_array().unwrap().len(), 2);
}

#[test]
fn test_parse_without_config() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("email.md");
    fs::write(&file, EMAIL_MD).unwrap();
    let missing_config = tmp.path().join("missing.toml");

    let (stdout, stderr, success) =
        run_altnav(&missing_config, &["parse", file.to_str().unwrap()]);
    assert!(success, "parse failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Tuta"));
    assert!(stdout.contains("blocks: 3"));
    assert!(stdout.contains("records: 2"));
    assert!(stdout.contains("malformed blocks: 1"));
}

#[test]
fn test_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let missing_config = tmp.path().join("missing.toml");

    let (_, _, success) = run_altnav(&missing_config, &["ingest"]);
    assert!(!success);
}
