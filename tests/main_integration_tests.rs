//! Integration tests for the search service.
//!
//! These tests verify:
//! - Configuration loading from environment variables
//! - Building indexes from metadata and loading them back
//! - Routed search over both datasets
//! - The HTTP API and the healthcheck client
//!
//! Note: These tests use the hash embedder to avoid downloading the ONNX model.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serial_test::serial;
use tower::ServiceExt;

use startup_search::config::Config;
use startup_search::error::ServiceError;
use startup_search::http::{self, AppState};
use startup_search::router::Dataset;
use startup_search::search::{
    embedder_from_config, HashEmbedder, MetadataStore, SearchEngine, VectorIndex,
};

/// Test helper to set environment variables for a test
struct TestEnv {
    vars_to_restore: Vec<(String, Option<String>)>,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            vars_to_restore: Vec::new(),
        }
    }

    fn set_var(&mut self, key: &str, value: &str) {
        let old_value = std::env::var(key).ok();
        self.vars_to_restore.push((key.to_string(), old_value));
        std::env::set_var(key, value);
    }

    fn remove_var(&mut self, key: &str) {
        let old_value = std::env::var(key).ok();
        self.vars_to_restore.push((key.to_string(), old_value));
        std::env::remove_var(key);
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        for (key, old_value) in self.vars_to_restore.iter().rev() {
            match old_value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn sample_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Copy the bundled metadata into `dir` and build both indexes with the hash embedder.
fn build_fixture(dir: &Path) -> Config {
    let mut config = Config::for_data_dir(dir);
    config.mock_embedder = true;

    let embedder = HashEmbedder::new();
    for dataset in Dataset::ALL {
        let (index_path, metadata_path) = config.artifact_paths(dataset);
        let source = sample_data_dir().join(format!("{}_metadata.json", dataset));
        std::fs::copy(&source, metadata_path).expect("copy sample metadata");

        let metadata = MetadataStore::load(metadata_path).expect("load sample metadata");
        VectorIndex::build(&embedder, &metadata, 4)
            .expect("build index")
            .save(index_path)
            .expect("save index");
    }

    config
}

fn load_engine(config: &Config) -> Arc<SearchEngine> {
    let embedder = embedder_from_config(config).expect("mock embedder");
    Arc::new(SearchEngine::load(config, embedder).expect("engine loads"))
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[test]
#[serial]
fn test_config_loading_with_mock_embedder() {
    let mut env = TestEnv::new();
    env.set_var("MOCK_EMBEDDER", "true");
    env.set_var("HTTP_PORT", "8600");
    env.set_var("METRICS_PORT", "9191");

    let config = Config::from_env().expect("Config should load");

    assert!(config.mock_embedder);
    assert_eq!(config.http_port, 8600);
    assert_eq!(config.metrics_port, 9191);
}

#[test]
#[serial]
fn test_invalid_port_falls_back_to_default() {
    let mut env = TestEnv::new();
    env.set_var("HTTP_PORT", "invalid_port");
    env.remove_var("METRICS_PORT");

    let config = Config::from_env().expect("Config should use default port on parse failure");

    assert_eq!(config.http_port, 8501);
    assert_eq!(config.metrics_port, 9090);
}

#[test]
#[serial]
fn test_mock_embedder_flag_values() {
    let mut env = TestEnv::new();

    env.set_var("MOCK_EMBEDDER", "TRUE");
    assert!(Config::from_env().unwrap().mock_embedder);

    env.set_var("MOCK_EMBEDDER", "1");
    assert!(Config::from_env().unwrap().mock_embedder);

    env.set_var("MOCK_EMBEDDER", "false");
    assert!(!Config::from_env().unwrap().mock_embedder);
}

#[test]
#[serial]
fn test_default_top_k_is_clamped() {
    let mut env = TestEnv::new();

    env.set_var("DEFAULT_TOP_K", "50");
    assert_eq!(Config::from_env().unwrap().default_top_k, 10);

    env.set_var("DEFAULT_TOP_K", "0");
    assert_eq!(Config::from_env().unwrap().default_top_k, 1);

    env.set_var("DEFAULT_TOP_K", "three");
    assert_eq!(Config::from_env().unwrap().default_top_k, 5);
}

#[test]
#[serial]
fn test_artifact_path_overrides() {
    let mut env = TestEnv::new();
    env.set_var("DATA_DIR", "/srv/search");
    env.set_var("DOMAIN_INDEX_PATH", "/mnt/indexes/domain-v2.index");
    env.remove_var("MEETING_INDEX_PATH");

    let config = Config::from_env().expect("Config should load");

    assert_eq!(config.meeting_index_path, PathBuf::from("/srv/search/meeting.index"));
    assert_eq!(config.domain_index_path, PathBuf::from("/mnt/indexes/domain-v2.index"));
}

#[test]
#[serial]
fn test_empty_data_dir_is_rejected() {
    let mut env = TestEnv::new();
    env.set_var("DATA_DIR", "  ");

    assert!(Config::from_env().is_err());
}

#[test]
fn test_built_indexes_cover_bundled_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_fixture(dir.path());
    let engine = load_engine(&config);

    let meeting = engine.dataset(Dataset::Meeting);
    assert_eq!(meeting.index().len(), meeting.metadata().len());
    assert_eq!(meeting.index().embedder(), "hash");

    let domain = engine.dataset(Dataset::Domain);
    assert_eq!(domain.index().len(), domain.metadata().len());
}

#[test]
fn test_routed_search_examples() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));

    let outcome = engine
        .search_routed("Which startups raised funding?", 5)
        .unwrap();
    assert_eq!(outcome.dataset, Dataset::Meeting);
    assert!(!outcome.hits.is_empty() && outcome.hits.len() <= 5);

    let outcome = engine
        .search_routed("Looking for AI domain experts", 3)
        .unwrap();
    assert_eq!(outcome.dataset, Dataset::Domain);
    assert_eq!(outcome.hits.len(), 3);
    assert_eq!(outcome.hits[0].record.startup, "Nimbus Vision");
}

#[test]
fn test_unlabelled_record_renders_as_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));

    let hits = engine
        .search(
            Dataset::Meeting,
            "Unlabelled call about a stealth-mode fintech startup building treasury tools for small businesses.",
            1,
        )
        .unwrap();

    assert_eq!(hits[0].ordinal, 7);
    assert_eq!(hits[0].record.startup, "Unknown");

    let rendered = startup_search::present::render_hits(&hits);
    assert!(rendered.starts_with("### 1. Unknown\n**Source:** meeting_notes\n"));
}

#[test]
fn test_results_sorted_and_prefix_stable() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));
    let query = "seed round for robots and solar clinics";

    let five = engine.search(Dataset::Meeting, query, 5).unwrap();
    let three = engine.search(Dataset::Meeting, query, 3).unwrap();

    assert_eq!(five.len(), 5);
    for pair in five.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    let five_prefix: Vec<f32> = five.iter().take(3).map(|h| h.distance).collect();
    let three_all: Vec<f32> = three.iter().map(|h| h.distance).collect();
    assert_eq!(five_prefix, three_all);
}

#[test]
fn test_missing_index_is_fatal_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_fixture(dir.path());
    std::fs::remove_file(&config.domain_index_path).unwrap();

    let embedder = embedder_from_config(&config).unwrap();
    let result = SearchEngine::load(&config, embedder);
    assert!(matches!(result, Err(ServiceError::IndexNotFound(_))));
}

#[tokio::test]
async fn test_http_search_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));
    let app = http::app(AppState::new(engine, 5));

    let (status, body) = get_json(
        app,
        "/search?q=Which%20startups%20raised%20funding%3F&k=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"], "meeting");
    assert_eq!(body["total_hits"], 3);
    assert_eq!(body["hits"][0]["rank"], 1);
    assert!(body["hits"][0]["text"].is_string());
}

#[tokio::test]
async fn test_http_search_uses_default_k() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));
    let app = http::app(AppState::new(engine, 2));

    let (status, body) = get_json(app, "/search?q=looking%20for%20partners").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"], "domain");
    assert_eq!(body["total_hits"], 2);
}

#[tokio::test]
async fn test_http_rejects_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));
    let app = http::app(AppState::new(engine, 5));

    let (status, body) = get_json(app.clone(), "/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));

    let (status, body) = get_json(app.clone(), "/search?q=founder&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("k must be between"));

    // Malformed k is rejected with the same JSON error shape
    for uri in ["/search?q=founder&k=many", "/search?q=founder&k=-1"] {
        let (status, body) = get_json(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(
            body["error"].as_str().unwrap().contains("Invalid query string"),
            "{}",
            uri
        );
    }
}

#[tokio::test]
async fn test_health_endpoint_and_probe() {
    let dir = tempfile::tempdir().unwrap();
    let engine = load_engine(&build_fixture(dir.path()));
    let state = AppState::new(engine, 5);

    let (status, body) = get_json(http::app(state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
    assert_eq!(body["meeting_records"], 8);
    assert_eq!(body["domain_records"], 6);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(http::serve(listener, state));

    let health = tokio::time::timeout(
        Duration::from_secs(5),
        http::probe_health(&format!("http://127.0.0.1:{}", port)),
    )
    .await
    .expect("probe should not time out")
    .expect("service should be healthy");
    assert_eq!(health.embedder, "hash");

    server.abort();
}

#[tokio::test]
async fn test_probe_against_unavailable_service_fails() {
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        http::probe_health("http://127.0.0.1:1"),
    )
    .await;

    // Either timeout or connection failure
    assert!(result.is_err() || result.unwrap().is_err());
}

#[tokio::test]
async fn test_bind_listener_explicit_ipv4() {
    let listener = http::bind_listener("127.0.0.1", 0).await.unwrap();
    assert!(listener.local_addr().unwrap().is_ipv4());

    assert!(http::bind_listener("not-an-address", 0).await.is_err());
}
