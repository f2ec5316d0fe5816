//! End-to-end tests for dscache-core.
//!
//! Exercises the session coordinator against temporary databases and an
//! in-process HTTP endpoint serving canned dataset documents.

use async_trait::async_trait;
use dscache_core::config::{Config, LogConfig, SourceConfig, StoreConfig};
use dscache_core::fetch::{DatasetSource, HttpSource};
use dscache_core::{Dataset, Error, FetchError, Session};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn dataset(version: &str) -> Dataset {
    serde_json::from_value(serde_json::json!({
        "easy": [{"text": "a"}],
        "hard": [
            {"id": 1, "text": "x", "score": 2.5, "note": null},
            {"id": 2, "text": "y", "score": 3.5, "note": "n"},
        ],
        "version": version,
    }))
    .expect("valid dataset")
}

fn config_for(dir: &TempDir, url: &str) -> Config {
    Config {
        source: SourceConfig {
            url: url.into(),
            request_timeout_secs: 5,
        },
        store: StoreConfig {
            path: dir.path().join("cache.redb"),
            ..StoreConfig::default()
        },
        log: LogConfig::default(),
    }
}

/// In-process source that counts fetches.
struct CountingSource {
    dataset: Dataset,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new(dataset: Dataset) -> Arc<Self> {
        Arc::new(Self {
            dataset,
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DatasetSource for CountingSource {
    async fn fetch(&self) -> Result<Dataset, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.dataset.clone())
    }
}

mod session_lifecycle {
    use super::*;

    /// Concurrent initializers collapse onto one fetch and all receive the
    /// identical resolved dataset.
    #[tokio::test]
    async fn test_concurrent_initialize_single_fetch() {
        let dir = TempDir::new().expect("temp dir");
        let source = CountingSource::new(dataset("t1"));
        let session = Arc::new(
            Session::with_source(config_for(&dir, "http://unused"), source.clone())
                .expect("session"),
        );

        let mut handles = Vec::new();
        for _ in 0..10 {
            let session = session.clone();
            handles.push(tokio::spawn(async move { session.initialize().await }));
        }

        let mut datasets = Vec::new();
        for handle in handles {
            datasets.push(handle.await.expect("join").expect("initialize"));
        }

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        for other in &datasets[1..] {
            assert!(Arc::ptr_eq(&datasets[0], other));
        }
    }

    /// A version change across sessions wipes and fully repopulates; the
    /// meta record reflects the new version afterward.
    #[tokio::test]
    async fn test_version_change_repopulates() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_for(&dir, "http://unused");

        let session = Session::with_source(config.clone(), CountingSource::new(dataset("t1")))
            .expect("session");
        session.initialize().await.expect("initialize v1");
        drop(session);

        // New session, new version: every store is rebuilt
        let bigger: Dataset = serde_json::from_value(serde_json::json!({
            "easy": [{"text": "a"}, {"text": "b"}],
            "version": "t2",
        }))
        .expect("valid dataset");
        let session =
            Session::with_source(config, CountingSource::new(bigger)).expect("session");
        session.initialize().await.expect("initialize v2");

        let store = session.open_handle().await.expect("handle");
        let meta = store.installed_version().expect("probe").expect("present");
        assert_eq!(meta.version, "t2");

        // Old collections are gone, new contents are complete
        assert_eq!(store.collection_names().expect("names"), vec!["easy"]);
        assert_eq!(store.keys("easy").expect("keys"), vec![0, 1]);
        assert!(store.keys("hard").expect("keys").is_empty());
    }

    /// An unchanged version across sessions takes the reuse path: store
    /// contents and meta record stay untouched.
    #[tokio::test]
    async fn test_unchanged_version_reuses() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_for(&dir, "http://unused");

        let session = Session::with_source(config.clone(), CountingSource::new(dataset("t1")))
            .expect("session");
        session.initialize().await.expect("initialize");
        let store = session.open_handle().await.expect("handle");
        let installed = store.installed_version().expect("probe").expect("present");
        drop(store);
        drop(session);

        let session = Session::with_source(config, CountingSource::new(dataset("t1")))
            .expect("session");
        session.initialize().await.expect("initialize again");

        let store = session.open_handle().await.expect("handle");
        let meta = store.installed_version().expect("probe").expect("present");
        assert_eq!(meta, installed, "reuse path must not rewrite the meta record");
        assert_eq!(store.keys("hard").expect("keys").len(), 2);
    }

    /// A database file corrupted between sessions (for example by a crash
    /// mid-write) is discarded on open, and initialization repopulates the
    /// fresh store instead of failing on every retry.
    #[tokio::test]
    async fn test_corrupt_store_recovers_on_initialize() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_for(&dir, "http://unused");
        std::fs::write(&config.store.path, b"\0\0garbage\0\0").expect("write garbage");

        let session = Session::with_source(config, CountingSource::new(dataset("t1")))
            .expect("session");
        session.initialize().await.expect("initialize");

        let store = session.open_handle().await.expect("handle");
        let meta = store.installed_version().expect("probe").expect("present");
        assert_eq!(meta.version, "t1");
        assert_eq!(store.keys("hard").expect("keys").len(), 2);
    }

    /// Records written during populate come back field-for-field equal.
    #[tokio::test]
    async fn test_record_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let source_dataset = dataset("t1");
        let session = Session::with_source(
            config_for(&dir, "http://unused"),
            CountingSource::new(source_dataset.clone()),
        )
        .expect("session");
        session.initialize().await.expect("initialize");

        let store = session.open_handle().await.expect("handle");
        for (index, expected) in source_dataset.collections["hard"].iter().enumerate() {
            let record = store
                .get("hard", index as u64)
                .expect("get")
                .expect("present");
            assert_eq!(&record, expected);
        }
    }

    /// A single-element collection serves its one record on every call
    /// (cycle of size 1).
    #[tokio::test]
    async fn test_single_element_collection() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::with_source(
            config_for(&dir, "http://unused"),
            CountingSource::new(dataset("t1")),
        )
        .expect("session");
        session.initialize().await.expect("initialize");

        for _ in 0..2 {
            let record = session
                .get_from_store("easy")
                .expect("read")
                .expect("present");
            assert_eq!(record["text"], "a");
        }
    }

    /// N distinct keys yield N distinct records before any repeat.
    #[tokio::test]
    async fn test_sampling_covers_collection() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::with_source(
            config_for(&dir, "http://unused"),
            CountingSource::new(dataset("t1")),
        )
        .expect("session");
        session.initialize().await.expect("initialize");

        let mut texts = std::collections::HashSet::new();
        for _ in 0..2 {
            let record = session
                .get_from_store("hard")
                .expect("read")
                .expect("present");
            texts.insert(record["text"].as_str().expect("text").to_string());
        }
        assert_eq!(texts.len(), 2, "both records served before any repeat");
    }
}

mod http_source {
    use super::*;

    /// Serve exactly one canned HTTP response, then close.
    async fn one_shot_server(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");

            // Drain the request head before answering
            let mut buf = [0u8; 4096];
            let mut head = Vec::new();
            loop {
                let n = stream.read(&mut buf).await.expect("read");
                head.extend_from_slice(&buf[..n]);
                if n == 0 || head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len(),
            );
            stream
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            stream.shutdown().await.ok();
        });

        format!("http://{addr}/dataset.json")
    }

    #[tokio::test]
    async fn test_fetch_and_initialize_over_http() {
        let body = serde_json::to_string(&dataset("t1")).expect("serialize");
        let url = one_shot_server("200 OK", body).await;

        let dir = TempDir::new().expect("temp dir");
        let session = Session::new(config_for(&dir, &url)).expect("session");
        let fetched = session.initialize().await.expect("initialize");

        assert_eq!(fetched.version, "t1");
        let record = session
            .get_from_store("easy")
            .expect("read")
            .expect("present");
        assert_eq!(record["text"], "a");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let url = one_shot_server("503 Service Unavailable", String::new()).await;

        let config = SourceConfig {
            url,
            request_timeout_secs: 5,
        };
        let source = HttpSource::new(&config).expect("source");
        let err = source.fetch().await.expect_err("must fail");
        assert!(matches!(err, FetchError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let url = one_shot_server("200 OK", "{not json".to_string()).await;

        let config = SourceConfig {
            url,
            request_timeout_secs: 5,
        };
        let source = HttpSource::new(&config).expect("source");
        let err = source.fetch().await.expect_err("must fail");
        assert!(matches!(err, FetchError::Parse(_)));
    }

    /// A fetch failure surfaces from initialize and leaves no memo behind.
    #[tokio::test]
    async fn test_initialize_surfaces_fetch_failure() {
        let url = one_shot_server("500 Internal Server Error", String::new()).await;

        let dir = TempDir::new().expect("temp dir");
        let session = Session::new(config_for(&dir, &url)).expect("session");

        let err = session.initialize().await.expect_err("must fail");
        assert!(matches!(
            err,
            Error::Fetch(FetchError::Status { status: 500 })
        ));
    }
}
