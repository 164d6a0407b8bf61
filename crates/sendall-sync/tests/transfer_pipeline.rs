//! Integration test: transfer.sh upload/delete through the pipelines,
//! including partial failure and the record-keeping rules for deletion.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sendall_core::config::{PipelineConfig, TransferConfig};
use sendall_core::{LinkRecord, SendallError};
use sendall_sync::{
    build_http_client, delete_links, submit_files, Backend, LinkStore, Receipt, TransferShClient,
    TRANSFERSH_BUCKET,
};

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn backend(host: &str) -> Backend {
    backend_with_client(host, reqwest::Client::new())
}

fn backend_with_client(host: &str, http: reqwest::Client) -> Backend {
    let config = TransferConfig {
        host: host.to_string(),
        max_downloads: 3,
        max_days: 2,
    };
    Backend::TransferSh(TransferShClient::new(http, config).unwrap())
}

fn stored_public_urls(store: &LinkStore) -> Vec<String> {
    store
        .list(TRANSFERSH_BUCKET)
        .unwrap()
        .into_iter()
        .map(|r| r.public_url)
        .collect()
}

fn open_store(tmp: &TempDir) -> Arc<LinkStore> {
    Arc::new(LinkStore::open(&tmp.path().join("sendall.db")).unwrap())
}

async fn mount_upload(server: &MockServer, name: &str) {
    let public = format!("{}/dl/{name}", server.uri());
    let delete = format!("{}/del/{name}", server.uri());
    Mock::given(method("PUT"))
        .and(path(format!("/{name}")))
        .and(header("Max-Downloads", "3"))
        .and(header("Max-Days", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Url-Delete", delete.as_str())
                .set_body_string(format!("{public}\n")),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn upload_records_public_and_delete_links() {
    let server = MockServer::start().await;
    mount_upload(&server, "report.txt").await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let file = write_file(tmp.path(), "report.txt", b"quarterly numbers");

    let report = submit_files(
        &backend(&server.uri()),
        &store,
        &[file],
        &PipelineConfig::default(),
        &CancellationToken::new(),
        None,
    )
    .await;
    report.ensure_success().unwrap();

    let expected = LinkRecord::new(
        format!("{}/dl/report.txt", server.uri()),
        format!("{}/del/report.txt", server.uri()),
    );
    let submitted = report.records[0].outcome.as_ref().unwrap();
    assert!(matches!(&submitted.receipt, Receipt::TransferSh(r) if *r == expected));
    assert_eq!(store.list(TRANSFERSH_BUCKET).unwrap(), vec![expected]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, b"quarterly numbers");
}

#[tokio::test]
async fn second_of_three_fails() {
    let server = MockServer::start().await;
    mount_upload(&server, "a.txt").await;
    mount_upload(&server, "c.txt").await;
    Mock::given(method("PUT"))
        .and(path("/b.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let files: Vec<PathBuf> = ["a.txt", "b.txt", "c.txt"]
        .iter()
        .map(|name| write_file(tmp.path(), name, name.as_bytes()))
        .collect();

    let report = submit_files(
        &backend(&server.uri()),
        &store,
        &files,
        &PipelineConfig {
            workers: 2,
            ..PipelineConfig::default()
        },
        &CancellationToken::new(),
        None,
    )
    .await;

    assert!(report.records[0].outcome.is_ok());
    assert!(matches!(
        report.records[1].outcome,
        Err(SendallError::Protocol(_))
    ));
    assert!(report.records[2].outcome.is_ok());
    assert!(matches!(
        report.ensure_success(),
        Err(SendallError::Batch {
            failed: 1,
            total: 3
        })
    ));

    assert_eq!(
        stored_public_urls(&store),
        vec![
            format!("{}/dl/a.txt", server.uri()),
            format!("{}/dl/c.txt", server.uri()),
        ]
    );
}

#[tokio::test]
async fn transport_failure_on_second_file() {
    let server = MockServer::start().await;
    mount_upload(&server, "a.txt").await;
    mount_upload(&server, "c.txt").await;
    Mock::given(method("PUT"))
        .and(path("/b.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Url-Delete", "https://t/del/b")
                .set_body_string("https://t/dl/b")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let files: Vec<PathBuf> = ["a.txt", "b.txt", "c.txt"]
        .iter()
        .map(|name| write_file(tmp.path(), name, name.as_bytes()))
        .collect();

    let config = PipelineConfig {
        request_timeout_secs: 1,
        ..PipelineConfig::default()
    };
    let http = build_http_client(&config).unwrap();

    let report = submit_files(
        &backend_with_client(&server.uri(), http),
        &store,
        &files,
        &config,
        &CancellationToken::new(),
        None,
    )
    .await;

    assert_eq!(report.failure_count(), 1);
    assert!(report.records[0].outcome.is_ok());
    assert!(
        matches!(report.records[1].outcome, Err(SendallError::Network(_))),
        "{:?}",
        report.records[1].outcome
    );
    assert!(report.records[2].outcome.is_ok());
    assert_eq!(
        stored_public_urls(&store),
        vec![
            format!("{}/dl/a.txt", server.uri()),
            format!("{}/dl/c.txt", server.uri()),
        ]
    );
}

#[tokio::test]
async fn path_without_file_name_does_not_cancel_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/good.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Url-Delete", "https://t/del/good")
                .set_body_string("https://t/dl/good")
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let files = vec![
        PathBuf::from("/"),
        write_file(tmp.path(), "good.txt", b"fine"),
    ];

    let report = submit_files(
        &backend(&server.uri()),
        &store,
        &files,
        &PipelineConfig::default(),
        &CancellationToken::new(),
        None,
    )
    .await;

    assert!(matches!(
        report.records[0].outcome,
        Err(SendallError::InvalidInput(_))
    ));
    assert!(
        report.records[1].outcome.is_ok(),
        "{:?}",
        report.records[1].outcome
    );
    assert_eq!(stored_public_urls(&store), vec!["https://t/dl/good".to_string()]);
}

#[tokio::test]
async fn missing_delete_header_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://t/x"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let file = write_file(tmp.path(), "x", b"x");

    let report = submit_files(
        &backend(&server.uri()),
        &store,
        &[file],
        &PipelineConfig::default(),
        &CancellationToken::new(),
        None,
    )
    .await;

    assert!(matches!(
        report.records[0].outcome,
        Err(SendallError::Protocol(_))
    ));
    assert!(store.list(TRANSFERSH_BUCKET).unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_file_fails_alone() {
    let server = MockServer::start().await;
    mount_upload(&server, "ok.txt").await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let files = vec![
        tmp.path().join("missing.txt"),
        write_file(tmp.path(), "ok.txt", b"fine"),
    ];

    let report = submit_files(
        &backend(&server.uri()),
        &store,
        &files,
        &PipelineConfig::default(),
        &CancellationToken::new(),
        None,
    )
    .await;

    assert!(matches!(report.records[0].outcome, Err(SendallError::Io(_))));
    assert!(report.records[1].outcome.is_ok());
    assert_eq!(store.list(TRANSFERSH_BUCKET).unwrap().len(), 1);
}

#[tokio::test]
async fn delete_without_record_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);

    let report = delete_links(
        &backend(&server.uri()),
        &store,
        &["https://t/never-posted".to_string()],
        &PipelineConfig::default(),
        &CancellationToken::new(),
        None,
    )
    .await;

    assert!(matches!(
        &report.records[0].outcome,
        Err(SendallError::NoRecord(url)) if url == "https://t/never-posted"
    ));
}

#[tokio::test]
async fn delete_failure_keeps_record_success_removes_it() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/del/gone"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/del/stuck"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let gone = format!("{}/dl/gone", server.uri());
    let stuck = format!("{}/dl/stuck", server.uri());
    store
        .put(TRANSFERSH_BUCKET, &gone, &format!("{}/del/gone", server.uri()))
        .unwrap();
    store
        .put(TRANSFERSH_BUCKET, &stuck, &format!("{}/del/stuck", server.uri()))
        .unwrap();

    let report = delete_links(
        &backend(&server.uri()),
        &store,
        &[gone.clone(), stuck.clone(), "https://t/unknown".to_string()],
        &PipelineConfig::default(),
        &CancellationToken::new(),
        None,
    )
    .await;

    assert!(report.records[0].outcome.is_ok());
    assert!(matches!(
        report.records[1].outcome,
        Err(SendallError::Protocol(_))
    ));
    assert!(matches!(
        report.records[2].outcome,
        Err(SendallError::NoRecord(_))
    ));
    assert!(matches!(
        report.ensure_success(),
        Err(SendallError::Batch {
            failed: 2,
            total: 3
        })
    ));

    assert_eq!(store.get(TRANSFERSH_BUCKET, &gone).unwrap(), None);
    assert!(store.get(TRANSFERSH_BUCKET, &stuck).unwrap().is_some());
}
