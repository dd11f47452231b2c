use std::sync::Arc;

use super::*;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, Default)]
struct CapturedForm {
    fields: Vec<(String, String)>,
    files: Vec<(String, Vec<u8>)>,
}

impl CapturedForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone)]
struct StubState {
    reply: Arc<Mutex<(StatusCode, String)>>,
    forms: Arc<Mutex<Vec<CapturedForm>>>,
    json_bodies: Arc<Mutex<Vec<Value>>>,
    hits: Arc<Mutex<u32>>,
}

impl StubState {
    async fn last_form(&self) -> CapturedForm {
        self.forms.lock().await.last().cloned().unwrap_or_default()
    }
}

async fn capture_form(
    State(state): State<StubState>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    *state.hits.lock().await += 1;
    let mut captured = CapturedForm::default();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await.expect("field bytes").to_vec();
        match file_name {
            Some(file_name) => {
                assert_eq!(name, "files");
                captured.files.push((file_name, bytes));
            }
            None => captured
                .fields
                .push((name, String::from_utf8(bytes).expect("utf8 field"))),
        }
    }
    state.forms.lock().await.push(captured);
    state.reply.lock().await.clone()
}

async fn capture_json(
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    *state.hits.lock().await += 1;
    state.json_bodies.lock().await.push(body);
    state.reply.lock().await.clone()
}

async fn reply_only(State(state): State<StubState>) -> (StatusCode, String) {
    *state.hits.lock().await += 1;
    state.reply.lock().await.clone()
}

async fn spawn_stub(status: StatusCode, body: String) -> (HttpGateway, StubState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = StubState {
        reply: Arc::new(Mutex::new((status, body))),
        forms: Arc::new(Mutex::new(Vec::new())),
        json_bodies: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(Mutex::new(0)),
    };
    let app = Router::new()
        .route("/inspect", post(capture_form))
        .route("/merge", post(capture_form))
        .route("/cleanup", post(capture_form))
        .route("/mapping", get(reply_only).post(capture_json))
        .route("/download/:task_id", get(reply_only))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let gateway = HttpGateway::new(&format!("http://{addr}")).expect("gateway");
    (gateway, state)
}

async fn spawn_json_stub(status: StatusCode, body: Value) -> (HttpGateway, StubState) {
    spawn_stub(status, body.to_string()).await
}

fn write_upload(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> UploadFile {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write upload");
    UploadFile {
        name: name.to_string(),
        path,
    }
}

#[tokio::test]
async fn inspect_uploads_files_with_flags_and_parses_report() {
    let (gateway, stub) = spawn_json_stub(
        StatusCode::OK,
        json!({
            "ok": true,
            "columns": [
                { "name": "来源文件", "is_meta": true, "sources": ["a.xlsx-Sheet1"] },
                { "name": "amount", "is_meta": false, "sources": ["a.xlsx-Sheet1"] }
            ],
            "previews": [
                { "file": "a.xlsx", "sheet": "Sheet1", "columns": ["amount"], "rows": [{ "amount": 4 }] }
            ],
            "mapping": { "a.xlsx-Sheet1": { "Amt": "amount" } }
        }),
    )
    .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let files = vec![
        write_upload(&dir, "a.xlsx", b"first"),
        write_upload(&dir, "b.csv", b"second"),
    ];

    let report = gateway
        .inspect(InspectRequest {
            files,
            normalize: true,
            fuzzy: false,
        })
        .await
        .expect("inspect");

    assert_eq!(report.columns.len(), 2);
    assert!(report.columns[0].is_meta);
    assert_eq!(report.previews[0].file, "a.xlsx");
    assert_eq!(report.mapping.len(), 1);

    let form = stub.last_form().await;
    assert_eq!(
        form.files,
        vec![
            ("a.xlsx".to_string(), b"first".to_vec()),
            ("b.csv".to_string(), b"second".to_vec()),
        ]
    );
    assert_eq!(form.field("normalize_columns"), Some("on"));
    assert_eq!(form.field("enable_fuzzy"), None);
}

#[tokio::test]
async fn inspect_surfaces_application_error_verbatim() {
    let (gateway, _stub) =
        spawn_json_stub(StatusCode::OK, json!({ "ok": false, "error": "X" })).await;
    let dir = tempfile::tempdir().expect("tempdir");

    let err = gateway
        .inspect(InspectRequest {
            files: vec![write_upload(&dir, "a.xlsx", b"data")],
            normalize: false,
            fuzzy: false,
        })
        .await
        .expect_err("must fail");

    assert_eq!(err, GatewayError::Rejected(Some("X".to_string())));
    assert_eq!(err.status_text("Inspect"), "X");
}

#[tokio::test]
async fn non_success_status_is_reported_with_its_code() {
    let (gateway, _stub) = spawn_json_stub(
        StatusCode::PAYLOAD_TOO_LARGE,
        json!({ "ok": false, "error": "upload too large" }),
    )
    .await;
    let dir = tempfile::tempdir().expect("tempdir");

    let err = gateway
        .inspect(InspectRequest {
            files: vec![write_upload(&dir, "a.xlsx", b"data")],
            normalize: false,
            fuzzy: false,
        })
        .await
        .expect_err("must fail");

    assert_eq!(
        err,
        GatewayError::Http {
            status: 413,
            detail: Some("upload too large".to_string()),
        }
    );
    assert!(err.status_text("Inspect").contains("413"));
}

#[tokio::test]
async fn non_json_error_page_keeps_status_without_detail() {
    let (gateway, _stub) =
        spawn_stub(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>".to_string()).await;

    let err = gateway.cleanup(CleanupTarget::Temp).await.expect_err("fail");
    assert_eq!(
        err,
        GatewayError::Http {
            status: 502,
            detail: None,
        }
    );
}

#[tokio::test]
async fn unexpected_body_shape_is_a_malformed_response() {
    let (gateway, _stub) =
        spawn_json_stub(StatusCode::OK, json!({ "ok": true, "columns": "nope" })).await;
    let dir = tempfile::tempdir().expect("tempdir");

    let err = gateway
        .inspect(InspectRequest {
            files: vec![write_upload(&dir, "a.xlsx", b"data")],
            normalize: false,
            fuzzy: false,
        })
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), shared::error::FailureKind::MalformedResponse);
}

#[tokio::test]
async fn empty_file_list_is_refused_without_a_request() {
    let (gateway, stub) = spawn_json_stub(StatusCode::OK, json!({ "ok": true })).await;

    let err = gateway
        .inspect(InspectRequest {
            files: Vec::new(),
            normalize: true,
            fuzzy: true,
        })
        .await
        .expect_err("must fail");

    assert_eq!(err, GatewayError::EmptySelection);
    assert_eq!(*stub.hits.lock().await, 0);
}

#[tokio::test]
async fn unreadable_upload_is_a_local_io_failure() {
    let (gateway, stub) = spawn_json_stub(StatusCode::OK, json!({ "ok": true })).await;
    let dir = tempfile::tempdir().expect("tempdir");

    let err = gateway
        .inspect(InspectRequest {
            files: vec![UploadFile {
                name: "gone.xlsx".to_string(),
                path: dir.path().join("gone.xlsx"),
            }],
            normalize: false,
            fuzzy: false,
        })
        .await
        .expect_err("must fail");

    assert!(matches!(err, GatewayError::LocalIo(_)));
    assert_eq!(*stub.hits.lock().await, 0);
}

#[tokio::test]
async fn merge_always_sends_keys_exclusions_and_format() {
    let (gateway, stub) = spawn_json_stub(
        StatusCode::OK,
        json!({ "ok": true, "task_id": "t-1", "download_url": "/download/t-1" }),
    )
    .await;
    let dir = tempfile::tempdir().expect("tempdir");

    let receipt = gateway
        .merge(MergeRequest {
            files: vec![write_upload(&dir, "a.xlsx", b"data")],
            options: MergeOptions {
                normalize: true,
                fuzzy: true,
                remove_duplicates: false,
                smart_dedup: true,
                dedup_keys: "  id, email ".to_string(),
                excluded_columns: ["notes", "comment"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                output_format: OutputFormat::Csv,
            },
        })
        .await
        .expect("merge");

    assert_eq!(
        receipt.download_url,
        format!("{}download/t-1", gateway.base_url())
    );
    assert_eq!(receipt.task_id.as_deref(), Some("t-1"));
    assert_eq!(receipt.output_format, OutputFormat::Csv);

    let form = stub.last_form().await;
    assert_eq!(form.field("normalize_columns"), Some("on"));
    assert_eq!(form.field("enable_fuzzy"), Some("on"));
    assert_eq!(form.field("remove_duplicates"), None);
    assert_eq!(form.field("smart_dedup"), Some("on"));
    assert_eq!(form.field("dedup_keys"), Some("id, email"));
    assert_eq!(form.field("exclude_columns"), Some("comment,notes"));
    assert_eq!(form.field("output_format"), Some("csv"));
}

#[tokio::test]
async fn merge_sends_empty_keys_and_exclusions_when_unset() {
    let (gateway, stub) = spawn_json_stub(
        StatusCode::OK,
        json!({ "ok": true, "download_url": "/download/t-2" }),
    )
    .await;
    let dir = tempfile::tempdir().expect("tempdir");

    gateway
        .merge(MergeRequest {
            files: vec![write_upload(&dir, "a.xlsx", b"data")],
            options: MergeOptions::default(),
        })
        .await
        .expect("merge");

    let form = stub.last_form().await;
    assert_eq!(form.field("dedup_keys"), Some(""));
    assert_eq!(form.field("exclude_columns"), Some(""));
    assert_eq!(form.field("output_format"), Some("xlsx"));
}

#[tokio::test]
async fn merge_success_without_link_is_malformed() {
    let (gateway, _stub) = spawn_json_stub(StatusCode::OK, json!({ "ok": true })).await;
    let dir = tempfile::tempdir().expect("tempdir");

    let err = gateway
        .merge(MergeRequest {
            files: vec![write_upload(&dir, "a.xlsx", b"data")],
            options: MergeOptions::default(),
        })
        .await
        .expect_err("must fail");

    assert!(matches!(err, GatewayError::MalformedResponse(_)));
}

#[tokio::test]
async fn load_mapping_returns_the_mapping_object() {
    let (gateway, _stub) = spawn_json_stub(
        StatusCode::OK,
        json!({ "ok": true, "mappings": { "amount": ["Amt", "金额"] } }),
    )
    .await;

    let mappings = gateway.load_mapping().await.expect("load");
    assert_eq!(mappings, json!({ "amount": ["Amt", "金额"] }));
}

#[tokio::test]
async fn load_mapping_rejects_non_object_payload() {
    let (gateway, _stub) =
        spawn_json_stub(StatusCode::OK, json!({ "ok": true, "mappings": [1, 2] })).await;

    let err = gateway.load_mapping().await.expect_err("must fail");
    assert!(matches!(err, GatewayError::MalformedResponse(_)));
}

#[tokio::test]
async fn save_mapping_posts_wrapped_json() {
    let (gateway, stub) = spawn_json_stub(StatusCode::OK, json!({ "ok": true })).await;

    gateway
        .save_mapping(json!({ "amount": ["Amt"] }))
        .await
        .expect("save");

    let bodies = stub.json_bodies.lock().await;
    assert_eq!(bodies.as_slice(), &[json!({ "mappings": { "amount": ["Amt"] } })]);
}

#[tokio::test]
async fn save_mapping_rejection_carries_server_reason() {
    let (gateway, _stub) = spawn_json_stub(
        StatusCode::OK,
        json!({ "ok": false, "error": "mapping amount must be a list" }),
    )
    .await;

    let err = gateway
        .save_mapping(json!({ "amount": "Amt" }))
        .await
        .expect_err("must fail");
    assert_eq!(err.server_message(), Some("mapping amount must be a list"));
}

#[tokio::test]
async fn cleanup_sends_target_and_reports_partial_errors() {
    let (gateway, stub) = spawn_json_stub(
        StatusCode::OK,
        json!({ "ok": true, "removed": 5, "errors": ["could not delete x.log"] }),
    )
    .await;

    let report = gateway.cleanup(CleanupTarget::Logs).await.expect("cleanup");
    assert_eq!(
        report,
        CleanupReport {
            removed: 5,
            errors: vec!["could not delete x.log".to_string()],
        }
    );
    assert_eq!(stub.last_form().await.field("target"), Some("logs"));
}

#[tokio::test]
async fn download_fetches_result_bytes_from_relative_link() {
    let (gateway, _stub) = spawn_stub(StatusCode::OK, "id,amount\n1,4\n".to_string()).await;

    let bytes = gateway.download("/download/t-9").await.expect("download");
    assert_eq!(bytes, b"id,amount\n1,4\n".to_vec());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = HttpGateway::new(&format!("http://{addr}")).expect("gateway");
    let err = gateway.cleanup(CleanupTarget::Logs).await.expect_err("fail");

    assert!(matches!(err, GatewayError::Transport(_)));
    assert_eq!(
        err.status_text("Cleanup"),
        "Cleanup request failed, please retry later."
    );
}

#[test]
fn rejects_unusable_server_urls() {
    assert!(matches!(
        HttpGateway::new("not a url"),
        Err(GatewayError::InvalidInput(_))
    ));
    assert!(matches!(
        HttpGateway::new("mailto:ops@example.com"),
        Err(GatewayError::InvalidInput(_))
    ));
}

#[test]
fn resolves_links_against_server_url() {
    let gateway = HttpGateway::new("http://127.0.0.1:8000").expect("gateway");
    assert_eq!(
        gateway.resolve("/download/abc").expect("resolve").as_str(),
        "http://127.0.0.1:8000/download/abc"
    );
    assert_eq!(
        gateway
            .resolve("https://files.example.com/r.xlsx")
            .expect("resolve")
            .as_str(),
        "https://files.example.com/r.xlsx"
    );
}
