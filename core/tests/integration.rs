//! End-to-end run of every client operation against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background runtime, then
//! drives `ProjectClient` over real HTTP with the default ureq transport.

use std::net::SocketAddr;

use mock_server::{MockProject, API_PATH, DEMO_TOKEN};
use rcap_core::{ApiError, ClientConfig, Credential, PdfExport, ProjectClient, RecordExport};
use serde_json::{json, Value};

fn start_server(project: MockProject) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, project).await
        })
        .unwrap();
    });

    addr
}

fn endpoint(addr: SocketAddr) -> String {
    format!("http://{addr}{API_PATH}")
}

#[test]
fn construction_caches_schema() {
    let addr = start_server(MockProject::demo());
    let client = ProjectClient::new(DEMO_TOKEN, &endpoint(addr)).unwrap();

    let schema = client.schema();
    assert_eq!(schema.len(), 4);
    assert_eq!(schema.forms(), vec!["enrollment", "demographics"]);
    assert_eq!(schema.get(2).unwrap().as_row(), ["demographics", "age", "text", "Age"]);
}

#[test]
fn rejected_token_is_request_error() {
    let addr = start_server(MockProject::demo());
    let err = ProjectClient::new("WRONG", &endpoint(addr)).unwrap_err();
    assert!(matches!(err, ApiError::HttpStatus { status: 403, .. }));
}

#[test]
fn missing_host_never_touches_network() {
    let config = ClientConfig::new().api_token(DEMO_TOKEN);
    let err = ProjectClient::connect(config).unwrap_err();
    assert!(matches!(err, ApiError::MissingCredential(Credential::Host)));
}

#[test]
fn unreachable_host_is_transport_error() {
    // Port 1 (tcpmux) is privileged and has no listener on test hosts.
    let err = ProjectClient::new(DEMO_TOKEN, "http://127.0.0.1:1/api/").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[test]
fn full_lifecycle() {
    let addr = start_server(MockProject::demo());
    let client = ProjectClient::new(DEMO_TOKEN, &endpoint(addr)).unwrap();

    // Step 1: simple exports.
    let forms: Value = client.export_forms().unwrap().json().unwrap();
    assert_eq!(forms.as_array().unwrap().len(), 2);

    let info = client.export_project_info().unwrap();
    assert!(info.is_success());
    assert_eq!(info.json::<Value>().unwrap()["project_title"], "Demo cohort");

    let users: Value = client.export_user().unwrap().json().unwrap();
    assert_eq!(users[0]["username"], "coordinator");

    let metadata: Value = client.export_metadata().unwrap().json().unwrap();
    assert_eq!(metadata.as_array().unwrap().len(), client.schema().len());

    // Step 2: record export, unfiltered then filtered.
    let all: Value = client.export_records(&RecordExport::new()).unwrap().json().unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let params = RecordExport::new().records(["1", "2"]).fields(["age"]);
    let some: Value = client.export_records(&params).unwrap().json().unwrap();
    assert_eq!(
        some,
        json!([{"record_id": "1", "age": "34"}, {"record_id": "2", "age": "58"}])
    );

    // Step 3: import a new record and update an existing one.
    let created = client
        .import_record(&json!([{"record_id": "3", "age": "29", "sex": "1"}]), false)
        .unwrap();
    assert!(created.is_success());
    assert_eq!(created.json::<Value>().unwrap(), json!(["3"]));

    let updated = client
        .import_record(&json!([{"record_id": "1", "age": "35"}]), true)
        .unwrap();
    assert_eq!(updated.json::<Value>().unwrap(), json!(["1"]));

    let rows: Value = client
        .export_records(&RecordExport::new().records(["1", "3"]))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(rows[0]["age"], "35");
    assert_eq!(rows[0]["sex"], "0");
    assert_eq!(rows[1]["age"], "29");

    // Step 4: report.
    let report = client.export_report("101").unwrap();
    assert_eq!(report.json::<Value>().unwrap().as_array().unwrap().len(), 3);
    let missing = client.export_report("").unwrap();
    assert_eq!(missing.status, 400);

    // Step 5: delete.
    let deleted = client.delete_record(&["2", "3"]).unwrap();
    assert_eq!(deleted.json::<Value>().unwrap(), json!(2));
    let again = client.delete_record(&["2"]).unwrap();
    assert_eq!(again.status, 400);

    let left: Value = client.export_records(&RecordExport::new()).unwrap().json().unwrap();
    assert_eq!(left.as_array().unwrap().len(), 1);

    // Step 6: the cached schema is untouched by everything above.
    assert_eq!(client.schema().len(), 4);
}

#[test]
fn pdf_export_round_trip() {
    let addr = start_server(MockProject::demo());
    let client = ProjectClient::new(DEMO_TOKEN, &endpoint(addr)).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let params = PdfExport::new(dir.path(), "record-1.pdf")
        .record("1")
        .instrument("demographics");
    let path = client.export_forms_pdf(&params).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));

    let bad = PdfExport::new(dir.path(), "bad.pdf").instrument("labs");
    let err = client.export_forms_pdf(&bad).unwrap_err();
    assert!(err.is_request_error());
    assert!(!dir.path().join("bad.pdf").exists());
}
