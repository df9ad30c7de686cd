use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, MockProject, API_PATH, DEMO_TOKEN};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(API_PATH)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn authed(body: &str) -> Request<String> {
    form_request(&format!("token={DEMO_TOKEN}&{body}"))
}

// --- auth ---

#[tokio::test]
async fn wrong_token_returns_403() {
    let resp = app()
        .oneshot(form_request("token=nope&content=metadata&format=json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("permissions"));
}

#[tokio::test]
async fn custom_token_is_honoured() {
    let resp = app_with(MockProject::demo().with_token("OTHER"))
        .oneshot(form_request("token=OTHER&content=user&format=json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_is_not_routed() {
    let resp = app()
        .oneshot(Request::builder().uri(API_PATH).body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- metadata ---

#[tokio::test]
async fn metadata_lists_fields() {
    let resp = app()
        .oneshot(authed("content=metadata&format=json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let fields = body.as_array().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0]["field_name"], "record_id");
    assert_eq!(fields[2]["form_name"], "demographics");
}

// --- records ---

#[tokio::test]
async fn record_export_with_repeated_keys() {
    let resp = app()
        .oneshot(authed("content=record&format=json&type=flat&records=2&fields=age"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body, serde_json::json!([{"record_id": "2", "age": "58"}]));
}

#[tokio::test]
async fn record_delete_with_indexed_keys() {
    let resp = app()
        .oneshot(authed("content=record&action=delete&records%5B0%5D=1&records%5B1%5D=2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!(2));
}

#[tokio::test]
async fn unknown_content_returns_400() {
    let resp = app()
        .oneshot(authed("content=arm&format=json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- pdf ---

#[tokio::test]
async fn pdf_is_binary() {
    let resp = app()
        .oneshot(authed("content=pdf&returnFormat=json&instrument=demographics&record=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"%PDF-"));
}

// --- import lifecycle ---

#[tokio::test]
async fn import_then_export_then_delete() {
    use tower::Service;

    let mut app = app().into_service();

    // import
    let data = r#"[{"record_id":"7","age":"41","sex":"0"}]"#;
    let body = format!(
        "content=record&format=json&type=flat&overwriteBehavior=normal&forceAutoNumber=false&returnContent=ids&data={}",
        data.replace('"', "%22")
            .replace('{', "%7B")
            .replace('}', "%7D")
            .replace('[', "%5B")
            .replace(']', "%5D")
            .replace(',', "%2C")
            .replace(':', "%3A")
    );
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(&body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!(["7"]));

    // export the new record
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("content=record&format=json&records=7"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let rows = body_json(resp).await;
    assert_eq!(rows[0]["age"], "41");

    // delete it
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("content=record&action=delete&records%5B0%5D=7"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // gone
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("content=record&format=json&records=7"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, serde_json::json!([]));
}
