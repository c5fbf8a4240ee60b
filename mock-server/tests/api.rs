use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_wraps_body_in_data() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", r#"{"value":100}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"result": "ok", "data": {"value": 100}})
    );
}

#[tokio::test]
async fn echo_empty_body_is_null() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"result": "ok", "data": null}));
}

#[tokio::test]
async fn echo_malformed_json_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({"result": "error"}));
}

#[tokio::test]
async fn echo_rejects_get() {
    let resp = app()
        .oneshot(Request::builder().uri("/echo").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- database ---

#[tokio::test]
async fn database_get_before_put_returns_404() {
    let resp = app()
        .oneshot(json_request("POST", "/database?action=get", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"result": "error"}));
}

#[tokio::test]
async fn database_unknown_action_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/database?action=drop", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn database_put_malformed_body_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/database?action=put", "{nope"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn database_store_and_retrieve() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/database?action=put",
            r#"{"value":{"text":"hello"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"result": "ok"}));

    // get carries no body
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/database?action=get", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"result": "ok", "value": {"text": "hello"}})
    );

    // a named key is a separate slot
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/database?action=get&key=other", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // overwrite
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/database?action=put", r#"{"value":"bye"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/database?action=get", ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["value"], "bye");
}

// --- diagnostics ---

#[tokio::test]
async fn status_endpoint_returns_requested_code() {
    let resp = app()
        .oneshot(json_request("POST", "/status/503", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_endpoint_rejects_invalid_code() {
    let resp = app()
        .oneshot(json_request("GET", "/status/42", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delay_endpoint_responds_ok() {
    let resp = app()
        .oneshot(json_request("GET", "/delay/1", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"result": "ok"}));
}

#[tokio::test]
async fn bytes_endpoint_echoes_raw_body() {
    let resp = app()
        .oneshot(json_request("POST", "/bytes", "\u{1}\u{2}raw"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(resp).await.as_ref(), b"\x01\x02raw");
}

#[tokio::test]
async fn length_endpoint_counts_bytes() {
    let resp = app()
        .oneshot(json_request("POST", "/length", "12345"))
        .await
        .unwrap();

    assert_eq!(body_json(resp).await, json!({"length": 5}));
}

#[tokio::test]
async fn content_type_endpoint_reports_received_header() {
    let resp = app()
        .oneshot(json_request("PUT", "/content-type", "abc"))
        .await
        .unwrap();

    assert_eq!(
        body_json(resp).await,
        json!({"content_type": "application/json", "length": 3})
    );
}

#[tokio::test]
async fn content_type_endpoint_reports_missing_header() {
    let resp = app()
        .oneshot(Request::builder().uri("/content-type").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(body_json(resp).await, json!({"content_type": null, "length": 0}));
}
