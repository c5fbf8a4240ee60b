use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{any, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Slot used when a `database` request names no key.
pub const DEFAULT_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Put,
    Get,
}

/// Query string of `/database`, e.g. `?action=put` or `?action=get&key=k`.
#[derive(Debug, Deserialize)]
pub struct DatabaseQuery {
    pub action: Action,
    pub key: Option<String>,
}

/// Body of `?action=put`.
#[derive(Debug, Deserialize)]
pub struct PutEntry {
    #[serde(default)]
    pub value: Value,
}

pub type Store = Arc<RwLock<HashMap<String, Value>>>;

pub fn app() -> Router {
    let store: Store = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/echo", post(echo))
        .route("/database", any(database))
        .route("/content-type", any(content_type))
        .route("/status/{code}", any(fixed_status))
        .route("/delay/{ms}", any(delayed))
        .route("/bytes", any(echo_bytes))
        .route("/length", post(body_length))
        .with_state(store)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn failure(status: StatusCode) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "result": "error" })))
}

/// An empty body echoes as `null`.
fn parse_body(body: &Bytes) -> Result<Value, serde_json::Error> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}

async fn echo(body: Bytes) -> (StatusCode, Json<Value>) {
    match parse_body(&body) {
        Ok(data) => {
            tracing::debug!(len = body.len(), "echo");
            (StatusCode::OK, Json(json!({ "result": "ok", "data": data })))
        }
        Err(err) => {
            tracing::debug!(error = %err, "echo rejected malformed body");
            failure(StatusCode::BAD_REQUEST)
        }
    }
}

/// The demo page's toy store: `?action=put` with a `{"value":...}` body,
/// `?action=get` with no body.
async fn database(
    State(store): State<Store>,
    Query(query): Query<DatabaseQuery>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let key = query.key.unwrap_or_else(|| DEFAULT_KEY.to_string());
    match query.action {
        Action::Put => {
            let Ok(entry) = serde_json::from_slice::<PutEntry>(&body) else {
                return failure(StatusCode::BAD_REQUEST);
            };
            tracing::info!(%key, "database put");
            store.write().await.insert(key, entry.value);
            (StatusCode::OK, Json(json!({ "result": "ok" })))
        }
        Action::Get => {
            tracing::info!(%key, "database get");
            match store.read().await.get(&key) {
                Some(value) => (StatusCode::OK, Json(json!({ "result": "ok", "value": value }))),
                None => failure(StatusCode::NOT_FOUND),
            }
        }
    }
}

/// Reports the `content-type` header the server actually received.
async fn content_type(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let received = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    Json(json!({ "content_type": received, "length": body.len() }))
}

async fn fixed_status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({})))
}

async fn delayed(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "result": "ok" }))
}

async fn echo_bytes(body: Bytes) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], body)
}

async fn body_length(body: Bytes) -> Json<Value> {
    Json(json!({ "length": body.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_entry_value_defaults_to_null() {
        let entry: PutEntry = serde_json::from_str("{}").unwrap();
        assert_eq!(entry.value, Value::Null);
    }

    #[test]
    fn put_entry_accepts_structured_value() {
        let entry: PutEntry = serde_json::from_str(r#"{"value":{"nested":[1,2]}}"#).unwrap();
        assert_eq!(entry.value, json!({"nested": [1, 2]}));
    }

    #[test]
    fn action_parses_lowercase() {
        let action: Action = serde_json::from_str(r#""put""#).unwrap();
        assert_eq!(action, Action::Put);
        assert!(serde_json::from_str::<Action>(r#""drop""#).is_err());
    }

    #[test]
    fn empty_body_parses_as_null() {
        assert_eq!(parse_body(&Bytes::new()).unwrap(), Value::Null);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_body(&Bytes::from_static(b"{nope")).is_err());
    }
}
