use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Lowercased header names, values in arrival order.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/items/{id}", get(get_item))
        .route("/status/{code}", any(status))
        .route("/slow/{millis}", any(slow))
        .route("/text", any(text))
        .route("/concat", get(concat))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body,
    })
}

async fn get_item(Path(id): Path<u64>) -> Json<Item> {
    Json(Item { id })
}

/// Answers with the requested status and a `{}` body.
async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, [(header::CONTENT_TYPE, "application/json")], "{}")
}

async fn slow(Path(millis): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({ "id": 1 }))
}

async fn text() -> &'static str {
    "not json"
}

/// Two JSON documents back to back.
async fn concat() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"id":1}{"id":2}"#)
}
