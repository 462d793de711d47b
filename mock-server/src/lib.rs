//! Deterministic HTTP routes for exercising transfer engines end to end.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;
use uuid::Uuid;

/// Largest body `/bytes/{n}` will produce.
pub const MAX_BYTES: usize = 1 << 20;

const X_HOP: HeaderName = HeaderName::from_static("x-hop");

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub id: Uuid,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub content_length: Option<u64>,
}

impl Echo {
    /// First header with `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_count(&self, name: &str) -> usize {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .count()
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/json", get(json))
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/redirect/{n}", get(redirect))
        .route("/slow/{ms}", get(slow))
        .route("/bytes/{n}", get(bytes))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"ok":true}"#)
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let echo = Echo {
        id: Uuid::new_v4(),
        method: method.to_string(),
        headers: headers
            .iter()
            .map(|(n, v)| {
                (
                    n.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
        content_length,
    };
    debug!(id = %echo.id, method = %echo.method, len = body.len(), "echo");
    Json(echo)
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (
        status,
        [(header::CONTENT_TYPE, "text/plain")],
        format!("status {code}"),
    )
        .into_response()
}

async fn redirect(Path(n): Path<u32>) -> Response {
    if n == 0 {
        return ([(X_HOP, "0")], "arrived").into_response();
    }
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, format!("/redirect/{}", n - 1)),
            (X_HOP, n.to_string()),
        ],
    )
        .into_response()
}

async fn slow(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "done"
}

async fn bytes(Path(n): Path<usize>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![b'x'; n.min(MAX_BYTES)],
    )
}
