use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, MAX_BYTES};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- json ---

#[tokio::test]
async fn json_returns_fixed_document() {
    let resp = app().oneshot(get("/json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    assert_eq!(body_bytes(resp).await, &br#"{"ok":true}"#[..]);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_headers_and_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header("X-Test", "abc")
        .header(http::header::CONTENT_LENGTH, "5")
        .body("hello".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, "hello");
    assert_eq!(echo.content_length, Some(5));
    assert_eq!(echo.header("x-test"), Some("abc"));
}

#[tokio::test]
async fn echo_accepts_get_without_body() {
    let resp = app().oneshot(get("/echo")).await.unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert!(echo.body.is_empty());
    assert_eq!(echo.content_length, None);
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(resp).await, "status 404");
}

#[tokio::test]
async fn status_out_of_range_is_bad_request() {
    let resp = app().oneshot(get("/status/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_non_numeric_is_rejected() {
    let resp = app().oneshot(get("/status/abc")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- redirect ---

#[tokio::test]
async fn redirect_points_to_next_hop() {
    let resp = app().oneshot(get("/redirect/2")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "/redirect/1");
    assert_eq!(resp.headers()["x-hop"], "2");
}

#[tokio::test]
async fn redirect_zero_is_final() {
    let resp = app().oneshot(get("/redirect/0")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-hop"], "0");
    assert_eq!(body_bytes(resp).await, "arrived");
}

// --- slow / bytes ---

#[tokio::test]
async fn slow_eventually_answers() {
    let resp = app().oneshot(get("/slow/10")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "done");
}

#[tokio::test]
async fn bytes_returns_requested_length() {
    let resp = app().oneshot(get("/bytes/40000")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await.len(), 40000);
}

#[tokio::test]
async fn bytes_is_capped() {
    let resp = app().oneshot(get(&format!("/bytes/{}", MAX_BYTES * 2))).await.unwrap();
    assert_eq!(body_bytes(resp).await.len(), MAX_BYTES);
}

// --- unknown ---

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(get("/nonexistent")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
