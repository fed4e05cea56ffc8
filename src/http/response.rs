//! HTTP response building module
//!
//! Builders for every response the dispatcher emits, decoupled from handler logic.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::ProxyError;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ROUTED_METHODS: &str = "GET, HEAD, POST, OPTIONS";

/// Build JSON response from any serializable value
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => raw_json_response(status, "application/json", Bytes::from(json)),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            raw_json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "application/json",
                Bytes::from_static(br#"{"error":{"message":"Internal server error","code":500}}"#),
            )
        }
    }
}

/// Build response around an already-encoded body
pub fn raw_json_response(
    status: StatusCode,
    content_type: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build the uniform error envelope `{"error": {"message", "code"}}`
pub fn error_response(err: &ProxyError) -> Response<Full<Bytes>> {
    let status = err.status();
    let body = serde_json::json!({
        "error": {
            "message": err.to_string(),
            "code": status.as_u16()
        }
    });
    let mut resp = json_response(status, &body);
    if matches!(err, ProxyError::MethodNotAllowed) {
        resp.headers_mut()
            .insert("Allow", HeaderValue::from_static(ROUTED_METHODS));
    }
    resp
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Cache-Control", "no-cache")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build static file response with `ETag`
///
/// Journal assets change while the app is developed locally, so clients
/// revalidate every time instead of caching for a fixed period.
pub fn build_static_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("ETag", etag)
        .header("Cache-Control", "no-cache")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Attach `Access-Control-Allow-Origin: *` unless the response already has one
pub fn with_cors(mut resp: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    resp.headers_mut()
        .entry(ACCESS_CONTROL_ALLOW_ORIGIN)
        .or_insert(HeaderValue::from_static("*"));
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
