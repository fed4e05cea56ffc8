//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: classifies the request, runs the
//! matching handler, and turns failures into the JSON error envelope.

use crate::config::AppState;
use crate::error::ProxyError;
use crate::handler::static_files::{self, StaticRequest};
use crate::handler::{chat, check, entries};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{IF_NONE_MATCH, REFERER, USER_AGENT};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What a (method, path) pair is handled by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Check,
    ListEntries,
    SaveEntries,
    Chat,
    Static,
    NotFound,
    MethodNotAllowed,
}

/// Classify a request by method and URI path (query string excluded)
pub fn classify(method: &Method, path: &str) -> Route {
    match (method, path) {
        (&Method::OPTIONS, _) => Route::Preflight,
        (&Method::GET, "/api/check") => Route::Check,
        (&Method::GET, "/api/entries") => Route::ListEntries,
        (&Method::POST, "/api/entries") => Route::SaveEntries,
        (&Method::POST, "/api/chat") => Route::Chat,
        (&Method::GET | &Method::HEAD, _) => Route::Static,
        (&Method::POST, _) => Route::NotFound,
        _ => Route::MethodNotAllowed,
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let route = classify(&parts.method, parts.uri.path());

    let request_timeout = state.config.performance.connection_timeout;
    let handled = tokio::time::timeout(
        Duration::from_secs(request_timeout),
        dispatch(route, &parts, body, &state),
    )
    .await
    .unwrap_or(Err(ProxyError::RequestTimeout(request_timeout)));

    let response = match handled {
        Ok(resp) => resp,
        Err(err) => {
            log_failure(&parts.method, parts.uri.path(), &err);
            http::error_response(&err)
        }
    };
    let response = if route == Route::Preflight {
        response
    } else {
        http::with_cors(response)
    };

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer.ip().to_string(),
            parts.method.to_string(),
            parts.uri.path().to_string(),
        );
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = version_label(parts.version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.referer = header_value(&parts.headers, REFERER);
        entry.user_agent = header_value(&parts.headers, USER_AGENT);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(
    route: Route,
    parts: &hyper::http::request::Parts,
    body: B,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match route {
        Route::Preflight => Ok(http::build_options_response()),
        Route::Check => Ok(check::check(state.providers.default_provider())),
        Route::ListEntries => entries::list(state).await,
        Route::SaveEntries => entries::save(body, state).await,
        Route::Chat => chat::forward(body, state).await,
        Route::Static => {
            let req = StaticRequest {
                path: parts.uri.path(),
                is_head: parts.method == Method::HEAD,
                if_none_match: parts
                    .headers
                    .get(IF_NONE_MATCH)
                    .and_then(|v| v.to_str().ok()),
            };
            static_files::serve(&req, &state.config.static_files).await
        }
        Route::NotFound => Err(ProxyError::NotFound),
        Route::MethodNotAllowed => Err(ProxyError::MethodNotAllowed),
    }
}

fn log_failure(method: &Method, path: &str, err: &ProxyError) {
    let status = err.status();
    if status.is_server_error() {
        logger::log_error(&format!("{method} {path} -> {}: {err}", status.as_u16()));
    } else if !matches!(err, ProxyError::NotFound) {
        logger::log_warning(&format!("{method} {path} -> {}: {err}", status.as_u16()));
    }
}

fn header_value(headers: &hyper::HeaderMap, name: hyper::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2.0",
        hyper::Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}
