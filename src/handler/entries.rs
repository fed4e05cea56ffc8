//! Journal entry endpoints
//!
//! `GET /api/entries` returns the stored value; `POST /api/entries` replaces it
//! with the `entries` field of the request body.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::AppState;
use crate::error::ProxyError;
use crate::http::{self, body};
use crate::store::entry_count;

#[derive(Debug, Serialize)]
struct ListReply {
    success: bool,
    entries: Value,
}

#[derive(Debug, Serialize)]
struct SaveReply {
    success: bool,
    message: &'static str,
    count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DelegatedReply {
    success: bool,
    use_local_storage: bool,
    message: &'static str,
}

pub async fn list(state: &AppState) -> Result<Response<Full<Bytes>>, ProxyError> {
    if !state.config.storage.enabled {
        return Ok(delegated());
    }
    let entries = state.store.load().await?;
    Ok(http::json_response(
        StatusCode::OK,
        &ListReply {
            success: true,
            entries,
        },
    ))
}

pub async fn save<B>(req_body: B, state: &AppState) -> Result<Response<Full<Bytes>>, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if !state.config.storage.enabled {
        return Ok(delegated());
    }

    let payload = body::read_json(req_body, state.config.http.max_body_size).await?;
    let Value::Object(mut fields) = payload else {
        return Err(ProxyError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };
    let entries = fields
        .remove("entries")
        .unwrap_or_else(|| Value::Array(Vec::new()));

    state.store.replace(&entries).await?;
    Ok(http::json_response(
        StatusCode::OK,
        &SaveReply {
            success: true,
            message: "Entries saved",
            count: entry_count(&entries),
        },
    ))
}

/// Storage is off: the client keeps entries in browser storage
fn delegated() -> Response<Full<Bytes>> {
    http::json_response(
        StatusCode::OK,
        &DelegatedReply {
            success: false,
            use_local_storage: true,
            message: "Server storage is disabled; use browser local storage",
        },
    )
}
