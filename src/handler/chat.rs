//! Chat forwarding
//!
//! The body is validated as JSON before anything goes over the network, then
//! posted to the provider chosen by its `model` field.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::Response;

use crate::config::AppState;
use crate::error::ProxyError;
use crate::http::{self, body};

pub async fn forward<B>(req_body: B, state: &AppState) -> Result<Response<Full<Bytes>>, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let payload = body::read_json(req_body, state.config.http.max_body_size).await?;
    let provider = state.providers.select(&payload);

    let encoded = serde_json::to_vec(&payload)
        .map_err(|e| ProxyError::BadRequest(format!("Invalid JSON request: {e}")))?;
    let reply = state.upstream.forward(provider, Bytes::from(encoded)).await?;

    Ok(http::raw_json_response(
        reply.status,
        reply.content_type.as_deref().unwrap_or("application/json"),
        reply.body,
    ))
}
