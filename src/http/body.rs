//! Request body collection
//!
//! Reads an inbound body to completion under a size limit and parses it as JSON.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};

use crate::error::ProxyError;

/// Collect the whole body, failing with `PayloadTooLarge` past `max_size` bytes
pub async fn collect_limited<B>(body: B, max_size: u64) -> Result<Bytes, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ProxyError::PayloadTooLarge(max_size))
        }
        Err(e) => Err(ProxyError::BadRequest(format!(
            "Failed to read request body: {e}"
        ))),
    }
}

/// Collect the body and parse it as JSON
pub async fn read_json<B>(body: B, max_size: u64) -> Result<serde_json::Value, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = collect_limited(body, max_size).await?;
    parse_json(&bytes)
}

/// Parse collected bytes as JSON, mapping failure to `BadRequest`
pub fn parse_json(bytes: &[u8]) -> Result<serde_json::Value, ProxyError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ProxyError::BadRequest(format!("Invalid JSON request: {e}")))
}
