//! Credential availability check

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::http;
use crate::upstream::Provider;

#[derive(Debug, Serialize)]
struct CheckReply {
    configured: bool,
    message: String,
}

/// Report whether the provider has a credential, without revealing it
pub fn check(provider: &Provider) -> Response<Full<Bytes>> {
    let reply = if provider.credential.is_some() {
        CheckReply {
            configured: true,
            message: "API key configured".to_string(),
        }
    } else {
        CheckReply {
            configured: false,
            message: format!("{} environment variable not found", provider.credential_env),
        }
    };
    http::json_response(StatusCode::OK, &reply)
}
