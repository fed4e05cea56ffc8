// Upstream HTTPS client
// One POST per chat request, bounded by a fixed timeout, never retried

use std::error::Error as _;
use std::time::{Duration, Instant};

use hyper::body::Bytes;
use hyper::StatusCode;

use super::Provider;
use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::logger;

/// Upstream answer relayed to the browser unchanged
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Shared HTTP client; pooled connections are reused across requests
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn from_config(cfg: &UpstreamConfig, user_agent: &str) -> Result<Self, String> {
        Self::new(
            Duration::from_secs(cfg.timeout_secs),
            user_agent,
            cfg.system_proxy,
        )
    }

    /// `system_proxy` honours `HTTPS_PROXY`/`HTTP_PROXY`/`NO_PROXY` from the environment
    pub fn new(timeout: Duration, user_agent: &str, system_proxy: bool) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent);
        if !system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| format!("Failed to build upstream client: {e}"))?;
        Ok(Self { http, timeout })
    }

    /// POST `body` to the provider with its bearer credential
    ///
    /// 2xx answers come back as `Ok`; any other status becomes
    /// `ProxyError::Upstream` carrying the upstream body text.
    pub async fn forward(
        &self,
        provider: &Provider,
        body: Bytes,
    ) -> Result<UpstreamReply, ProxyError> {
        let Some(credential) = provider.credential.as_ref() else {
            return Err(ProxyError::Unconfigured(format!(
                "Upstream credential not configured: set the {} environment variable",
                provider.credential_env
            )));
        };

        let started = Instant::now();
        let response = self
            .http
            .post(&provider.url)
            .header("Content-Type", "application/json")
            .header("Authorization", credential.bearer())
            .body(body)
            .send()
            .await
            .map_err(|e| self.network_error(provider, &e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) => text,
                Err(_) => status.canonical_reason().unwrap_or("").to_string(),
            };
            logger::log_upstream_failure(&provider.name, &format!("status {status}: {body}"));
            return Err(ProxyError::Upstream { status, body });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.network_error(provider, &e))?;
        logger::log_upstream(&provider.name, status.as_u16(), started.elapsed().as_millis());

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }

    fn network_error(&self, provider: &Provider, err: &reqwest::Error) -> ProxyError {
        let message = if err.is_timeout() {
            format!(
                "upstream request timed out after {}s",
                self.timeout.as_secs()
            )
        } else {
            describe(err)
        };
        logger::log_upstream_failure(&provider.name, &message);
        ProxyError::Network(message)
    }
}

/// Error text including its source chain; reqwest's `Display` omits the cause
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
