//! Upstream chat-completion forwarding
//!
//! `provider` maps a chat payload to an endpoint and credential;
//! `client` performs the single bounded HTTPS round trip.

pub mod client;
pub mod provider;

pub use client::{UpstreamClient, UpstreamReply};
pub use provider::{Provider, ProviderTable};
