//! Local proxy for the journal app: forwards chat requests to an LLM API with
//! a server-held credential, persists journal entries to disk, and serves the
//! front-end.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod store;
pub mod upstream;

#[cfg(test)]
mod test_support;
