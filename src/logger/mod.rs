//! Logger module
//!
//! Provides logging utilities for the proxy including:
//! - Startup summary (listen address, providers, entry store)
//! - Access logging with multiple formats
//! - Upstream and store event logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{AppState, Config};
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, state: &AppState, stored_entries: Option<usize>) {
    let cfg = &state.config;
    write_info("======================================");
    write_info("Journal proxy started");
    write_info(&format!("Listening on: http://{addr}"));
    if let Some(workers) = cfg.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    for provider in state.providers.iter() {
        match &provider.credential {
            Some(cred) => write_info(&format!(
                "[UPSTREAM] {} -> {} (credential {cred})",
                provider.name, provider.url
            )),
            None => write_info(&format!(
                "[UPSTREAM] {} -> {} (credential missing: set {})",
                provider.name, provider.url, provider.credential_env
            )),
        }
    }
    if state.providers.default_provider().credential.is_none() {
        log_warning("Default provider has no credential; chat forwarding is disabled");
    }
    match stored_entries {
        Some(count) => write_info(&format!(
            "[STORE] {} ({count} stored entries)",
            state.store.path().display()
        )),
        None => write_info("[STORE] Server storage disabled; clients keep entries locally"),
    }
    write_info(&format!("Static files: {}", cfg.static_files.root));
    if let Some(ref path) = cfg.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = cfg.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("Press Ctrl+C to stop");
    write_info("======================================");
}

pub fn log_server_stopped(drained: usize) {
    write_info(&format!(
        "[INFO] Server stopped ({drained} in-flight connections drained)"
    ));
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_upstream(provider: &str, status: u16, elapsed_ms: u128) {
    write_info(&format!("[UPSTREAM] {provider} answered {status} in {elapsed_ms}ms"));
}

pub fn log_upstream_failure(provider: &str, message: &str) {
    write_error(&format!("[UPSTREAM] {provider}: {message}"));
}

pub fn log_store(message: &str) {
    write_info(&format!("[STORE] {message}"));
}

pub fn log_store_warning(message: &str) {
    write_error(&format!("[STORE] [WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}
