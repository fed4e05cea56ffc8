//! Request handler module
//!
//! Routes each request to chat forwarding, entry storage, the credential
//! check, or static file serving.

pub mod chat;
pub mod check;
pub mod entries;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
