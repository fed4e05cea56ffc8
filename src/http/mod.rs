//! HTTP protocol layer module
//!
//! Body collection, response builders, MIME and cache helpers shared by all handlers.

pub mod body;
pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_options_response, build_static_response, error_response,
    json_response, raw_json_response, with_cors,
};
