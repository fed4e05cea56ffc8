//! Conditional request support for static files

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Quoted strong `ETag` derived from the file content
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// True when the client's `If-None-Match` list names `etag` (or is `*`)
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.trim_start_matches("W/") == etag
        })
    })
}
