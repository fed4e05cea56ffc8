//! Static file serving module
//!
//! Serves the journal front-end from the configured root directory.

use std::path::{Component, Path, PathBuf};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use tokio::fs;

use crate::config::StaticFilesConfig;
use crate::error::ProxyError;
use crate::http::{self, cache, mime};
use crate::logger;

/// The parts of a GET/HEAD request static serving looks at
pub struct StaticRequest<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Serve one file from the static root
pub async fn serve(
    req: &StaticRequest<'_>,
    cfg: &StaticFilesConfig,
) -> Result<Response<Full<Bytes>>, ProxyError> {
    let file_path = resolve(&cfg.root, req.path, &cfg.index_files)
        .await
        .ok_or(ProxyError::NotFound)?;

    let content = fs::read(&file_path).await.map_err(|e| {
        logger::log_error(&format!(
            "Failed to read file '{}': {e}",
            file_path.display()
        ));
        ProxyError::NotFound
    })?;

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(req.if_none_match, &etag) {
        return Ok(http::build_304_response(&etag));
    }

    Ok(http::build_static_response(
        Bytes::from(content),
        mime::content_type_for(&file_path),
        &etag,
        req.is_head,
    ))
}

/// Map a URL path to a file inside `root`, trying index files for directories
///
/// Returns `None` for missing files and for anything that would escape `root`.
pub async fn resolve(root: &str, url_path: &str, index_files: &[String]) -> Option<PathBuf> {
    let Ok(decoded) = percent_decode_str(url_path).decode_utf8() else {
        logger::log_warning(&format!("Request path is not valid UTF-8: {url_path}"));
        return None;
    };
    // Components are checked after decoding so `%2e%2e` cannot slip through
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
        return None;
    }

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{root}': {e}"
            ));
            return None;
        }
    };

    let mut file_path = root_canonical.join(relative);
    if fs::metadata(&file_path).await.ok()?.is_dir() {
        let mut index = None;
        for name in index_files {
            let candidate = file_path.join(name);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                index = Some(candidate);
                break;
            }
        }
        file_path = index?;
    }

    // Symlinks may still point outside the root
    let file_canonical = fs::canonicalize(&file_path).await.ok()?;
    if !file_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {url_path} -> {}",
            file_canonical.display()
        ));
        return None;
    }
    Some(file_canonical)
}
