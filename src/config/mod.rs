// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod credential;
mod state;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

// Re-export public types
pub use credential::Credential;
pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StaticFilesConfig,
    StorageConfig, UpstreamConfig, UpstreamRoute, DEFAULT_CREDENTIAL_ENV, DEFAULT_UPSTREAM_URL,
};

/// Config file used when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "journal";

impl Config {
    /// Load configuration from the path given as the first CLI argument,
    /// falling back to `journal.*` in the working directory
    pub fn load() -> Result<Self, String> {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (extension optional)
    ///
    /// Sources, lowest priority first: built-in defaults, the file (if present),
    /// then `JOURNAL_*` environment variables using `__` between nested keys.
    pub fn load_from(config_path: &str) -> Result<Self, String> {
        let settings = build_settings(config_path)
            .map_err(|e| format!("Failed to load configuration: {e}"))?;

        let cfg: Self = settings
            .try_deserialize()
            .map_err(|e| format!("Invalid configuration: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), String> {
        self.get_socket_addr()?;
        if self.server.workers == Some(0) {
            return Err("server.workers must be greater than 0".to_string());
        }
        if self.upstream.timeout_secs == 0 {
            return Err("upstream.timeout_secs must be greater than 0".to_string());
        }
        if self.performance.connection_timeout <= self.upstream.timeout_secs {
            return Err(format!(
                "performance.connection_timeout ({}) must exceed upstream.timeout_secs ({})",
                self.performance.connection_timeout, self.upstream.timeout_secs
            ));
        }
        if self.storage.entries_file.trim().is_empty() {
            return Err("storage.entries_file must not be empty".to_string());
        }
        if let Some(route) = self
            .upstream
            .routes
            .iter()
            .find(|r| r.model_prefix.is_empty())
        {
            return Err(format!(
                "upstream route for {} has an empty model_prefix",
                route.url
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Full path of the entry store file
    pub fn entries_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join(&self.storage.entries_file)
    }
}

fn build_settings(config_path: &str) -> Result<config::Config, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(config_path).required(false))
        .add_source(
            config::Environment::with_prefix("JOURNAL")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8000)?
        .set_default("upstream.url", DEFAULT_UPSTREAM_URL)?
        .set_default("upstream.credential_env", DEFAULT_CREDENTIAL_ENV)?
        .set_default("upstream.timeout_secs", 60)?
        .set_default("storage.enabled", true)?
        .set_default("storage.data_dir", "data")?
        .set_default("storage.entries_file", "entries.json")?
        .set_default("static_files.root", ".")?
        .set_default("logging.access_log", true)?
        .set_default("http.server_name", "journal-proxy")?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("performance.connection_timeout", 120)?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let cfg = Config::load_from(missing.to_str().unwrap()).unwrap();
        let defaults = Config::default();

        assert_eq!(cfg.server.host, defaults.server.host);
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.upstream.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(cfg.upstream.timeout_secs, 60);
        assert!(cfg.upstream.system_proxy);
        assert_eq!(cfg.upstream.routes, defaults.upstream.routes);
        assert!(cfg.storage.enabled);
        assert_eq!(cfg.entries_path(), PathBuf::from("data").join("entries.json"));
        assert_eq!(cfg.static_files.index_files, vec!["index.html", "index.htm"]);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9100

[upstream]
timeout_secs = 30
system_proxy = false

[[upstream.routes]]
model_prefix = "gpt"
url = "https://example.invalid/v1/chat/completions"
credential_env = "OPENAI_API_KEY"

[storage]
enabled = false
data_dir = "/var/lib/journal"
"#,
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.upstream.timeout_secs, 30);
        assert!(!cfg.upstream.system_proxy);
        assert_eq!(cfg.upstream.routes.len(), 1);
        assert_eq!(cfg.upstream.routes[0].model_prefix, "gpt");
        assert!(!cfg.storage.enabled);
        assert_eq!(
            cfg.entries_path(),
            PathBuf::from("/var/lib/journal/entries.json")
        );
    }

    #[test]
    fn test_validate_rejects_short_connection_timeout() {
        let mut cfg = Config::default();
        cfg.performance.connection_timeout = 60;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("connection_timeout"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut cfg = Config::default();
        cfg.upstream.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        let mut cfg = Config::default();
        cfg.server.host = "not a host".to_string();
        assert!(cfg.validate().unwrap_err().contains("Invalid address"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut cfg = Config::default();
        cfg.server.workers = Some(0);
        assert!(cfg.validate().unwrap_err().contains("server.workers"));

        cfg.server.workers = Some(2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
