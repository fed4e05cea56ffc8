// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
    pub static_files: StaticFilesConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Upstream chat-completion configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Default chat-completion endpoint
    pub url: String,
    /// Environment variable holding the default endpoint's credential
    pub credential_env: String,
    /// Whole-request timeout for one upstream round trip, in seconds
    pub timeout_secs: u64,
    /// Route upstream calls through proxies named in the environment
    #[serde(default = "default_system_proxy")]
    pub system_proxy: bool,
    /// Model-prefix routes, checked in order before falling back to `url`
    #[serde(default = "default_upstream_routes")]
    pub routes: Vec<UpstreamRoute>,
}

/// Sends models whose name starts with `model_prefix` to a different endpoint
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UpstreamRoute {
    pub model_prefix: String,
    pub url: String,
    pub credential_env: String,
}

pub const DEFAULT_UPSTREAM_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";
pub const DEFAULT_CREDENTIAL_ENV: &str = "DASHSCOPE_API_KEY";

#[allow(clippy::missing_const_for_fn)]
fn default_system_proxy() -> bool {
    true
}

fn default_upstream_routes() -> Vec<UpstreamRoute> {
    vec![UpstreamRoute {
        model_prefix: "deepseek".to_string(),
        url: "https://api.deepseek.com/v1/chat/completions".to_string(),
        credential_env: "DEEPSEEK_API_KEY".to_string(),
    }]
}

/// Entry storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// When false, entry endpoints tell the client to keep entries in browser storage
    pub enabled: bool,
    pub data_dir: String,
    pub entries_file: String,
}

/// Static file serving configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    pub root: String,
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Upper bound on one connection's lifetime, in seconds
    pub connection_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Default for Config {
    /// Built-in defaults, identical to what `Config::load_from` yields with no file or env overrides
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                workers: None,
            },
            upstream: UpstreamConfig {
                url: DEFAULT_UPSTREAM_URL.to_string(),
                credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
                timeout_secs: 60,
                system_proxy: default_system_proxy(),
                routes: default_upstream_routes(),
            },
            storage: StorageConfig {
                enabled: true,
                data_dir: "data".to_string(),
                entries_file: "entries.json".to_string(),
            },
            static_files: StaticFilesConfig {
                root: ".".to_string(),
                index_files: default_index_files(),
            },
            logging: LoggingConfig {
                access_log: true,
                access_log_format: default_access_log_format(),
                access_log_file: None,
                error_log_file: None,
            },
            http: HttpConfig {
                server_name: "journal-proxy".to_string(),
                max_body_size: 10_485_760,
            },
            performance: PerformanceConfig {
                connection_timeout: 120,
                max_connections: None,
            },
        }
    }
}
