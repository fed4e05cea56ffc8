// Application state module
// Everything a request handler needs, built once at startup and shared via Arc

use super::types::Config;
use crate::store::EntryStore;
use crate::upstream::{ProviderTable, UpstreamClient};

/// Application state
pub struct AppState {
    pub config: Config,
    /// Endpoints and credentials, resolved once from the environment
    pub providers: ProviderTable,
    pub upstream: UpstreamClient,
    pub store: EntryStore,
}

impl AppState {
    /// Build state, reading provider credentials from the process environment
    pub fn new(config: Config) -> Result<Self, String> {
        let providers = ProviderTable::from_config(&config.upstream);
        Self::with_providers(config, providers)
    }

    /// Build state around an already-resolved provider table
    pub fn with_providers(config: Config, providers: ProviderTable) -> Result<Self, String> {
        let upstream = UpstreamClient::from_config(&config.upstream, &config.http.server_name)?;
        let store = EntryStore::new(config.entries_path());
        Ok(Self {
            config,
            providers,
            upstream,
            store,
        })
    }
}
