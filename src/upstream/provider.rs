// Upstream provider table
// Chooses the endpoint and credential for a chat payload by its `model` field

use crate::config::{Credential, UpstreamConfig};

/// One chat-completion endpoint and the credential used to call it
#[derive(Debug, Clone)]
pub struct Provider {
    /// `default`, or the model prefix this provider is routed by
    pub name: String,
    pub url: String,
    /// Environment variable the credential was read from
    pub credential_env: String,
    pub credential: Option<Credential>,
}

/// Default provider plus ordered model-prefix routes
#[derive(Debug, Clone)]
pub struct ProviderTable {
    default: Provider,
    routes: Vec<(String, Provider)>,
}

impl ProviderTable {
    /// Build the table, reading every credential from the process environment once
    pub fn from_config(cfg: &UpstreamConfig) -> Self {
        Self::with_credentials(cfg, Credential::from_env)
    }

    /// Build the table with a custom credential lookup (keyed by env var name)
    pub fn with_credentials(
        cfg: &UpstreamConfig,
        lookup: impl Fn(&str) -> Option<Credential>,
    ) -> Self {
        let default = Provider {
            name: "default".to_string(),
            url: cfg.url.clone(),
            credential_env: cfg.credential_env.clone(),
            credential: lookup(&cfg.credential_env),
        };
        let routes = cfg
            .routes
            .iter()
            .map(|route| {
                (
                    route.model_prefix.clone(),
                    Provider {
                        name: route.model_prefix.clone(),
                        url: route.url.clone(),
                        credential_env: route.credential_env.clone(),
                        credential: lookup(&route.credential_env),
                    },
                )
            })
            .collect();
        Self { default, routes }
    }

    pub const fn default_provider(&self) -> &Provider {
        &self.default
    }

    /// Provider for a chat payload: first route whose prefix matches `model`, else the default
    pub fn select(&self, payload: &serde_json::Value) -> &Provider {
        let Some(model) = payload.get("model").and_then(serde_json::Value::as_str) else {
            return &self.default;
        };
        self.routes
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix.as_str()))
            .map_or(&self.default, |(_, provider)| provider)
    }

    /// Default provider first, then routes in order
    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        std::iter::once(&self.default).chain(self.routes.iter().map(|(_, p)| p))
    }
}
