use std::sync::Arc;

use humorflow_core::{
    Authenticator, Config, FlavorStore, Identity, PipelineRunner, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    flavor_store: Arc<dyn FlavorStore>,
    runner: PipelineRunner,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        flavor_store: Arc<dyn FlavorStore>,
        runner: PipelineRunner,
    ) -> Self {
        Self {
            config,
            authenticator,
            flavor_store,
            runner,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn flavor_store(&self) -> &dyn FlavorStore {
        self.flavor_store.as_ref()
    }

    pub fn runner(&self) -> &PipelineRunner {
        &self.runner
    }

    pub fn pipeline_body_limit(&self) -> usize {
        self.config.pipeline.max_body_bytes
    }

    /// Bearer token to send to the caption pipeline on behalf of `identity`.
    ///
    /// The caller's own session token wins over the configured service token.
    pub fn upstream_token(&self, identity: &Identity) -> Option<String> {
        identity
            .access_token
            .clone()
            .or_else(|| self.config.pipeline.api_token.clone())
            .filter(|t| !t.trim().is_empty())
    }
}
