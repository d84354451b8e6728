pub mod auth;
pub mod config;
pub mod flavors;
pub mod metrics;
pub mod pipeline;
pub mod testing;

pub use auth::{
    create_authenticator, is_authorized_admin, ApiKeyAuthenticator, AuthError, AuthRequest,
    Authenticator, Identity, NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, PipelineConfig, SanitizedConfig,
};
pub use flavors::{
    CatalogError, Flavor, FlavorInput, FlavorStep, FlavorStore, LookupInput, LookupItem,
    LookupKind, SqliteFlavorStore, StepInput,
};
pub use pipeline::{
    BackendError, Caption, HttpPipelineBackend, PipelineBackend, PipelineOutcome,
    PipelineRequest, PipelineRunner, RejectedRequest, StepResult, StepStatus,
    PIPELINE_ERROR_STEP,
};
