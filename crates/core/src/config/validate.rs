use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - api_key is set when the api_key method is selected
/// - Server port is not 0
/// - Pipeline base URL is an http(s) URL
/// - Pipeline timeout and body limit are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_ref().is_none_or(|k| k.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let api_base = &config.pipeline.api_base;
    if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "pipeline.api_base must be an http(s) URL, got {:?}",
            api_base
        )));
    }

    if config.pipeline.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_body_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_body_bytes cannot be 0".to_string(),
        ));
    }

    Ok(())
}
