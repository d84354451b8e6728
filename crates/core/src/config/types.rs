use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Superadmin key (required when method = "api_key")
    #[serde(default)]
    pub api_key: Option<String>,
    /// Optional read-only key. Callers presenting it can browse the
    /// flavor catalog but fail the admin gate.
    #[serde(default)]
    pub viewer_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("humorflow.db")
}

/// Caption pipeline backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Base URL of the caption pipeline API
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-step request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Service token used when the caller has no session token to forward
    #[serde(default)]
    pub api_token: Option<String>,
    /// Largest accepted `POST /pipeline` body in bytes (default: 50 MiB).
    /// The image travels base64 encoded, so this is about 4/3 of the image.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
            api_token: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.almostcrackd.ai".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pipeline: SanitizedPipelineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub viewer_key_configured: bool,
}

/// Sanitized pipeline config (service token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPipelineConfig {
    pub api_base: String,
    pub timeout_secs: u32,
    pub max_body_bytes: usize,
    pub api_token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                viewer_key_configured: config.auth.viewer_api_key.is_some(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            pipeline: SanitizedPipelineConfig {
                api_base: config.pipeline.api_base.clone(),
                timeout_secs: config.pipeline.timeout_secs,
                max_body_bytes: config.pipeline.max_body_bytes,
                api_token_configured: config
                    .pipeline
                    .api_token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
            },
        }
    }
}
