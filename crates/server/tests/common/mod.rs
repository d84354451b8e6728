//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a scripted caption pipeline backend and a throwaway flavor
//! catalog, enabling E2E testing without network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use humorflow_core::config::{DatabaseConfig, PipelineConfig, ServerConfig};
use humorflow_core::testing::MockPipelineBackend;
use humorflow_core::{
    create_authenticator, AuthConfig, AuthMethod, Config, FlavorStore, PipelineBackend,
    PipelineRunner, SqliteFlavorStore,
};
use humorflow_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use humorflow_core::testing::fixtures;

pub const ADMIN_KEY: &str = "admin-key";
pub const VIEWER_KEY: &str = "viewer-key";
pub const SERVICE_TOKEN: &str = "service-token";

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_pipeline_run() {
///     let fixture = TestFixture::new().await;
///     fixture.backend.fail_step(2, 403, "expired").await;
///
///     let response = fixture
///         .post_as("/api/v1/pipeline", json!({ ... }), Some("session"))
///         .await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock caption pipeline - script step outcomes and inspect calls
    pub backend: Arc<MockPipelineBackend>,
    /// Flavor catalog backing the router
    pub store: Arc<SqliteFlavorStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with `none` auth and no service token.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = if test_config.api_keys {
            AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(ADMIN_KEY.to_string()),
                viewer_api_key: Some(VIEWER_KEY.to_string()),
            }
        } else {
            AuthConfig {
                method: AuthMethod::None,
                api_key: None,
                viewer_api_key: None,
            }
        };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            pipeline: PipelineConfig {
                api_token: test_config.service_token.then(|| SERVICE_TOKEN.to_string()),
                max_body_bytes: test_config
                    .max_body_bytes
                    .unwrap_or(PipelineConfig::default().max_body_bytes),
                ..Default::default()
            },
        };

        let backend = Arc::new(MockPipelineBackend::new());
        let store =
            Arc::new(SqliteFlavorStore::new(&db_path).expect("Failed to create flavor store"));
        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));

        let runner = PipelineRunner::new(Arc::clone(&backend) as Arc<dyn PipelineBackend>)
            .with_step_timeout(test_config.step_timeout);

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&store) as Arc<dyn FlavorStore>,
            runner,
        ));

        Self {
            router: create_router(state),
            backend,
            store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a GET request with a bearer token.
    pub async fn get_as(&self, path: &str, token: &str) -> TestResponse {
        self.request("GET", path, None, Some(token)).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request with JSON body and an optional bearer token.
    pub async fn post_as(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request("POST", path, Some(body), token).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None, None).await
    }

    /// Send a DELETE request with a bearer token.
    pub async fn delete_as(&self, path: &str, token: &str) -> TestResponse {
        self.request("DELETE", path, None, Some(token)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Use api_key auth with [`ADMIN_KEY`] and [`VIEWER_KEY`]
    pub api_keys: bool,
    /// Configure [`SERVICE_TOKEN`] as the pipeline api_token
    pub service_token: bool,
    /// Per-step pipeline timeout
    pub step_timeout: std::time::Duration,
    /// Override `pipeline.max_body_bytes`
    pub max_body_bytes: Option<usize>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_keys: false,
            service_token: false,
            step_timeout: std::time::Duration::from_secs(5),
            max_body_bytes: None,
        }
    }
}

impl TestConfig {
    /// api_key auth with a configured service token.
    pub fn with_api_keys() -> Self {
        Self {
            api_keys: true,
            service_token: true,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
