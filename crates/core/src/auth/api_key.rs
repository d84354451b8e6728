//! API Key authentication.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that validates requests against configured API keys.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
///
/// The admin key yields a superadmin identity. The optional viewer key
/// yields an authenticated identity without the superadmin flag.
/// Neither carries a session token, since the bearer header holds the
/// local key rather than a pipeline credential.
pub struct ApiKeyAuthenticator {
    admin_key: String,
    viewer_key: Option<String>,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            admin_key: api_key,
            viewer_key: None,
        }
    }

    /// Also accept a read-only viewer key.
    pub fn with_viewer_key(mut self, viewer_key: String) -> Self {
        self.viewer_key = Some(viewer_key).filter(|k| !k.is_empty());
        self
    }

    /// Extract API key from request headers.
    fn extract_key(&self, request: &AuthRequest) -> Option<String> {
        if let Some(key) = request.bearer_token() {
            return Some(key.to_string());
        }

        request.headers.get("x-api-key").cloned()
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        let identity = |user_id: &str, superadmin: bool| {
            Identity {
                user_id: user_id.to_string(),
                method: "api_key".to_string(),
                claims: std::collections::HashMap::new(),
                access_token: None,
            }
            .with_superadmin(superadmin)
        };

        if constant_time_eq(provided_key.as_bytes(), self.admin_key.as_bytes()) {
            return Ok(identity("api_key_admin", true));
        }

        if let Some(viewer_key) = &self.viewer_key {
            if constant_time_eq(provided_key.as_bytes(), viewer_key.as_bytes()) {
                return Ok(identity("api_key_viewer", false));
            }
        }

        Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
