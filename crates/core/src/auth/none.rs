use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that accepts all requests as an anonymous superadmin.
/// Must be explicitly configured - the system won't default to this.
///
/// A bearer token on the request is treated as the caller's session token
/// and forwarded to the caption pipeline.
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoneAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let identity = Identity::anonymous().with_superadmin(true);
        Ok(match request.bearer_token() {
            Some(token) => identity.with_access_token(token),
            None => identity,
        })
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
