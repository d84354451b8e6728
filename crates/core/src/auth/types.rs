use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Claim carrying the superadmin privilege flag.
pub const SUPERADMIN_CLAIM: &str = "is_superadmin";

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Bearer token from the `Authorization` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        let header = self.headers.get("authorization")?;
        header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    pub claims: HashMap<String, serde_json::Value>,
    /// Session token forwarded to the caption pipeline on the caller's behalf.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            claims: HashMap::new(),
            access_token: None,
        }
    }

    /// Set the superadmin claim.
    pub fn with_superadmin(mut self, is_superadmin: bool) -> Self {
        self.claims.insert(
            SUPERADMIN_CLAIM.to_string(),
            serde_json::Value::Bool(is_superadmin),
        );
        self
    }

    /// Attach a session token to forward upstream.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn is_superadmin(&self) -> bool {
        self.claims
            .get(SUPERADMIN_CLAIM)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Admin gate: the caller is authenticated and holds the superadmin flag.
pub fn is_authorized_admin(identity: &Identity) -> bool {
    identity.is_superadmin()
}
