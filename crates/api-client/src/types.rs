use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ags_domain::model::Credential;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Signup body. The server requires `password`; `password_hash` is its
/// SHA-256 hex digest for deployments that accept pre-hashed values.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub password_hash: &'a str,
}

/// Signup / login response. Either token field may carry the credential.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub jwt: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl AuthResponse {
    /// The bearer token from `jwt`, else `access_token`; empty strings count
    /// as absent.
    pub fn credential(&self) -> Option<Credential> {
        let token = [self.jwt.as_deref(), self.access_token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())?;
        Some(Credential {
            token: token.to_owned(),
            user_id: self.user_id(),
        })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        let raw = self.user_id.as_deref()?;
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(user_id = %raw, error = %e, "ignoring malformed user_id in auth response");
                None
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin / agents / tools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Body of a 200 from the admin provisioning endpoint (204 carries none).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminProvisionResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolDto {
    pub id: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolRunRequest<'a> {
    pub tool: &'a str,
    pub args: &'a serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolRunResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub result: serde_json::Value,
}
