//! Provisioning data model: catalog entries, agent templates and the
//! identity handed from the credential step to the provisioners.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Catalog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tool kind tag stored in `tools.kind` / `global_tools_catalog.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "rag.search")]
    RagSearch,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::Http => "http",
            ToolKind::RagSearch => "rag.search",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(ToolKind::Http),
            "rag.search" => Some(ToolKind::RagSearch),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A process-wide tool template. Unique by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: ToolKind,
    pub config: serde_json::Value,
}

/// A process-wide default agent bundle. Unique by `slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplate {
    pub slug: String,
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bearer credential returned by signup or login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    /// Present when the API echoes the new user's id.
    pub user_id: Option<Uuid>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &mask(&self.token))
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// The user a provisioner acts on. The id is always explicit.
#[derive(Debug, Clone)]
pub struct ProvisionTarget {
    pub user_id: Uuid,
    pub email: String,
    pub credential: Credential,
}

/// What a provisioner did for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvisionOutcome {
    /// `None` when the template was absent and nothing was created.
    pub agent_id: Option<Uuid>,
    pub tool_names: Vec<String>,
}

/// SHA-256 hex digest of a password, matching what the API stores.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Show the first and last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_round_trips_through_serde() {
        let v = serde_json::to_value(ToolKind::RagSearch).unwrap();
        assert_eq!(v, "rag.search");
        let k: ToolKind = serde_json::from_value(serde_json::json!("http")).unwrap();
        assert_eq!(k, ToolKind::Http);
        assert_eq!(ToolKind::parse("rag.search"), Some(ToolKind::RagSearch));
        assert_eq!(ToolKind::parse("shell"), None);
    }

    #[test]
    fn password_digest_is_sha256_hex() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn credential_debug_masks_token() {
        let c = Credential {
            token: "eyJhbGciOiJIUzI1NiJ9.payload.sig".into(),
            user_id: None,
        };
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("payload"));
        assert!(dbg.contains("eyJh"));
    }

    #[test]
    fn mask_short_secret_fully() {
        assert_eq!(mask("abc"), "***");
    }
}
