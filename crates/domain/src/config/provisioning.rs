use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provisioning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Agent template cloned into the new user's scope.
    #[serde(default = "d_template_slug")]
    pub template_slug: String,
    /// Value substituted for `{{city}}` in tool configs.
    #[serde(default = "d_city")]
    pub default_city: String,
    /// Fixed password for the throwaway user.
    #[serde(default = "d_password")]
    pub password: String,
    /// Local part of generated emails; a time-based suffix is appended.
    #[serde(default = "d_email_prefix")]
    pub email_prefix: String,
    #[serde(default = "d_email_domain")]
    pub email_domain: String,
    #[serde(default = "d_display_name")]
    pub display_name: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            template_slug: d_template_slug(),
            default_city: d_city(),
            password: d_password(),
            email_prefix: d_email_prefix(),
            email_domain: d_email_domain(),
            display_name: d_display_name(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Smoke tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeConfig {
    #[serde(default = "d_tool_calls")]
    pub tool_calls: Vec<SmokeToolCall>,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            tool_calls: d_tool_calls(),
        }
    }
}

/// One `POST /v1/tools/run` call issued after provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_template_slug() -> String {
    "jeeves".into()
}
fn d_city() -> String {
    "chicago".into()
}
fn d_password() -> String {
    "bootstrap-Passw0rd!".into()
}
fn d_email_prefix() -> String {
    "bootstrap".into()
}
fn d_email_domain() -> String {
    "example.com".into()
}
fn d_display_name() -> String {
    "Bootstrap User".into()
}
fn d_tool_calls() -> Vec<SmokeToolCall> {
    let mut ip_args = serde_json::Map::new();
    ip_args.insert("ip".into(), serde_json::Value::String("8.8.8.8".into()));
    vec![
        SmokeToolCall {
            tool: "ip.lookup".into(),
            args: ip_args,
        },
        SmokeToolCall {
            tool: "weather".into(),
            args: serde_json::Map::new(),
        },
    ]
}
