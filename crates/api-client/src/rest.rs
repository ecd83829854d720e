//! REST client for the platform API.
//!
//! Every call goes through one retry engine: 5xx responses and transport
//! errors are retried with exponential back-off, 4xx responses are
//! permanent. 401/403 become [`Error::Auth`]; other 4xx keep their status in
//! [`Error::Api`] so callers can tell a missing endpoint from a broken one.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use ags_domain::config::ApiConfig;
use ags_domain::error::{Error, Result};
use ags_domain::model::password_digest;
use ags_domain::trace::TraceEvent;

use crate::types::{
    AdminProvisionResponse, AgentDto, AuthResponse, LoginRequest, SignupRequest, ToolDto,
    ToolRunRequest, ToolRunResponse,
};

pub const ADMIN_PROVISION_PATH: &str = "/v1/admin/provision";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    openapi_path: String,
    max_retries: u32,
}

impl ApiClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.resolved_base_url(),
            openapi_path: cfg.openapi_path.clone(),
            max_retries: cfg.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        self.execute(endpoint, self.max_retries, build_request).await
    }

    /// Single attempt, for requests that must not be replayed.
    async fn execute_once(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        self.execute(endpoint, 0, build_request).await
    }

    async fn execute(
        &self,
        endpoint: &str,
        max_retries: u32,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = build_request().send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    TraceEvent::ApiCall {
                        endpoint: endpoint.to_owned(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        tracing::debug!(%endpoint, status = status.as_u16(), attempt, "server error, retrying");
                        last_err = Some(Error::Api {
                            endpoint: endpoint.to_owned(),
                            status: status.as_u16(),
                            body,
                        });
                        continue;
                    }

                    if status.is_client_error() {
                        let body = resp.text().await.unwrap_or_default();
                        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                            return Err(Error::Auth(format!(
                                "{endpoint} rejected credentials ({}): {body}",
                                status.as_u16()
                            )));
                        }
                        return Err(Error::Api {
                            endpoint: endpoint.to_owned(),
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    TraceEvent::ApiCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Http(format!("{endpoint}: all retries exhausted"))))
    }

    async fn json<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Http(format!("{endpoint}: unexpected response body: {e}: {body}")))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Endpoints
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse> {
        const EP: &str = "POST /v1/auth/signup";
        let hash = password_digest(password);
        let body = SignupRequest {
            email,
            password,
            password_hash: &hash,
            name,
        };
        let url = self.url("/v1/auth/signup");
        let resp = self
            .execute_with_retry(EP, || self.http.post(&url).json(&body))
            .await?;
        Self::json(EP, resp).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        const EP: &str = "POST /v1/auth/login";
        let hash = password_digest(password);
        let body = LoginRequest {
            email,
            password,
            password_hash: &hash,
        };
        let url = self.url("/v1/auth/login");
        let resp = self
            .execute_with_retry(EP, || self.http.post(&url).json(&body))
            .await?;
        Self::json(EP, resp).await
    }

    /// Ask the API to provision the caller's defaults. Only 200 and 204
    /// count as success; any other status is returned as [`Error::Api`].
    pub async fn admin_provision(&self, token: &str) -> Result<AdminProvisionResponse> {
        const EP: &str = "POST /v1/admin/provision";
        let url = self.url(ADMIN_PROVISION_PATH);
        let resp = self
            .execute_with_retry(EP, || self.http.post(&url).bearer_auth(token))
            .await?;
        let status = resp.status();
        let accepted = AdminProvisionResponse {
            ok: true,
            agent_id: None,
        };
        match status {
            StatusCode::NO_CONTENT => Ok(accepted),
            StatusCode::OK => {
                let body = resp.text().await.map_err(from_reqwest)?;
                if body.trim().is_empty() {
                    return Ok(accepted);
                }
                match serde_json::from_str(&body) {
                    Ok(parsed) => Ok(parsed),
                    Err(e) => {
                        tracing::debug!(endpoint = EP, error = %e, %body, "undecodable provisioning body, treating as success");
                        Ok(accepted)
                    }
                }
            }
            other => Err(Error::Api {
                endpoint: EP.to_owned(),
                status: other.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Whether the API's OpenAPI document lists `path`.
    pub async fn advertises_path(&self, path: &str) -> Result<bool> {
        let endpoint = format!("GET {}", self.openapi_path);
        let url = self.url(&self.openapi_path);
        let resp = self
            .execute_with_retry(&endpoint, || self.http.get(&url))
            .await?;
        let doc: Value = Self::json(&endpoint, resp).await?;
        Ok(doc
            .get("paths")
            .and_then(Value::as_object)
            .is_some_and(|paths| paths.contains_key(path)))
    }

    pub async fn list_agents(&self, token: &str) -> Result<Vec<AgentDto>> {
        const EP: &str = "GET /v1/agents";
        let url = self.url("/v1/agents");
        let resp = self
            .execute_with_retry(EP, || self.http.get(&url).bearer_auth(token))
            .await?;
        Self::json(EP, resp).await
    }

    pub async fn list_tools(&self, token: &str) -> Result<Vec<ToolDto>> {
        const EP: &str = "GET /v1/tools";
        let url = self.url("/v1/tools");
        let resp = self
            .execute_with_retry(EP, || self.http.get(&url).bearer_auth(token))
            .await?;
        Self::json(EP, resp).await
    }

    pub async fn run_tool(
        &self,
        token: &str,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<ToolRunResponse> {
        const EP: &str = "POST /v1/tools/run";
        let body = ToolRunRequest { tool, args };
        let url = self.url("/v1/tools/run");
        let resp = self
            .execute_once(EP, || self.http.post(&url).bearer_auth(token).json(&body))
            .await?;
        Self::json(EP, resp).await
    }
}

/// Host and port to wait on before calling the API, from `base_url` when set
/// (scheme default port if none is given), else `host`/`port`.
pub fn probe_endpoint(cfg: &ApiConfig) -> Result<(String, u16)> {
    let Some(raw) = cfg.base_url.as_deref() else {
        return Ok((cfg.host.clone(), cfg.port));
    };
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("api.base_url {raw:?}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Config(format!("api.base_url {raw:?} has no host")))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::Config(format!("api.base_url {raw:?} has no port")))?;
    // IPv6 literals come back bracketed.
    Ok((host.trim_start_matches('[').trim_end_matches(']').to_owned(), port))
}

/// Convert a `reqwest::Error` into the shared error type.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
