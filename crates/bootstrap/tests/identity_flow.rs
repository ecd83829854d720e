//! Identity flow against an in-process fake API and an in-memory user
//! directory.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

use ags_api_client::ApiClient;
use ags_bootstrap::identity::{IdentityFlow, UserDirectory};
use ags_domain::config::{ApiConfig, ProvisioningConfig};
use ags_domain::error::{Error, Result};

#[derive(Default)]
struct MemoryUsers {
    rows: Mutex<HashMap<String, (Uuid, String)>>,
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn insert_user(&self, email: &str, password_hash: &str, _name: &str) -> Result<Uuid> {
        let mut rows = self.rows.lock().unwrap();
        let entry = rows
            .entry(email.to_owned())
            .or_insert_with(|| (Uuid::new_v4(), password_hash.to_owned()));
        Ok(entry.0)
    }

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        Ok(self.rows.lock().unwrap().get(email).map(|r| r.0))
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn api(addr: SocketAddr) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: Some(format!("http://{addr}")),
        max_retries: 0,
        timeout_ms: 2_000,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn signup_token_and_user_id_used_directly() {
    let id = Uuid::new_v4();
    let addr = serve(Router::new().route(
        "/v1/auth/signup",
        post(move || async move { Json(json!({ "jwt": "tok", "user_id": id.to_string() })) }),
    ))
    .await;
    let api = api(addr);
    let users = MemoryUsers::default();
    let cfg = ProvisioningConfig::default();
    let flow = IdentityFlow::new(&api, &users, &cfg);

    let created = flow.create_user().await.unwrap();
    assert_eq!(created.via, "signup");
    let target = flow.obtain_credential(created).await.unwrap();

    assert_eq!(target.user_id, id);
    assert_eq!(target.credential.token, "tok");
    assert!(users.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_signup_falls_back_to_insert_then_login() {
    let app = Router::new()
        .route(
            "/v1/auth/signup",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Database not initialized") }),
        )
        .route(
            "/v1/auth/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["password_hash"].as_str().unwrap().len(), 64);
                Json(json!({ "access_token": "from-login" }))
            }),
        );
    let api = api(serve(app).await);
    let users = MemoryUsers::default();
    let cfg = ProvisioningConfig::default();
    let flow = IdentityFlow::new(&api, &users, &cfg);

    let created = flow.create_user().await.unwrap();
    assert_eq!(created.via, "sql");
    let inserted = created.user_id.unwrap();
    let email = created.email.clone();

    let target = flow.obtain_credential(created).await.unwrap();
    assert_eq!(target.credential.token, "from-login");
    assert_eq!(target.user_id, inserted);
    assert_eq!(target.email, email);

    let rows = users.rows.lock().unwrap();
    assert_eq!(
        rows[&email].1,
        ags_domain::model::password_digest(&cfg.password)
    );
}

#[tokio::test]
async fn tokenless_signup_also_falls_back() {
    let app = Router::new()
        .route("/v1/auth/signup", post(|| async { Json(json!({ "ok": true })) }))
        .route("/v1/auth/login", post(|| async { Json(json!({ "jwt": "j" })) }));
    let api = api(serve(app).await);
    let users = MemoryUsers::default();
    let cfg = ProvisioningConfig::default();
    let flow = IdentityFlow::new(&api, &users, &cfg);

    let created = flow.create_user().await.unwrap();
    assert!(created.credential.is_none());
    let target = flow.obtain_credential(created).await.unwrap();
    assert_eq!(target.credential.token, "j");
}

#[tokio::test]
async fn user_id_resolved_by_email_when_response_omits_it() {
    let app = Router::new().route("/v1/auth/signup", post(|| async { Json(json!({ "jwt": "t" })) }));
    let api = api(serve(app).await);
    let users = MemoryUsers::default();
    let cfg = ProvisioningConfig::default();
    let flow = IdentityFlow::new(&api, &users, &cfg);

    let created = flow.create_user().await.unwrap();
    // The API created the row; mirror it in the directory.
    let id = users.insert_user(&created.email, "h", "n").await.unwrap();

    let target = flow.obtain_credential(created).await.unwrap();
    assert_eq!(target.user_id, id);
}

#[tokio::test]
async fn no_token_anywhere_is_an_auth_error() {
    let app = Router::new()
        .route("/v1/auth/signup", post(|| async { Json(json!({})) }))
        .route(
            "/v1/auth/login",
            post(|| async { (StatusCode::UNAUTHORIZED, "Invalid credentials") }),
        );
    let api = api(serve(app).await);
    let users = MemoryUsers::default();
    let cfg = ProvisioningConfig::default();
    let flow = IdentityFlow::new(&api, &users, &cfg);

    let created = flow.create_user().await.unwrap();
    let err = flow.obtain_credential(created).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "{err}");
}
