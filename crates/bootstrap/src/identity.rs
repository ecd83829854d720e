//! Throwaway user creation and credential acquisition.
//!
//! Signup is tried first. When it yields no token the user row is written
//! directly and a login is attempted. The user id always comes from the
//! auth response or from a lookup by the unique email.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use ags_api_client::{ApiClient, AuthResponse};
use ags_domain::config::ProvisioningConfig;
use ags_domain::error::{Error, Result};
use ags_domain::model::{password_digest, Credential, ProvisionTarget};
use ags_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// User directory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Direct access to user rows, bypassing the API.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert unless the email exists; return the user's id either way.
    async fn insert_user(&self, email: &str, password_hash: &str, name: &str) -> Result<Uuid>;
    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>>;
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn insert_user(&self, email: &str, password_hash: &str, name: &str) -> Result<Uuid> {
        ags_store::users::insert_user(&self.pool, email, password_hash, name).await
    }

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        ags_store::users::user_id_by_email(&self.pool, email).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Flow
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of the `USER_CREATED` step.
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub email: String,
    pub credential: Option<Credential>,
    /// Known when the row was inserted directly.
    pub user_id: Option<Uuid>,
    pub via: &'static str,
}

/// A fresh, unique, lowercase email: `<prefix>+<millis>-<rand>@<domain>`.
pub fn unique_email(prefix: &str, domain: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let rand = Uuid::new_v4().simple().to_string();
    format!("{prefix}+{millis}-{}@{domain}", &rand[..6]).to_lowercase()
}

pub struct IdentityFlow<'a> {
    api: &'a ApiClient,
    users: &'a dyn UserDirectory,
    cfg: &'a ProvisioningConfig,
}

impl<'a> IdentityFlow<'a> {
    pub fn new(api: &'a ApiClient, users: &'a dyn UserDirectory, cfg: &'a ProvisioningConfig) -> Self {
        Self { api, users, cfg }
    }

    /// Sign up a new user, falling back to a direct insert when signup
    /// produced no token.
    pub async fn create_user(&self) -> Result<CreatedUser> {
        let email = unique_email(&self.cfg.email_prefix, &self.cfg.email_domain);
        tracing::info!(%email, "creating user");

        match self
            .api
            .signup(&email, &self.cfg.password, &self.cfg.display_name)
            .await
        {
            Ok(resp) => {
                if let Some(credential) = resp.credential() {
                    return Ok(CreatedUser {
                        email,
                        user_id: credential.user_id,
                        credential: Some(credential),
                        via: "signup",
                    });
                }
                tracing::warn!(%email, "signup returned no token, inserting user directly");
            }
            Err(e) => tracing::warn!(%email, error = %e, "signup failed, inserting user directly"),
        }

        let id = self
            .users
            .insert_user(&email, &password_digest(&self.cfg.password), &self.cfg.display_name)
            .await?;
        Ok(CreatedUser {
            email,
            credential: None,
            user_id: Some(id),
            via: "sql",
        })
    }

    /// Turn a created user into a provisioning target: a bearer credential
    /// plus an explicit user id.
    pub async fn obtain_credential(&self, user: CreatedUser) -> Result<ProvisionTarget> {
        let (credential, via) = match user.credential {
            Some(c) => (c, user.via),
            None => {
                let resp: AuthResponse = self.api.login(&user.email, &self.cfg.password).await?;
                let c = resp.credential().ok_or_else(|| {
                    Error::Auth(format!("login for {} returned no token", user.email))
                })?;
                (c, "login")
            }
        };

        let user_id = match credential.user_id.or(user.user_id) {
            Some(id) => id,
            None => self
                .users
                .user_id_by_email(&user.email)
                .await?
                .ok_or_else(|| Error::Auth(format!("no user row for {}", user.email)))?,
        };

        TraceEvent::CredentialObtained {
            email: user.email.clone(),
            via: via.to_owned(),
        }
        .emit();

        Ok(ProvisionTarget {
            user_id,
            email: user.email,
            credential,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_unique_and_lowercase() {
        let a = unique_email("Boot", "Example.com");
        let b = unique_email("Boot", "Example.com");
        assert_ne!(a, b);
        assert!(a.starts_with("boot+"));
        assert!(a.ends_with("@example.com"));
    }
}
