//! Direct user rows, used when the API could not issue a credential.

use sqlx::PgPool;
use uuid::Uuid;

use ags_domain::error::Result;

use crate::db_err;

/// Insert a user unless the email already exists; either way return its id.
pub async fn insert_user(pool: &PgPool, email: &str, password_hash: &str, name: &str) -> Result<Uuid> {
    let inserted: Option<Uuid> = sqlx::query_scalar(
        "insert into users (email, password_hash, name) values ($1, $2, $3)
         on conflict (email) do nothing
         returning id",
    )
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(db_err)?;

    match inserted {
        Some(id) => {
            tracing::info!(%email, user_id = %id, "user inserted directly");
            Ok(id)
        }
        None => {
            let id = user_id_by_email(pool, email).await?.ok_or_else(|| {
                ags_domain::Error::Database(format!("user {email} vanished after conflict"))
            })?;
            tracing::debug!(%email, user_id = %id, "user already existed");
            Ok(id)
        }
    }
}

/// Resolve a user id by its unique email.
pub async fn user_id_by_email(pool: &PgPool, email: &str) -> Result<Option<Uuid>> {
    sqlx::query_scalar("select id from users where email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_err)
}
