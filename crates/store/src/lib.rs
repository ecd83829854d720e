//! Postgres access for the bootstrap: connection pool, the migration ledger,
//! the catalog seeder, direct user rows and SQL provisioning.

pub mod migrations;
pub mod pool;
pub mod provision;
pub mod seed;
pub mod users;

pub use migrations::{reconcile, Migration, MigrationOutcome, MIGRATIONS};
pub use pool::connect;
pub use provision::provision_defaults;
pub use seed::{seed_catalog, SeedReport};

use ags_domain::error::Error;

/// Wrap a driver error without rewording it.
pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}
