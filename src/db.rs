use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::role::Role;
use crate::config::AppConfig;
use crate::models::account;

/// Pool created lazily: no connection is opened until the first query.
pub fn create_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the `admin` account when no account exists yet. Returns whether
/// anything was created.
pub async fn seed_admin(pool: &PgPool, password_hash: &str) -> Result<bool, sqlx::Error> {
    let existing = account::count(pool).await?;
    if existing > 0 {
        log::info!("Database already has {existing} accounts, skipping admin seed");
        return Ok(false);
    }
    let mut conn = pool.acquire().await?;
    account::insert(&mut *conn, "admin", password_hash, Role::Admin).await?;
    log::info!("Created admin account");
    Ok(true)
}
