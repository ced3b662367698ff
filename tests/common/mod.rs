//! Shared test infrastructure.
//!
//! Database tests need a PostgreSQL server: `TEST_DATABASE_URL` points at a
//! database the tests may use to create and drop scratch databases. Without
//! it the database tests return early.

#![allow(dead_code)]

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};

use aula::auth::password;
use aula::auth::role::Viewer;
use aula::config::AppConfig;
use aula::models::account;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// A scratch database with migrations applied. Call `cleanup` at the end of
/// the test to drop it.
pub struct TestDb {
    pub pool: PgPool,
    admin_url: String,
    name: String,
}

impl TestDb {
    /// Create a fresh database, or `None` when `TEST_DATABASE_URL` is unset.
    pub async fn new() -> Option<Self> {
        let _ = dotenvy::dotenv();
        let admin_url = std::env::var("TEST_DATABASE_URL").ok()?;
        let name = format!("aula_test_{}", hex::encode(rand::random::<[u8; 6]>()));

        let mut admin = PgConnection::connect(&admin_url)
            .await
            .expect("Failed to connect to TEST_DATABASE_URL");
        sqlx::query(&format!("CREATE DATABASE {name}"))
            .execute(&mut admin)
            .await
            .expect("Failed to create test database");
        admin.close().await.ok();

        let options: PgConnectOptions = admin_url.parse().expect("Invalid TEST_DATABASE_URL");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options.database(&name))
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self { pool, admin_url, name })
    }

    /// Fresh database with the admin account and the demo data.
    pub async fn seeded() -> Option<Self> {
        let db = Self::new().await?;
        let hash = password::hash_password(ADMIN_PASS).expect("Failed to hash password");
        aula::db::seed_admin(&db.pool, &hash).await.expect("Failed to seed admin");
        aula::seed::seed_demo(&db.pool, &hash).await.expect("Failed to seed demo data");
        Some(db)
    }

    pub async fn cleanup(self) {
        self.pool.close().await;
        if let Ok(mut admin) = PgConnection::connect(&self.admin_url).await {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name))
                .execute(&mut admin)
                .await;
        }
    }

    /// Viewer for a seeded account.
    pub async fn viewer(&self, username: &str) -> Viewer {
        let acc = account::find_by_username(&self.pool, username)
            .await
            .expect("Query failed")
            .unwrap_or_else(|| panic!("No account {username}"));
        Viewer::new(acc.id, acc.role().expect("Unknown role"))
    }
}

/// Configuration for HTTP tests; the database URL is never dialled.
pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/aula_unused".to_string()),
        "APP_LOCALE" => Some("en".to_string()),
        _ => None,
    })
    .expect("Invalid test config")
}
