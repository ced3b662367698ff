use sqlx::{PgConnection, PgPool};

use crate::auth::role::Role;

/// A sign-in account. Students, teachers and parents share its id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

impl Account {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, username, password_hash, role FROM accounts WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, username, password_hash, role FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Number of accounts per role name.
pub async fn count_by_role(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT role, COUNT(*) FROM accounts GROUP BY role ORDER BY role",
    )
    .fetch_all(pool)
    .await
}

/// Insert an account inside the caller's transaction.
pub async fn insert(
    conn: &mut PgConnection,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO accounts (username, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Change the username and, when given, the password hash.
pub async fn update_credentials(
    conn: &mut PgConnection,
    id: i64,
    username: &str,
    password_hash: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts SET username = $1, password_hash = COALESCE($2, password_hash) WHERE id = $3",
    )
    .bind(username)
    .bind(password_hash)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_password(pool: &PgPool, id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete an account; the person profile sharing its id cascades.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "accounts", id).await
}

/// Display name for the header: the profile's full name when there is one.
pub async fn display_name(pool: &PgPool, id: i64) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT name || ' ' || surname FROM ( \
             SELECT id, name, surname FROM teachers \
             UNION ALL SELECT id, name, surname FROM students \
             UNION ALL SELECT id, name, surname FROM parents \
         ) people WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(name,)| name))
}
