use sqlx::PgPool;

use crate::auth::role::Role;
use super::account;
use super::listing::ListSpec;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Parents,
    select: "SELECT p.id, a.username, p.name, p.surname, p.email, p.phone, p.address, \
                    (SELECT string_agg(ps.name || ' ' || ps.surname, ', ' ORDER BY ps.name) \
                       FROM students ps WHERE ps.parent_id = p.id) AS children \
             FROM parents p \
             JOIN accounts a ON a.id = p.id",
    id_col: "p.id",
    fields: &[],
    search: &["p.name", "p.surname", "a.username"],
    sorts: &[
        ("name", "p.surname || ' ' || p.name"),
        ("username", "a.username"),
    ],
    default_sort: "name",
    default_desc: false,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParentRow {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub children: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParentRecord {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct ParentInput {
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ParentRecord>, sqlx::Error> {
    sqlx::query_as::<_, ParentRecord>(
        "SELECT p.id, a.username, p.name, p.surname, p.email, p.phone, p.address \
         FROM parents p JOIN accounts a ON a.id = p.id \
         WHERE p.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, input: &ParentInput, password_hash: &str) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let id = account::insert(&mut *tx, &input.username, password_hash, Role::Parent).await?;
    sqlx::query(
        "INSERT INTO parents (id, name, surname, email, phone, address) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.surname)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(id)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    input: &ParentInput,
    password_hash: Option<&str>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    account::update_credentials(&mut *tx, id, &input.username, password_hash).await?;
    let result = sqlx::query(
        "UPDATE parents SET name = $1, surname = $2, email = $3, phone = $4, address = $5 \
         WHERE id = $6",
    )
    .bind(&input.name)
    .bind(&input.surname)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    tx.commit().await?;
    Ok(())
}
