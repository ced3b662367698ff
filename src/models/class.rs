use sqlx::{PgConnection, PgPool};

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Classes,
    select: "SELECT c.id, c.name, c.capacity, g.level AS grade_level, \
                    sup.name || ' ' || sup.surname AS supervisor, \
                    (SELECT COUNT(*) FROM students cs WHERE cs.class_id = c.id) AS student_count \
             FROM classes c \
             JOIN grades g ON g.id = c.grade_id \
             LEFT JOIN teachers sup ON sup.id = c.supervisor_id",
    id_col: "c.id",
    fields: &[
        FilterField::id("supervisor_id", "c.supervisor_id"),
        FilterField::id("grade_id", "c.grade_id"),
        FilterField::id_set(
            "teacher_id",
            "SELECT fl.teacher_id FROM lessons fl WHERE fl.class_id = c.id",
        ),
    ],
    search: &["c.name", "sup.name", "sup.surname"],
    sorts: &[
        ("name", "c.name"),
        ("capacity", "c.capacity"),
        ("grade", "g.level"),
    ],
    default_sort: "name",
    default_desc: false,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClassRow {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    pub grade_level: i32,
    pub supervisor: Option<String>,
    pub student_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClassRecord {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    pub supervisor_id: Option<i64>,
    pub grade_id: i64,
}

#[derive(Debug, Clone)]
pub struct ClassInput {
    pub name: String,
    pub capacity: i32,
    pub supervisor_id: Option<i64>,
    pub grade_id: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ClassRecord>, sqlx::Error> {
    sqlx::query_as::<_, ClassRecord>(
        "SELECT id, name, capacity, supervisor_id, grade_id FROM classes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, input: &ClassInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO classes (name, capacity, supervisor_id, grade_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&input.name)
    .bind(input.capacity)
    .bind(input.supervisor_id)
    .bind(input.grade_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &ClassInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE classes SET name = $1, capacity = $2, supervisor_id = $3, grade_id = $4 WHERE id = $5",
    )
    .bind(&input.name)
    .bind(input.capacity)
    .bind(input.supervisor_id)
    .bind(input.grade_id)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "classes", id).await
}

/// Grade of a class, or `None` when it does not exist.
pub async fn grade_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT grade_id FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(g,)| g))
}

/// Lock the class row for the rest of the transaction and report whether a
/// seat is free. Placements into the same class queue on the lock, and the
/// count runs after it is held, so it sees every committed placement.
/// A missing class reports a free seat; the foreign key rejects it later.
pub async fn lock_free_seat(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
    let capacity: Option<(i32,)> = sqlx::query_as("SELECT capacity FROM classes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some((capacity,)) = capacity else { return Ok(true) };
    let (seated,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students WHERE class_id = $1")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(seated < i64::from(capacity))
}
