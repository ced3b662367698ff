use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Subjects,
    select: "SELECT sub.id, sub.name, \
                    (SELECT string_agg(t.name || ' ' || t.surname, ', ' ORDER BY t.surname) \
                       FROM subject_teachers st JOIN teachers t ON t.id = st.teacher_id \
                      WHERE st.subject_id = sub.id) AS teachers \
             FROM subjects sub",
    id_col: "sub.id",
    fields: &[FilterField::id_set(
        "teacher_id",
        "SELECT fst.teacher_id FROM subject_teachers fst WHERE fst.subject_id = sub.id",
    )],
    search: &["sub.name"],
    sorts: &[("name", "sub.name")],
    default_sort: "name",
    default_desc: false,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubjectRow {
    pub id: i64,
    pub name: String,
    pub teachers: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubjectInput {
    pub name: String,
    pub teacher_ids: Vec<i64>,
}

pub async fn find_name(pool: &PgPool, id: i64) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT name FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(n,)| n))
}

pub async fn teacher_ids(pool: &PgPool, id: i64) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT teacher_id FROM subject_teachers WHERE subject_id = $1 ORDER BY teacher_id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

pub async fn create(pool: &PgPool, input: &SubjectInput) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let (id,): (i64,) = sqlx::query_as("INSERT INTO subjects (name) VALUES ($1) RETURNING id")
        .bind(&input.name)
        .fetch_one(&mut *tx)
        .await?;
    for teacher_id in &input.teacher_ids {
        sqlx::query("INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2)")
            .bind(id)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &SubjectInput) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("UPDATE subjects SET name = $1 WHERE id = $2")
        .bind(&input.name)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    sqlx::query("DELETE FROM subject_teachers WHERE subject_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for teacher_id in &input.teacher_ids {
        sqlx::query("INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2)")
            .bind(id)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "subjects", id).await
}
