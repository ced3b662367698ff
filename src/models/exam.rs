use chrono::NaiveDateTime;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Exams,
    select: "SELECT e.id, e.title, e.start_time, e.end_time, sub.name AS subject_name, \
                    c.name AS class_name, t.name || ' ' || t.surname AS teacher_name \
             FROM exams e \
             JOIN lessons l ON l.id = e.lesson_id \
             JOIN subjects sub ON sub.id = l.subject_id \
             JOIN classes c ON c.id = l.class_id \
             JOIN teachers t ON t.id = l.teacher_id",
    id_col: "e.id",
    fields: &[
        FilterField::id("class_id", "l.class_id"),
        FilterField::id("teacher_id", "l.teacher_id"),
        FilterField::id("lesson_id", "e.lesson_id"),
        FilterField::id("subject_id", "l.subject_id"),
        FilterField::date("date", "e.start_time"),
    ],
    search: &["e.title", "sub.name"],
    sorts: &[
        ("title", "e.title"),
        ("date", "e.start_time"),
        ("class", "c.name"),
    ],
    default_sort: "date",
    default_desc: true,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub subject_name: String,
    pub class_name: String,
    pub teacher_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExamRecord {
    pub id: i64,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub lesson_id: i64,
}

#[derive(Debug, Clone)]
pub struct ExamInput {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub lesson_id: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(
        "SELECT id, title, start_time, end_time, lesson_id FROM exams WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The teacher whose lesson the exam belongs to.
pub async fn teacher_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT l.teacher_id FROM exams e JOIN lessons l ON l.id = e.lesson_id WHERE e.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(t,)| t))
}

pub async fn create(pool: &PgPool, input: &ExamInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO exams (title, start_time, end_time, lesson_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&input.title)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.lesson_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &ExamInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exams SET title = $1, start_time = $2, end_time = $3, lesson_id = $4 WHERE id = $5",
    )
    .bind(&input.title)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.lesson_id)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "exams", id).await
}
