use chrono::NaiveDateTime;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Assignments,
    select: "SELECT asg.id, asg.title, asg.start_date, asg.due_date, sub.name AS subject_name, \
                    c.name AS class_name, t.name || ' ' || t.surname AS teacher_name \
             FROM assignments asg \
             JOIN lessons l ON l.id = asg.lesson_id \
             JOIN subjects sub ON sub.id = l.subject_id \
             JOIN classes c ON c.id = l.class_id \
             JOIN teachers t ON t.id = l.teacher_id",
    id_col: "asg.id",
    fields: &[
        FilterField::id("class_id", "l.class_id"),
        FilterField::id("teacher_id", "l.teacher_id"),
        FilterField::id("lesson_id", "asg.lesson_id"),
        FilterField::id("subject_id", "l.subject_id"),
        FilterField::date("date", "asg.due_date"),
    ],
    search: &["asg.title", "sub.name"],
    sorts: &[
        ("title", "asg.title"),
        ("date", "asg.due_date"),
        ("class", "c.name"),
    ],
    default_sort: "date",
    default_desc: true,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub title: String,
    pub start_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub subject_name: String,
    pub class_name: String,
    pub teacher_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentRecord {
    pub id: i64,
    pub title: String,
    pub start_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub lesson_id: i64,
}

#[derive(Debug, Clone)]
pub struct AssignmentInput {
    pub title: String,
    pub start_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub lesson_id: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<AssignmentRecord>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentRecord>(
        "SELECT id, title, start_date, due_date, lesson_id FROM assignments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The teacher whose lesson the assignment belongs to.
pub async fn teacher_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT l.teacher_id FROM assignments asg JOIN lessons l ON l.id = asg.lesson_id WHERE asg.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(t,)| t))
}

pub async fn create(pool: &PgPool, input: &AssignmentInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO assignments (title, start_date, due_date, lesson_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&input.title)
    .bind(input.start_date)
    .bind(input.due_date)
    .bind(input.lesson_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &AssignmentInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assignments SET title = $1, start_date = $2, due_date = $3, lesson_id = $4 WHERE id = $5",
    )
    .bind(&input.title)
    .bind(input.start_date)
    .bind(input.due_date)
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
    super::delete_row(pool, "assignments", id).await
}
