use chrono::NaiveTime;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const DAYS: &[&str] = &["MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY"];

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Lessons,
    select: "SELECT l.id, l.name, l.day, l.start_time, l.end_time, sub.name AS subject_name, \
                    c.name AS class_name, t.name || ' ' || t.surname AS teacher_name \
             FROM lessons l \
             JOIN subjects sub ON sub.id = l.subject_id \
             JOIN classes c ON c.id = l.class_id \
             JOIN teachers t ON t.id = l.teacher_id",
    id_col: "l.id",
    fields: &[
        FilterField::id("class_id", "l.class_id"),
        FilterField::id("teacher_id", "l.teacher_id"),
        FilterField::id("subject_id", "l.subject_id"),
        FilterField::text("day", "l.day"),
    ],
    search: &["l.name", "sub.name", "t.name", "t.surname"],
    sorts: &[
        ("name", "l.name"),
        ("day", "array_position(ARRAY['MONDAY','TUESDAY','WEDNESDAY','THURSDAY','FRIDAY'], l.day)"),
        ("class", "c.name"),
        ("teacher", "t.surname"),
    ],
    default_sort: "day",
    default_desc: false,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LessonRow {
    pub id: i64,
    pub name: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_name: String,
    pub class_name: String,
    pub teacher_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LessonRecord {
    pub id: i64,
    pub name: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
}

#[derive(Debug, Clone)]
pub struct LessonInput {
    pub name: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<LessonRecord>, sqlx::Error> {
    sqlx::query_as::<_, LessonRecord>(
        "SELECT id, name, day, start_time, end_time, subject_id, class_id, teacher_id \
         FROM lessons WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The teacher giving a lesson.
pub async fn teacher_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT teacher_id FROM lessons WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(t,)| t))
}

pub async fn create(pool: &PgPool, input: &LessonInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO lessons (name, day, start_time, end_time, subject_id, class_id, teacher_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&input.name)
    .bind(&input.day)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.subject_id)
    .bind(input.class_id)
    .bind(input.teacher_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &LessonInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE lessons SET name = $1, day = $2, start_time = $3, end_time = $4, \
                subject_id = $5, class_id = $6, teacher_id = $7 \
         WHERE id = $8",
    )
    .bind(&input.name)
    .bind(&input.day)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.subject_id)
    .bind(input.class_id)
    .bind(input.teacher_id)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "lessons", id).await
}

/// All lessons a teacher gives, in list-row form for the schedule.
pub async fn for_teacher(pool: &PgPool, teacher_id: i64) -> Result<Vec<LessonRow>, sqlx::Error> {
    let sql = format!("{} WHERE l.teacher_id = $1 ORDER BY l.start_time", LIST.select);
    sqlx::query_as::<_, LessonRow>(&sql)
        .bind(teacher_id)
        .fetch_all(pool)
        .await
}

pub async fn for_class(pool: &PgPool, class_id: i64) -> Result<Vec<LessonRow>, sqlx::Error> {
    let sql = format!("{} WHERE l.class_id = $1 ORDER BY l.start_time", LIST.select);
    sqlx::query_as::<_, LessonRow>(&sql)
        .bind(class_id)
        .fetch_all(pool)
        .await
}
