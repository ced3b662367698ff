use chrono::NaiveDate;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Attendance,
    select: "SELECT att.id, att.date, att.present, s.name || ' ' || s.surname AS student_name, \
                    l.name AS lesson_name, c.name AS class_name \
             FROM attendances att \
             JOIN students s ON s.id = att.student_id \
             JOIN lessons l ON l.id = att.lesson_id \
             JOIN classes c ON c.id = l.class_id",
    id_col: "att.id",
    fields: &[
        FilterField::id("student_id", "att.student_id"),
        FilterField::id("lesson_id", "att.lesson_id"),
        FilterField::id("class_id", "l.class_id"),
        FilterField::id("teacher_id", "l.teacher_id"),
        FilterField::date("date", "att.date"),
    ],
    search: &["s.name", "s.surname", "l.name"],
    sorts: &[
        ("date", "att.date"),
        ("student", "s.surname || ' ' || s.name"),
        ("lesson", "l.name"),
    ],
    default_sort: "date",
    default_desc: true,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: i64,
    pub date: NaiveDate,
    pub present: bool,
    pub student_name: String,
    pub lesson_name: String,
    pub class_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub present: bool,
    pub student_id: i64,
    pub lesson_id: i64,
}

#[derive(Debug, Clone)]
pub struct AttendanceInput {
    pub date: NaiveDate,
    pub present: bool,
    pub student_id: i64,
    pub lesson_id: i64,
}

/// Present / absent counts for one weekday.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DayCount {
    pub date: NaiveDate,
    pub present: i64,
    pub absent: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, date, present, student_id, lesson_id FROM attendances WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, input: &AttendanceInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO attendances (date, present, student_id, lesson_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(input.date)
    .bind(input.present)
    .bind(input.student_id)
    .bind(input.lesson_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &AttendanceInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attendances SET date = $1, present = $2, student_id = $3, lesson_id = $4 WHERE id = $5",
    )
    .bind(input.date)
    .bind(input.present)
    .bind(input.student_id)
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
    super::delete_row(pool, "attendances", id).await
}

/// Present / absent totals per day between `from` and `to` inclusive.
/// Days without records are absent from the result.
pub async fn daily_counts(pool: &PgPool, from: NaiveDate, to: NaiveDate) -> Result<Vec<DayCount>, sqlx::Error> {
    sqlx::query_as::<_, DayCount>(
        "SELECT date, COUNT(*) FILTER (WHERE present) AS present, \
                COUNT(*) FILTER (WHERE NOT present) AS absent \
         FROM attendances \
         WHERE date BETWEEN $1 AND $2 \
         GROUP BY date ORDER BY date",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
