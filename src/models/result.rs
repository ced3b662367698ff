use chrono::NaiveDateTime;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Results,
    select: "SELECT r.id, r.score, s.name || ' ' || s.surname AS student_name, \
                    c.name AS class_name, \
                    COALESCE(e.title, asg.title) AS source_title, \
                    r.exam_id IS NOT NULL AS from_exam, \
                    COALESCE(e.start_time, asg.start_date) AS source_date, \
                    COALESCE(t.name || ' ' || t.surname, '') AS teacher_name \
             FROM results r \
             JOIN students s ON s.id = r.student_id \
             JOIN classes c ON c.id = s.class_id \
             LEFT JOIN exams e ON e.id = r.exam_id \
             LEFT JOIN lessons el ON el.id = e.lesson_id \
             LEFT JOIN assignments asg ON asg.id = r.assignment_id \
             LEFT JOIN lessons al ON al.id = asg.lesson_id \
             LEFT JOIN teachers t ON t.id = COALESCE(el.teacher_id, al.teacher_id)",
    id_col: "r.id",
    fields: &[
        FilterField::id("student_id", "r.student_id"),
        FilterField::id("exam_id", "r.exam_id"),
        FilterField::id("assignment_id", "r.assignment_id"),
        FilterField::id("class_id", "s.class_id"),
        FilterField::id("teacher_id", "COALESCE(el.teacher_id, al.teacher_id)"),
        FilterField::id("lesson_id", "COALESCE(el.id, al.id)"),
    ],
    search: &["s.name", "s.surname", "e.title", "asg.title"],
    sorts: &[
        ("student", "s.surname || ' ' || s.name"),
        ("score", "r.score"),
        ("title", "COALESCE(e.title, asg.title)"),
        ("date", "COALESCE(e.start_time, asg.start_date)"),
    ],
    default_sort: "date",
    default_desc: true,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultRow {
    pub id: i64,
    pub score: i32,
    pub student_name: String,
    pub class_name: String,
    pub source_title: String,
    pub from_exam: bool,
    pub source_date: NaiveDateTime,
    pub teacher_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultRecord {
    pub id: i64,
    pub score: i32,
    pub exam_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub student_id: i64,
}

#[derive(Debug, Clone)]
pub struct ResultInput {
    pub score: i32,
    pub exam_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub student_id: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ResultRecord>, sqlx::Error> {
    sqlx::query_as::<_, ResultRecord>(
        "SELECT id, score, exam_id, assignment_id, student_id FROM results WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, input: &ResultInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO results (score, exam_id, assignment_id, student_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(input.score)
    .bind(input.exam_id)
    .bind(input.assignment_id)
    .bind(input.student_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &ResultInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE results SET score = $1, exam_id = $2, assignment_id = $3, student_id = $4 WHERE id = $5",
    )
    .bind(input.score)
    .bind(input.exam_id)
    .bind(input.assignment_id)
    .bind(input.student_id)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "results", id).await
}
