use chrono::NaiveDateTime;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Events,
    select: "SELECT ev.id, ev.title, ev.description, ev.start_time, ev.end_time, \
                    c.name AS class_name \
             FROM events ev \
             LEFT JOIN classes c ON c.id = ev.class_id",
    id_col: "ev.id",
    fields: &[
        FilterField::id("class_id", "ev.class_id"),
        FilterField::date("date", "ev.start_time"),
    ],
    search: &["ev.title", "ev.description"],
    sorts: &[
        ("title", "ev.title"),
        ("date", "ev.start_time"),
    ],
    default_sort: "date",
    default_desc: true,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub class_id: Option<i64>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<EventRecord>, sqlx::Error> {
    sqlx::query_as::<_, EventRecord>(
        "SELECT id, title, description, start_time, end_time, class_id FROM events WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, input: &EventInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO events (title, description, start_time, end_time, class_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.class_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &EventInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE events SET title = $1, description = $2, start_time = $3, end_time = $4, class_id = $5 \
         WHERE id = $6",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.class_id)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    super::delete_row(pool, "events", id).await
}
