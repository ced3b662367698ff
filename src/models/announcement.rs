use chrono::NaiveDate;
use sqlx::PgPool;

use super::listing::ListSpec;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Announcements,
    select: "SELECT an.id, an.title, an.description, an.date, c.name AS class_name \
             FROM announcements an \
             LEFT JOIN classes c ON c.id = an.class_id",
    id_col: "an.id",
    fields: &[
        FilterField::id("class_id", "an.class_id"),
        FilterField::date("date", "an.date"),
    ],
    search: &["an.title", "an.description"],
    sorts: &[
        ("title", "an.title"),
        ("date", "an.date"),
    ],
    default_sort: "date",
    default_desc: true,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnnouncementRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnnouncementRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AnnouncementInput {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub class_id: Option<i64>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<AnnouncementRecord>, sqlx::Error> {
    sqlx::query_as::<_, AnnouncementRecord>(
        "SELECT id, title, description, date, class_id FROM announcements WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, input: &AnnouncementInput) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO announcements (title, description, date, class_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.date)
    .bind(input.class_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &PgPool, id: i64, input: &AnnouncementInput) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "UPDATE announcements SET title = $1, description = $2, date = $3, class_id = $4 WHERE id = $5",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.date)
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
    super::delete_row(pool, "announcements", id).await
}
