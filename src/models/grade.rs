use sqlx::PgPool;

/// Grade levels are a fixed lookup seeded by the migrations.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Grade {
    pub id: i64,
    pub level: i32,
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<Grade>, sqlx::Error> {
    sqlx::query_as::<_, Grade>("SELECT id, level FROM grades ORDER BY level")
        .fetch_all(pool)
        .await
}

pub async fn find_by_level(pool: &PgPool, level: i32) -> Result<Option<Grade>, sqlx::Error> {
    sqlx::query_as::<_, Grade>("SELECT id, level FROM grades WHERE level = $1")
        .bind(level)
        .fetch_optional(pool)
        .await
}
