//! Option lists for form selects and list filter bars. Lists that point at
//! scoped resources go through the same role scope as the list pages, so a
//! teacher is only offered their own lessons, students, exams and assignments.

use sqlx::PgPool;

use crate::auth::role::Viewer;
use crate::forms::SelectOption;
use super::scope;
use super::ResourceKind;

#[derive(Debug, sqlx::FromRow)]
struct Choice {
    id: i64,
    label: String,
}

impl From<Choice> for SelectOption {
    fn from(c: Choice) -> Self {
        SelectOption::new(c.id, c.label)
    }
}

async fn choices(
    pool: &PgPool,
    kind: ResourceKind,
    viewer: &Viewer,
    select: &str,
    order: &str,
) -> Result<Vec<SelectOption>, sqlx::Error> {
    let scoped = scope::clause(kind, viewer.role);
    let where_sql = match &scoped {
        Some(clause) => scope::render(clause, 1),
        None => "TRUE".to_string(),
    };
    let sql = format!("{select} WHERE {where_sql} ORDER BY {order}");
    let mut query = sqlx::query_as::<_, Choice>(&sql);
    if scoped.as_deref().is_some_and(scope::uses_viewer) {
        query = query.bind(viewer.user_id.to_string());
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.into_iter().map(SelectOption::from).collect())
}

pub async fn grades(pool: &PgPool) -> Result<Vec<SelectOption>, sqlx::Error> {
    let rows = sqlx::query_as::<_, Choice>(
        "SELECT id, level::TEXT AS label FROM grades ORDER BY level",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(SelectOption::from).collect())
}

pub async fn classes(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(pool, ResourceKind::Classes, viewer, "SELECT c.id, c.name AS label FROM classes c", "c.name").await
}

pub async fn teachers(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(
        pool,
        ResourceKind::Teachers,
        viewer,
        "SELECT t.id, t.name || ' ' || t.surname AS label FROM teachers t",
        "t.surname, t.name",
    )
    .await
}

pub async fn parents(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(
        pool,
        ResourceKind::Parents,
        viewer,
        "SELECT p.id, p.name || ' ' || p.surname AS label FROM parents p",
        "p.surname, p.name",
    )
    .await
}

pub async fn subjects(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(pool, ResourceKind::Subjects, viewer, "SELECT sub.id, sub.name AS label FROM subjects sub", "sub.name").await
}

pub async fn students(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(
        pool,
        ResourceKind::Students,
        viewer,
        "SELECT s.id, s.name || ' ' || s.surname || ' (' || c.name || ')' AS label \
         FROM students s JOIN classes c ON c.id = s.class_id",
        "s.surname, s.name",
    )
    .await
}

pub async fn lessons(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(
        pool,
        ResourceKind::Lessons,
        viewer,
        "SELECT l.id, l.name || ' (' || c.name || ')' AS label \
         FROM lessons l JOIN classes c ON c.id = l.class_id",
        "l.name, c.name",
    )
    .await
}

pub async fn exams(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(
        pool,
        ResourceKind::Exams,
        viewer,
        "SELECT e.id, e.title || ' (' || c.name || ')' AS label \
         FROM exams e JOIN lessons l ON l.id = e.lesson_id JOIN classes c ON c.id = l.class_id",
        "e.start_time DESC",
    )
    .await
}

pub async fn assignments(pool: &PgPool, viewer: &Viewer) -> Result<Vec<SelectOption>, sqlx::Error> {
    choices(
        pool,
        ResourceKind::Assignments,
        viewer,
        "SELECT asg.id, asg.title || ' (' || c.name || ')' AS label \
         FROM assignments asg JOIN lessons l ON l.id = asg.lesson_id JOIN classes c ON c.id = l.class_id",
        "asg.due_date DESC",
    )
    .await
}
