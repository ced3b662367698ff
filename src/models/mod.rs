pub mod account;
pub mod announcement;
pub mod assignment;
pub mod attendance;
pub mod class;
pub mod dashboard;
pub mod event;
pub mod exam;
pub mod grade;
pub mod lesson;
pub mod listing;
pub mod lookup;
pub mod parent;
pub mod person;
pub mod result;
pub mod schedule;
pub mod scope;
pub mod status;
pub mod student;
pub mod subject;
pub mod table_filter;
pub mod teacher;

use std::fmt;

use sqlx::PgPool;

/// The resources behind `/list/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Students,
    Teachers,
    Parents,
    Classes,
    Subjects,
    Lessons,
    Exams,
    Assignments,
    Results,
    Attendance,
    Events,
    Announcements,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Students,
        ResourceKind::Teachers,
        ResourceKind::Parents,
        ResourceKind::Classes,
        ResourceKind::Subjects,
        ResourceKind::Lessons,
        ResourceKind::Exams,
        ResourceKind::Assignments,
        ResourceKind::Results,
        ResourceKind::Attendance,
        ResourceKind::Events,
        ResourceKind::Announcements,
    ];

    /// URL segment, permission prefix and i18n key of the list title.
    pub fn slug(&self) -> &'static str {
        match self {
            ResourceKind::Students => "students",
            ResourceKind::Teachers => "teachers",
            ResourceKind::Parents => "parents",
            ResourceKind::Classes => "classes",
            ResourceKind::Subjects => "subjects",
            ResourceKind::Lessons => "lessons",
            ResourceKind::Exams => "exams",
            ResourceKind::Assignments => "assignments",
            ResourceKind::Results => "results",
            ResourceKind::Attendance => "attendance",
            ResourceKind::Events => "events",
            ResourceKind::Announcements => "announcements",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    /// i18n key naming one record of this kind.
    pub fn singular_key(&self) -> &'static str {
        match self {
            ResourceKind::Students => "student",
            ResourceKind::Teachers => "teacher",
            ResourceKind::Parents => "parent",
            ResourceKind::Classes => "class",
            ResourceKind::Subjects => "subject",
            ResourceKind::Lessons => "lesson",
            ResourceKind::Exams => "exam",
            ResourceKind::Assignments => "assignment",
            ResourceKind::Results => "result",
            ResourceKind::Attendance => "attendance_record",
            ResourceKind::Events => "event",
            ResourceKind::Announcements => "announcement",
        }
    }

    pub fn permission(&self, action: &str) -> String {
        format!("{}.{action}", self.slug())
    }

    pub fn list_url(&self) -> String {
        format!("/list/{}", self.slug())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Delete one row by id from a fixed table; `RowNotFound` when nothing matched.
pub async fn delete_row(pool: &PgPool, table: &'static str, id: i64) -> Result<(), sqlx::Error> {
    let sql = format!("DELETE FROM {table} WHERE id = $1");
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}
