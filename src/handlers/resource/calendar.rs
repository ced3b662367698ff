//! Events and announcements. Rows without a class are school-wide.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::auth::role::Viewer;
use crate::errors::AppError;
use crate::forms::{FieldKind, FieldSpec, FormData, FormReader, SaveError};
use crate::i18n::Locale;
use crate::models::announcement::{self, AnnouncementInput, AnnouncementRow};
use crate::models::event::{self, EventInput, EventRow};
use crate::models::listing::ListSpec;
use crate::models::status::period_status;
use crate::models::{lookup, ResourceKind};
use crate::templates_structs::Cell;
use super::{col, sorted, ColumnDef, FilterSelect, FormMode, ResourceHandler};

const DESCRIPTION_MAX: usize = 2000;
const PREVIEW_CHARS: usize = 80;

fn class_cell(class_name: Option<&str>, locale: Locale) -> Cell {
    Cell::text(class_name.unwrap_or(locale.t("all_classes")))
}

/// First `PREVIEW_CHARS` characters, with an ellipsis when cut.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}…") } else { head }
}

// ---------- Events ----------

pub struct Events;

fn read_event(data: &FormData) -> Result<EventInput, SaveError> {
    let mut r = FormReader::new(data);
    let title = r.text("title", 100);
    let description = r.text("description", DESCRIPTION_MAX);
    let start_time = r.datetime("start_time");
    let end_time = r.datetime("end_time");
    r.ensure_after("start_time", &start_time, "end_time", &end_time);
    let class_id = r.optional_id("class_id");
    r.finish()?;
    Ok(EventInput { title, description, start_time, end_time, class_id })
}

impl ResourceHandler for Events {
    const KIND: ResourceKind = ResourceKind::Events;
    type Row = EventRow;

    fn spec() -> &'static ListSpec {
        &event::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("title", "title"),
            col("class"),
            sorted("date", "date"),
            col("start_time"),
            col("end_time"),
            col("status"),
        ]
    }

    fn cells(row: &EventRow, locale: Locale, now: NaiveDateTime) -> Vec<Cell> {
        let status = period_status(row.start_time, row.end_time, now);
        vec![
            Cell::text(&row.title),
            class_cell(row.class_name.as_deref(), locale),
            Cell::text(row.start_time.format("%Y-%m-%d").to_string()),
            Cell::text(row.start_time.format("%H:%M").to_string()),
            Cell::text(row.end_time.format("%H:%M").to_string()),
            Cell::badge(locale.t(status.key()), status.badge()),
        ]
    }

    fn row_id(row: &EventRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![FilterSelect::new("class_id", lookup::classes(pool, viewer).await?)])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("title").required(),
            FieldSpec::new("description", FieldKind::Textarea).required(),
            FieldSpec::new("start_time", FieldKind::DateTime).required(),
            FieldSpec::new("end_time", FieldKind::DateTime).required(),
            FieldSpec::select("class_id", lookup::classes(pool, viewer).await?).hint("all_classes_hint"),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let e = event::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("title", &e.title)
            .with("description", &e.description)
            .with("start_time", e.start_time.format("%Y-%m-%dT%H:%M"))
            .with("end_time", e.end_time.format("%Y-%m-%dT%H:%M"))
            .with_opt("class_id", e.class_id))
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_event(data)?;
        Ok(event::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_event(data)?;
        Ok(event::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        event::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let e = event::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(format!("{} ({})", e.title, e.start_time.format("%Y-%m-%d %H:%M")))
    }
}

// ---------- Announcements ----------

pub struct Announcements;

fn read_announcement(data: &FormData) -> Result<AnnouncementInput, SaveError> {
    let mut r = FormReader::new(data);
    let input = AnnouncementInput {
        title: r.text("title", 100),
        description: r.text("description", DESCRIPTION_MAX),
        date: r.date("date"),
        class_id: r.optional_id("class_id"),
    };
    r.finish()?;
    Ok(input)
}

impl ResourceHandler for Announcements {
    const KIND: ResourceKind = ResourceKind::Announcements;
    type Row = AnnouncementRow;

    fn spec() -> &'static ListSpec {
        &announcement::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![sorted("title", "title"), col("class"), sorted("date", "date"), col("description")]
    }

    fn cells(row: &AnnouncementRow, locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![
            Cell::text(&row.title),
            class_cell(row.class_name.as_deref(), locale),
            Cell::text(row.date.format("%Y-%m-%d").to_string()),
            Cell::text(preview(&row.description)),
        ]
    }

    fn row_id(row: &AnnouncementRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![FilterSelect::new("class_id", lookup::classes(pool, viewer).await?)])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("title").required(),
            FieldSpec::new("description", FieldKind::Textarea).required(),
            FieldSpec::new("date", FieldKind::Date).required(),
            FieldSpec::select("class_id", lookup::classes(pool, viewer).await?).hint("all_classes_hint"),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let a = announcement::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("title", &a.title)
            .with("description", &a.description)
            .with("date", a.date.format("%Y-%m-%d"))
            .with_opt("class_id", a.class_id))
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_announcement(data)?;
        Ok(announcement::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_announcement(data)?;
        Ok(announcement::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        announcement::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let a = announcement::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(format!("{} ({})", a.title, a.date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::errors::{ErrorCode, FieldError};

    #[test]
    fn preview_cuts_long_text() {
        assert_eq!(preview("short"), "short");
        let long = "á".repeat(100);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn global_rows_show_all_classes() {
        assert_eq!(class_cell(None, Locale::En).text, "All classes");
        assert_eq!(class_cell(Some("2A"), Locale::En).text, "2A");
    }

    #[test]
    fn event_without_class_is_global() {
        let data = FormData::default()
            .with("title", "Fair")
            .with("description", "Science fair")
            .with("start_time", "2026-10-20T09:00")
            .with("end_time", "2026-10-20T13:00");
        let input = read_event(&data).unwrap();
        assert_eq!(input.class_id, None);
    }

    #[test]
    fn event_end_must_follow_start() {
        let data = FormData::default()
            .with("title", "Fair")
            .with("description", "Science fair")
            .with("start_time", "2026-10-20T09:00")
            .with("end_time", "2026-10-20T09:00");
        match read_event(&data) {
            Err(SaveError::Invalid(errs)) => {
                assert_eq!(errs, vec![FieldError::new("end_time", ErrorCode::EndBeforeStart)]);
            }
            _ => panic!("expected an ordering error"),
        }
    }
}
