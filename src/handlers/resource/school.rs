//! Classes, subjects and lessons.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::auth::role::Viewer;
use crate::errors::AppError;
use crate::forms::{FieldKind, FieldSpec, FormData, FormReader, SaveError};
use crate::i18n::Locale;
use crate::models::class::{self, ClassInput, ClassRow};
use crate::models::lesson::{self, LessonInput, LessonRow, DAYS};
use crate::models::listing::ListSpec;
use crate::models::subject::{self, SubjectInput, SubjectRow};
use crate::models::{lookup, ResourceKind};
use crate::templates_structs::Cell;
use super::{col, sorted, ColumnDef, FilterSelect, FormMode, ResourceHandler};

// ---------- Classes ----------

pub struct Classes;

fn read_class(data: &FormData) -> Result<ClassInput, SaveError> {
    let mut r = FormReader::new(data);
    let input = ClassInput {
        name: r.text("name", 20),
        capacity: r.int("capacity", 1, 100),
        supervisor_id: r.optional_id("supervisor_id"),
        grade_id: r.id("grade_id"),
    };
    r.finish()?;
    Ok(input)
}

impl ResourceHandler for Classes {
    const KIND: ResourceKind = ResourceKind::Classes;
    type Row = ClassRow;

    fn spec() -> &'static ListSpec {
        &class::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("name", "name"),
            sorted("capacity", "capacity"),
            col("student_count"),
            sorted("grade", "grade"),
            col("supervisor_id"),
        ]
    }

    fn cells(row: &ClassRow, _locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![
            Cell::link(&row.name, format!("/list/students?class_id={}", row.id)),
            Cell::text(row.capacity.to_string()),
            Cell::text(row.student_count.to_string()),
            Cell::text(row.grade_level.to_string()),
            Cell::opt(row.supervisor.as_deref()),
        ]
    }

    fn row_id(row: &ClassRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("grade_id", lookup::grades(pool).await?),
            FilterSelect::new("supervisor_id", lookup::teachers(pool, viewer).await?),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("name").required(),
            FieldSpec::new("capacity", FieldKind::Number).required(),
            FieldSpec::select("grade_id", lookup::grades(pool).await?).required(),
            FieldSpec::select("supervisor_id", lookup::teachers(pool, viewer).await?),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let c = class::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("name", &c.name)
            .with("capacity", c.capacity)
            .with("grade_id", c.grade_id)
            .with_opt("supervisor_id", c.supervisor_id))
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_class(data)?;
        Ok(class::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_class(data)?;
        Ok(class::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        class::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let c = class::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(c.name)
    }
}

// ---------- Subjects ----------

pub struct Subjects;

fn read_subject(data: &FormData) -> Result<SubjectInput, SaveError> {
    let mut r = FormReader::new(data);
    let input = SubjectInput {
        name: r.text("name", 50),
        teacher_ids: r.ids("teacher_ids"),
    };
    r.finish()?;
    Ok(input)
}

impl ResourceHandler for Subjects {
    const KIND: ResourceKind = ResourceKind::Subjects;
    type Row = SubjectRow;

    fn spec() -> &'static ListSpec {
        &subject::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![sorted("name", "name"), col("teacher_ids")]
    }

    fn cells(row: &SubjectRow, _locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![Cell::text(&row.name), Cell::opt(row.teachers.as_deref())]
    }

    fn row_id(row: &SubjectRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![FilterSelect::new("teacher_id", lookup::teachers(pool, viewer).await?)])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("name").required(),
            FieldSpec::multi("teacher_ids", lookup::teachers(pool, viewer).await?),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let name = subject::find_name(pool, id).await?.ok_or(AppError::NotFound)?;
        let mut data = FormData::default().with("name", name);
        for teacher_id in subject::teacher_ids(pool, id).await? {
            data.push("teacher_ids", teacher_id.to_string());
        }
        Ok(data)
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_subject(data)?;
        Ok(subject::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_subject(data)?;
        Ok(subject::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        subject::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        subject::find_name(pool, id).await?.ok_or(AppError::NotFound)
    }
}

// ---------- Lessons ----------

pub struct Lessons;

fn read_lesson(data: &FormData) -> Result<LessonInput, SaveError> {
    let mut r = FormReader::new(data);
    let name = r.text("name", 100);
    let day = r.choice("day", DAYS);
    let start_time = r.time("start_time");
    let end_time = r.time("end_time");
    r.ensure_after("start_time", &start_time, "end_time", &end_time);
    let input = LessonInput {
        name,
        day,
        start_time,
        end_time,
        subject_id: r.id("subject_id"),
        class_id: r.id("class_id"),
        teacher_id: r.id("teacher_id"),
    };
    r.finish()?;
    Ok(input)
}

impl ResourceHandler for Lessons {
    const KIND: ResourceKind = ResourceKind::Lessons;
    type Row = LessonRow;

    fn spec() -> &'static ListSpec {
        &lesson::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("name", "name"),
            col("subject"),
            sorted("class", "class"),
            sorted("teacher", "teacher"),
            sorted("day", "day"),
            col("start_time"),
            col("end_time"),
        ]
    }

    fn cells(row: &LessonRow, locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![
            Cell::text(&row.name),
            Cell::text(&row.subject_name),
            Cell::text(&row.class_name),
            Cell::text(&row.teacher_name),
            Cell::text(locale.t(&row.day)),
            Cell::text(row.start_time.format("%H:%M").to_string()),
            Cell::text(row.end_time.format("%H:%M").to_string()),
        ]
    }

    fn row_id(row: &LessonRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
            FilterSelect::new("teacher_id", lookup::teachers(pool, viewer).await?),
            FilterSelect::choice("day", DAYS),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("name").required(),
            FieldSpec::choice("day", DAYS).required(),
            FieldSpec::new("start_time", FieldKind::Time).required(),
            FieldSpec::new("end_time", FieldKind::Time).required(),
            FieldSpec::select("subject_id", lookup::subjects(pool, viewer).await?).required(),
            FieldSpec::select("class_id", lookup::classes(pool, viewer).await?).required(),
            FieldSpec::select("teacher_id", lookup::teachers(pool, viewer).await?).required(),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let l = lesson::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("name", &l.name)
            .with("day", &l.day)
            .with("start_time", l.start_time.format("%H:%M"))
            .with("end_time", l.end_time.format("%H:%M"))
            .with("subject_id", l.subject_id)
            .with("class_id", l.class_id)
            .with("teacher_id", l.teacher_id))
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_lesson(data)?;
        Ok(lesson::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_lesson(data)?;
        Ok(lesson::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        lesson::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let l = lesson::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(format!("{} ({} {})", l.name, l.day, l.start_time.format("%H:%M")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::errors::{ErrorCode, FieldError};

    fn invalid(result: Result<impl Sized, SaveError>) -> Vec<FieldError> {
        match result {
            Err(SaveError::Invalid(errs)) => errs,
            Err(SaveError::App(e)) => panic!("unexpected app error {e}"),
            Ok(_) => vec![],
        }
    }

    #[test]
    fn class_capacity_must_be_positive() {
        let data = FormData::default().with("name", "1A").with("capacity", "0").with("grade_id", "1");
        assert_eq!(
            invalid(read_class(&data)),
            vec![FieldError::new("capacity", ErrorCode::OutOfRange(1, 100))]
        );
    }

    #[test]
    fn class_supervisor_is_optional() {
        let data = FormData::default().with("name", "1A").with("capacity", "20").with("grade_id", "1");
        let input = read_class(&data).unwrap();
        assert_eq!(input.supervisor_id, None);
        assert_eq!(input.capacity, 20);
    }

    #[test]
    fn lesson_must_end_after_it_starts() {
        let data = FormData::default()
            .with("name", "Algebra")
            .with("day", "MONDAY")
            .with("start_time", "10:00")
            .with("end_time", "09:00")
            .with("subject_id", "1")
            .with("class_id", "1")
            .with("teacher_id", "2");
        assert_eq!(
            invalid(read_lesson(&data)),
            vec![FieldError::new("end_time", ErrorCode::EndBeforeStart)]
        );
    }

    #[test]
    fn lesson_day_is_a_weekday() {
        let data = FormData::default()
            .with("name", "Algebra")
            .with("day", "SATURDAY")
            .with("start_time", "08:00")
            .with("end_time", "09:00")
            .with("subject_id", "1")
            .with("class_id", "1")
            .with("teacher_id", "2");
        assert_eq!(invalid(read_lesson(&data)), vec![FieldError::new("day", ErrorCode::InvalidChoice)]);
    }

    #[test]
    fn subject_teachers_are_deduplicated() {
        let mut data = FormData::default().with("name", "Math");
        data.push("teacher_ids", "4");
        data.push("teacher_ids", "4");
        assert_eq!(read_subject(&data).unwrap().teacher_ids, vec![4]);
    }
}
