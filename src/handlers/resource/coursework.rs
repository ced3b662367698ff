//! Exams, assignments, results and attendance: the records teachers write
//! for their own lessons.

use chrono::{Local, NaiveDateTime};
use sqlx::PgPool;

use crate::auth::role::{Role, Viewer};
use crate::errors::AppError;
use crate::forms::{ErrorCode, FieldKind, FieldSpec, FormData, FormReader, SaveError};
use crate::i18n::Locale;
use crate::models::assignment::{self, AssignmentInput, AssignmentRow};
use crate::models::attendance::{self, AttendanceInput, AttendanceRow};
use crate::models::exam::{self, ExamInput, ExamRow};
use crate::models::listing::{is_visible, ListSpec};
use crate::models::result::{self, ResultInput, ResultRow};
use crate::models::status::{assignment_status, period_status};
use crate::models::{account, lesson, lookup, student, ResourceKind};
use crate::templates_structs::Cell;
use super::{col, sorted, ColumnDef, FilterSelect, FormMode, ResourceHandler};

const DATETIME_SHOWN: &str = "%Y-%m-%d %H:%M";
const DATETIME_INPUT: &str = "%Y-%m-%dT%H:%M";

/// Whether `viewer` may attach records to something owned by `owner`
/// (the teacher of the lesson involved).
fn may_write(viewer: &Viewer, owner: Option<i64>) -> bool {
    match viewer.role {
        Role::Admin => true,
        Role::Teacher => owner == Some(viewer.user_id),
        Role::Student | Role::Parent => false,
    }
}

/// Record an error on `field` unless the referenced row exists and the
/// viewer may write to it.
fn check_owner(r: &mut FormReader<'_>, viewer: &Viewer, field: &str, found: Option<Option<i64>>) {
    match found {
        None => r.error(field, ErrorCode::MissingReference),
        Some(owner) if !may_write(viewer, owner) => r.error(field, ErrorCode::NotAllowed),
        Some(_) => {}
    }
}

/// Lesson ownership as `Some(teacher)` when the lesson exists.
async fn lesson_owner(pool: &PgPool, lesson_id: i64) -> Result<Option<Option<i64>>, sqlx::Error> {
    Ok(lesson::teacher_of(pool, lesson_id).await?.map(Some))
}

async fn check_student(
    pool: &PgPool,
    r: &mut FormReader<'_>,
    viewer: &Viewer,
    student_id: i64,
) -> Result<(), AppError> {
    if !r.has_error("student_id") && !is_visible(pool, &student::LIST, viewer, student_id).await? {
        r.error("student_id", ErrorCode::NotAllowed);
    }
    Ok(())
}

// ---------- Exams ----------

pub struct Exams;

async fn read_exam(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<ExamInput, SaveError> {
    let mut r = FormReader::new(data);
    let title = r.text("title", 100);
    let start_time = r.datetime("start_time");
    let end_time = r.datetime("end_time");
    r.ensure_after("start_time", &start_time, "end_time", &end_time);
    let lesson_id = r.id("lesson_id");
    if !r.has_error("lesson_id") {
        let found = lesson_owner(pool, lesson_id).await?;
        check_owner(&mut r, viewer, "lesson_id", found);
    }
    r.finish()?;
    Ok(ExamInput { title, start_time, end_time, lesson_id })
}

impl ResourceHandler for Exams {
    const KIND: ResourceKind = ResourceKind::Exams;
    type Row = ExamRow;

    fn spec() -> &'static ListSpec {
        &exam::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("title", "title"),
            col("subject"),
            sorted("class", "class"),
            col("teacher"),
            sorted("date", "date"),
            col("status"),
        ]
    }

    fn cells(row: &ExamRow, locale: Locale, now: NaiveDateTime) -> Vec<Cell> {
        let status = period_status(row.start_time, row.end_time, now);
        vec![
            Cell::link(&row.title, format!("/list/results?exam_id={}", row.id)),
            Cell::text(&row.subject_name),
            Cell::text(&row.class_name),
            Cell::text(&row.teacher_name),
            Cell::text(row.start_time.format(DATETIME_SHOWN).to_string()),
            Cell::badge(locale.t(status.key()), status.badge()),
        ]
    }

    fn row_id(row: &ExamRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
            FilterSelect::new("teacher_id", lookup::teachers(pool, viewer).await?),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("title").required(),
            FieldSpec::new("start_time", FieldKind::DateTime).required(),
            FieldSpec::new("end_time", FieldKind::DateTime).required(),
            FieldSpec::select("lesson_id", lookup::lessons(pool, viewer).await?).required(),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let e = exam::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("title", &e.title)
            .with("start_time", e.start_time.format(DATETIME_INPUT))
            .with("end_time", e.end_time.format(DATETIME_INPUT))
            .with("lesson_id", e.lesson_id))
    }

    async fn create(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_exam(pool, viewer, data).await?;
        Ok(exam::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_exam(pool, viewer, data).await?;
        Ok(exam::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        exam::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let e = exam::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(format!("{} ({})", e.title, e.start_time.format(DATETIME_SHOWN)))
    }
}

// ---------- Assignments ----------

pub struct Assignments;

async fn read_assignment(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<AssignmentInput, SaveError> {
    let mut r = FormReader::new(data);
    let title = r.text("title", 100);
    let start_date = r.datetime("start_date");
    let due_date = r.datetime("due_date");
    r.ensure_after("start_date", &start_date, "due_date", &due_date);
    let lesson_id = r.id("lesson_id");
    if !r.has_error("lesson_id") {
        let found = lesson_owner(pool, lesson_id).await?;
        check_owner(&mut r, viewer, "lesson_id", found);
    }
    r.finish()?;
    Ok(AssignmentInput { title, start_date, due_date, lesson_id })
}

impl ResourceHandler for Assignments {
    const KIND: ResourceKind = ResourceKind::Assignments;
    type Row = AssignmentRow;

    fn spec() -> &'static ListSpec {
        &assignment::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("title", "title"),
            col("subject"),
            sorted("class", "class"),
            col("teacher"),
            col("start_date"),
            sorted("due_date", "date"),
            col("status"),
        ]
    }

    fn cells(row: &AssignmentRow, locale: Locale, now: NaiveDateTime) -> Vec<Cell> {
        let status = assignment_status(row.due_date, now);
        vec![
            Cell::link(&row.title, format!("/list/results?assignment_id={}", row.id)),
            Cell::text(&row.subject_name),
            Cell::text(&row.class_name),
            Cell::text(&row.teacher_name),
            Cell::text(row.start_date.format(DATETIME_SHOWN).to_string()),
            Cell::text(row.due_date.format(DATETIME_SHOWN).to_string()),
            Cell::badge(locale.t(status.key()), status.badge()),
        ]
    }

    fn row_id(row: &AssignmentRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
            FilterSelect::new("teacher_id", lookup::teachers(pool, viewer).await?),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::text("title").required(),
            FieldSpec::new("start_date", FieldKind::DateTime).required(),
            FieldSpec::new("due_date", FieldKind::DateTime).required(),
            FieldSpec::select("lesson_id", lookup::lessons(pool, viewer).await?).required(),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let a = assignment::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("title", &a.title)
            .with("start_date", a.start_date.format(DATETIME_INPUT))
            .with("due_date", a.due_date.format(DATETIME_INPUT))
            .with("lesson_id", a.lesson_id))
    }

    async fn create(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_assignment(pool, viewer, data).await?;
        Ok(assignment::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_assignment(pool, viewer, data).await?;
        Ok(assignment::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        assignment::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let a = assignment::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(format!("{} ({})", a.title, a.due_date.format(DATETIME_SHOWN)))
    }
}

// ---------- Results ----------

pub struct Results;

/// Exactly one of exam / assignment must be given.
fn check_source(r: &mut FormReader<'_>, exam_id: Option<i64>, assignment_id: Option<i64>) {
    if r.has_error("exam_id") || r.has_error("assignment_id") {
        return;
    }
    if exam_id.is_some() == assignment_id.is_some() {
        r.error("exam_id", ErrorCode::ExactlyOneOf("exam_id", "assignment_id"));
    }
}

async fn read_result(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<ResultInput, SaveError> {
    let mut r = FormReader::new(data);
    let score = r.int("score", 0, 100);
    let exam_id = r.optional_id("exam_id");
    let assignment_id = r.optional_id("assignment_id");
    check_source(&mut r, exam_id, assignment_id);
    if !r.has_error("exam_id") {
        if let Some(id) = exam_id {
            let found = exam::teacher_of(pool, id).await?.map(Some);
            check_owner(&mut r, viewer, "exam_id", found);
        }
        if let Some(id) = assignment_id {
            let found = assignment::teacher_of(pool, id).await?.map(Some);
            check_owner(&mut r, viewer, "assignment_id", found);
        }
    }
    let student_id = r.id("student_id");
    check_student(pool, &mut r, viewer, student_id).await?;
    r.finish()?;
    Ok(ResultInput { score, exam_id, assignment_id, student_id })
}

impl ResourceHandler for Results {
    const KIND: ResourceKind = ResourceKind::Results;
    type Row = ResultRow;

    fn spec() -> &'static ListSpec {
        &result::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("title", "title"),
            col("source"),
            sorted("student", "student"),
            sorted("score", "score"),
            col("teacher"),
            col("class"),
            sorted("date", "date"),
        ]
    }

    fn cells(row: &ResultRow, locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        let source = if row.from_exam { "exam" } else { "assignment" };
        vec![
            Cell::text(&row.source_title),
            Cell::text(locale.t(source)),
            Cell::text(&row.student_name),
            Cell::text(row.score.to_string()),
            Cell::opt(Some(row.teacher_name.as_str())),
            Cell::text(&row.class_name),
            Cell::text(row.source_date.format("%Y-%m-%d").to_string()),
        ]
    }

    fn row_id(row: &ResultRow) -> i64 {
        row.id
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("student_id", lookup::students(pool, viewer).await?),
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::new("score", FieldKind::Number).required(),
            FieldSpec::select("exam_id", lookup::exams(pool, viewer).await?).hint("exam_or_assignment"),
            FieldSpec::select("assignment_id", lookup::assignments(pool, viewer).await?),
            FieldSpec::select("student_id", lookup::students(pool, viewer).await?).required(),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let res = result::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("score", res.score)
            .with_opt("exam_id", res.exam_id)
            .with_opt("assignment_id", res.assignment_id)
            .with("student_id", res.student_id))
    }

    async fn create(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_result(pool, viewer, data).await?;
        Ok(result::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_result(pool, viewer, data).await?;
        Ok(result::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        result::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let res = result::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        let name = account::display_name(pool, res.student_id).await?.unwrap_or_default();
        Ok(format!("{name}: {}", res.score))
    }
}

// ---------- Attendance ----------

pub struct Attendance;

async fn read_attendance(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<AttendanceInput, SaveError> {
    let mut r = FormReader::new(data);
    let date = r.date("date");
    let present = r.checkbox("present");
    let lesson_id = r.id("lesson_id");
    if !r.has_error("lesson_id") {
        let found = lesson_owner(pool, lesson_id).await?;
        check_owner(&mut r, viewer, "lesson_id", found);
    }
    let student_id = r.id("student_id");
    check_student(pool, &mut r, viewer, student_id).await?;
    r.finish()?;
    Ok(AttendanceInput { date, present, student_id, lesson_id })
}

impl ResourceHandler for Attendance {
    const KIND: ResourceKind = ResourceKind::Attendance;
    type Row = AttendanceRow;

    fn spec() -> &'static ListSpec {
        &attendance::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("date", "date"),
            sorted("student", "student"),
            sorted("lesson", "lesson"),
            col("class"),
            col("status"),
        ]
    }

    fn cells(row: &AttendanceRow, locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        let (key, badge) = if row.present { ("present", "badge-success") } else { ("absent", "badge-danger") };
        vec![
            Cell::text(row.date.format("%Y-%m-%d").to_string()),
            Cell::text(&row.student_name),
            Cell::text(&row.lesson_name),
            Cell::text(&row.class_name),
            Cell::badge(locale.t(key), badge),
        ]
    }

    fn row_id(row: &AttendanceRow) -> i64 {
        row.id
    }

    fn defaults() -> FormData {
        FormData::default()
            .with("date", Local::now().date_naive().format("%Y-%m-%d"))
            .with("present", "on")
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
            FilterSelect::new("lesson_id", lookup::lessons(pool, viewer).await?),
            FilterSelect::new("student_id", lookup::students(pool, viewer).await?),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, _mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        Ok(vec![
            FieldSpec::new("date", FieldKind::Date).required(),
            FieldSpec::select("lesson_id", lookup::lessons(pool, viewer).await?).required(),
            FieldSpec::select("student_id", lookup::students(pool, viewer).await?).required(),
            FieldSpec::new("present", FieldKind::Checkbox),
        ])
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let a = attendance::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        let data = FormData::default()
            .with("date", a.date.format("%Y-%m-%d"))
            .with("lesson_id", a.lesson_id)
            .with("student_id", a.student_id);
        Ok(if a.present { data.with("present", "on") } else { data })
    }

    async fn create(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let input = read_attendance(pool, viewer, data).await?;
        Ok(attendance::create(pool, &input).await?)
    }

    async fn update(pool: &PgPool, viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let input = read_attendance(pool, viewer, data).await?;
        Ok(attendance::update(pool, id, &input).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        attendance::delete(pool, id).await.map_err(SaveError::from_delete)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        let a = attendance::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        let name = account::display_name(pool, a.student_id).await?.unwrap_or_default();
        Ok(format!("{name} ({})", a.date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::errors::FieldError;

    fn errors_of(r: FormReader<'_>) -> Vec<FieldError> {
        match r.finish() {
            Err(SaveError::Invalid(errs)) => errs,
            _ => vec![],
        }
    }

    #[test]
    fn admins_write_anywhere_teachers_only_their_own() {
        let admin = Viewer::new(1, Role::Admin);
        let teacher = Viewer::new(7, Role::Teacher);
        let student = Viewer::new(9, Role::Student);
        assert!(may_write(&admin, Some(3)));
        assert!(may_write(&teacher, Some(7)));
        assert!(!may_write(&teacher, Some(3)));
        assert!(!may_write(&teacher, None));
        assert!(!may_write(&student, Some(9)));
    }

    #[test]
    fn owner_check_reports_missing_and_foreign_rows() {
        let data = FormData::default();
        let teacher = Viewer::new(7, Role::Teacher);

        let mut r = FormReader::new(&data);
        check_owner(&mut r, &teacher, "lesson_id", None);
        assert_eq!(errors_of(r), vec![FieldError::new("lesson_id", ErrorCode::MissingReference)]);

        let mut r = FormReader::new(&data);
        check_owner(&mut r, &teacher, "lesson_id", Some(Some(3)));
        assert_eq!(errors_of(r), vec![FieldError::new("lesson_id", ErrorCode::NotAllowed)]);

        let mut r = FormReader::new(&data);
        check_owner(&mut r, &teacher, "lesson_id", Some(Some(7)));
        assert!(errors_of(r).is_empty());
    }

    #[test]
    fn result_needs_exactly_one_source() {
        let data = FormData::default();
        for (exam, asg) in [(None, None), (Some(1), Some(2))] {
            let mut r = FormReader::new(&data);
            check_source(&mut r, exam, asg);
            assert_eq!(
                errors_of(r),
                vec![FieldError::new("exam_id", ErrorCode::ExactlyOneOf("exam_id", "assignment_id"))]
            );
        }
        let mut r = FormReader::new(&data);
        check_source(&mut r, None, Some(2));
        assert!(errors_of(r).is_empty());
    }

    #[test]
    fn attendance_defaults_to_present_today() {
        let data = Attendance::defaults();
        assert_eq!(data.get("present"), Some("on"));
        assert_eq!(data.get("date").map(str::len), Some(10));
    }
}
