//! Field errors and the mapping from database failures onto them.
//!
//! PostgreSQL reports constraint violations with an SQLSTATE code plus the
//! table and constraint names. Constraint names follow
//! `<table>_<column>_(key|fkey|check)`, so most of them resolve to a form
//! field mechanically; the multi-column ones are listed in `NAMED`.

use sqlx::postgres::PgDatabaseError;

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Required,
    TooShort(usize),
    TooLong(usize),
    InvalidEmail,
    InvalidDate,
    InvalidTime,
    InvalidNumber,
    OutOfRange(i64, i64),
    InvalidChoice,
    EndBeforeStart,
    Duplicate,
    MissingReference,
    InUse,
    NotAllowed,
    PasswordTooShort(usize),
    InvalidUsername,
    ExactlyOneOf(&'static str, &'static str),
    GradeMismatch,
    ClassFull,
    WrongPassword,
    PasswordMismatch,
    TooManyAttempts,
    Unknown,
}

/// An error attached to a form field. An empty `field` marks a form-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub code: ErrorCode,
}

impl FieldError {
    pub fn new(field: &str, code: ErrorCode) -> Self {
        Self { field: field.to_string(), code }
    }

    pub fn form(code: ErrorCode) -> Self {
        Self { field: String::new(), code }
    }

    pub fn is_form_level(&self) -> bool {
        self.field.is_empty()
    }
}

/// Outcome of a failed save or delete.
#[derive(Debug)]
pub enum SaveError {
    Invalid(Vec<FieldError>),
    App(AppError),
}

impl SaveError {
    pub fn field(field: &str, code: ErrorCode) -> Self {
        SaveError::Invalid(vec![FieldError::new(field, code)])
    }

    /// Map a failure from a DELETE: foreign-key violations mean the row is
    /// still referenced.
    pub fn from_delete(e: sqlx::Error) -> Self {
        match map_db_error(&e, DbOp::Delete) {
            Some(err) => SaveError::Invalid(vec![err]),
            None => SaveError::App(AppError::from(e)),
        }
    }
}

impl From<sqlx::Error> for SaveError {
    fn from(e: sqlx::Error) -> Self {
        match map_db_error(&e, DbOp::Write) {
            Some(err) => SaveError::Invalid(vec![err]),
            None => SaveError::App(AppError::from(e)),
        }
    }
}

impl From<AppError> for SaveError {
    fn from(e: AppError) -> Self {
        SaveError::App(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOp {
    Write,
    Delete,
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
const CHECK_VIOLATION: &str = "23514";

/// Constraints whose names do not follow the `<table>_<column>_<suffix>` scheme.
const NAMED: &[(&str, &str, ErrorCode)] = &[
    ("lessons_time_order", "end_time", ErrorCode::EndBeforeStart),
    ("exams_time_order", "end_time", ErrorCode::EndBeforeStart),
    ("events_time_order", "end_time", ErrorCode::EndBeforeStart),
    ("assignments_date_order", "due_date", ErrorCode::EndBeforeStart),
    ("attendances_once_per_day", "date", ErrorCode::Duplicate),
    ("results_single_source", "exam_id", ErrorCode::ExactlyOneOf("exam_id", "assignment_id")),
    ("results_score_check", "score", ErrorCode::OutOfRange(0, 100)),
    ("classes_capacity_check", "capacity", ErrorCode::InvalidNumber),
];

/// Translate a database error into a field error, if it is a constraint
/// violation we know how to attribute.
pub fn map_db_error(e: &sqlx::Error, op: DbOp) -> Option<FieldError> {
    let db_err = match e {
        sqlx::Error::Database(db_err) => db_err,
        _ => return None,
    };
    let code = db_err.code()?;
    let column = db_err
        .try_downcast_ref::<PgDatabaseError>()
        .and_then(|pg| pg.column());
    let mapped = map_violation(&code, db_err.table(), db_err.constraint(), column, op);
    if mapped.is_none() {
        log::warn!("Unmapped database error {code}: {}", db_err.message());
    }
    mapped
}

/// Pure part of the mapping, split out so it can be tested without a database.
pub fn map_violation(
    code: &str,
    table: Option<&str>,
    constraint: Option<&str>,
    column: Option<&str>,
    op: DbOp,
) -> Option<FieldError> {
    if code == FOREIGN_KEY_VIOLATION && op == DbOp::Delete {
        return Some(FieldError::form(ErrorCode::InUse));
    }
    if code == NOT_NULL_VIOLATION {
        return Some(FieldError::new(column.unwrap_or(""), ErrorCode::Required));
    }

    let constraint = constraint?;
    if let Some((_, field, err)) = NAMED.iter().find(|(name, _, _)| *name == constraint) {
        return Some(FieldError::new(field, err.clone()));
    }

    let (field, suffix) = split_constraint(constraint, table)?;
    let err = match (code, suffix) {
        (UNIQUE_VIOLATION, "key") => ErrorCode::Duplicate,
        (FOREIGN_KEY_VIOLATION, "fkey") => ErrorCode::MissingReference,
        (CHECK_VIOLATION, "check") => ErrorCode::InvalidChoice,
        _ => return None,
    };
    Some(FieldError::new(field, err))
}

/// `students_parent_id_fkey` on table `students` → (`parent_id`, `fkey`).
fn split_constraint<'a>(constraint: &'a str, table: Option<&str>) -> Option<(&'a str, &'a str)> {
    let (rest, suffix) = constraint.rsplit_once('_')?;
    let field = match table {
        Some(t) => rest.strip_prefix(t)?.strip_prefix('_')?,
        None => rest.split_once('_')?.1,
    };
    if field.is_empty() {
        return None;
    }
    Some((field, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_names_the_column() {
        let err = map_violation("23505", Some("accounts"), Some("accounts_username_key"), None, DbOp::Write);
        assert_eq!(err, Some(FieldError::new("username", ErrorCode::Duplicate)));

        let err = map_violation("23505", Some("students"), Some("students_email_key"), None, DbOp::Write);
        assert_eq!(err, Some(FieldError::new("email", ErrorCode::Duplicate)));
    }

    #[test]
    fn foreign_key_on_write_is_missing_reference() {
        let err = map_violation("23503", Some("students"), Some("students_class_id_fkey"), None, DbOp::Write);
        assert_eq!(err, Some(FieldError::new("class_id", ErrorCode::MissingReference)));
    }

    #[test]
    fn foreign_key_on_delete_is_in_use() {
        let err = map_violation("23503", Some("students"), Some("students_parent_id_fkey"), None, DbOp::Delete);
        assert_eq!(err, Some(FieldError::form(ErrorCode::InUse)));
    }

    #[test]
    fn named_constraints_win() {
        let err = map_violation("23514", Some("lessons"), Some("lessons_time_order"), None, DbOp::Write);
        assert_eq!(err, Some(FieldError::new("end_time", ErrorCode::EndBeforeStart)));

        let err = map_violation("23505", Some("attendances"), Some("attendances_once_per_day"), None, DbOp::Write);
        assert_eq!(err, Some(FieldError::new("date", ErrorCode::Duplicate)));
    }

    #[test]
    fn check_violation_falls_back_to_invalid_choice() {
        let err = map_violation("23514", Some("teachers"), Some("teachers_sex_check"), None, DbOp::Write);
        assert_eq!(err, Some(FieldError::new("sex", ErrorCode::InvalidChoice)));
    }

    #[test]
    fn not_null_uses_the_column() {
        let err = map_violation("23502", Some("lessons"), None, Some("teacher_id"), DbOp::Write);
        assert_eq!(err, Some(FieldError::new("teacher_id", ErrorCode::Required)));
    }

    #[test]
    fn unknown_codes_and_shapes_are_not_mapped() {
        assert_eq!(map_violation("40001", Some("x"), Some("x_y_key"), None, DbOp::Write), None);
        assert_eq!(map_violation("23505", Some("students"), None, None, DbOp::Write), None);
        assert_eq!(map_violation("23505", Some("students"), Some("weird"), None, DbOp::Write), None);
        assert_eq!(map_violation("23505", Some("students"), Some("students_key"), None, DbOp::Write), None);
    }

    #[test]
    fn non_database_errors_are_not_mapped() {
        assert_eq!(map_db_error(&sqlx::Error::RowNotFound, DbOp::Write), None);
    }

    #[test]
    fn split_without_table_drops_first_segment() {
        assert_eq!(split_constraint("grades_level_key", None), Some(("level", "key")));
        assert_eq!(split_constraint("classes_supervisor_id_fkey", Some("classes")), Some(("supervisor_id", "fkey")));
    }
}
