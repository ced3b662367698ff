use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::auth::validate;
use super::errors::{ErrorCode, FieldError, SaveError};
use super::FormData;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S"];

/// Typed access to submitted values. Each accessor records a field error
/// when the value is missing or malformed and returns a placeholder; the
/// placeholders are never persisted because `finish` fails first.
pub struct FormReader<'a> {
    data: &'a FormData,
    errors: Vec<FieldError>,
}

impl<'a> FormReader<'a> {
    pub fn new(data: &'a FormData) -> Self {
        Self { data, errors: vec![] }
    }

    fn raw(&self, name: &str) -> &'a str {
        self.data.get(name).map(str::trim).unwrap_or("")
    }

    pub fn error(&mut self, field: &str, code: ErrorCode) {
        if !self.has_error(field) {
            self.errors.push(FieldError::new(field, code));
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn text(&mut self, name: &str, max: usize) -> String {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, ErrorCode::Required);
        } else if value.chars().count() > max {
            self.error(name, ErrorCode::TooLong(max));
        }
        value.to_string()
    }

    pub fn optional_text(&mut self, name: &str, max: usize) -> Option<String> {
        let value = self.raw(name);
        if value.is_empty() {
            return None;
        }
        if value.chars().count() > max {
            self.error(name, ErrorCode::TooLong(max));
        }
        Some(value.to_string())
    }

    pub fn optional_email(&mut self, name: &str) -> Option<String> {
        let value = self.raw(name);
        if value.is_empty() {
            return None;
        }
        if let Some(code) = validate::validate_email(value) {
            self.error(name, code);
        }
        Some(value.to_string())
    }

    pub fn username(&mut self, name: &str) -> String {
        let value = self.raw(name);
        if let Some(code) = validate::validate_username(value) {
            self.error(name, code);
        }
        value.to_string()
    }

    /// Required on create; on update a blank password means "keep".
    pub fn password(&mut self, name: &str, required: bool) -> Option<String> {
        let value = self.data.get(name).unwrap_or("");
        if value.is_empty() && !required {
            return None;
        }
        if let Some(code) = validate::validate_password(value) {
            self.error(name, code);
        }
        Some(value.to_string())
    }

    pub fn int(&mut self, name: &str, min: i64, max: i64) -> i32 {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, ErrorCode::Required);
            return 0;
        }
        match value.parse::<i64>() {
            Ok(n) if n >= min && n <= max => n as i32,
            Ok(_) => {
                self.error(name, ErrorCode::OutOfRange(min, max));
                0
            }
            Err(_) => {
                self.error(name, ErrorCode::InvalidNumber);
                0
            }
        }
    }

    /// A required reference to another row.
    pub fn id(&mut self, name: &str) -> i64 {
        match self.optional_id(name) {
            Some(id) => id,
            None => {
                self.error(name, ErrorCode::Required);
                0
            }
        }
    }

    pub fn optional_id(&mut self, name: &str) -> Option<i64> {
        let value = self.raw(name);
        if value.is_empty() {
            return None;
        }
        match value.parse::<i64>() {
            Ok(id) if id > 0 => Some(id),
            _ => {
                self.error(name, ErrorCode::InvalidChoice);
                None
            }
        }
    }

    pub fn ids(&mut self, name: &str) -> Vec<i64> {
        let mut ids = vec![];
        for raw in self.data.get_all(name) {
            match raw.trim().parse::<i64>() {
                Ok(id) if id > 0 => {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                _ => self.error(name, ErrorCode::InvalidChoice),
            }
        }
        ids
    }

    pub fn date(&mut self, name: &str) -> NaiveDate {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, ErrorCode::Required);
            return NaiveDate::default();
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap_or_else(|_| {
            self.error(name, ErrorCode::InvalidDate);
            NaiveDate::default()
        })
    }

    pub fn datetime(&mut self, name: &str) -> NaiveDateTime {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, ErrorCode::Required);
            return NaiveDateTime::default();
        }
        match parse_datetime(value) {
            Some(dt) => dt,
            None => {
                self.error(name, ErrorCode::InvalidDate);
                NaiveDateTime::default()
            }
        }
    }

    pub fn time(&mut self, name: &str) -> NaiveTime {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, ErrorCode::Required);
            return NaiveTime::default();
        }
        match TIME_FORMATS.iter().find_map(|f| NaiveTime::parse_from_str(value, f).ok()) {
            Some(t) => t,
            None => {
                self.error(name, ErrorCode::InvalidTime);
                NaiveTime::default()
            }
        }
    }

    pub fn choice(&mut self, name: &str, allowed: &[&str]) -> String {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, ErrorCode::Required);
        } else if !allowed.contains(&value) {
            self.error(name, ErrorCode::InvalidChoice);
        }
        value.to_string()
    }

    pub fn checkbox(&self, name: &str) -> bool {
        matches!(self.raw(name), "on" | "true" | "1")
    }

    /// Record `EndBeforeStart` on `end_field` unless `end` is strictly after
    /// `start`. Skipped when either side already failed to parse.
    pub fn ensure_after<T: PartialOrd>(&mut self, start_field: &str, start: &T, end_field: &str, end: &T) {
        if self.has_error(start_field) || self.has_error(end_field) {
            return;
        }
        if end <= start {
            self.error(end_field, ErrorCode::EndBeforeStart);
        }
    }

    pub fn finish(self) -> Result<(), SaveError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SaveError::Invalid(self.errors))
        }
    }
}

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn codes(result: Result<(), SaveError>) -> Vec<(String, ErrorCode)> {
        match result {
            Ok(()) => vec![],
            Err(SaveError::Invalid(errs)) => errs.into_iter().map(|e| (e.field, e.code)).collect(),
            Err(SaveError::App(e)) => panic!("unexpected app error {e}"),
        }
    }

    #[test]
    fn valid_form_finishes_clean() {
        let form = data(&[
            ("title", " Math test "),
            ("start_time", "2026-10-19T09:00"),
            ("end_time", "2026-10-19T10:00"),
            ("lesson_id", "4"),
            ("score", "88"),
        ]);
        let mut r = FormReader::new(&form);
        assert_eq!(r.text("title", 100), "Math test");
        let start = r.datetime("start_time");
        let end = r.datetime("end_time");
        r.ensure_after("start_time", &start, "end_time", &end);
        assert_eq!(r.id("lesson_id"), 4);
        assert_eq!(r.int("score", 0, 100), 88);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn collects_one_error_per_field() {
        let form = data(&[("title", ""), ("score", "120"), ("lesson_id", "abc"), ("day", "SUNDAY")]);
        let mut r = FormReader::new(&form);
        r.text("title", 10);
        r.int("score", 0, 100);
        r.id("lesson_id");
        r.choice("day", &["MONDAY", "FRIDAY"]);
        r.date("birthday");
        assert_eq!(
            codes(r.finish()),
            vec![
                ("title".to_string(), ErrorCode::Required),
                ("score".to_string(), ErrorCode::OutOfRange(0, 100)),
                ("lesson_id".to_string(), ErrorCode::InvalidChoice),
                ("day".to_string(), ErrorCode::InvalidChoice),
                ("birthday".to_string(), ErrorCode::Required),
            ]
        );
    }

    #[test]
    fn end_must_follow_start() {
        let form = data(&[("start_time", "10:00"), ("end_time", "09:30")]);
        let mut r = FormReader::new(&form);
        let start = r.time("start_time");
        let end = r.time("end_time");
        r.ensure_after("start_time", &start, "end_time", &end);
        assert_eq!(codes(r.finish()), vec![("end_time".to_string(), ErrorCode::EndBeforeStart)]);
    }

    #[test]
    fn ordering_check_skipped_when_parse_failed() {
        let form = data(&[("start_date", "yesterday"), ("due_date", "2026-01-01T00:00")]);
        let mut r = FormReader::new(&form);
        let start = r.datetime("start_date");
        let due = r.datetime("due_date");
        r.ensure_after("start_date", &start, "due_date", &due);
        assert_eq!(codes(r.finish()), vec![("start_date".to_string(), ErrorCode::InvalidDate)]);
    }

    #[test]
    fn optional_values() {
        let form = data(&[("email", ""), ("phone", "  "), ("class_id", "")]);
        let mut r = FormReader::new(&form);
        assert_eq!(r.optional_email("email"), None);
        assert_eq!(r.optional_text("phone", 20), None);
        assert_eq!(r.optional_id("class_id"), None);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn password_blank_on_update_means_keep() {
        let form = data(&[("password", "")]);
        let mut r = FormReader::new(&form);
        assert_eq!(r.password("password", false), None);
        assert!(r.finish().is_ok());

        let mut r = FormReader::new(&form);
        r.password("password", true);
        assert_eq!(codes(r.finish()), vec![("password".to_string(), ErrorCode::Required)]);

        let short = data(&[("password", "abc")]);
        let mut r = FormReader::new(&short);
        r.password("password", false);
        assert_eq!(codes(r.finish()), vec![("password".to_string(), ErrorCode::PasswordTooShort(8))]);
    }

    #[test]
    fn ids_deduplicate_and_reject_garbage() {
        let form = data(&[("subject_ids", "2"), ("subject_ids", "2"), ("subject_ids", "5")]);
        let mut r = FormReader::new(&form);
        assert_eq!(r.ids("subject_ids"), vec![2, 5]);
        assert!(r.finish().is_ok());

        let bad = data(&[("subject_ids", "x")]);
        let mut r = FormReader::new(&bad);
        r.ids("subject_ids");
        assert_eq!(codes(r.finish()), vec![("subject_ids".to_string(), ErrorCode::InvalidChoice)]);
    }

    #[test]
    fn checkbox_values() {
        let form = data(&[("present", "on"), ("late", "off")]);
        let r = FormReader::new(&form);
        assert!(r.checkbox("present"));
        assert!(!r.checkbox("late"));
        assert!(!r.checkbox("missing"));
    }

    #[test]
    fn datetime_formats() {
        assert!(parse_datetime("2026-10-19T08:30").is_some());
        assert!(parse_datetime("2026-10-19T08:30:15").is_some());
        assert!(parse_datetime("2026-10-19 08:30").is_some());
        assert!(parse_datetime("19/10/2026").is_none());
    }
}
