//! Weekly timetable layout for dashboards and detail pages.

use chrono::{Datelike, Duration, NaiveDate};

use super::lesson::{DAYS, LessonRow};

/// One weekday column of the timetable.
#[derive(Debug, Clone)]
pub struct WeekDay {
    pub day: &'static str,
    pub date: NaiveDate,
    pub is_today: bool,
    pub lessons: Vec<LessonRow>,
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Place lessons on the Monday..Friday dates of `today`'s week, each day's
/// lessons ordered by start time. Lessons with an unknown day are dropped.
pub fn week_grid(entries: &[LessonRow], today: NaiveDate) -> Vec<WeekDay> {
    let monday = week_start(today);
    DAYS.iter()
        .copied()
        .enumerate()
        .map(|(offset, day)| {
            let date = monday + Duration::days(offset as i64);
            let mut lessons: Vec<LessonRow> = entries
                .iter()
                .filter(|l| l.day == day)
                .cloned()
                .collect();
            lessons.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
            WeekDay { day, date, is_today: date == today, lessons }
        })
        .collect()
}
