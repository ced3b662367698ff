use askama::Template;
use chrono::{NaiveDate, NaiveDateTime};

use crate::i18n::Locale;
use crate::models::attendance::DayCount;
use crate::models::dashboard::AdminCounts;
use crate::models::schedule::WeekDay;
use crate::models::status::period_status;
use super::PageContext;

// ---------- Building blocks ----------

/// One column of the weekly attendance chart. Heights are percentages of
/// the busiest day.
pub struct AttendanceBar {
    pub label: String,
    pub present: i64,
    pub absent: i64,
    pub present_height: i64,
    pub absent_height: i64,
}

impl AttendanceBar {
    pub fn from_week(days: &[DayCount], locale: Locale) -> Vec<Self> {
        let peak = days
            .iter()
            .map(|d| d.present.max(d.absent))
            .max()
            .unwrap_or(0)
            .max(1);
        days.iter()
            .map(|d| AttendanceBar {
                label: locale.t(weekday_key(d.date)).to_string(),
                present: d.present,
                absent: d.absent,
                present_height: d.present * 100 / peak,
                absent_height: d.absent * 100 / peak,
            })
            .collect()
    }
}

/// An event or announcement card.
pub struct DashboardItem {
    pub title: String,
    pub description: String,
    pub when: String,
    pub class_name: String,
    pub badge: String,
    pub badge_label: String,
}

impl DashboardItem {
    pub fn event(
        title: &str,
        description: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        class_name: Option<&str>,
        now: NaiveDateTime,
        locale: Locale,
    ) -> Self {
        let status = period_status(start, end, now);
        DashboardItem {
            title: title.to_string(),
            description: description.to_string(),
            when: format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")),
            class_name: class_name.unwrap_or("").to_string(),
            badge: status.badge().to_string(),
            badge_label: locale.t(status.key()).to_string(),
        }
    }

    pub fn announcement(title: &str, description: &str, date: NaiveDate, class_name: Option<&str>) -> Self {
        DashboardItem {
            title: title.to_string(),
            description: description.to_string(),
            when: date.format("%Y-%m-%d").to_string(),
            class_name: class_name.unwrap_or("").to_string(),
            badge: String::new(),
            badge_label: String::new(),
        }
    }
}

pub struct ScheduleLessonView {
    pub name: String,
    pub time: String,
    pub subject: String,
    pub class_name: String,
    pub teacher: String,
}

pub struct ScheduleDayView {
    pub label: String,
    pub date: String,
    pub is_today: bool,
    pub lessons: Vec<ScheduleLessonView>,
}

/// A titled Monday..Friday timetable.
pub struct ScheduleBlock {
    pub title: String,
    pub days: Vec<ScheduleDayView>,
}

impl ScheduleBlock {
    pub fn new(title: impl Into<String>, week: Vec<WeekDay>, locale: Locale) -> Self {
        let days = week
            .into_iter()
            .map(|d| ScheduleDayView {
                label: locale.t(d.day).to_string(),
                date: d.date.format("%d/%m").to_string(),
                is_today: d.is_today,
                lessons: d
                    .lessons
                    .into_iter()
                    .map(|l| ScheduleLessonView {
                        time: format!("{} - {}", l.start_time.format("%H:%M"), l.end_time.format("%H:%M")),
                        name: l.name,
                        subject: l.subject_name,
                        class_name: l.class_name,
                        teacher: l.teacher_name,
                    })
                    .collect(),
            })
            .collect();
        ScheduleBlock { title: title.into(), days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|d| d.lessons.is_empty())
    }
}

fn weekday_key(date: NaiveDate) -> &'static str {
    use chrono::{Datelike, Weekday};
    match date.weekday() {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

// ---------- Pages ----------

#[derive(Template)]
#[template(path = "dashboard/admin.html")]
pub struct AdminDashboardTemplate {
    pub ctx: PageContext,
    pub counts: AdminCounts,
    pub boys_percent: i64,
    pub attendance: Vec<AttendanceBar>,
    pub date: String,
    pub prev_date: String,
    pub next_date: String,
    pub events: Vec<DashboardItem>,
    pub announcements: Vec<DashboardItem>,
}

#[derive(Template)]
#[template(path = "dashboard/schedule.html")]
pub struct ScheduleDashboardTemplate {
    pub ctx: PageContext,
    pub display_name: String,
    pub schedules: Vec<ScheduleBlock>,
    pub date: String,
    pub prev_date: String,
    pub next_date: String,
    pub events: Vec<DashboardItem>,
    pub announcements: Vec<DashboardItem>,
}
