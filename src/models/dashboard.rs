use chrono::{Duration, NaiveDate};
use sqlx::PgPool;

use super::attendance::{self, DayCount};
use super::schedule::week_start;
use super::{account, student};

// ---------- Types ----------

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminCounts {
    pub admins: i64,
    pub teachers: i64,
    pub students: i64,
    pub parents: i64,
    pub boys: i64,
    pub girls: i64,
}

impl AdminCounts {
    pub fn from_roles(roles: &[(String, i64)], boys: i64, girls: i64) -> Self {
        let count = |role: &str| {
            roles
                .iter()
                .find(|(r, _)| r == role)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };
        Self {
            admins: count("admin"),
            teachers: count("teacher"),
            students: count("student"),
            parents: count("parent"),
            boys,
            girls,
        }
    }

    /// Share of boys in percent, for the sex chart.
    pub fn boys_percent(&self) -> i64 {
        let total = self.boys + self.girls;
        if total == 0 { 0 } else { self.boys * 100 / total }
    }
}

// ---------- Queries ----------

pub async fn admin_counts(pool: &PgPool) -> Result<AdminCounts, sqlx::Error> {
    let roles = account::count_by_role(pool).await?;
    let (boys, girls) = student::count_by_sex(pool).await?;
    Ok(AdminCounts::from_roles(&roles, boys, girls))
}

/// Present / absent per weekday of `today`'s week, zero-filled.
pub async fn attendance_week(pool: &PgPool, today: NaiveDate) -> Result<Vec<DayCount>, sqlx::Error> {
    let monday = week_start(today);
    let friday = monday + Duration::days(4);
    let counts = attendance::daily_counts(pool, monday, friday).await?;
    Ok(fill_week(monday, &counts))
}

/// Five entries Monday..Friday; days missing from `counts` are zero.
pub fn fill_week(monday: NaiveDate, counts: &[DayCount]) -> Vec<DayCount> {
    (0..5)
        .map(|offset| {
            let date = monday + Duration::days(offset);
            counts
                .iter()
                .find(|c| c.date == date)
                .cloned()
                .unwrap_or(DayCount { date, present: 0, absent: 0 })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    #[test]
    fn counts_default_to_zero_for_missing_roles() {
        let roles = vec![("teacher".to_string(), 4), ("student".to_string(), 30)];
        let counts = AdminCounts::from_roles(&roles, 16, 14);
        assert_eq!(counts.teachers, 4);
        assert_eq!(counts.students, 30);
        assert_eq!(counts.parents, 0);
        assert_eq!(counts.boys_percent(), 53);
        assert_eq!(AdminCounts::default().boys_percent(), 0);
    }

    #[test]
    fn week_is_zero_filled() {
        let counts = vec![
            DayCount { date: date(15), present: 20, absent: 2 },
            DayCount { date: date(17), present: 18, absent: 4 },
        ];
        let week = fill_week(date(14), &counts);
        assert_eq!(week.len(), 5);
        assert_eq!(week[0], DayCount { date: date(14), present: 0, absent: 0 });
        assert_eq!(week[1].present, 20);
        assert_eq!(week[3].absent, 4);
        assert_eq!(week[4].date, date(18));
    }
}
