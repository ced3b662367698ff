use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::role::{Role, Viewer};
use crate::auth::session::{get_viewer, require_permission};
use crate::config::AppConfig;
use crate::errors::{render, AppError};
use crate::i18n::Locale;
use crate::models::announcement::{self, AnnouncementRow};
use crate::models::event::{self, EventRow};
use crate::models::listing::{fetch_all, fetch_page, ListQuery};
use crate::models::table_filter::SortSpec;
use crate::models::{account, dashboard, lesson, schedule, student};
use crate::templates_structs::{
    AdminDashboardTemplate, AttendanceBar, DashboardItem, PageContext, ScheduleBlock,
    ScheduleDashboardTemplate,
};

const ANNOUNCEMENTS_SHOWN: usize = 5;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub date: Option<String>,
}

/// `?date=` when it parses, otherwise today.
fn selected_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    raw.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or(today)
}

/// Previous and next day links. At the ends of the calendar the link
/// points back at `date` itself.
fn neighbours(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    (date.pred_opt().unwrap_or(date), date.succ_opt().unwrap_or(date))
}

async fn events_on(
    pool: &PgPool,
    viewer: &Viewer,
    date: NaiveDate,
    now: NaiveDateTime,
    locale: Locale,
) -> Result<Vec<DashboardItem>, AppError> {
    let mut query = ListQuery::default().with_shortcut("date", date.format("%Y-%m-%d"));
    query.sort = SortSpec::from_params(Some("date"), Some("asc"));
    let rows = fetch_all::<EventRow>(pool, &event::LIST, viewer, &query).await?;
    Ok(rows
        .iter()
        .map(|e| {
            DashboardItem::event(
                &e.title,
                &e.description,
                e.start_time,
                e.end_time,
                e.class_name.as_deref(),
                now,
                locale,
            )
        })
        .collect())
}

async fn latest_announcements(pool: &PgPool, viewer: &Viewer) -> Result<Vec<DashboardItem>, AppError> {
    let page = fetch_page::<AnnouncementRow>(pool, &announcement::LIST, viewer, &ListQuery::default()).await?;
    Ok(page
        .items
        .iter()
        .take(ANNOUNCEMENTS_SHOWN)
        .map(|a| DashboardItem::announcement(&a.title, &a.description, a.date, a.class_name.as_deref()))
        .collect())
}

/// Timetables for a non-admin viewer: own lessons for a teacher, the
/// class for a student, one per child for a parent.
async fn schedules_for(
    pool: &PgPool,
    viewer: &Viewer,
    today: NaiveDate,
    locale: Locale,
) -> Result<Vec<ScheduleBlock>, AppError> {
    let title = locale.t("schedule");
    let blocks = match viewer.role {
        Role::Teacher => {
            let lessons = lesson::for_teacher(pool, viewer.user_id).await?;
            vec![ScheduleBlock::new(title, schedule::week_grid(&lessons, today), locale)]
        }
        Role::Student => match student::class_of(pool, viewer.user_id).await? {
            Some(class_id) => {
                let lessons = lesson::for_class(pool, class_id).await?;
                vec![ScheduleBlock::new(title, schedule::week_grid(&lessons, today), locale)]
            }
            None => vec![],
        },
        Role::Parent => {
            let mut blocks = vec![];
            for (_, name, class_id) in student::children_of(pool, viewer.user_id).await? {
                let lessons = lesson::for_class(pool, class_id).await?;
                blocks.push(ScheduleBlock::new(
                    format!("{title} - {name}"),
                    schedule::week_grid(&lessons, today),
                    locale,
                ));
            }
            blocks
        }
        Role::Admin => vec![],
    };
    Ok(blocks)
}

pub async fn index(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "dashboard.view")?;
    let viewer = get_viewer(&session)?;
    let ctx = PageContext::build(&session, &config, "/dashboard")?;
    let locale = config.locale;

    let now = Local::now().naive_local();
    let today = now.date();
    let date = selected_date(query.date.as_deref(), today);
    let (prev, next) = neighbours(date);
    let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();

    let events = events_on(&pool, &viewer, date, now, locale).await?;
    let announcements = latest_announcements(&pool, &viewer).await?;

    if viewer.is_admin() {
        let counts = dashboard::admin_counts(&pool).await?;
        let week = dashboard::attendance_week(&pool, today).await?;
        return render(AdminDashboardTemplate {
            ctx,
            boys_percent: counts.boys_percent(),
            counts,
            attendance: AttendanceBar::from_week(&week, locale),
            date: fmt(date),
            prev_date: fmt(prev),
            next_date: fmt(next),
            events,
            announcements,
        });
    }

    let schedules = schedules_for(&pool, &viewer, today, locale).await?;
    let display_name = account::display_name(&pool, viewer.user_id)
        .await?
        .unwrap_or_else(|| ctx.username.clone());
    render(ScheduleDashboardTemplate {
        ctx,
        display_name,
        schedules,
        date: fmt(date),
        prev_date: fmt(prev),
        next_date: fmt(next),
        events,
        announcements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_parameter_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(selected_date(None, today), today);
        assert_eq!(selected_date(Some("not-a-date"), today), today);
        assert_eq!(
            selected_date(Some("2026-11-02"), today),
            NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
        );
    }

    #[test]
    fn day_links_stop_at_the_calendar_ends() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let raw = NaiveDate::MAX.format("%Y-%m-%d").to_string();
        let last = selected_date(Some(raw.as_str()), today);
        assert_eq!(last, NaiveDate::MAX);
        assert_eq!(neighbours(last), (NaiveDate::MAX.pred_opt().unwrap(), NaiveDate::MAX));

        assert_eq!(neighbours(NaiveDate::MIN), (NaiveDate::MIN, NaiveDate::MIN.succ_opt().unwrap()));

        let (prev, next) = neighbours(today);
        assert_eq!(prev, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(next, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
    }
}
