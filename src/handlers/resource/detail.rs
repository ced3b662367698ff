//! Profile pages for a single student or teacher.

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::Local;
use sqlx::PgPool;

use crate::auth::role::Role;
use crate::auth::session::{get_viewer, require_permission};
use crate::config::AppConfig;
use crate::errors::{render, AppError};
use crate::i18n::Locale;
use crate::models::listing::ensure_visible;
use crate::models::student::StudentDetail;
use crate::models::teacher::TeacherDetail;
use crate::models::{lesson, schedule, student, teacher, ResourceKind};
use crate::templates_structs::{PageContext, ProfileDetailTemplate, ScheduleBlock, StatTile};

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

fn fact(locale: Locale, key: &str, value: impl Into<String>) -> (String, String) {
    (locale.t(key).to_string(), value.into())
}

fn stat(locale: Locale, key: &str, value: impl ToString) -> StatTile {
    StatTile { label: locale.t(key).to_string(), value: value.to_string() }
}

fn shortcut(locale: Locale, kind: ResourceKind, param: &str, id: i64) -> (String, String) {
    (format!("{}?{param}={id}", kind.list_url()), locale.t(kind.slug()).to_string())
}

fn edit_href(ctx: &PageContext, kind: ResourceKind, id: i64) -> String {
    if ctx.permissions.has(&kind.permission("edit")) {
        format!("{}/{id}/edit", kind.list_url())
    } else {
        String::new()
    }
}

fn student_facts(s: &StudentDetail, locale: Locale) -> Vec<(String, String)> {
    vec![
        fact(locale, "username", s.username.as_str()),
        fact(locale, "email", or_dash(s.email.as_deref())),
        fact(locale, "phone", or_dash(s.phone.as_deref())),
        fact(locale, "address", s.address.as_str()),
        fact(locale, "blood_type", s.blood_type.as_str()),
        fact(locale, "sex", locale.t(&s.sex)),
        fact(locale, "birthday", s.birthday.format("%d/%m/%Y").to_string()),
        fact(locale, "parent", format!("{} ({})", s.parent_name, s.parent_phone)),
    ]
}

fn student_stats(s: &StudentDetail, locale: Locale) -> Vec<StatTile> {
    let rate = s.attendance_rate().map(|r| format!("{r}%")).unwrap_or_else(|| "-".to_string());
    vec![
        stat(locale, "attendance_rate", rate),
        stat(locale, "grade", format!("{}º", s.grade_level)),
        stat(locale, "lessons_count", s.lessons),
        stat(locale, "class", &s.class_name),
    ]
}

fn teacher_facts(t: &TeacherDetail, locale: Locale) -> Vec<(String, String)> {
    vec![
        fact(locale, "username", t.username.as_str()),
        fact(locale, "email", or_dash(t.email.as_deref())),
        fact(locale, "phone", or_dash(t.phone.as_deref())),
        fact(locale, "address", t.address.as_str()),
        fact(locale, "blood_type", t.blood_type.as_str()),
        fact(locale, "sex", locale.t(&t.sex)),
        fact(locale, "birthday", t.birthday.format("%d/%m/%Y").to_string()),
        fact(locale, "subjects", or_dash(t.subjects.as_deref())),
        fact(locale, "supervisor_id", or_dash(t.supervised.as_deref())),
    ]
}

fn teacher_stats(t: &TeacherDetail, locale: Locale) -> Vec<StatTile> {
    vec![
        stat(locale, "lessons_count", t.lessons),
        stat(locale, "classes_count", t.classes),
        stat(locale, "subjects_count", t.subject_count),
    ]
}

/// GET /list/students/{id}
pub async fn student(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let kind = ResourceKind::Students;
    require_permission(&session, &kind.permission("list"))?;
    let viewer = get_viewer(&session)?;
    let id = path.into_inner();
    ensure_visible(&pool, &student::LIST, &viewer, id).await?;
    let s = student::find_detail(&pool, id).await?.ok_or(AppError::NotFound)?;

    let locale = config.locale;
    let ctx = PageContext::build(&session, &config, &kind.list_url())?;
    let today = Local::now().date_naive();
    let lessons = lesson::for_class(&pool, s.class_id).await?;

    let shortcuts = [
        (ResourceKind::Lessons, "class_id", s.class_id),
        (ResourceKind::Exams, "class_id", s.class_id),
        (ResourceKind::Assignments, "class_id", s.class_id),
        (ResourceKind::Results, "student_id", s.id),
        (ResourceKind::Attendance, "student_id", s.id),
    ]
    .into_iter()
    .filter(|(k, _, _)| ctx.permissions.has(&k.permission("list")))
    .map(|(k, param, value)| shortcut(locale, k, param, value))
    .collect();

    let tmpl = ProfileDetailTemplate {
        full_name: format!("{} {}", s.name, s.surname),
        role_label: locale.t(Role::Student.label_key()).to_string(),
        img: s.img.clone().unwrap_or_default(),
        facts: student_facts(&s, locale),
        stats: student_stats(&s, locale),
        schedules: vec![ScheduleBlock::new(locale.t("schedule"), schedule::week_grid(&lessons, today), locale)],
        shortcuts,
        edit_href: edit_href(&ctx, kind, id),
        back_href: kind.list_url(),
        ctx,
    };
    render(tmpl)
}

/// GET /list/teachers/{id}
pub async fn teacher(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let kind = ResourceKind::Teachers;
    require_permission(&session, &kind.permission("list"))?;
    let viewer = get_viewer(&session)?;
    let id = path.into_inner();
    ensure_visible(&pool, &teacher::LIST, &viewer, id).await?;
    let t = teacher::find_detail(&pool, id).await?.ok_or(AppError::NotFound)?;

    let locale = config.locale;
    let ctx = PageContext::build(&session, &config, &kind.list_url())?;
    let today = Local::now().date_naive();
    let lessons = lesson::for_teacher(&pool, id).await?;

    let shortcuts = [
        ResourceKind::Classes,
        ResourceKind::Students,
        ResourceKind::Lessons,
        ResourceKind::Exams,
        ResourceKind::Assignments,
    ]
    .into_iter()
    .filter(|k| ctx.permissions.has(&k.permission("list")))
    .map(|k| shortcut(locale, k, "teacher_id", id))
    .collect();

    let tmpl = ProfileDetailTemplate {
        full_name: format!("{} {}", t.name, t.surname),
        role_label: locale.t(Role::Teacher.label_key()).to_string(),
        img: t.img.clone().unwrap_or_default(),
        facts: teacher_facts(&t, locale),
        stats: teacher_stats(&t, locale),
        schedules: vec![ScheduleBlock::new(locale.t("schedule"), schedule::week_grid(&lessons, today), locale)],
        shortcuts,
        edit_href: edit_href(&ctx, kind, id),
        back_href: kind.list_url(),
        ctx,
    };
    render(tmpl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_student() -> StudentDetail {
        StudentDetail {
            id: 7,
            username: "ana".into(),
            name: "Ana".into(),
            surname: "Ruiz".into(),
            email: None,
            phone: Some("600111222".into()),
            address: "Calle Mayor 1".into(),
            img: None,
            blood_type: "A+".into(),
            sex: "FEMALE".into(),
            birthday: NaiveDate::from_ymd_opt(2015, 3, 9).unwrap(),
            class_id: 2,
            class_name: "3B".into(),
            grade_level: 3,
            parent_name: "Luis Ruiz".into(),
            parent_phone: "600333444".into(),
            lessons: 12,
            attended: 3,
            attendance_total: 4,
        }
    }

    #[test]
    fn student_facts_are_localized() {
        let facts = student_facts(&sample_student(), Locale::En);
        assert!(facts.contains(&("Email".to_string(), "-".to_string())));
        assert!(facts.contains(&("Sex".to_string(), "Female".to_string())));
        assert!(facts.contains(&("Birthday".to_string(), "09/03/2015".to_string())));
        assert!(facts.contains(&("Parent".to_string(), "Luis Ruiz (600333444)".to_string())));
    }

    #[test]
    fn student_stats_show_attendance_percentage() {
        let stats = student_stats(&sample_student(), Locale::En);
        assert_eq!(stats[0].value, "75%");
        assert_eq!(stats[2].value, "12");

        let mut s = sample_student();
        s.attendance_total = 0;
        assert_eq!(student_stats(&s, Locale::En)[0].value, "-");
    }

    #[test]
    fn shortcuts_point_at_filtered_lists() {
        let (href, label) = shortcut(Locale::Es, ResourceKind::Results, "student_id", 7);
        assert_eq!(href, "/list/results?student_id=7");
        assert_eq!(label, "Resultados");
    }
}
