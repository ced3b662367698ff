//! One set of list / create / update / delete pages serving every resource.
//!
//! Each resource implements [`ResourceHandler`]; the route functions at the
//! bottom resolve `{kind}` from the path and dispatch statically to the
//! generic page functions. Every page checks the `<kind>.<action>`
//! permission, POSTs check the CSRF token, and id routes check that the row
//! is inside the viewer's scope.

pub mod calendar;
pub mod coursework;
pub mod detail;
pub mod people;
pub mod school;

use std::collections::HashMap;

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDateTime};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::auth::csrf;
use crate::auth::role::Viewer;
use crate::auth::session::{get_viewer, require_permission, set_flash};
use crate::config::AppConfig;
use crate::errors::{render, see_other, AppError};
use crate::forms::errors::FieldError;
use crate::forms::{build_views, FieldSpec, FormData, OptionView, SaveError, SelectOption};
use crate::i18n::Locale;
use crate::models::listing::{ensure_visible, fetch_page, ListQuery, ListSpec};
use crate::models::ResourceKind;
use crate::templates_structs::{
    Cell, ColumnView, ConfirmDeleteTemplate, FilterSelectView, FormTemplate, ListTemplate,
    PageContext, RowView,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

impl FormMode {
    pub fn is_create(&self) -> bool {
        *self == FormMode::Create
    }
}

/// A table column: label key plus the sort key, if sortable.
pub struct ColumnDef {
    pub label: &'static str,
    pub sort: Option<&'static str>,
}

pub const fn col(label: &'static str) -> ColumnDef {
    ColumnDef { label, sort: None }
}

pub const fn sorted(label: &'static str, key: &'static str) -> ColumnDef {
    ColumnDef { label, sort: Some(key) }
}

/// A filter-bar select; `name` is the shortcut parameter it submits.
pub struct FilterSelect {
    pub name: &'static str,
    pub options: Vec<SelectOption>,
    pub localized: bool,
}

impl FilterSelect {
    pub fn new(name: &'static str, options: Vec<SelectOption>) -> Self {
        Self { name, options, localized: false }
    }

    /// Fixed values whose labels are catalog keys.
    pub fn choice(name: &'static str, values: &[&str]) -> Self {
        let options = values.iter().map(|v| SelectOption::new(v, *v)).collect();
        Self { name, options, localized: true }
    }
}

#[allow(async_fn_in_trait)]
pub trait ResourceHandler {
    const KIND: ResourceKind;
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    fn spec() -> &'static ListSpec;
    fn columns() -> Vec<ColumnDef>;
    fn cells(row: &Self::Row, locale: Locale, now: NaiveDateTime) -> Vec<Cell>;
    fn row_id(row: &Self::Row) -> i64;

    fn detail_href(_id: i64) -> Option<String> {
        None
    }

    /// Initial values of the create form.
    fn defaults() -> FormData {
        FormData::default()
    }

    async fn filter_bar(_pool: &PgPool, _viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, mode: FormMode) -> Result<Vec<FieldSpec>, AppError>;
    /// Current values of row `id` as form data.
    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError>;
    async fn create(pool: &PgPool, viewer: &Viewer, data: &FormData) -> Result<i64, SaveError>;
    async fn update(pool: &PgPool, viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError>;
    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError>;
    /// Short human description shown on the delete confirmation.
    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError>;
}

// ---------- View helpers ----------

fn column_view(column: ColumnDef, query: &ListQuery, spec: &ListSpec, base: &str, locale: Locale) -> ColumnView {
    let label = locale.t(column.label).to_string();
    let Some(key) = column.sort else {
        return ColumnView { label, sort_href: String::new(), sort_state: String::new() };
    };
    let sort_state = if query.sort.column == key {
        query.sort.dir_str().to_string()
    } else if spec.sort_sql(&query.sort.column).is_none() && key == spec.default_sort {
        if spec.default_desc { "desc" } else { "asc" }.to_string()
    } else {
        String::new()
    };
    ColumnView { label, sort_href: query.sort_href(base, key), sort_state }
}

fn filter_view(select: FilterSelect, query: &ListQuery, locale: Locale) -> FilterSelectView {
    let current = query.shortcut(select.name).unwrap_or("");
    let localized = select.localized;
    FilterSelectView {
        name: select.name.to_string(),
        label: locale.t(select.name).to_string(),
        options: select
            .options
            .into_iter()
            .map(|o| OptionView {
                selected: o.value == current,
                label: if localized { locale.t(&o.label).to_string() } else { o.label },
                value: o.value,
            })
            .collect(),
    }
}

/// Query state the search form carries in hidden inputs. Shortcuts with a
/// select in the filter bar are left to the select.
fn hidden_state(query: &ListQuery, selects: &[FilterSelectView]) -> Vec<(String, String)> {
    let mut hidden = vec![];
    if !query.filters.is_empty() {
        hidden.push(("filter".to_string(), query.filters.to_json()));
    }
    for (key, value) in &query.shortcuts {
        if !selects.iter().any(|s| &s.name == key) {
            hidden.push((key.clone(), value.clone()));
        }
    }
    if !query.sort.column.is_empty() {
        hidden.push(("sort".to_string(), query.sort.column.clone()));
        hidden.push(("dir".to_string(), query.sort.dir_str().to_string()));
    }
    hidden
}

fn flash_and_return(session: &Session, locale: Locale, key: &str, kind: ResourceKind) -> HttpResponse {
    set_flash(session, locale.t(key));
    see_other(&kind.list_url())
}

// ---------- Generic pages ----------

async fn list_page<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    params: &HashMap<String, String>,
) -> Result<HttpResponse, AppError> {
    let kind = R::KIND;
    require_permission(session, &kind.permission("list"))?;
    let viewer = get_viewer(session)?;
    let base = kind.list_url();
    let ctx = PageContext::build(session, config, &base)?;
    let locale = config.locale;
    let spec = R::spec();

    let query = ListQuery::from_params(params);
    let page = fetch_page::<R::Row>(pool, spec, &viewer, &query).await?;

    let can_edit = ctx.permissions.has(&kind.permission("edit"));
    let can_delete = ctx.permissions.has(&kind.permission("delete"));
    let now = Local::now().naive_local();
    let rows: Vec<RowView> = page
        .items
        .iter()
        .map(|row| {
            let id = R::row_id(row);
            RowView {
                cells: R::cells(row, locale, now),
                detail_href: R::detail_href(id).unwrap_or_default(),
                edit_href: if can_edit { format!("{base}/{id}/edit") } else { String::new() },
                delete_href: if can_delete { format!("{base}/{id}/delete") } else { String::new() },
            }
        })
        .collect();

    let columns = R::columns()
        .into_iter()
        .map(|c| column_view(c, &query, spec, &base, locale))
        .collect();
    let filters: Vec<FilterSelectView> = R::filter_bar(pool, &viewer)
        .await?
        .into_iter()
        .map(|f| filter_view(f, &query, locale))
        .collect();

    let tmpl = ListTemplate {
        title: locale.t(kind.slug()).to_string(),
        q: query.q.clone(),
        hidden: hidden_state(&query, &filters),
        columns,
        has_actions: rows.iter().any(|r| {
            !r.detail_href.is_empty() || !r.edit_href.is_empty() || !r.delete_href.is_empty()
        }),
        rows,
        filters,
        page: page.page,
        total_pages: page.total_pages,
        total_count: page.total_count,
        prev_href: if page.has_prev() { query.page_href(&base, page.page - 1) } else { String::new() },
        next_href: if page.has_next() { query.page_href(&base, page.page + 1) } else { String::new() },
        new_href: if ctx.permissions.has(&kind.permission("create")) {
            format!("{base}/new")
        } else {
            String::new()
        },
        clear_href: base.clone(),
        base_url: base,
        ctx,
    };
    render(tmpl)
}

#[allow(clippy::too_many_arguments)]
async fn form_page<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    viewer: &Viewer,
    mode: FormMode,
    action: String,
    data: &FormData,
    errors: &[FieldError],
) -> Result<HttpResponse, AppError> {
    let kind = R::KIND;
    let locale = config.locale;
    let ctx = PageContext::build(session, config, &kind.list_url())?;
    let specs = R::fields(pool, viewer, mode).await?;
    let (fields, mut form_errors) = build_views(&specs, data, errors, locale);
    if !errors.is_empty() && form_errors.is_empty() {
        form_errors.push(locale.t("form_invalid").to_string());
    }
    let title_key = if mode.is_create() { "create_title" } else { "edit_title" };
    render(FormTemplate {
        title: format!("{}: {}", locale.t(title_key), locale.t(kind.singular_key())),
        action,
        cancel_href: kind.list_url(),
        fields,
        form_errors,
        ctx,
    })
}

async fn new_page<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
) -> Result<HttpResponse, AppError> {
    require_permission(session, &R::KIND.permission("create"))?;
    let viewer = get_viewer(session)?;
    let action = R::KIND.list_url();
    form_page::<R>(pool, session, config, &viewer, FormMode::Create, action, &R::defaults(), &[]).await
}

async fn create_submit<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    data: &FormData,
) -> Result<HttpResponse, AppError> {
    let kind = R::KIND;
    require_permission(session, &kind.permission("create"))?;
    csrf::validate_csrf(session, data.csrf_token())?;
    let viewer = get_viewer(session)?;
    match R::create(pool, &viewer, data).await {
        Ok(id) => {
            log::info!("{} {id} created by {}", kind.singular_key(), viewer.user_id);
            Ok(flash_and_return(session, config.locale, "created", kind))
        }
        Err(SaveError::Invalid(errors)) => {
            let action = kind.list_url();
            form_page::<R>(pool, session, config, &viewer, FormMode::Create, action, data, &errors).await
        }
        Err(SaveError::App(e)) => Err(e),
    }
}

async fn edit_page<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    id: i64,
) -> Result<HttpResponse, AppError> {
    require_permission(session, &R::KIND.permission("edit"))?;
    let viewer = get_viewer(session)?;
    ensure_visible(pool, R::spec(), &viewer, id).await?;
    let data = R::load(pool, id).await?;
    let action = format!("{}/{id}", R::KIND.list_url());
    form_page::<R>(pool, session, config, &viewer, FormMode::Edit, action, &data, &[]).await
}

async fn update_submit<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    id: i64,
    data: &FormData,
) -> Result<HttpResponse, AppError> {
    let kind = R::KIND;
    require_permission(session, &kind.permission("edit"))?;
    csrf::validate_csrf(session, data.csrf_token())?;
    let viewer = get_viewer(session)?;
    ensure_visible(pool, R::spec(), &viewer, id).await?;
    match R::update(pool, &viewer, id, data).await {
        Ok(()) => {
            log::info!("{} {id} updated by {}", kind.singular_key(), viewer.user_id);
            Ok(flash_and_return(session, config.locale, "updated", kind))
        }
        Err(SaveError::Invalid(errors)) => {
            let action = format!("{}/{id}", kind.list_url());
            form_page::<R>(pool, session, config, &viewer, FormMode::Edit, action, data, &errors).await
        }
        Err(SaveError::App(e)) => Err(e),
    }
}

async fn confirm_page<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    id: i64,
    errors: Vec<String>,
) -> Result<HttpResponse, AppError> {
    let kind = R::KIND;
    let locale = config.locale;
    let ctx = PageContext::build(session, config, &kind.list_url())?;
    let description = R::describe(pool, id).await?;
    render(ConfirmDeleteTemplate {
        title: format!("{}: {}", locale.t("delete_title"), locale.t(kind.singular_key())),
        description,
        action: format!("{}/{id}/delete", kind.list_url()),
        cancel_href: kind.list_url(),
        form_errors: errors,
        ctx,
    })
}

async fn delete_page<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    id: i64,
) -> Result<HttpResponse, AppError> {
    require_permission(session, &R::KIND.permission("delete"))?;
    let viewer = get_viewer(session)?;
    ensure_visible(pool, R::spec(), &viewer, id).await?;
    confirm_page::<R>(pool, session, config, id, vec![]).await
}

async fn delete_submit<R: ResourceHandler>(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    id: i64,
    data: &FormData,
) -> Result<HttpResponse, AppError> {
    let kind = R::KIND;
    require_permission(session, &kind.permission("delete"))?;
    csrf::validate_csrf(session, data.csrf_token())?;
    let viewer = get_viewer(session)?;
    ensure_visible(pool, R::spec(), &viewer, id).await?;
    match R::delete(pool, id).await {
        Ok(()) => {
            log::info!("{} {id} deleted by {}", kind.singular_key(), viewer.user_id);
            Ok(flash_and_return(session, config.locale, "deleted", kind))
        }
        Err(SaveError::Invalid(errors)) => {
            let messages = errors.iter().map(|e| config.locale.error(&e.code)).collect();
            confirm_page::<R>(pool, session, config, id, messages).await
        }
        Err(SaveError::App(e)) => Err(e),
    }
}

// ---------- Routes ----------

fn kind_of(slug: &str) -> Result<ResourceKind, AppError> {
    ResourceKind::from_slug(slug).ok_or(AppError::NotFound)
}

/// Call `$func::<Handler>(args)` for the handler of `$kind`.
macro_rules! dispatch {
    ($kind:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $kind {
            ResourceKind::Students => $func::<people::Students>($($arg),*).await,
            ResourceKind::Teachers => $func::<people::Teachers>($($arg),*).await,
            ResourceKind::Parents => $func::<people::Parents>($($arg),*).await,
            ResourceKind::Classes => $func::<school::Classes>($($arg),*).await,
            ResourceKind::Subjects => $func::<school::Subjects>($($arg),*).await,
            ResourceKind::Lessons => $func::<school::Lessons>($($arg),*).await,
            ResourceKind::Exams => $func::<coursework::Exams>($($arg),*).await,
            ResourceKind::Assignments => $func::<coursework::Assignments>($($arg),*).await,
            ResourceKind::Results => $func::<coursework::Results>($($arg),*).await,
            ResourceKind::Attendance => $func::<coursework::Attendance>($($arg),*).await,
            ResourceKind::Events => $func::<calendar::Events>($($arg),*).await,
            ResourceKind::Announcements => $func::<calendar::Announcements>($($arg),*).await,
        }
    };
}

pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let kind = kind_of(&path)?;
    dispatch!(kind, list_page(&pool, &session, &config, &query))
}

pub async fn new_form(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let kind = kind_of(&path)?;
    dispatch!(kind, new_page(&pool, &session, &config))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    form: web::Form<FormData>,
) -> Result<HttpResponse, AppError> {
    let kind = kind_of(&path)?;
    dispatch!(kind, create_submit(&pool, &session, &config, &form))
}

pub async fn edit_form(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let kind = kind_of(&slug)?;
    dispatch!(kind, edit_page(&pool, &session, &config, id))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<(String, i64)>,
    form: web::Form<FormData>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let kind = kind_of(&slug)?;
    dispatch!(kind, update_submit(&pool, &session, &config, id, &form))
}

pub async fn confirm_delete(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let kind = kind_of(&slug)?;
    dispatch!(kind, delete_page(&pool, &session, &config, id))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    path: web::Path<(String, i64)>,
    form: web::Form<FormData>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let kind = kind_of(&slug)?;
    dispatch!(kind, delete_submit(&pool, &session, &config, id, &form))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn default_sort_column_shows_its_direction() {
        let query = ListQuery::from_params(&params(&[]));
        let view = column_view(sorted("name", "name"), &query, &student::LIST, "/list/students", Locale::En);
        assert_eq!(view.sort_state, "asc");
        assert_eq!(view.sort_href, "/list/students?sort=name&dir=asc");

        let other = column_view(sorted("class", "class"), &query, &student::LIST, "/list/students", Locale::En);
        assert_eq!(other.sort_state, "");
    }

    #[test]
    fn active_sort_links_flip_direction() {
        let query = ListQuery::from_params(&params(&[("sort", "class"), ("dir", "asc")]));
        let view = column_view(sorted("class", "class"), &query, &student::LIST, "/list/students", Locale::En);
        assert_eq!(view.sort_state, "asc");
        assert!(view.sort_href.ends_with("sort=class&dir=desc"));
    }

    #[test]
    fn unsortable_columns_have_no_link() {
        let query = ListQuery::default();
        let view = column_view(col("email"), &query, &student::LIST, "/list/students", Locale::Es);
        assert_eq!(view.label, "Correo electrónico");
        assert!(view.sort_href.is_empty());
    }

    #[test]
    fn filter_select_marks_current_value() {
        let query = ListQuery::from_params(&params(&[("class_id", "2")]));
        let select = FilterSelect::new(
            "class_id",
            vec![SelectOption::new(1, "1A"), SelectOption::new(2, "2A")],
        );
        let view = filter_view(select, &query, Locale::En);
        assert_eq!(view.label, "Class");
        assert!(!view.options[0].selected);
        assert!(view.options[1].selected);
    }

    #[test]
    fn localized_filter_options_are_translated() {
        let view = filter_view(FilterSelect::choice("day", &["MONDAY"]), &ListQuery::default(), Locale::Es);
        assert_eq!(view.options[0].label, "Lunes");
        assert_eq!(view.options[0].value, "MONDAY");
    }

    #[test]
    fn hidden_state_skips_shortcuts_with_a_select() {
        let query = ListQuery::from_params(&params(&[
            ("class_id", "2"),
            ("teacher_id", "7"),
            ("sort", "name"),
            ("dir", "desc"),
        ]));
        let selects = vec![FilterSelectView { name: "class_id".into(), label: String::new(), options: vec![] }];
        let hidden = hidden_state(&query, &selects);
        assert_eq!(
            hidden,
            vec![
                ("teacher_id".to_string(), "7".to_string()),
                ("sort".to_string(), "name".to_string()),
                ("dir".to_string(), "desc".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_kind_is_not_found() {
        assert!(matches!(kind_of("grades"), Err(AppError::NotFound)));
        assert_eq!(kind_of("exams").ok(), Some(ResourceKind::Exams));
    }
}
