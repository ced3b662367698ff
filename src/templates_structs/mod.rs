// Template context structures for Askama templates, organized by page.

use actix_session::Session;

use crate::auth::csrf;
use crate::auth::session::{get_permissions, get_role, get_username, take_flash, Permissions};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::i18n::Locale;
use crate::models::ResourceKind;

/// One sidebar link.
pub struct NavItem {
    pub href: String,
    pub label: String,
    pub active: bool,
}

/// Common context shared by all authenticated pages.
/// Templates access these as `ctx.username`, `ctx.nav`, `ctx.t("key")`.
pub struct PageContext {
    pub username: String,
    pub avatar_initial: String,
    pub role_label: String,
    pub permissions: Permissions,
    pub flash: Option<String>,
    pub nav: Vec<NavItem>,
    pub app_name: String,
    pub csrf_token: String,
    pub locale: Locale,
    pub lang: String,
}

impl PageContext {
    pub fn build(session: &Session, config: &AppConfig, current_path: &str) -> Result<Self, AppError> {
        let username = get_username(session)?;
        let permissions = get_permissions(session)?;
        let role = get_role(session).ok_or_else(|| AppError::Session("No role in session".to_string()))?;
        let locale = config.locale;
        let flash = take_flash(session);
        let csrf_token = csrf::get_or_create_token(session);
        let avatar_initial = username.chars().next().unwrap_or('?').to_uppercase().to_string();
        let nav = build_nav(&permissions, locale, current_path);
        Ok(Self {
            username,
            avatar_initial,
            role_label: locale.t(role.label_key()).to_string(),
            permissions,
            flash,
            nav,
            app_name: config.app_name.clone(),
            csrf_token,
            locale,
            lang: locale.code().to_string(),
        })
    }

    /// Translate a UI label.
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        self.locale.t(key)
    }
}

fn build_nav(permissions: &Permissions, locale: Locale, current_path: &str) -> Vec<NavItem> {
    let mut nav = vec![NavItem {
        href: "/dashboard".to_string(),
        label: locale.t("dashboard").to_string(),
        active: current_path == "/dashboard",
    }];
    for kind in ResourceKind::ALL {
        if !permissions.has(&kind.permission("list")) {
            continue;
        }
        let href = kind.list_url();
        nav.push(NavItem {
            active: current_path == href || current_path.starts_with(&format!("{href}/")),
            label: locale.t(kind.slug()).to_string(),
            href,
        });
    }
    nav.push(NavItem {
        href: "/account".to_string(),
        label: locale.t("account").to_string(),
        active: current_path == "/account",
    });
    nav
}

mod common;
mod dashboard;
mod detail;
mod form;
mod list;

pub use self::common::{AccountTemplate, LoginTemplate};
pub use self::dashboard::{
    AdminDashboardTemplate, AttendanceBar, DashboardItem, ScheduleBlock, ScheduleDashboardTemplate,
    ScheduleDayView, ScheduleLessonView,
};
pub use self::detail::{ProfileDetailTemplate, StatTile};
pub use self::form::{ConfirmDeleteTemplate, FormTemplate};
pub use self::list::{Cell, ColumnView, FilterSelectView, ListTemplate, RowView};
