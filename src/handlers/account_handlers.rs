use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use sqlx::PgPool;

use crate::auth::rate_limit::{client_ip, RateLimiter};
use crate::auth::session::{get_viewer, set_flash};
use crate::auth::{csrf, password};
use crate::config::AppConfig;
use crate::errors::{render, see_other, AppError};
use crate::forms::errors::{ErrorCode, FieldError};
use crate::forms::{build_views, FieldKind, FieldSpec, FormData, FormReader, SaveError};
use crate::models::account;
use crate::templates_structs::{AccountTemplate, PageContext};

fn password_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("current_password", FieldKind::Password).required(),
        FieldSpec::new("new_password", FieldKind::Password).required(),
        FieldSpec::new("confirm_password", FieldKind::Password).required(),
    ]
}

/// Validate the change form and return the new password. `current_ok`
/// says whether `current_password` matched the stored hash.
fn read_change(data: &FormData, current_ok: bool) -> Result<String, SaveError> {
    let mut r = FormReader::new(data);
    if data.get("current_password").unwrap_or("").is_empty() {
        r.error("current_password", ErrorCode::Required);
    } else if !current_ok {
        r.error("current_password", ErrorCode::WrongPassword);
    }
    let new = r.password("new_password", true).unwrap_or_default();
    if !r.has_error("new_password") && data.get("confirm_password") != Some(new.as_str()) {
        r.error("confirm_password", ErrorCode::PasswordMismatch);
    }
    r.finish()?;
    Ok(new)
}

async fn page(
    pool: &PgPool,
    session: &Session,
    config: &AppConfig,
    errors: &[FieldError],
) -> Result<HttpResponse, AppError> {
    let viewer = get_viewer(session)?;
    let ctx = PageContext::build(session, config, "/account")?;
    let display_name = account::display_name(pool, viewer.user_id)
        .await?
        .unwrap_or_else(|| ctx.username.clone());
    // Passwords are never echoed back.
    let (fields, form_errors) = build_views(&password_fields(), &FormData::default(), errors, config.locale);
    render(AccountTemplate { ctx, display_name, fields, form_errors })
}

pub async fn show(
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    page(&pool, &session, &config, &[]).await
}

pub async fn change_password(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    limiter: web::Data<RateLimiter>,
    form: web::Form<FormData>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, form.csrf_token())?;
    let viewer = get_viewer(&session)?;

    let ip = client_ip(&req);
    if limiter.is_blocked(ip) {
        log::warn!("Password change blocked for {ip}");
        return page(&pool, &session, &config, &[FieldError::form(ErrorCode::TooManyAttempts)]).await;
    }

    let current = form.get("current_password").unwrap_or("").to_string();
    let current_ok = if current.is_empty() {
        false
    } else {
        let acc = account::find_by_id(&pool, viewer.user_id)
            .await?
            .ok_or_else(|| AppError::Session("Account no longer exists".to_string()))?;
        let ok = password::verify_password_blocking(current, acc.password_hash).await?;
        if !ok {
            limiter.record_failure(ip);
            log::warn!("Wrong current password for account {} from {ip}", viewer.user_id);
        }
        ok
    };

    let new = match read_change(&form, current_ok) {
        Ok(new) => new,
        Err(SaveError::Invalid(errors)) => return page(&pool, &session, &config, &errors).await,
        Err(SaveError::App(e)) => return Err(e),
    };

    limiter.clear(ip);
    let hash = password::hash_password_blocking(new).await?;
    account::update_password(&pool, viewer.user_id, &hash).await?;
    log::info!("Account {} changed its password", viewer.user_id);
    set_flash(&session, config.locale.t("password_changed"));
    Ok(see_other("/account"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(current: &str, new: &str, confirm: &str) -> FormData {
        FormData::default()
            .with("current_password", current)
            .with("new_password", new)
            .with("confirm_password", confirm)
    }

    fn codes(result: Result<String, SaveError>) -> Vec<(String, ErrorCode)> {
        match result {
            Err(SaveError::Invalid(errors)) => errors.into_iter().map(|e| (e.field, e.code)).collect(),
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn valid_change_returns_the_new_password() {
        let data = form("old secret", "long enough", "long enough");
        assert_eq!(read_change(&data, true).unwrap(), "long enough");
    }

    #[test]
    fn wrong_current_password_is_a_field_error() {
        let data = form("not it", "long enough", "long enough");
        assert_eq!(
            codes(read_change(&data, false)),
            vec![("current_password".to_string(), ErrorCode::WrongPassword)]
        );
        let blank = form("", "long enough", "long enough");
        assert_eq!(
            codes(read_change(&blank, false)),
            vec![("current_password".to_string(), ErrorCode::Required)]
        );
    }

    #[test]
    fn new_password_rules_apply() {
        assert_eq!(
            codes(read_change(&form("old secret", "short", "short"), true)),
            vec![("new_password".to_string(), ErrorCode::PasswordTooShort(8))]
        );
        assert_eq!(
            codes(read_change(&form("old secret", "long enough", "long enuff"), true)),
            vec![("confirm_password".to_string(), ErrorCode::PasswordMismatch)]
        );
    }
}
