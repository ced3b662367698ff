use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::role::permissions_for;
use crate::auth::session::{get_user_id, sign_in};
use crate::auth::rate_limit::{client_ip, RateLimiter};
use crate::auth::{csrf, password};
use crate::config::AppConfig;
use crate::errors::{render, see_other, AppError};
use crate::models::account;
use crate::templates_structs::LoginTemplate;

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

fn login_template(session: &Session, config: &AppConfig, username: &str, error_key: &str) -> LoginTemplate {
    let locale = config.locale;
    LoginTemplate {
        error: if error_key.is_empty() { String::new() } else { locale.t(error_key).to_string() },
        username: username.to_string(),
        app_name: config.app_name.clone(),
        csrf_token: csrf::get_or_create_token(session),
        locale,
        lang: locale.code().to_string(),
    }
}

pub async fn login_page(
    session: Session,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    if get_user_id(&session).is_some() {
        return Ok(see_other("/dashboard"));
    }
    render(login_template(&session, &config, "", ""))
}

pub async fn login_submit(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    session: Session,
    config: web::Data<AppConfig>,
    form: web::Form<LoginForm>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    // Rate-limit check before any database access
    let ip = client_ip(&req);
    if limiter.is_blocked(ip) {
        log::warn!("Login blocked for {ip}");
        return render(login_template(&session, &config, &form.username, "rate_limited"));
    }

    let username = form.username.trim();
    let found = account::find_by_username(&pool, username).await?;
    let signed_in = match found {
        Some(acc) => {
            let verified =
                password::verify_password_blocking(form.password.clone(), acc.password_hash.clone()).await?;
            match (verified, acc.role()) {
                (true, Some(role)) => Some((acc, role)),
                (true, None) => {
                    log::error!("Account {} has unknown role '{}'", acc.id, acc.role);
                    None
                }
                (false, _) => None,
            }
        }
        None => None,
    };

    match signed_in {
        Some((acc, role)) => {
            limiter.clear(ip);
            sign_in(&session, acc.id, &acc.username, role, &permissions_for(role))?;
            log::info!("User '{}' signed in as {role}", acc.username);
            Ok(see_other("/dashboard"))
        }
        None => {
            limiter.record_failure(ip);
            render(login_template(&session, &config, username, "login_failed"))
        }
    }
}

pub async fn logout(
    session: Session,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    session.purge();
    Ok(see_other("/login"))
}
