//! Routes that answer without touching the database: login page, the auth
//! redirect, CSRF rejection and the 404 page.

mod common;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use regex::Regex;

use aula::auth::rate_limit::RateLimiter;
use common::*;

macro_rules! app {
    () => {{
        let config = test_config();
        let pool = aula::db::create_pool(&config).expect("Failed to create lazy pool");
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(RateLimiter::new()))
                .app_data(web::Data::new(config))
                .configure(aula::configure)
                .default_service(web::to(aula::not_found)),
        )
        .await
    }};
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[actix_web::test]
async fn test_login_page_renders_with_csrf_token() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = Regex::new(r#"name="csrf_token" value="([0-9a-f]{64})""#).unwrap();
    assert!(token.is_match(&body));
    assert!(body.contains("Sign in"));
}

#[actix_web::test]
async fn test_protected_pages_redirect_to_login() {
    let app = app!();
    for uri in ["/dashboard", "/account", "/list/students", "/list/teachers/1"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&resp), "/login", "{uri}");
    }
}

#[actix_web::test]
async fn test_root_redirects_to_dashboard() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");
}

#[actix_web::test]
async fn test_login_without_csrf_token_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", ADMIN_USER), ("password", ADMIN_PASS), ("csrf_token", "forged")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_unknown_route_is_not_found() {
    let app = test::init_service(App::new().default_service(web::to(aula::not_found))).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/nowhere").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("404"));
}
