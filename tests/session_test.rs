//! Full request cycles against a seeded database: sign in through the login
//! form, then browse with the session cookie.

mod common;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use regex::Regex;

use aula::auth::password;
use aula::auth::rate_limit::RateLimiter;
use aula::models::account;
use common::*;

async fn body_of<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
        .expect("No session cookie")
}

fn csrf_in(body: &str) -> String {
    let re = Regex::new(r#"name="csrf_token" value="([0-9a-f]{64})""#).unwrap();
    re.captures(body).expect("No CSRF token")[1].to_string()
}

/// Sign in through the form; evaluates to the authenticated session cookie.
macro_rules! sign_in {
    ($app:expr, $username:expr, $password:expr) => {{
        let page = test::call_service(&$app, test::TestRequest::get().uri("/login").to_request()).await;
        let cookie = session_cookie(&page);
        let token = csrf_in(&body_of(page).await);

        let req = test::TestRequest::post()
            .uri("/login")
            .cookie(cookie)
            .set_form([("username", $username), ("password", $password), ("csrf_token", token.as_str())])
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "login as {} failed", $username);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/dashboard");
        session_cookie(&resp)
    }};
}

macro_rules! get {
    ($app:expr, $uri:expr, $cookie:expr) => {
        test::call_service(
            &$app,
            test::TestRequest::get().uri($uri).cookie($cookie.clone()).to_request(),
        )
        .await
    };
}

macro_rules! change_password {
    ($app:expr, $cookie:expr, $token:expr, $current:expr, $new:expr) => {
        test::call_service(
            &$app,
            test::TestRequest::post()
                .uri("/account/password")
                .cookie($cookie.clone())
                .set_form([
                    ("current_password", $current),
                    ("new_password", $new),
                    ("confirm_password", $new),
                    ("csrf_token", $token),
                ])
                .to_request(),
        )
        .await
    };
}

macro_rules! app {
    ($db:expr) => {{
        let config = test_config();
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new($db.pool.clone()))
                .app_data(web::Data::new(RateLimiter::new()))
                .app_data(web::Data::new(config))
                .configure(aula::configure)
                .default_service(web::to(aula::not_found)),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_admin_browses_lists_and_dashboard() {
    let Some(db) = TestDb::seeded().await else { return };
    let app = app!(db);
    let cookie = sign_in!(app, ADMIN_USER, ADMIN_PASS);

    let dashboard = get!(app, "/dashboard", cookie);
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body = body_of(dashboard).await;
    assert!(body.contains("Attendance this week"));

    let list = get!(app, "/list/students?sort=grade&dir=desc", cookie);
    assert_eq!(list.status(), StatusCode::OK);
    let body = body_of(list).await;
    assert!(body.contains("Page 1 of 2"));
    assert!(body.contains("/list/students/new"));

    let form = get!(app, "/list/classes/new", cookie);
    assert_eq!(form.status(), StatusCode::OK);
    assert!(body_of(form).await.contains(r#"name="capacity""#));

    let unknown = get!(app, "/list/grades", cookie);
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    db.cleanup().await;
}

#[actix_web::test]
async fn test_wrong_password_shows_the_form_again() {
    let Some(db) = TestDb::seeded().await else { return };
    let app = app!(db);

    let page = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;
    let cookie = session_cookie(&page);
    let token = csrf_in(&body_of(page).await);
    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(cookie)
        .set_form([("username", ADMIN_USER), ("password", "wrong"), ("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("Invalid username or password"));

    db.cleanup().await;
}

#[actix_web::test]
async fn test_student_permissions_and_scope() {
    let Some(db) = TestDb::seeded().await else { return };
    let app = app!(db);
    let cookie = sign_in!(app, "student1", ADMIN_PASS);

    let dashboard = get!(app, "/dashboard", cookie);
    assert_eq!(dashboard.status(), StatusCode::OK);
    assert!(body_of(dashboard).await.contains("Schedule"));

    let results = get!(app, "/list/results", cookie);
    assert_eq!(results.status(), StatusCode::OK);

    let create = get!(app, "/list/results/new", cookie);
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    let other = db.viewer("student2").await;
    let hidden = get!(app, &format!("/list/students/{}", other.user_id), cookie);
    assert_eq!(hidden.status(), StatusCode::FORBIDDEN);

    db.cleanup().await;
}

#[actix_web::test]
async fn test_teacher_sees_a_student_profile() {
    let Some(db) = TestDb::seeded().await else { return };
    let app = app!(db);
    let cookie = sign_in!(app, "teacher1", ADMIN_PASS);
    let student = db.viewer("student1").await;

    let profile = get!(app, &format!("/list/students/{}", student.user_id), cookie);
    assert_eq!(profile.status(), StatusCode::OK);
    let body = body_of(profile).await;
    assert!(body.contains("Hugo García"));
    assert!(body.contains(&format!("/list/results?student_id={}", student.user_id)));

    db.cleanup().await;
}

#[actix_web::test]
async fn test_password_change_round_trip() {
    let Some(db) = TestDb::seeded().await else { return };
    let app = app!(db);
    let cookie = sign_in!(app, "teacher6", ADMIN_PASS);
    let token = csrf_in(&body_of(get!(app, "/account", cookie)).await);

    let resp = change_password!(app, cookie, token.as_str(), ADMIN_PASS, "pizarra verde");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/account");

    sign_in!(app, "teacher6", "pizarra verde");

    db.cleanup().await;
}

#[actix_web::test]
async fn test_repeated_wrong_current_password_is_throttled() {
    let Some(db) = TestDb::seeded().await else { return };
    let app = app!(db);
    let cookie = sign_in!(app, "parent1", ADMIN_PASS);
    let token = csrf_in(&body_of(get!(app, "/account", cookie)).await);

    for _ in 0..5 {
        let resp = change_password!(app, cookie, token.as_str(), "not my password", "pizarra verde");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_of(resp).await.contains("Current password is incorrect"));
    }

    // Even the right password is refused until the window passes.
    let resp = change_password!(app, cookie, token.as_str(), ADMIN_PASS, "pizarra verde");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("Too many failed attempts"));

    let acc = account::find_by_username(&db.pool, "parent1").await.unwrap().unwrap();
    assert!(password::verify_password(ADMIN_PASS, &acc.password_hash).unwrap());

    db.cleanup().await;
}
