pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod i18n;
pub mod models;
pub mod seed;
pub mod templates_structs;

use actix_web::{middleware::from_fn, web, HttpResponse};

use handlers::{account_handlers, auth_handlers, dashboard, resource};

/// Register every route. Shared by `main` and the HTTP tests; the caller
/// provides the session middleware and app data (pool, config, rate limiter).
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(auth_handlers::login_page))
        .route("/login", web::post().to(auth_handlers::login_submit))
        .route("/logout", web::post().to(auth_handlers::logout))
        .route("/", web::get().to(|| async { errors::see_other("/dashboard") }))
        .service(
            web::scope("")
                .wrap(from_fn(auth::middleware::require_auth))
                .route("/dashboard", web::get().to(dashboard::index))
                .route("/account", web::get().to(account_handlers::show))
                .route("/account/password", web::post().to(account_handlers::change_password))
                // `/new` before the `{id}` routes
                .route("/list/{kind}", web::get().to(resource::list))
                .route("/list/{kind}", web::post().to(resource::create))
                .route("/list/{kind}/new", web::get().to(resource::new_form))
                .route("/list/students/{id}", web::get().to(resource::detail::student))
                .route("/list/teachers/{id}", web::get().to(resource::detail::teacher))
                .route("/list/{kind}/{id}/edit", web::get().to(resource::edit_form))
                .route("/list/{kind}/{id}", web::post().to(resource::update))
                .route("/list/{kind}/{id}/delete", web::get().to(resource::confirm_delete))
                .route("/list/{kind}/{id}/delete", web::post().to(resource::delete)),
        );
}

/// Fallback for unmatched paths.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../templates/errors/404.html"))
}
