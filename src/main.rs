use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use aula::auth::password::hash_password_blocking;
use aula::auth::rate_limit::RateLimiter;
use aula::config::AppConfig;
use aula::{db, seed};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    let pool = db::create_pool(&config).map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    let admin_hash = hash_password_blocking(config.admin_password.clone())
        .await
        .map_err(std::io::Error::other)?;
    db::seed_admin(&pool, &admin_hash).await.map_err(std::io::Error::other)?;
    if config.seed_demo {
        seed::seed_demo(&pool, &admin_hash).await.map_err(std::io::Error::other)?;
    }

    let secret_key = match &config.session_key {
        Some(key) => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(key.as_bytes())
        }
        None => Key::generate(),
    };
    let limiter = RateLimiter::new();
    let bind_addr = config.bind_addr.clone();
    let cookie_secure = config.cookie_secure;
    let config = web::Data::new(config);

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(limiter.clone()))
            .app_data(config.clone())
            .service(actix_files::Files::new("/static", "./static"))
            .configure(aula::configure)
            .default_service(web::to(aula::not_found))
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}
