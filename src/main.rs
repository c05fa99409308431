use actix_web::{App, HttpServer, middleware, web};

use storefront_guard::config::AppConfig;
use storefront_guard::errors::AppError;
use storefront_guard::handlers;
use storefront_guard::state::AppContext;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    env_logger::init();

    let config = AppConfig::from_env()?;
    let mut ctx = AppContext::new(config.clone());
    ctx.start_cleanup();

    let limiter = web::Data::new(ctx.limiter.clone());
    let app_config = web::Data::new(config.clone());

    log::info!(
        "Starting guard at http://{} (default locale {})",
        config.bind_addr,
        config.default_locale
    );

    let served = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(limiter.clone())
            .app_data(app_config.clone())
            .configure(handlers::configure)
            .default_service(web::to(|| async {
                actix_web::HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" }))
            }))
    })
    .bind(&config.bind_addr)?
    .run()
    .await;

    ctx.shutdown().await;
    log::info!("Guard stopped");
    served.map_err(AppError::from)
}
