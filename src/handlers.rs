pub mod guard_handlers;
pub mod validate_handlers;

use actix_web::{HttpRequest, web};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::i18n::Locale;

/// Locale from `Accept-Language`, else the configured default.
pub fn request_locale(req: &HttpRequest, config: &AppConfig) -> Locale {
    req.headers()
        .get("accept-language")
        .and_then(|v| v.to_str().ok())
        .and_then(Locale::from_accept_language)
        .unwrap_or(config.default_locale)
}

/// Malformed JSON bodies become `AppError::BadRequest` instead of actix's
/// plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Configure the `/guard` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/guard")
            .app_data(json_config())
            .route("/attempts/check", web::post().to(guard_handlers::check))
            .route("/attempts/record", web::post().to(guard_handlers::record))
            .route("/attempts/reset", web::post().to(guard_handlers::reset))
            .route("/stats", web::get().to(guard_handlers::stats))
            .route("/validate/login", web::post().to(validate_handlers::login))
            .route("/validate/register", web::post().to(validate_handlers::register))
            .route("/validate/forgot-password", web::post().to(validate_handlers::forgot_password))
            .route("/validate/password-change", web::post().to(validate_handlers::password_change))
            .route("/validate/phone", web::post().to(validate_handlers::phone))
            .route("/validate/address", web::post().to(validate_handlers::address))
            .route("/validate/file", web::post().to(validate_handlers::file))
            .route("/validate/search", web::post().to(validate_handlers::search)),
    );
}
