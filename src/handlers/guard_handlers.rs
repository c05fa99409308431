use std::collections::BTreeMap;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::api_types::{
    ActionStatsResponse, AttemptCheckRequest, AttemptRecordRequest, AttemptResetRequest,
    AttemptStatusResponse,
};
use crate::auth::identifier::client_identifier;
use crate::auth::rate_limit::{AttemptStatus, RateLimiter};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::i18n;

use super::request_locale;

fn require_action(action: &str) -> Result<(), AppError> {
    if action.trim().is_empty() {
        return Err(AppError::BadRequest("action is required".to_string()));
    }
    Ok(())
}

fn resolve_identifier(req: &HttpRequest, explicit: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| client_identifier(req))
}

fn status_for(
    status: AttemptStatus,
    identifier: String,
    action: String,
    locale: i18n::Locale,
) -> AttemptStatusResponse {
    let message = (!status.allowed).then(|| i18n::too_many_attempts(status.retry_after, locale));
    AttemptStatusResponse {
        remaining_attempts: status.remaining_attempts,
        retry_after_ms: u64::try_from(status.retry_after.as_millis()).unwrap_or(u64::MAX),
        identifier,
        action,
        allowed: status.allowed,
        message,
    }
}

fn status_response(status: AttemptStatusResponse) -> HttpResponse {
    if status.allowed {
        return HttpResponse::Ok().json(status);
    }
    let retry_secs = status.retry_after_ms.div_ceil(1000);
    HttpResponse::TooManyRequests()
        .insert_header(("Retry-After", retry_secs.to_string()))
        .json(status)
}

/// POST /guard/attempts/check - May this identifier attempt the action now?
pub async fn check(
    req: HttpRequest,
    limiter: web::Data<RateLimiter>,
    config: web::Data<AppConfig>,
    body: web::Json<AttemptCheckRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    require_action(&body.action)?;

    let identifier = resolve_identifier(&req, body.identifier.as_deref());
    let locale = request_locale(&req, &config);
    let snapshot = limiter.check(&identifier, &body.action);
    let status = status_for(snapshot, identifier, body.action, locale);

    if !status.allowed {
        log::info!(
            "Refused '{}' for '{}', retry in {}ms",
            status.action,
            status.identifier,
            status.retry_after_ms
        );
    }
    Ok(status_response(status))
}

/// POST /guard/attempts/record - Report the outcome of an attempt.
pub async fn record(
    req: HttpRequest,
    limiter: web::Data<RateLimiter>,
    config: web::Data<AppConfig>,
    body: web::Json<AttemptRecordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    require_action(&body.action)?;

    let identifier = resolve_identifier(&req, body.identifier.as_deref());
    limiter.record_attempt(&identifier, &body.action, body.success);
    log::debug!(
        "Recorded {} '{}' attempt for '{}'",
        if body.success { "successful" } else { "failed" },
        body.action,
        identifier
    );

    // Read-only: a stale window must not swallow the failure just counted.
    let snapshot = limiter.status(&identifier, &body.action);
    let locale = request_locale(&req, &config);
    Ok(status_response(status_for(snapshot, identifier, body.action, locale)))
}

/// POST /guard/attempts/reset - Administrative unblock.
pub async fn reset(
    limiter: web::Data<RateLimiter>,
    body: web::Json<AttemptResetRequest>,
) -> Result<HttpResponse, AppError> {
    require_action(&body.action)?;
    let identifier = body.identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::BadRequest("identifier is required".to_string()));
    }

    limiter.reset_attempts(identifier, &body.action);
    Ok(HttpResponse::NoContent().finish())
}

/// GET /guard/stats - Record counts per configured action.
pub async fn stats(limiter: web::Data<RateLimiter>) -> HttpResponse {
    let stats: BTreeMap<String, ActionStatsResponse> = limiter
        .stats()
        .into_iter()
        .map(|(action, s)| (action, ActionStatsResponse::from(s)))
        .collect();
    HttpResponse::Ok().json(stats)
}
