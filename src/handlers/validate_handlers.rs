use actix_web::{HttpRequest, HttpResponse, web};

use crate::api_types::{AddressRequest, FileRequest, PhoneRequest, SearchRequest, ValidationResponse};
use crate::auth::validate::{
    self, FileUploadOptions, ForgotPasswordData, LoginData, PasswordChangeData, RegisterData,
    ValidationResult,
};
use crate::config::AppConfig;

use super::request_locale;

/// 200 with sanitized data when valid, 422 with localized errors otherwise.
fn respond(req: &HttpRequest, config: &AppConfig, result: ValidationResult) -> HttpResponse {
    let body = ValidationResponse::localize(result, request_locale(req, config));
    if body.is_valid {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::UnprocessableEntity().json(body)
    }
}

pub async fn login(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<LoginData>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_login_data(&body))
}

pub async fn register(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<RegisterData>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_register_data(&body))
}

pub async fn forgot_password(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<ForgotPasswordData>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_forgot_password_data(&body))
}

pub async fn password_change(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<PasswordChangeData>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_password_change(&body))
}

pub async fn phone(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<PhoneRequest>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_phone_number(body.phone.as_deref()))
}

pub async fn address(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<AddressRequest>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_address(body.address.as_deref()))
}

/// Options omitted from the body fall back to 5 MB of jpeg/png/webp.
pub async fn file(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<FileRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let options = body.options.unwrap_or_else(FileUploadOptions::default);
    respond(&req, &config, validate::validate_file_upload(body.file.as_ref(), &options))
}

pub async fn search(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    body: web::Json<SearchRequest>,
) -> HttpResponse {
    respond(&req, &config, validate::validate_search_query(body.query.as_deref()))
}
