use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::api_types::ApiErrorResponse;

#[derive(Debug)]
pub enum AppError {
    Config(String),
    BadRequest(String),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {e}"),
            AppError::BadRequest(e) => write!(f, "Bad request: {e}"),
            AppError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::BadRequest(e) => HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Bad request".to_string(),
                details: Some(e.clone()),
            }),
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError().json(ApiErrorResponse {
                    error: "Internal server error".to_string(),
                    details: None,
                })
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}
