use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auth::rate_limit::ActionStats;
use crate::auth::validate::{ErrorKind, FileMeta, FileUploadOptions, ValidationResult};
use crate::i18n::{self, Locale};

/// Error body for malformed requests and server failures.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body of `/guard/attempts/check`. Without an explicit identifier the
/// request's forwarded client address is used.
#[derive(Deserialize, Debug)]
pub struct AttemptCheckRequest {
    pub action: String,
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AttemptRecordRequest {
    pub action: String,
    #[serde(default)]
    pub identifier: Option<String>,
    pub success: bool,
}

/// Resets are administrative, so the identifier must be explicit.
#[derive(Deserialize, Debug)]
pub struct AttemptResetRequest {
    pub action: String,
    pub identifier: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttemptStatusResponse {
    pub identifier: String,
    pub action: String,
    pub allowed: bool,
    /// `None` when the action is unmetered.
    pub remaining_attempts: Option<u32>,
    pub retry_after_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionStatsResponse {
    pub max_attempts: u32,
    pub window_ms: i64,
    pub block_duration_ms: i64,
    pub total_records: usize,
    pub blocked_records: usize,
}

impl From<ActionStats> for ActionStatsResponse {
    fn from(s: ActionStats) -> Self {
        ActionStatsResponse {
            max_attempts: s.config.max_attempts,
            window_ms: s.config.window.num_milliseconds(),
            block_duration_ms: s.config.block_duration.num_milliseconds(),
            total_records: s.total_records,
            blocked_records: s.blocked_records,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PhoneRequest {
    pub phone: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AddressRequest {
    pub address: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SearchRequest {
    pub query: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileRequest {
    pub file: Option<FileMeta>,
    pub options: Option<FileUploadOptions>,
}

#[derive(Serialize, Debug, Clone)]
pub struct LocalizedError {
    #[serde(flatten)]
    pub kind: ErrorKind,
    pub message: String,
}

/// A [`ValidationResult`] with every error kind paired with its message.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub is_valid: bool,
    pub locale: Locale,
    pub errors: BTreeMap<String, Vec<LocalizedError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_data: Option<BTreeMap<String, String>>,
}

impl ValidationResponse {
    pub fn localize(result: ValidationResult, locale: Locale) -> Self {
        let errors = result
            .errors
            .into_iter()
            .map(|(field, kinds)| {
                let localized = kinds
                    .into_iter()
                    .map(|kind| LocalizedError {
                        kind,
                        message: i18n::error_message(&field, kind, locale),
                    })
                    .collect();
                (field, localized)
            })
            .collect();

        ValidationResponse {
            is_valid: result.is_valid,
            locale,
            errors,
            sanitized_data: result.sanitized_data,
        }
    }
}
