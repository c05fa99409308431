//! Validation and sanitization of untrusted form input.
//!
//! Every `validate_*` function collects all field errors instead of stopping
//! at the first one, and only returns sanitized data when the input is valid.
//! Errors are language-neutral [`ErrorKind`]s; see [`crate::i18n`] for the
//! user-facing strings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const FIELD_NAME: &str = "name";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_CONFIRM_PASSWORD: &str = "confirmPassword";
pub const FIELD_CURRENT_PASSWORD: &str = "currentPassword";
pub const FIELD_NEW_PASSWORD: &str = "newPassword";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_ADDRESS: &str = "address";
pub const FIELD_FILE: &str = "file";
pub const FIELD_QUERY: &str = "query";

pub const DEFAULT_SANITIZE_MAX_LENGTH: usize = 1000;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const DEFAULT_ALLOWED_FILE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

const LOGIN_PASSWORD_MIN: usize = 6;
const REGISTER_NAME_MIN: usize = 2;
const REGISTER_NAME_MAX: usize = 50;
const REGISTER_PASSWORD_MIN: usize = 6;
const REGISTER_PASSWORD_MAX: usize = 128;
const STRONG_PASSWORD_MIN: usize = 8;
const PHONE_MIN_DIGITS: usize = 10;
const ADDRESS_MAX: usize = 200;
const ADDRESS_MIN: usize = 10;
const SEARCH_MAX: usize = 100;
const SEARCH_MIN: usize = 2;
const FILE_NAME_MAX: usize = 255;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    Required,
    TooShort { min: usize },
    TooLong { max: usize },
    FormatInvalid,
    Mismatch,
    FileTooLarge { max_bytes: u64 },
    UnsupportedFileType,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSymbol,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, Vec<ErrorKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_data: Option<BTreeMap<String, String>>,
}

impl ValidationResult {
    pub fn field_errors(&self, field: &str) -> &[ErrorKind] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_error(&self, field: &str, kind: ErrorKind) -> bool {
        self.field_errors(field).contains(&kind)
    }

    pub fn sanitized(&self, field: &str) -> Option<&str> {
        self.sanitized_data.as_ref()?.get(field).map(String::as_str)
    }
}

/// Accumulates errors per field, then attaches sanitized values only if
/// nothing was rejected.
#[derive(Default)]
struct Collector {
    errors: BTreeMap<String, Vec<ErrorKind>>,
    sanitized: BTreeMap<String, String>,
}

impl Collector {
    fn reject(&mut self, field: &str, kind: ErrorKind) {
        self.errors.entry(field.to_string()).or_default().push(kind);
    }

    fn keep(&mut self, field: &str, value: impl Into<String>) {
        self.sanitized.insert(field.to_string(), value.into());
    }

    fn finish(self) -> ValidationResult {
        let is_valid = self.errors.is_empty();
        ValidationResult {
            is_valid,
            errors: self.errors,
            sanitized_data: is_valid.then_some(self.sanitized),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginData {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgotPasswordData {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordChangeData {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Metadata of an uploaded file; the bytes never reach the validator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileMeta {
    pub name: Option<String>,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileUploadOptions {
    pub max_size: u64,
    pub allowed_types: Vec<String>,
}

impl Default for FileUploadOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_FILE_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Trim, drop `<` and `>`, and cut to `max_length` characters.
pub fn sanitize_text(text: &str, max_length: usize) -> String {
    text.trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(max_length)
        .collect()
}

/// Checks a required email field; returns the trimmed, lower-cased address.
fn check_email(c: &mut Collector, email: &Option<String>) -> Option<String> {
    let Some(email) = present(email) else {
        c.reject(FIELD_EMAIL, ErrorKind::Required);
        return None;
    };
    let trimmed = email.trim();
    if !EMAIL_PATTERN.is_match(trimmed) {
        c.reject(FIELD_EMAIL, ErrorKind::FormatInvalid);
        return None;
    }
    Some(trimmed.to_lowercase())
}

pub fn validate_login_data(data: &LoginData) -> ValidationResult {
    let mut c = Collector::default();

    if let Some(email) = check_email(&mut c, &data.email) {
        c.keep(FIELD_EMAIL, email);
    }

    match present(&data.password) {
        None => c.reject(FIELD_PASSWORD, ErrorKind::Required),
        Some(p) if char_len(p) < LOGIN_PASSWORD_MIN => {
            c.reject(FIELD_PASSWORD, ErrorKind::TooShort { min: LOGIN_PASSWORD_MIN })
        }
        Some(p) => c.keep(FIELD_PASSWORD, p),
    }

    c.finish()
}

pub fn validate_register_data(data: &RegisterData) -> ValidationResult {
    let mut c = Collector::default();

    match present(&data.name) {
        None => c.reject(FIELD_NAME, ErrorKind::Required),
        Some(name) => {
            let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
            let len = char_len(&collapsed);
            if len < REGISTER_NAME_MIN {
                c.reject(FIELD_NAME, ErrorKind::TooShort { min: REGISTER_NAME_MIN });
            } else if len > REGISTER_NAME_MAX {
                c.reject(FIELD_NAME, ErrorKind::TooLong { max: REGISTER_NAME_MAX });
            } else {
                c.keep(FIELD_NAME, collapsed);
            }
        }
    }

    if let Some(email) = check_email(&mut c, &data.email) {
        c.keep(FIELD_EMAIL, email);
    }

    match present(&data.password) {
        None => c.reject(FIELD_PASSWORD, ErrorKind::Required),
        Some(p) if char_len(p) < REGISTER_PASSWORD_MIN => {
            c.reject(FIELD_PASSWORD, ErrorKind::TooShort { min: REGISTER_PASSWORD_MIN })
        }
        Some(p) if char_len(p) > REGISTER_PASSWORD_MAX => {
            c.reject(FIELD_PASSWORD, ErrorKind::TooLong { max: REGISTER_PASSWORD_MAX })
        }
        Some(p) => c.keep(FIELD_PASSWORD, p),
    }

    // Only checked when the form sends a confirmation field at all.
    if let Some(confirm) = &data.confirm_password {
        if confirm.is_empty() {
            c.reject(FIELD_CONFIRM_PASSWORD, ErrorKind::Required);
        } else if data.password.as_deref() != Some(confirm.as_str()) {
            c.reject(FIELD_CONFIRM_PASSWORD, ErrorKind::Mismatch);
        }
    }

    c.finish()
}

pub fn validate_forgot_password_data(data: &ForgotPasswordData) -> ValidationResult {
    let mut c = Collector::default();
    if let Some(email) = check_email(&mut c, &data.email) {
        c.keep(FIELD_EMAIL, email);
    }
    c.finish()
}

/// The account-settings password change, which asks for a stronger password
/// than registration does.
pub fn validate_password_change(data: &PasswordChangeData) -> ValidationResult {
    let mut c = Collector::default();

    match present(&data.current_password) {
        None => c.reject(FIELD_CURRENT_PASSWORD, ErrorKind::Required),
        Some(p) => c.keep(FIELD_CURRENT_PASSWORD, p),
    }

    match present(&data.new_password) {
        None => c.reject(FIELD_NEW_PASSWORD, ErrorKind::Required),
        Some(p) => {
            if char_len(p) < STRONG_PASSWORD_MIN {
                c.reject(FIELD_NEW_PASSWORD, ErrorKind::TooShort { min: STRONG_PASSWORD_MIN });
            }
            if !p.chars().any(char::is_uppercase) {
                c.reject(FIELD_NEW_PASSWORD, ErrorKind::MissingUppercase);
            }
            if !p.chars().any(char::is_lowercase) {
                c.reject(FIELD_NEW_PASSWORD, ErrorKind::MissingLowercase);
            }
            if !p.chars().any(|ch| ch.is_ascii_digit()) {
                c.reject(FIELD_NEW_PASSWORD, ErrorKind::MissingDigit);
            }
            if !p.chars().any(|ch| !ch.is_alphanumeric() && !ch.is_whitespace()) {
                c.reject(FIELD_NEW_PASSWORD, ErrorKind::MissingSymbol);
            }
            if !c.errors.contains_key(FIELD_NEW_PASSWORD) {
                c.keep(FIELD_NEW_PASSWORD, p);
            }
        }
    }

    match present(&data.confirm_password) {
        None => c.reject(FIELD_CONFIRM_PASSWORD, ErrorKind::Required),
        Some(confirm) if data.new_password.as_deref() != Some(confirm) => {
            c.reject(FIELD_CONFIRM_PASSWORD, ErrorKind::Mismatch)
        }
        Some(_) => {}
    }

    c.finish()
}

pub fn validate_phone_number(phone: Option<&str>) -> ValidationResult {
    let mut c = Collector::default();
    match phone.filter(|p| !p.is_empty()) {
        None => c.reject(FIELD_PHONE, ErrorKind::Required),
        Some(phone) => {
            let digits: String = phone.chars().filter(|ch| ch.is_ascii_digit()).collect();
            if digits.len() < PHONE_MIN_DIGITS {
                c.reject(FIELD_PHONE, ErrorKind::TooShort { min: PHONE_MIN_DIGITS });
            } else {
                c.keep(FIELD_PHONE, digits);
            }
        }
    }
    c.finish()
}

pub fn validate_address(address: Option<&str>) -> ValidationResult {
    let mut c = Collector::default();
    match address.filter(|a| !a.is_empty()) {
        None => c.reject(FIELD_ADDRESS, ErrorKind::Required),
        Some(address) => {
            let cleaned = sanitize_text(address, ADDRESS_MAX);
            if char_len(&cleaned) < ADDRESS_MIN {
                c.reject(FIELD_ADDRESS, ErrorKind::TooShort { min: ADDRESS_MIN });
            } else {
                c.keep(FIELD_ADDRESS, cleaned);
            }
        }
    }
    c.finish()
}

/// Size and type are checked independently; both errors are reported when
/// both fail.
pub fn validate_file_upload(file: Option<&FileMeta>, options: &FileUploadOptions) -> ValidationResult {
    let mut c = Collector::default();
    let Some(file) = file else {
        c.reject(FIELD_FILE, ErrorKind::Required);
        return c.finish();
    };

    if file.size > options.max_size {
        c.reject(FIELD_FILE, ErrorKind::FileTooLarge { max_bytes: options.max_size });
    }
    if !options.allowed_types.iter().any(|t| *t == file.mime_type) {
        c.reject(FIELD_FILE, ErrorKind::UnsupportedFileType);
    }

    c.keep("type", file.mime_type.as_str());
    c.keep("size", file.size.to_string());
    if let Some(name) = &file.name {
        c.keep(FIELD_NAME, sanitize_text(name, FILE_NAME_MAX));
    }
    c.finish()
}

pub fn validate_search_query(query: Option<&str>) -> ValidationResult {
    let mut c = Collector::default();
    match query.filter(|q| !q.is_empty()) {
        None => c.reject(FIELD_QUERY, ErrorKind::Required),
        Some(query) => {
            let cleaned = sanitize_text(query, SEARCH_MAX);
            if char_len(&cleaned) < SEARCH_MIN {
                c.reject(FIELD_QUERY, ErrorKind::TooShort { min: SEARCH_MIN });
            } else {
                c.keep(FIELD_QUERY, cleaned);
            }
        }
    }
    c.finish()
}
