//! Arabic and English strings for validation and rate-limit messages.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::auth::validate::{self, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::Ar => write!(f, "ar"),
            Locale::En => write!(f, "en"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s.trim().split(['-', '_']).next().unwrap_or("");
        match primary.to_ascii_lowercase().as_str() {
            "ar" => Ok(Locale::Ar),
            "en" => Ok(Locale::En),
            other => Err(format!("unsupported locale '{other}'")),
        }
    }
}

impl Locale {
    /// First supported language in an `Accept-Language` header, in the order
    /// the client listed them. Quality values are ignored.
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .find_map(|tag| tag.parse().ok())
    }
}

fn field_label(field: &str, locale: Locale) -> &str {
    match (locale, field) {
        (Locale::Ar, validate::FIELD_NAME) => "الاسم",
        (Locale::Ar, validate::FIELD_EMAIL) => "البريد الإلكتروني",
        (Locale::Ar, validate::FIELD_PASSWORD) => "كلمة المرور",
        (Locale::Ar, validate::FIELD_CONFIRM_PASSWORD) => "تأكيد كلمة المرور",
        (Locale::Ar, validate::FIELD_CURRENT_PASSWORD) => "كلمة المرور الحالية",
        (Locale::Ar, validate::FIELD_NEW_PASSWORD) => "كلمة المرور الجديدة",
        (Locale::Ar, validate::FIELD_PHONE) => "رقم الهاتف",
        (Locale::Ar, validate::FIELD_ADDRESS) => "العنوان",
        (Locale::Ar, validate::FIELD_FILE) => "الملف",
        (Locale::Ar, validate::FIELD_QUERY) => "نص البحث",
        (Locale::En, validate::FIELD_NAME) => "Name",
        (Locale::En, validate::FIELD_EMAIL) => "Email",
        (Locale::En, validate::FIELD_PASSWORD) => "Password",
        (Locale::En, validate::FIELD_CONFIRM_PASSWORD) => "Password confirmation",
        (Locale::En, validate::FIELD_CURRENT_PASSWORD) => "Current password",
        (Locale::En, validate::FIELD_NEW_PASSWORD) => "New password",
        (Locale::En, validate::FIELD_PHONE) => "Phone number",
        (Locale::En, validate::FIELD_ADDRESS) => "Address",
        (Locale::En, validate::FIELD_FILE) => "File",
        (Locale::En, validate::FIELD_QUERY) => "Search query",
        (_, other) => other,
    }
}

/// User-facing text for one validation error on `field`.
pub fn error_message(field: &str, kind: ErrorKind, locale: Locale) -> String {
    let label = field_label(field, locale);
    match locale {
        Locale::Ar => match kind {
            ErrorKind::Required => format!("{label} مطلوب"),
            ErrorKind::TooShort { min } => format!("{label} يجب أن يكون {min} أحرف على الأقل"),
            ErrorKind::TooLong { max } => format!("{label} يجب ألا يتجاوز {max} حرفاً"),
            ErrorKind::FormatInvalid => format!("{label} غير صالح"),
            ErrorKind::Mismatch => "كلمات المرور غير متطابقة".to_string(),
            ErrorKind::FileTooLarge { max_bytes } => {
                format!("حجم الملف يجب ألا يتجاوز {} ميجابايت", megabytes(max_bytes))
            }
            ErrorKind::UnsupportedFileType => "نوع الملف غير مدعوم".to_string(),
            ErrorKind::MissingUppercase => format!("{label} يجب أن تحتوي على حرف كبير"),
            ErrorKind::MissingLowercase => format!("{label} يجب أن تحتوي على حرف صغير"),
            ErrorKind::MissingDigit => format!("{label} يجب أن تحتوي على رقم"),
            ErrorKind::MissingSymbol => format!("{label} يجب أن تحتوي على رمز خاص"),
        },
        Locale::En => match kind {
            ErrorKind::Required => format!("{label} is required"),
            ErrorKind::TooShort { min } => format!("{label} must be at least {min} characters"),
            ErrorKind::TooLong { max } => format!("{label} must be at most {max} characters"),
            ErrorKind::FormatInvalid => format!("{label} is not valid"),
            ErrorKind::Mismatch => "Passwords do not match".to_string(),
            ErrorKind::FileTooLarge { max_bytes } => {
                format!("File must be at most {} MB", megabytes(max_bytes))
            }
            ErrorKind::UnsupportedFileType => "File type is not supported".to_string(),
            ErrorKind::MissingUppercase => format!("{label} must contain an uppercase letter"),
            ErrorKind::MissingLowercase => format!("{label} must contain a lowercase letter"),
            ErrorKind::MissingDigit => format!("{label} must contain a digit"),
            ErrorKind::MissingSymbol => format!("{label} must contain a special character"),
        },
    }
}

fn megabytes(bytes: u64) -> u64 {
    bytes.div_ceil(1024 * 1024)
}

/// "Too many attempts" text with the wait rounded up to whole minutes.
pub fn too_many_attempts(retry_after: Duration, locale: Locale) -> String {
    let minutes = retry_after.as_secs().div_ceil(60).max(1);
    match locale {
        Locale::Ar => format!("محاولات كثيرة جداً. يرجى المحاولة مرة أخرى بعد {minutes} دقيقة"),
        Locale::En => format!("Too many attempts. Please try again in {minutes} minutes"),
    }
}
