//! Usage: Unified application error model (maps internal failures to `CODE: message` strings).

use std::sync::Arc;

pub type AppResult<T> = Result<T, AppError>;

pub const CODE_DB_ERROR: &str = "DB_ERROR";
pub const CODE_DB_NOT_FOUND: &str = "DB_NOT_FOUND";
pub const CODE_DB_CONSTRAINT: &str = "DB_CONSTRAINT";
pub const CODE_DB_MIGRATION: &str = "DB_MIGRATION";
pub const CODE_SESSION_STORE: &str = "SESSION_STORE";
pub const CODE_INVALID_INPUT: &str = "SEC_INVALID_INPUT";
pub const CODE_USAGE_PERIOD_CONFLICT: &str = "USAGE_PERIOD_CONFLICT";
pub const CODE_BILL_ALREADY_PAID: &str = "BILL_ALREADY_PAID";
pub const CODE_AUTH_INVALID_CREDENTIALS: &str = "AUTH_INVALID_CREDENTIALS";
pub const CODE_TASK_JOIN: &str = "TASK_JOIN";
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

/// Coarse classification of error codes, used by callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Authentication,
    Persistence,
    Internal,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    code: String,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            CODE_DB_NOT_FOUND => ErrorKind::NotFound,
            CODE_USAGE_PERIOD_CONFLICT | CODE_BILL_ALREADY_PAID | CODE_DB_CONSTRAINT => {
                ErrorKind::Conflict
            }
            CODE_INVALID_INPUT => ErrorKind::Validation,
            CODE_AUTH_INVALID_CREDENTIALS => ErrorKind::Authentication,
            CODE_DB_ERROR | CODE_DB_MIGRATION | CODE_SESSION_STORE => ErrorKind::Persistence,
            _ => ErrorKind::Internal,
        }
    }
}

macro_rules! db_err {
    ($($arg:tt)*) => {
        $crate::shared::error::AppError::new(
            $crate::shared::error::CODE_DB_ERROR,
            format!($($arg)*),
        )
    };
}
pub(crate) use db_err;

pub(crate) fn invalid_input(message: impl Into<String>) -> AppError {
    AppError::new(CODE_INVALID_INPUT, message)
}

pub(crate) fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(CODE_DB_NOT_FOUND, message)
}

fn split_code_message(raw: &str) -> Option<(&str, &str)> {
    let msg = raw.trim();
    let msg = msg.strip_prefix("Error:").unwrap_or(msg).trim();
    if msg.is_empty() {
        return None;
    }

    let (maybe_code, rest) = msg.split_once(':')?;
    let code = maybe_code.trim();
    if code.is_empty() {
        return None;
    }
    let mut chars = code.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_') {
        return None;
    }
    Some((code, rest.trim()))
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        if let Some((code, rest)) = split_code_message(&value) {
            let message = if rest.is_empty() { value.trim() } else { rest };
            return AppError::new(code.to_string(), message.to_string());
        }
        AppError::new(CODE_INTERNAL, value)
    }
}

impl From<&'static str> for AppError {
    fn from(value: &'static str) -> Self {
        AppError::from(value.to_string())
    }
}

impl From<AppError> for String {
    fn from(value: AppError) -> Self {
        value.to_string()
    }
}
