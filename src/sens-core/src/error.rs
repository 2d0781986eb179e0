//! Error taxonomy shared by every client operation.
//!
//! Each failure surfaces as exactly one of eight kinds. The kind drives
//! control flow; the server's machine code and message ride along unchanged.

use std::fmt;
use std::time::Duration;

/// Code the service uses for request validation failures.
/// Local checks (missing key, missing file) reuse it.
pub const VALIDATION_CODE: &str = "SENS_003";

/// ErrorKind names the eight error categories without their payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    NotFound,
    Conflict,
    PayloadTooLarge,
    RateLimit,
    ServiceUnavailable,
    Generic,
}

impl ErrorKind {
    /// Kind for an HTTP status, with `Generic` as the fallback
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::Validation,
            401 | 403 => ErrorKind::Authentication,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            413 => ErrorKind::PayloadTooLarge,
            429 => ErrorKind::RateLimit,
            503 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Generic,
        }
    }
}

/// ErrorDetail is the payload every error kind carries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetail {
    pub message: String,
    /// Machine-readable code, only when the server (or a local check) set one
    pub code: Option<String>,
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
    pub request_id: Option<String>,
    /// HTTP status; `None` for failures raised before or without a response
    pub status: Option<u16>,
    /// Short error label from the body's `error` field
    pub error: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// RateLimitInfo mirrors the `X-RateLimit-*` response headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Unix timestamp (seconds) at which the window resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensError {
    #[error("{0}")]
    Validation(ErrorDetail),

    #[error("{0}")]
    Authentication(ErrorDetail),

    #[error("{0}")]
    NotFound(ErrorDetail),

    #[error("{0}")]
    Conflict(ErrorDetail),

    #[error("{0}")]
    PayloadTooLarge(ErrorDetail),

    #[error("{detail}")]
    RateLimit {
        detail: ErrorDetail,
        retry_after: Option<Duration>,
        limits: Option<RateLimitInfo>,
    },

    #[error("{detail}")]
    ServiceUnavailable {
        detail: ErrorDetail,
        retry_after: Option<Duration>,
    },

    #[error("{detail}")]
    Generic {
        detail: ErrorDetail,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type Result<T> = std::result::Result<T, SensError>;

impl SensError {
    /// Validation error raised locally, before any request is sent
    pub fn local_validation(message: impl Into<String>) -> Self {
        SensError::Validation(ErrorDetail::new(message).with_code(VALIDATION_CODE))
    }

    /// Generic error wrapping a lower-level failure (transport, I/O, decoding)
    pub fn generic<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SensError::Generic {
            detail: ErrorDetail::new(message),
            source: Some(Box::new(source)),
        }
    }

    /// Build the error for a kind from its parts.
    ///
    /// `retry_after` and `limits` are dropped for kinds that do not carry them.
    pub fn from_parts(
        kind: ErrorKind,
        detail: ErrorDetail,
        retry_after: Option<Duration>,
        limits: Option<RateLimitInfo>,
    ) -> Self {
        match kind {
            ErrorKind::Validation => SensError::Validation(detail),
            ErrorKind::Authentication => SensError::Authentication(detail),
            ErrorKind::NotFound => SensError::NotFound(detail),
            ErrorKind::Conflict => SensError::Conflict(detail),
            ErrorKind::PayloadTooLarge => SensError::PayloadTooLarge(detail),
            ErrorKind::RateLimit => SensError::RateLimit {
                detail,
                retry_after,
                limits,
            },
            ErrorKind::ServiceUnavailable => SensError::ServiceUnavailable {
                detail,
                retry_after,
            },
            ErrorKind::Generic => SensError::Generic {
                detail,
                source: None,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SensError::Validation(_) => ErrorKind::Validation,
            SensError::Authentication(_) => ErrorKind::Authentication,
            SensError::NotFound(_) => ErrorKind::NotFound,
            SensError::Conflict(_) => ErrorKind::Conflict,
            SensError::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
            SensError::RateLimit { .. } => ErrorKind::RateLimit,
            SensError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            SensError::Generic { .. } => ErrorKind::Generic,
        }
    }

    pub fn detail(&self) -> &ErrorDetail {
        match self {
            SensError::Validation(d)
            | SensError::Authentication(d)
            | SensError::NotFound(d)
            | SensError::Conflict(d)
            | SensError::PayloadTooLarge(d) => d,
            SensError::RateLimit { detail, .. }
            | SensError::ServiceUnavailable { detail, .. }
            | SensError::Generic { detail, .. } => detail,
        }
    }

    pub fn message(&self) -> &str {
        &self.detail().message
    }

    pub fn code(&self) -> Option<&str> {
        self.detail().code.as_deref()
    }

    pub fn details(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.detail().details.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.detail().status
    }

    pub fn request_id(&self) -> Option<&str> {
        self.detail().request_id.as_deref()
    }

    /// Server's backoff hint; only rate-limit and unavailable errors carry one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SensError::RateLimit { retry_after, .. }
            | SensError::ServiceUnavailable { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            SensError::RateLimit { limits, .. } => limits.as_ref(),
            _ => None,
        }
    }

    /// Whether the caller may reasonably try again later.
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimit | ErrorKind::ServiceUnavailable
        )
    }
}
