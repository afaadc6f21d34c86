//! # Errors
//!
//! Structured errors shared by every clinic crate.
//! Core goals:
//! - one error kind per failure class the UI distinguishes
//! - can be carried through anyhow::Error
//! - transport-agnostic (the HTTP client maps status codes into kinds)
//!
//! The failure classes the front-end cares about:
//! - tenant lookup failed → `TenantNotFound`, terminal for the page load
//! - bad credentials → `NotAuthenticated`, shown as a transient alert
//! - unparseable persisted state → `CorruptState`, clears the session

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// A convenience result type for clinic APIs.
pub type ClinicResult<T> = std::result::Result<T, AnyError>;

/// Error class names + status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    TenantNotFound,   // 404
    Unprocessable,    // 422
    CorruptState,     // 422
    GeneralError,     // 500
    BadGateway,       // 502
    Unavailable,      // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound | ErrorKind::TenantNotFound => 404,
            ErrorKind::Unprocessable | ErrorKind::CorruptState => 422,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::TenantNotFound => "TenantNotFound",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::CorruptState => "CorruptState",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Kebab-cased `className`
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::TenantNotFound => "tenant-not-found",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::CorruptState => "corrupt-state",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::BadGateway => "bad-gateway",
            ErrorKind::Unavailable => "unavailable",
        }
    }

    /// Map an HTTP status returned by the backend onto a kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::NotAuthenticated,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            422 => ErrorKind::Unprocessable,
            503 => ErrorKind::Unavailable,
            500..=599 => ErrorKind::BadGateway,
            _ => ErrorKind::GeneralError,
        }
    }
}

/// A structured clinic error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct ClinicError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<AnyError>,
}

impl ClinicError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `ClinicError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&ClinicError> {
        err.downcast_ref::<ClinicError>()
    }

    /// Kind of an arbitrary error; anything foreign counts as `GeneralError`.
    pub fn kind_of(err: &AnyError) -> ErrorKind {
        Self::from_anyhow(err)
            .map(|e| e.kind)
            .unwrap_or(ErrorKind::GeneralError)
    }

    /// Turn any error into a ClinicError:
    /// - if it's already a ClinicError, keep it (lossless)
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> ClinicError {
        match err.downcast::<ClinicError>() {
            Ok(e) => e,
            Err(other) => {
                ClinicError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// JSON payload suitable for an alert component. The `source` is dropped.
    pub fn to_json(&self) -> Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn tenant_not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TenantNotFound, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn corrupt_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptState, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for ClinicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for ClinicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with ClinicError".
#[macro_export]
macro_rules! bail_clinic {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::ClinicError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::ClinicError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
