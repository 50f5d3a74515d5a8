//! Error taxonomy for the key management core.
//!
//! Mirrors the teacher's split between a typed error *kind* and a thin
//! wrapper that carries operational context (component, scope) around it,
//! so callers can match on `kind()` while the `Display` impl stays useful
//! for logs. Never put key material in here.

use thiserror::Error;

/// The eight terminal error kinds the core can surface. None are retried
/// internally — retry policy is the caller's concern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("no policy registered for application")]
    InvalidApplication,

    #[error("more than one alias covers the requested instant, or a resolved alias has no backing material")]
    NoUniqueAlias,

    #[error("no current key exists for this scope and minting is not permitted here")]
    NoCurrentKey,

    #[error("policy produced a non-positive validity window")]
    PolicyConflict,

    #[error("certificate is outside its validity window or its chain is empty")]
    CertInvalid,

    #[error("asymmetric crypto primitive failed")]
    CryptoFailure,

    #[error("persistent store I/O failed")]
    StoreFailure,

    #[error("operation deadline exceeded")]
    Timeout,
}

impl ErrorKind {
    /// Severity used only to pick the `tracing` level of the single
    /// boundary log line for an operation — never logic.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ErrorKind::NoUniqueAlias => ErrorSeverity::Critical,
            ErrorKind::CryptoFailure => ErrorSeverity::Critical,
            ErrorKind::StoreFailure => ErrorSeverity::High,
            ErrorKind::CertInvalid => ErrorSeverity::High,
            ErrorKind::PolicyConflict => ErrorSeverity::High,
            ErrorKind::InvalidApplication => ErrorSeverity::Medium,
            ErrorKind::NoCurrentKey => ErrorSeverity::Medium,
            ErrorKind::Timeout => ErrorSeverity::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Top-level error type returned by every public operation in this crate.
#[derive(Debug, Error)]
#[error("[{severity}] {kind} (component: {component}, scope: {scope}): {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub component: String,
    pub scope: String,
}

impl CoreError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        component: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        let severity = kind.severity();
        Self {
            kind,
            severity,
            message: message.into(),
            component: component.into(),
            scope: scope.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind.clone()
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
