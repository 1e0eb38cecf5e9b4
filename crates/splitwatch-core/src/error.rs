//! Shared error type across splitwatch crates.

use thiserror::Error;

/// Stable diagnostic categories (used as log fields and in tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Invalid metric name.
    Validation,
    /// Metric lookup failed.
    Lookup,
    /// Middleware / header emission failure.
    Adapter,
    /// Configuration rejected.
    Config,
}

impl DiagnosticKind {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::Validation => "VALIDATION",
            DiagnosticKind::Lookup => "LOOKUP",
            DiagnosticKind::Adapter => "ADAPTER",
            DiagnosticKind::Config => "CONFIG",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TimingError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),
    #[error("no metric tracked under name: {0}")]
    UnknownMetric(String),
    #[error("adapter: {0}")]
    Adapter(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
}

impl TimingError {
    /// Map the error to its diagnostic category.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            TimingError::InvalidName(_) => DiagnosticKind::Validation,
            TimingError::UnknownMetric(_) => DiagnosticKind::Lookup,
            TimingError::Adapter(_) => DiagnosticKind::Adapter,
            TimingError::Config(_) | TimingError::UnsupportedVersion => DiagnosticKind::Config,
        }
    }
}
