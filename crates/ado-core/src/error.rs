//! Error taxonomy shared by the adapter, the resolution engine and the
//! dependency model.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VcsError>;

/// Errors raised by repository, release and resolution operations.
#[derive(Error, Debug)]
pub enum VcsError {
    /// A ref, tag, branch, commit, package or pull request is absent, or an
    /// expected-singleton lookup matched more than one candidate.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The host rejected the request (auth, rate limit, transient fault).
    #[error("{operation} failed for {target}: {message}")]
    Client {
        operation: String,
        target: String,
        message: String,
    },

    /// Malformed input detected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Every strategy was exhausted, or the dependency graph is inconsistent.
    #[error("Dependency resolution error: {0}")]
    Resolution(String),

    /// A bounded poll expired without reaching a terminal state.
    #[error("Timed out waiting for {operation} on {target}")]
    Timeout { operation: String, target: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl VcsError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    /// True for absence-type errors that callers may treat as "nothing there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
