//! Error types for report-drop.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Top-level error type for a webhook request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Subject parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Attachment fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Folder error: {0}")]
    Folder(#[from] FolderError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl Error {
    /// Short machine-readable kind, used in error response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Webhook(_) => "webhook",
            Error::Parse(_) => "parse",
            Error::Fetch(_) => "fetch",
            Error::Folder(_) => "folder",
            Error::Upload(_) => "upload",
        }
    }

    /// HTTP status reported to the email provider.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Webhook(WebhookError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            Error::Webhook(_) => StatusCode::UNAUTHORIZED,
            Error::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Fetch(_) | Error::Folder(_) | Error::Upload(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!(kind = self.kind(), error = %self, "Webhook request failed");
        (
            self.status(),
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inbound webhook payload and signature errors.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Webhook signature fields are missing")]
    MissingSignature,

    #[error("Webhook signature does not match")]
    InvalidSignature,

    #[error("Webhook timestamp {timestamp} is outside the allowed window")]
    StaleTimestamp { timestamp: String },
}

/// Subject-line normalization errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Subject line is empty")]
    EmptySubject,

    #[error("Subject \"{subject}\" has no \" - \" separator between folder and report name")]
    MissingSeparator { subject: String },

    #[error("Subject \"{subject}\" has no usable folder segments")]
    EmptyStructure { subject: String },

    #[error("Subject \"{subject}\" has no usable report name")]
    EmptyReportName { subject: String },
}

/// Attachment download errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid attachment reference {url}: {reason}")]
    InvalidReference { url: String, reason: String },

    #[error("Attachment request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Attachment {url} unavailable (HTTP {status})")]
    Unavailable { url: String, status: u16 },
}

/// Storage credential errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Drive client setup failed: {0}")]
    Setup(String),

    #[error("No access token available: {0}")]
    TokenUnavailable(String),
}

/// Folder lookup/creation errors.
#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error("Folder lookup for \"{name}\" failed: {reason}")]
    LookupFailed { name: String, reason: String },

    #[error("Folder creation for \"{name}\" failed: {reason}")]
    CreateFailed { name: String, reason: String },

    #[error("Storage authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// File creation errors.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload of \"{name}\" rejected (HTTP {status}): {reason}")]
    Rejected {
        name: String,
        status: u16,
        reason: String,
    },

    #[error("Upload of \"{name}\" failed: {reason}")]
    RequestFailed { name: String, reason: String },

    #[error("Storage authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// Result type alias for report-drop.
pub type Result<T> = std::result::Result<T, Error>;
