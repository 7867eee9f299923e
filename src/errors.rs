use thiserror::Error;

/// Largest file the service accepts for upload.
pub const MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// Top-level client error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Transport errors ─────────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("Server returned {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    // ── Chat stream errors ───────────────────────────────────────────────────
    #[error("Chat stream failed: {message}")]
    Stream { message: String },

    #[error("A message is already being sent")]
    SendInProgress,

    // ── Local storage errors ─────────────────────────────────────────────────
    #[error("Key store I/O failed at {path}: {source}")]
    KeyStoreIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("File '{file_name}' is {size} bytes, larger than the {max} byte limit")]
    FileTooLarge { file_name: String, size: u64, max: u64 },

    #[error("File '{file_name}' has an unsupported type")]
    UnsupportedFileType { file_name: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Broad failure classes used when presenting an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Timeout,
    Upload,
    AiAnalysis,
    Validation,
    Unknown,
}

/// Short, display-ready description of an [`AppError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    pub message: String,
    pub details: String,
    pub retryable: bool,
}

impl ErrorInfo {
    fn new(category: ErrorCategory, message: &str, details: impl Into<String>, retryable: bool) -> Self {
        Self {
            category,
            message: message.to_string(),
            details: details.into(),
            retryable,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err)
        } else if err.is_decode() {
            AppError::Decode(err)
        } else if err.is_builder() {
            AppError::ClientBuild(err)
        } else {
            AppError::Network(err)
        }
    }
}

impl AppError {
    pub fn stream(message: impl Into<String>) -> Self {
        AppError::Stream { message: message.into() }
    }

    /// Classifies the error into a message suitable for a status line.
    pub fn info(&self) -> ErrorInfo {
        use ErrorCategory::*;

        match self {
            AppError::Network(_) => ErrorInfo::new(
                Network,
                "Network connection failed",
                "Check that the server is reachable",
                true,
            ),
            AppError::Timeout(_) => ErrorInfo::new(
                Timeout,
                "Request timed out",
                "The server took too long to respond, try again later",
                true,
            ),
            AppError::Http { status, detail } => match status {
                400 => ErrorInfo::new(
                    Validation,
                    "Invalid request",
                    non_empty_or(detail, "Check the submitted content"),
                    false,
                ),
                413 => ErrorInfo::new(Upload, "File too large", "Files are limited to 200MB", false),
                415 => ErrorInfo::new(
                    Upload,
                    "Unsupported file type",
                    "Upload a PDF, Word, PowerPoint, text or image file",
                    false,
                ),
                500 => ErrorInfo::new(
                    AiAnalysis,
                    "AI analysis failed",
                    non_empty_or(detail, "The server failed to process the request, try again later"),
                    true,
                ),
                502..=504 => ErrorInfo::new(
                    Network,
                    "Service temporarily unavailable",
                    "The server is busy or under maintenance, try again later",
                    true,
                ),
                other => ErrorInfo::new(
                    Unknown,
                    "Operation failed",
                    non_empty_or(detail, &format!("Error code: {other}")),
                    true,
                ),
            },
            AppError::Stream { message } => ErrorInfo::new(AiAnalysis, message, message.clone(), true),
            AppError::FileTooLarge { .. } => {
                ErrorInfo::new(Upload, "File too large", self.to_string(), false)
            }
            AppError::UnsupportedFileType { .. } => {
                ErrorInfo::new(Upload, "Unsupported file type", self.to_string(), false)
            }
            AppError::EmptyField { .. } | AppError::SendInProgress => {
                ErrorInfo::new(Validation, &self.to_string(), self.to_string(), false)
            }
            _ => ErrorInfo::new(Unknown, "Unknown error", self.to_string(), true),
        }
    }
}

fn non_empty_or(detail: &str, fallback: &str) -> String {
    if detail.trim().is_empty() {
        fallback.to_string()
    } else {
        detail.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, detail: &str) -> AppError {
        AppError::Http { status, detail: detail.to_string() }
    }

    #[test]
    fn bad_request_uses_server_detail_and_is_not_retryable() {
        let info = http(400, "name must not be empty").info();
        assert_eq!(info.category, ErrorCategory::Validation);
        assert_eq!(info.details, "name must not be empty");
        assert!(!info.retryable);
    }

    #[test]
    fn upload_statuses_map_to_upload_category() {
        assert_eq!(http(413, "").info().category, ErrorCategory::Upload);
        assert_eq!(http(415, "").info().message, "Unsupported file type");
    }

    #[test]
    fn gateway_errors_are_retryable_network_failures() {
        for status in [502, 503, 504] {
            let info = http(status, "").info();
            assert_eq!(info.category, ErrorCategory::Network);
            assert!(info.retryable);
        }
    }

    #[test]
    fn unknown_status_falls_back_to_error_code() {
        let info = http(418, "").info();
        assert_eq!(info.category, ErrorCategory::Unknown);
        assert_eq!(info.details, "Error code: 418");
    }

    #[test]
    fn stream_error_surfaces_server_message() {
        let info = AppError::stream("quota exceeded").info();
        assert_eq!(info.message, "quota exceeded");
        assert_eq!(info.category, ErrorCategory::AiAnalysis);
    }
}
