use thiserror::Error;

#[derive(Error, Debug)]
pub enum StocktakeError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Server responded with {status}: {}", .message.as_deref().unwrap_or("no message"))]
    ServerError { status: u16, message: Option<String> },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Operation '{operation}' is not allowed while session is {phase}")]
    InvalidState { operation: String, phase: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Server,
    Configuration,
    Validation,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StocktakeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) => ErrorCategory::Network,
            Self::ServerError { .. } => ErrorCategory::Server,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::InvalidState { .. } => ErrorCategory::Validation,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ZipError(_)
            | Self::ProcessingError { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Server => match self {
                Self::ServerError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// 網路或 5xx 錯誤：操作員重新執行即可
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check network connectivity and the backend URL, then retry",
            Self::ServerError { status: 401, .. } | Self::ServerError { status: 403, .. } => {
                "Refresh the Auth-token and retry"
            }
            Self::ServerError { status, .. } if *status >= 500 => {
                "The backend is unavailable, retry in a moment"
            }
            Self::ServerError { .. } => "Review the request against the server message",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => {
                "Fix the configuration file or command line flags"
            }
            Self::ValidationError { .. } => "Correct the input and try again",
            Self::InvalidState { .. } => "Run `stocktake status` to inspect the current audit",
            Self::CsvError(_) => "Make sure the count sheet keeps the exported column layout",
            Self::ZipError(_) | Self::IoError(_) => "Check the output path and its permissions",
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                "The backend returned unexpected data, contact the administrator"
            }
        }
    }

    /// 給操作員看的訊息；伺服器有回傳 message 時直接沿用
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ServerError {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::ServerError { status, .. } => {
                format!("Something went wrong on the server (HTTP {})", status)
            }
            Self::ApiError(_) => "Could not reach the server".to_string(),
            Self::ValidationError { message } => message.clone(),
            Self::InvalidState { .. }
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => self.to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StocktakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_propagated() {
        let err = StocktakeError::ServerError {
            status: 409,
            message: Some("Zone is already being counted".to_string()),
        };
        assert_eq!(err.user_friendly_message(), "Zone is already being counted");
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_server_without_message_uses_fallback() {
        let err = StocktakeError::ServerError {
            status: 502,
            message: None,
        };
        assert!(err.user_friendly_message().contains("HTTP 502"));
        assert!(err.is_transient());
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_validation_is_low_severity() {
        let err = StocktakeError::validation("Warehouse is required");
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "Warehouse is required");
    }
}
