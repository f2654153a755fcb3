use crate::core::transport::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Posting API call failed: {0}")]
    FetchError(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Sheet sink error: {message}")]
    SinkError { message: String },

    #[error("Access denied: chat {chat_id} is not allowed for warehouse '{warehouse}'")]
    AccessDenied { chat_id: String, warehouse: String },

    #[error("Unknown warehouse: {name}")]
    UnknownWarehouse { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Authorization,
    Storage,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::FetchError(FetchError::ClientError { status, .. })
                if *status == 401 || *status == 403 =>
            {
                ErrorCategory::Authorization
            }
            EtlError::FetchError(_) | EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::UnknownWarehouse { .. } => ErrorCategory::Configuration,
            EtlError::AccessDenied { .. } => ErrorCategory::Authorization,
            EtlError::SinkError { .. } | EtlError::IoError(_) | EtlError::CsvError(_) => {
                ErrorCategory::Storage
            }
            EtlError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 重試後仍失敗的暫時性錯誤，稍後再跑通常可以恢復
            EtlError::FetchError(FetchError::Timeout { .. })
            | EtlError::FetchError(FetchError::ServerError { .. })
            | EtlError::ApiError(_) => ErrorSeverity::Medium,
            EtlError::FetchError(_) | EtlError::AccessDenied { .. } => ErrorSeverity::High,
            EtlError::SinkError { .. } | EtlError::SerializationError(_) => ErrorSeverity::High,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::UnknownWarehouse { .. }
            | EtlError::IoError(_)
            | EtlError::CsvError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::FetchError(e) => e.user_hint().to_string(),
            EtlError::ApiError(_) => {
                "Check network connectivity and the configured API endpoint".to_string()
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            EtlError::MissingConfigError { field } => {
                format!("Add the '{}' field to the configuration file", field)
            }
            EtlError::UnknownWarehouse { .. } => {
                "Check the warehouse name against the [[warehouses]] entries".to_string()
            }
            EtlError::AccessDenied { .. } => {
                "Ask an administrator to add this chat id to the [[access]] list".to_string()
            }
            EtlError::SinkError { .. } | EtlError::CsvError(_) | EtlError::IoError(_) => {
                "Check that the sheet destination is reachable and writable, then retry"
                    .to_string()
            }
            EtlError::SerializationError(_) => {
                "Inspect the logs for the offending payload".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            // 不把遠端回應內容直接顯示給使用者
            EtlError::FetchError(e) => format!("Could not fetch postings: {}", e.user_hint()),
            EtlError::SinkError { .. } => "Failed to save data to the sheet.".to_string(),
            EtlError::AccessDenied { warehouse, .. } => {
                format!("You do not have access to warehouse '{}'.", warehouse)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_body_not_in_user_message() {
        let err = EtlError::from(FetchError::ClientError {
            status: 401,
            body: "{\"message\":\"secret detail\"}".to_string(),
        });

        assert_eq!(err.category(), ErrorCategory::Authorization);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(!err.user_friendly_message().contains("secret detail"));
        assert!(!err.to_string().contains("secret detail"));
    }

    #[test]
    fn test_retryable_failures_are_medium_severity() {
        let err = EtlError::from(FetchError::Timeout { attempts: 3 });
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::MissingConfigError {
            field: "source.endpoint".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("source.endpoint"));
    }
}
