use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Prediction service answered {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("Image decode failed: {0}")]
    ImageDecodeError(#[from] image::ImageError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Model '{model}' could not be loaded from {path}: {message}")]
    ModelLoadError {
        model: String,
        path: String,
        message: String,
    },

    #[error("Inference failed for model '{model}': {message}")]
    InferenceError { model: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Report rendering failed: {message}")]
    ReportError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Model,
    Input,
    Network,
    Storage,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn inference(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InferenceError {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ConfigError { .. } | AppError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            AppError::ModelLoadError { .. } | AppError::InferenceError { .. } => {
                ErrorCategory::Model
            }
            AppError::ImageDecodeError(_) | AppError::ValidationError { .. } => {
                ErrorCategory::Input
            }
            AppError::HttpError(_) | AppError::ServiceError { .. } => ErrorCategory::Network,
            AppError::IoError(_) | AppError::ReportError { .. } => ErrorCategory::Storage,
            AppError::SerializationError(_) | AppError::InternalError { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Storage | ErrorCategory::Internal => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Model => ErrorSeverity::Critical,
        }
    }

    /// 是否屬於呼叫端造成的錯誤
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Input
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::ModelLoadError { model, path, .. } => {
                format!("The {} model could not be loaded from '{}'", model, path)
            }
            AppError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            AppError::HttpError(_) => "Could not reach the prediction service".to_string(),
            AppError::ValidationError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML config file and command-line flags",
            ErrorCategory::Model => {
                "Verify both ONNX model files exist and match the expected input shapes"
            }
            ErrorCategory::Input => "Check the uploaded image and biometric values",
            ErrorCategory::Network => "Make sure the prediction service is running and reachable",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Internal => "Retry the request; if it keeps failing, check the service logs",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
