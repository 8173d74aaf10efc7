use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostError {
    #[error("Image processing failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SheetError(#[from] calamine::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Input,
    Image,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PostError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PostError::ConfigError { .. }
            | PostError::ConfigValidationError { .. }
            | PostError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PostError::ApiError(_) => ErrorCategory::Network,
            PostError::CsvError(_) | PostError::SheetError(_) | PostError::ValidationError { .. } => {
                ErrorCategory::Input
            }
            PostError::ImageError(_) => ErrorCategory::Image,
            PostError::SerializationError(_) => ErrorCategory::Processing,
            PostError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Image => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Processing => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PostError::ConfigError { message } => format!("Configuration problem: {}", message),
            PostError::ConfigValidationError { field, message } => {
                format!("Setting '{}' is invalid: {}", field, message)
            }
            PostError::InvalidConfigValueError { field, value, reason } => {
                format!("'{}' is not a valid value for '{}': {}", value, field, reason)
            }
            PostError::SheetError(e) => format!("Could not read the spreadsheet: {}", e),
            PostError::CsvError(e) => format!("Could not read the CSV sheet: {}", e),
            PostError::ApiError(e) => format!("Network request failed: {}", e),
            PostError::ImageError(e) => format!("Image could not be processed: {}", e),
            PostError::IoError(e) => format!("File system error: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line flags and the settings file, then run again"
            }
            ErrorCategory::Network => "Check the network connection and the image URLs",
            ErrorCategory::Input => {
                "Check that the spreadsheet has a header row with the expected columns"
            }
            ErrorCategory::Image => "Replace the image URL with a reachable JPEG, PNG, GIF or WebP",
            ErrorCategory::Processing => "Inspect the row named in the log and fix its values",
            ErrorCategory::System => {
                "Check that the output directory is writable and the disk is not full"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PostError>;
