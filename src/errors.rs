use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("BACKUP_PARSE: {0}")]
    BackupParse(String),
    #[error("BACKUP_INVALID: {0}")]
    BackupShape(String),
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Message without the code prefix, as shown to the person using the app.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BackupParse(message)
            | Self::BackupShape(message)
            | Self::Validation(message)
            | Self::NotFound(message)
            | Self::Io(message)
            | Self::Internal(message) => message,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
