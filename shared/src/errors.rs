use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcademyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Email delivery failed: {0}")]
    EmailDeliveryFailed(String),

    #[error("SES error: {0}")]
    SESError(String),

    #[error("Bedrock error: {0}")]
    BedrockError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<sqlx::Error> for AcademyError {
    fn from(err: sqlx::Error) -> Self {
        AcademyError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AcademyError {
    fn from(err: serde_json::Error) -> Self {
        AcademyError::SerializationError(err.to_string())
    }
}

pub type AcademyResult<T> = Result<T, AcademyError>;
