use thiserror::Error;

/// Validation errors for request input and domain construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("date '{value}' has no following calendar day")]
    DateOutOfRange { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("timestamp {seconds} is outside the representable range")]
    TimestampOutOfRange { seconds: i64 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
}
