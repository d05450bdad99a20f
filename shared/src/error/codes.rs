//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Ingestion errors
//! - 2xxx: Policy errors
//! - 3xxx: Retrieval errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values so diagnostics serialize compactly in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Ingestion ====================
    /// Record dropped because a required key is missing
    MalformedRecord = 1001,
    /// Monetary value could not be parsed (degraded to zero)
    UnparseableValue = 1002,
    /// Timestamp could not be parsed (sorted as earliest)
    UnparseableTimestamp = 1003,
    /// Requested identifier is empty after cleaning
    EmptyIdentifier = 1004,

    // ==================== 2xxx: Policy ====================
    /// Policy document is invalid
    InvalidPolicy = 2001,
    /// Rule pattern is not a valid regular expression
    InvalidPattern = 2002,
    /// The same category is listed by more than one rule
    DuplicateRule = 2003,
    /// The default category cannot be assigned by a rule
    ReservedCategory = 2004,

    // ==================== 3xxx: Retrieval ====================
    /// Upstream request failed
    RetrievalFailed = 3001,
    /// Upstream request timed out
    RetrievalTimeout = 3002,
    /// Upstream returned a body that could not be decoded
    UnexpectedResponse = 3003,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Filesystem error
    IoError = 9002,
    /// Serialization error
    SerializationError = 9003,
    /// Configuration error
    ConfigError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this code represents success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field missing",

            Self::MalformedRecord => "Record is missing a required key",
            Self::UnparseableValue => "Value could not be parsed",
            Self::UnparseableTimestamp => "Timestamp could not be parsed",
            Self::EmptyIdentifier => "Identifier is empty",

            Self::InvalidPolicy => "Audit policy is invalid",
            Self::InvalidPattern => "Rule pattern is invalid",
            Self::DuplicateRule => "Category is listed more than once",
            Self::ReservedCategory => "Category is reserved for the default outcome",

            Self::RetrievalFailed => "Upstream request failed",
            Self::RetrievalTimeout => "Upstream request timed out",
            Self::UnexpectedResponse => "Upstream response could not be decoded",

            Self::InternalError => "Internal error",
            Self::IoError => "Filesystem error",
            Self::SerializationError => "Serialization error",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::ValidationFailed),
            3 => Ok(Self::NotFound),
            5 => Ok(Self::InvalidRequest),
            6 => Ok(Self::InvalidFormat),
            7 => Ok(Self::RequiredField),

            1001 => Ok(Self::MalformedRecord),
            1002 => Ok(Self::UnparseableValue),
            1003 => Ok(Self::UnparseableTimestamp),
            1004 => Ok(Self::EmptyIdentifier),

            2001 => Ok(Self::InvalidPolicy),
            2002 => Ok(Self::InvalidPattern),
            2003 => Ok(Self::DuplicateRule),
            2004 => Ok(Self::ReservedCategory),

            3001 => Ok(Self::RetrievalFailed),
            3002 => Ok(Self::RetrievalTimeout),
            3003 => Ok(Self::UnexpectedResponse),

            9001 => Ok(Self::InternalError),
            9002 => Ok(Self::IoError),
            9003 => Ok(Self::SerializationError),
            9004 => Ok(Self::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
