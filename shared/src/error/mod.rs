//! Unified error system for the order audit workspace
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Ingestion errors (record-level data quality)
//! - 2xxx: Policy errors
//! - 3xxx: Retrieval errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::InvalidPattern, "unclosed group")
//!     .with_detail("pattern", "(LIB");
//! assert_eq!(err.code, ErrorCode::InvalidPattern);
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
