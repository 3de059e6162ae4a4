//! Error types for the data model.

use crate::token_type::TokenType;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while decoding model payloads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A value payload did not match its token type.
    #[error("invalid {token_type} value: {message}")]
    InvalidValue {
        /// Declared type of the token.
        token_type: TokenType,
        /// Decoder message.
        message: String,
    },
}
