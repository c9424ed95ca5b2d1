//! Error types for XDR serialization/deserialization.

use std::fmt;

/// Result type for XDR operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during XDR serialization/deserialization.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom error message from serde.
    #[error("{0}")]
    Message(String),

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    Eof,

    /// Invalid boolean value (must be 0 or 1).
    #[error("invalid boolean value: {0}")]
    InvalidBool(u32),

    /// Optional discriminant other than 0 or 1.
    #[error("invalid optional discriminant: {0}")]
    InvalidOptional(u32),

    /// String is not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// String or opaque exceeds maximum length.
    #[error("string length {0} exceeds maximum {1}")]
    StringTooLong(usize, usize),

    /// The serde data model construct has no XDR encoding.
    #[error("{0} is not representable in XDR")]
    Unsupported(&'static str),
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
