//! NXCP codec error types

use thiserror::Error;

use super::FieldType;

/// NXCP codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Buffer ends before a header, field or body is complete
    #[error("message truncated: need {needed} bytes, got {got}")]
    TruncatedMessage {
        /// Bytes required to continue decoding
        needed: usize,
        /// Bytes actually available
        got: usize,
    },

    /// Header size disagrees with the buffer length
    #[error("message size mismatch: header declares {declared} bytes, buffer has {actual}")]
    SizeMismatch {
        /// Size declared in the header
        declared: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// Binary body length exceeds the bytes following the header
    #[error("invalid binary length: {declared} bytes declared, {available} available")]
    InvalidBinaryLength {
        /// Length declared in the header
        declared: usize,
        /// Bytes available after the header
        available: usize,
    },

    /// Field carries a type tag outside the known set
    #[error("unknown field type: {tag}")]
    UnknownFieldType {
        /// Raw tag byte
        tag: u8,
    },

    /// Explicit type tag contradicts the supplied value
    #[error("cannot store {input} value as {field_type} field")]
    TypeValueMismatch {
        /// Requested field type
        field_type: FieldType,
        /// Shape of the supplied value
        input: &'static str,
    },

    /// Integer does not fit the requested field width
    #[error("value {value} out of range for {field_type} field")]
    ValueOutOfRange {
        /// Requested field type
        field_type: FieldType,
        /// Offending value
        value: i128,
    },

    /// Network prefix longer than the address family allows
    #[error("invalid prefix length /{prefix} (max {max})")]
    InvalidPrefixLength {
        /// Prefix length found
        prefix: u8,
        /// Maximum for the family
        max: u8,
    },

    /// String payload is not valid UTF-16BE
    #[error("invalid UTF-16 string payload ({len} bytes)")]
    InvalidString {
        /// Payload length in bytes
        len: usize,
    },

    /// Variable-length payload does not fit its 32-bit length prefix
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
