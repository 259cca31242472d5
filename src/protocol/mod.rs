//! NXCP protocol core implementation
//!
//! This module provides the wire format, field types and codec for NXCP.

mod codec;
mod error;
mod field;
mod header;
mod message;
mod types;

pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use field::{Field, FieldInput, FieldValue, InetAddress, infer_tag};
pub use header::MessageHeader;
pub use message::{Body, Message};
pub use types::{FieldType, Flags};

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Field sub-header size in bytes (id, type, reserved)
pub const FIELD_HEADER_SIZE: usize = 6;

/// Fields and binary bodies are padded to this boundary
pub const ALIGNMENT: usize = 8;

/// Maximum length of a string or binary payload (32-bit length prefix)
pub const MAX_FIELD_PAYLOAD: usize = u32::MAX as usize;

/// Maximum encoded message size (32-bit size in header)
pub const MAX_MESSAGE_SIZE: usize = u32::MAX as usize;

/// Round `len` up to the next multiple of [`ALIGNMENT`]
#[must_use]
pub const fn padded_len(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}
