//! NXCP message header
//!
//! The header is 16 bytes, big-endian throughout.

use bytes::{Buf, BufMut};

use super::{Error, Flags, HEADER_SIZE, Result};

/// NXCP message header (16 bytes)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Message Code          |             Flags             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Total Size (4)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Message ID (4)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Aux (4)                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `Aux` holds the control value, the binary body length or the field
/// count, depending on the body kind selected by `Flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    message_code: u16,
    flags: Flags,
    total_size: u32,
    message_id: u32,
    aux: u32,
}

impl MessageHeader {
    /// Create a new message header
    #[must_use]
    pub const fn new(
        message_code: u16,
        flags: Flags,
        total_size: u32,
        message_id: u32,
        aux: u32,
    ) -> Self {
        Self {
            message_code,
            flags,
            total_size,
            message_id,
            aux,
        }
    }

    /// Get message code
    #[must_use]
    pub const fn message_code(&self) -> u16 {
        self.message_code
    }

    /// Get flags
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Get declared total size (header + body)
    #[must_use]
    pub const fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Get message ID
    #[must_use]
    pub const fn message_id(&self) -> u32 {
        self.message_id
    }

    /// Get the body-dependent aux word
    #[must_use]
    pub const fn aux(&self) -> u32 {
        self.aux
    }

    /// Write the header (big-endian)
    pub fn write_to(&self, dst: &mut impl BufMut) {
        dst.put_u16(self.message_code);
        dst.put_u16(self.flags.as_u16());
        dst.put_u32(self.total_size);
        dst.put_u32(self.message_id);
        dst.put_u32(self.aux);
    }

    /// Convert to bytes (big-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        self.write_to(&mut &mut bytes[..]);
        bytes
    }

    /// Parse from bytes (big-endian)
    ///
    /// Only the first 16 bytes are read; framing against the declared
    /// total size is checked by the message decoder.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedMessage {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        }

        Ok(Self {
            message_code: bytes.get_u16(),
            flags: Flags::from_u16(bytes.get_u16()),
            total_size: bytes.get_u32(),
            message_id: bytes.get_u32(),
            aux: bytes.get_u32(),
        })
    }
}
