//! NXCP field types and message flags

use std::fmt;

use bitflags::bitflags;

/// Wire type tag of a message field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FieldType {
    /// 32-bit unsigned integer
    Integer = 0,
    /// UTF-16BE text with a byte-length prefix
    String = 1,
    /// 64-bit unsigned integer
    Int64 = 2,
    /// 16-bit unsigned integer
    Int16 = 3,
    /// Opaque bytes with a length prefix
    Binary = 4,
    /// IEEE-754 double
    Float = 5,
    /// IPv4/IPv6 address with prefix length
    InetAddr = 6,
}

impl FieldType {
    /// Convert from tag byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Integer),
            1 => Some(Self::String),
            2 => Some(Self::Int64),
            3 => Some(Self::Int16),
            4 => Some(Self::Binary),
            5 => Some(Self::Float),
            6 => Some(Self::InetAddr),
            _ => None,
        }
    }

    /// Convert to tag byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the payload is preceded by a 4-byte length
    #[must_use]
    pub const fn is_variable_length(self) -> bool {
        matches!(self, Self::String | Self::Binary)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::String => "STRING",
            Self::Int64 => "INT64",
            Self::Int16 => "INT16",
            Self::Binary => "BINARY",
            Self::Float => "FLOAT",
            Self::InetAddr => "INETADDR",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// Message header flags (16 bits)
    ///
    /// Bits outside the named set are retained as-is so that a decoded
    /// message re-encodes to the same flag word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Flags: u16 {
        /// Body is a raw binary payload
        const BINARY = 0x0001;
        /// Last chunk of a file transfer
        const END_OF_FILE = 0x0002;
        /// Sender asks for the message to stay unencrypted
        const DONT_ENCRYPT = 0x0004;
        /// Last message of a multi-message sequence
        const END_OF_SEQUENCE = 0x0008;
        /// Sequence is delivered in reverse order
        const REVERSE_ORDER = 0x0010;
        /// Body is a single 32-bit control value
        const CONTROL = 0x0020;
        /// Payload is compressed
        const COMPRESSED = 0x0040;
        /// Part of a data stream
        const STREAM = 0x0080;
    }
}

impl Flags {
    /// Create from the raw header word, keeping unknown bits
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        Self::from_bits_retain(value)
    }

    /// Convert to the raw header word
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.bits()
    }

    /// Check if the control bit is set
    #[must_use]
    pub const fn is_control(self) -> bool {
        self.contains(Self::CONTROL)
    }

    /// Check if the binary bit is set
    #[must_use]
    pub const fn is_binary(self) -> bool {
        self.contains(Self::BINARY)
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_string())
            .collect();
        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            parts.push(format!("{unknown:#06x}"));
        }
        if parts.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}
