//! NXCP message fields
//!
//! A field is a 6-byte sub-header (`id`, type tag, reserved byte) followed by
//! a type-specific payload, zero-padded to an 8-byte boundary:
//!
//! ```text
//! [ID (4)] [TYPE (1)] [RSVD (1)] [PAYLOAD (variable)] [PADDING (0-7)]
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes};
use tracing::debug;

use super::{Error, FIELD_HEADER_SIZE, FieldType, MAX_FIELD_PAYLOAD, Result, padded_len};

/// Size of the address block inside an INETADDR payload
const INET_ADDR_BYTES: usize = 16;

/// Reserved tail of an INETADDR payload after family and prefix
const INET_RESERVED_BYTES: usize = 6;

const FAMILY_V4: u8 = 0;
const FAMILY_V6: u8 = 1;
const FAMILY_UNSPEC: u8 = 2;

/// IP network carried by an INETADDR field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InetAddress {
    /// IPv4 address with prefix length 0-32
    V4 {
        /// Address
        addr: Ipv4Addr,
        /// Prefix length
        prefix: u8,
    },
    /// IPv6 address with prefix length 0-128
    V6 {
        /// Address
        addr: Ipv6Addr,
        /// Prefix length
        prefix: u8,
    },
    /// No address (family selector other than IPv4/IPv6)
    Unspecified,
}

impl InetAddress {
    /// Create a network from an address and prefix length
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self> {
        let max = max_prefix(&addr);
        if prefix > max {
            return Err(Error::InvalidPrefixLength { prefix, max });
        }

        Ok(match addr {
            IpAddr::V4(addr) => Self::V4 { addr, prefix },
            IpAddr::V6(addr) => Self::V6 { addr, prefix },
        })
    }

    /// Create a single-host network (/32 or /128)
    #[must_use]
    pub fn host(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Self::V4 { addr, prefix: 32 },
            IpAddr::V6(addr) => Self::V6 { addr, prefix: 128 },
        }
    }

    /// Get the address, if any
    #[must_use]
    pub fn addr(&self) -> Option<IpAddr> {
        match *self {
            Self::V4 { addr, .. } => Some(IpAddr::V4(addr)),
            Self::V6 { addr, .. } => Some(IpAddr::V6(addr)),
            Self::Unspecified => None,
        }
    }

    /// Get the prefix length (0 for unspecified)
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        match *self {
            Self::V4 { prefix, .. } | Self::V6 { prefix, .. } => prefix,
            Self::Unspecified => 0,
        }
    }

    /// Check if this is the unspecified placeholder
    #[must_use]
    pub const fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }

    const fn family(&self) -> u8 {
        match self {
            Self::V4 { .. } => FAMILY_V4,
            Self::V6 { .. } => FAMILY_V6,
            Self::Unspecified => FAMILY_UNSPEC,
        }
    }

    fn octets(&self) -> [u8; INET_ADDR_BYTES] {
        let mut octets = [0u8; INET_ADDR_BYTES];
        match self {
            Self::V4 { addr, .. } => octets[..4].copy_from_slice(&addr.octets()),
            Self::V6 { addr, .. } => octets = addr.octets(),
            Self::Unspecified => {}
        }
        octets
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl From<IpAddr> for InetAddress {
    fn from(addr: IpAddr) -> Self {
        Self::host(addr)
    }
}

impl From<Ipv4Addr> for InetAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self::host(IpAddr::V4(addr))
    }
}

impl From<Ipv6Addr> for InetAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self::host(IpAddr::V6(addr))
    }
}

impl fmt::Display for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 { addr, prefix } => write!(f, "{addr}/{prefix}"),
            Self::V6 { addr, prefix } => write!(f, "{addr}/{prefix}"),
            Self::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Typed value of a message field
///
/// The variant determines the wire type tag, so a value can never disagree
/// with its tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// INTEGER
    Integer(u32),
    /// STRING
    String(String),
    /// INT64
    Int64(u64),
    /// INT16
    Int16(u16),
    /// BINARY
    Binary(Bytes),
    /// FLOAT
    Float(f64),
    /// INETADDR
    InetAddr(InetAddress),
}

impl FieldValue {
    /// Wire type tag for this value
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Integer(_) => FieldType::Integer,
            Self::String(_) => FieldType::String,
            Self::Int64(_) => FieldType::Int64,
            Self::Int16(_) => FieldType::Int16,
            Self::Binary(_) => FieldType::Binary,
            Self::Float(_) => FieldType::Float,
            Self::InetAddr(_) => FieldType::InetAddr,
        }
    }

    /// Get as 32-bit integer
    #[must_use]
    pub const fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as 16-bit integer
    #[must_use]
    pub const fn as_u16(&self) -> Option<u16> {
        match self {
            Self::Int16(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as 64-bit integer
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as float
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get as raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Get as network address
    #[must_use]
    pub const fn as_inet_addr(&self) -> Option<&InetAddress> {
        match self {
            Self::InetAddr(v) => Some(v),
            _ => None,
        }
    }

    /// Payload length before padding, excluding the sub-header
    fn payload_len(&self) -> usize {
        match self {
            Self::Int16(_) => 2,
            Self::Integer(_) => 2 + 4,
            Self::Int64(_) | Self::Float(_) => 2 + 8,
            Self::String(s) => 2 + 4 + utf16_len(s),
            Self::Binary(b) => 2 + 4 + b.len(),
            Self::InetAddr(_) => 2 + INET_ADDR_BYTES + 2 + INET_RESERVED_BYTES,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Self::Float(v) => write!(f, "{v}"),
            Self::InetAddr(v) => write!(f, "{v}"),
        }
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count() * 2
}

/// Loosely typed value supplied by the application
///
/// Converted into a [`FieldValue`] either by type inference ([`infer_tag`])
/// or under an explicit [`FieldType`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    /// Signed integer
    Signed(i64),
    /// Unsigned integer
    Unsigned(u64),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
    /// Raw bytes
    Bytes(Bytes),
    /// Bare IP address, stored as a host network
    Address(IpAddr),
    /// Network with explicit prefix
    Network(InetAddress),
}

impl FieldInput {
    /// Short name of the input shape, used in error reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Signed(_) | Self::Unsigned(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Address(_) => "address",
            Self::Network(_) => "network",
        }
    }

    /// Convert into a typed value of the given field type
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn into_value(self, field_type: FieldType) -> Result<FieldValue> {
        match (field_type, self) {
            (FieldType::Integer, Self::Signed(v)) => {
                narrow(field_type, i128::from(v), i32::MIN.into(), u32::MAX.into())
                    .map(|v| FieldValue::Integer(v as u32))
            }
            (FieldType::Integer, Self::Unsigned(v)) => {
                narrow(field_type, i128::from(v), i32::MIN.into(), u32::MAX.into())
                    .map(|v| FieldValue::Integer(v as u32))
            }
            (FieldType::Int16, Self::Signed(v)) => {
                narrow(field_type, i128::from(v), i16::MIN.into(), u16::MAX.into())
                    .map(|v| FieldValue::Int16(v as u16))
            }
            (FieldType::Int16, Self::Unsigned(v)) => {
                narrow(field_type, i128::from(v), i16::MIN.into(), u16::MAX.into())
                    .map(|v| FieldValue::Int16(v as u16))
            }
            (FieldType::Int64, Self::Signed(v)) => Ok(FieldValue::Int64(v as u64)),
            (FieldType::Int64, Self::Unsigned(v)) => Ok(FieldValue::Int64(v)),
            (FieldType::Float, Self::Float(v)) => Ok(FieldValue::Float(v)),
            (FieldType::Float, Self::Signed(v)) => Ok(FieldValue::Float(v as f64)),
            (FieldType::Float, Self::Unsigned(v)) => Ok(FieldValue::Float(v as f64)),
            (FieldType::String, Self::Text(v)) => Ok(FieldValue::String(v)),
            (FieldType::Binary, Self::Bytes(v)) => Ok(FieldValue::Binary(v)),
            (FieldType::InetAddr, Self::Address(v)) => {
                Ok(FieldValue::InetAddr(InetAddress::host(v)))
            }
            (FieldType::InetAddr, Self::Network(v)) => Ok(FieldValue::InetAddr(v)),
            (field_type, input) => Err(Error::TypeValueMismatch {
                field_type,
                input: input.kind(),
            }),
        }
    }
}

/// Range-check an integer for a fixed-width field; negative values are
/// later stored as two's complement.
fn narrow(field_type: FieldType, value: i128, min: i128, max: i128) -> Result<i128> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::ValueOutOfRange { field_type, value })
    }
}

macro_rules! impl_input_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for FieldInput {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

impl_input_from!(Signed: i8, i16, i32, i64);
impl_input_from!(Unsigned: u8, u16, u32, u64);
impl_input_from!(Float: f32, f64);
impl_input_from!(Text: String, &str);
impl_input_from!(Bytes: Bytes, Vec<u8>);
impl_input_from!(Address: IpAddr, Ipv4Addr, Ipv6Addr);
impl_input_from!(Network: InetAddress);

impl From<&[u8]> for FieldInput {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<&[u8; N]> for FieldInput {
    fn from(value: &[u8; N]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

/// Infer the wire type for a loosely typed value
///
/// Integers map to INTEGER; INT16 and INT64 are only reachable through an
/// explicit type.
#[must_use]
pub const fn infer_tag(input: &FieldInput) -> FieldType {
    match input {
        FieldInput::Signed(_) | FieldInput::Unsigned(_) => FieldType::Integer,
        FieldInput::Float(_) => FieldType::Float,
        FieldInput::Bytes(_) => FieldType::Binary,
        FieldInput::Address(_) | FieldInput::Network(_) => FieldType::InetAddr,
        FieldInput::Text(_) => FieldType::String,
    }
}

/// One identified, typed value inside a field-list message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    id: u32,
    value: FieldValue,
}

impl Field {
    /// Create a field from a typed value
    #[must_use]
    pub const fn new(id: u32, value: FieldValue) -> Self {
        Self { id, value }
    }

    /// Create a field from a loosely typed value
    ///
    /// With `field_type` of `None` the type is inferred from the value's shape;
    /// an explicit type always wins.
    pub fn from_input(
        id: u32,
        input: impl Into<FieldInput>,
        field_type: Option<FieldType>,
    ) -> Result<Self> {
        let input = input.into();
        let field_type = field_type.unwrap_or_else(|| infer_tag(&input));
        let value = input.into_value(field_type)?;
        Ok(Self { id, value })
    }

    /// Get field ID
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Get wire type
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    /// Get value
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Take the value
    #[must_use]
    pub fn into_value(self) -> FieldValue {
        self.value
    }

    /// Serialized length including padding
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        padded_len(FIELD_HEADER_SIZE + self.value.payload_len())
    }

    /// Write the field (sub-header, payload, padding)
    ///
    /// Nothing is written when the payload is too large.
    pub fn write_to(&self, dst: &mut impl BufMut) -> Result<()> {
        let data_len = match &self.value {
            FieldValue::String(s) => Some(utf16_len(s)),
            FieldValue::Binary(b) => Some(b.len()),
            _ => None,
        };
        let data_len = match data_len {
            Some(len) if len > MAX_FIELD_PAYLOAD => {
                return Err(Error::PayloadTooLarge {
                    size: len,
                    max: MAX_FIELD_PAYLOAD,
                });
            }
            Some(len) => len as u32,
            None => 0,
        };

        dst.put_u32(self.id);
        dst.put_u8(self.field_type().as_u8());
        dst.put_u8(0);

        match &self.value {
            FieldValue::Int16(v) => dst.put_u16(*v),
            FieldValue::Integer(v) => {
                dst.put_u16(0);
                dst.put_u32(*v);
            }
            FieldValue::Int64(v) => {
                dst.put_u16(0);
                dst.put_u64(*v);
            }
            FieldValue::Float(v) => {
                dst.put_u16(0);
                dst.put_f64(*v);
            }
            FieldValue::String(s) => {
                dst.put_u16(0);
                dst.put_u32(data_len);
                for unit in s.encode_utf16() {
                    dst.put_u16(unit);
                }
            }
            FieldValue::Binary(b) => {
                dst.put_u16(0);
                dst.put_u32(data_len);
                dst.put_slice(b);
            }
            FieldValue::InetAddr(addr) => {
                dst.put_u16(0);
                dst.put_slice(&addr.octets());
                dst.put_u8(addr.family());
                dst.put_u8(addr.prefix_len());
                dst.put_bytes(0, INET_RESERVED_BYTES);
            }
        }

        let unpadded = FIELD_HEADER_SIZE + self.value.payload_len();
        dst.put_bytes(0, padded_len(unpadded) - unpadded);
        Ok(())
    }

    /// Serialize to a standalone buffer
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode one field from the start of `bytes`
    ///
    /// Returns the field and the number of bytes it occupies including end
    /// padding. Padding missing from the end of `bytes` is not an error here;
    /// the caller compares the reported length against its buffer.
    pub fn from_binary(bytes: &[u8]) -> Result<(Self, usize)> {
        let total = bytes.len();
        let mut buf = bytes;

        ensure(buf, FIELD_HEADER_SIZE, total)?;
        let id = buf.get_u32();
        let tag = buf.get_u8();
        buf.advance(1);

        let field_type = FieldType::from_u8(tag).ok_or(Error::UnknownFieldType { tag })?;

        let value = match field_type {
            FieldType::Int16 => {
                ensure(buf, 2, total)?;
                FieldValue::Int16(buf.get_u16())
            }
            FieldType::Integer => {
                skip_pad(&mut buf, total)?;
                ensure(buf, 4, total)?;
                FieldValue::Integer(buf.get_u32())
            }
            FieldType::Int64 => {
                skip_pad(&mut buf, total)?;
                ensure(buf, 8, total)?;
                FieldValue::Int64(buf.get_u64())
            }
            FieldType::Float => {
                skip_pad(&mut buf, total)?;
                ensure(buf, 8, total)?;
                FieldValue::Float(buf.get_f64())
            }
            FieldType::String => {
                skip_pad(&mut buf, total)?;
                let data = take_sized(&mut buf, total)?;
                FieldValue::String(decode_utf16(data)?)
            }
            FieldType::Binary => {
                skip_pad(&mut buf, total)?;
                let data = take_sized(&mut buf, total)?;
                FieldValue::Binary(Bytes::copy_from_slice(data))
            }
            FieldType::InetAddr => {
                skip_pad(&mut buf, total)?;
                FieldValue::InetAddr(read_inet_addr(&mut buf, total)?)
            }
        };

        let consumed = padded_len(total - buf.remaining());
        Ok((Self { id, value }, consumed))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Field{{id={}, type={}, value={}}}",
            self.id,
            self.field_type(),
            self.value
        )
    }
}

fn ensure(buf: &[u8], needed: usize, total: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(Error::TruncatedMessage {
            needed: total - buf.len() + needed,
            got: total,
        });
    }
    Ok(())
}

/// Skip the 2-byte pad that aligns every payload except INT16
fn skip_pad(buf: &mut &[u8], total: usize) -> Result<()> {
    ensure(buf, 2, total)?;
    buf.advance(2);
    Ok(())
}

/// Read a 4-byte length and the data it announces
fn take_sized<'a>(buf: &mut &'a [u8], total: usize) -> Result<&'a [u8]> {
    ensure(buf, 4, total)?;
    let len = buf.get_u32() as usize;
    let current: &'a [u8] = *buf;
    ensure(current, len, total)?;
    let (data, rest) = current.split_at(len);
    *buf = rest;
    Ok(data)
}

fn decode_utf16(data: &[u8]) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(Error::InvalidString { len: data.len() });
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| Error::InvalidString { len: data.len() })
}

fn read_inet_addr(buf: &mut &[u8], total: usize) -> Result<InetAddress> {
    ensure(buf, INET_ADDR_BYTES + 2 + INET_RESERVED_BYTES, total)?;
    let mut octets = [0u8; INET_ADDR_BYTES];
    buf.copy_to_slice(&mut octets);
    let family = buf.get_u8();
    let prefix = buf.get_u8();
    buf.advance(INET_RESERVED_BYTES);

    match family {
        FAMILY_V4 => {
            let addr = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
            InetAddress::new(IpAddr::V4(addr), prefix)
        }
        FAMILY_V6 => InetAddress::new(IpAddr::V6(Ipv6Addr::from(octets)), prefix),
        _ => {
            debug!(family, prefix, "unrecognized address family, decoding as unspecified");
            Ok(InetAddress::Unspecified)
        }
    }
}
