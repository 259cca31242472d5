//! NXCP (NetXMS Communication Protocol) message codec
//!
//! This library encodes and decodes the binary messages exchanged between
//! NetXMS clients and servers. It covers a single, fully buffered message;
//! reading frames off a socket, session setup, encryption and compression
//! belong to the caller.
//!
//! # Quick Start
//!
//! ```rust
//! use nxcp::{FieldType, Message};
//!
//! // Build a field-list message
//! let mut msg = Message::with_id(100, 200);
//! msg.set(300, "Test String")?;
//! msg.set_typed(301, 1000u32, FieldType::Int16)?;
//!
//! // Encode to one framed buffer
//! let bytes = msg.encode()?;
//! assert_eq!(bytes.len() % 8, 0);
//!
//! // Decode from bytes
//! let decoded = Message::decode(&bytes)?;
//! assert_eq!(decoded.value(300).and_then(|v| v.as_str()), Some("Test String"));
//! # Ok::<(), nxcp::Error>(())
//! ```
//!
//! # Message Kinds
//!
//! - **Field list** - typed fields keyed by ID (the default)
//! - **Binary** - an opaque payload, see [`Message::set_binary_data`]
//! - **Control** - a single 32-bit value, see [`Message::set_control_data`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;

pub use protocol::{
    ALIGNMENT, Body, Error, Field, FieldInput, FieldType, FieldValue, Flags, HEADER_SIZE,
    InetAddress, Message, MessageHeader, Result, infer_tag,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
