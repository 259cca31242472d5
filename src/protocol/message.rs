//! NXCP message implementation

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use super::{Field, FieldInput, FieldType, FieldValue, Flags, Result};

/// Message body
///
/// Exactly one body kind exists per message. The header flags emitted on
/// encode follow from the variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Body {
    /// Fields keyed by ID, serialized in ascending ID order
    Fields(BTreeMap<u32, Field>),
    /// Raw binary payload
    Binary(Bytes),
    /// Single control value
    Control(u32),
}

impl Default for Body {
    fn default() -> Self {
        Self::Fields(BTreeMap::new())
    }
}

/// NXCP message
///
/// Equality compares the flags as they would be encoded, so a message equals
/// its own decoded form.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    message_code: u16,
    message_id: u32,
    /// Flag word as set or decoded; body bits are reconciled in `flags()`
    flags: Flags,
    body: Body,
}

impl Message {
    /// Create an empty field-list message
    #[must_use]
    pub fn new(message_code: u16) -> Self {
        Self::with_id(message_code, 0)
    }

    /// Create an empty field-list message with a correlation ID
    #[must_use]
    pub fn with_id(message_code: u16, message_id: u32) -> Self {
        Self {
            message_code,
            message_id,
            flags: Flags::empty(),
            body: Body::default(),
        }
    }

    pub(crate) fn from_parts(message_code: u16, message_id: u32, flags: Flags, body: Body) -> Self {
        Self {
            message_code,
            message_id,
            flags,
            body,
        }
    }

    /// Get message code
    #[must_use]
    pub const fn message_code(&self) -> u16 {
        self.message_code
    }

    /// Set message code
    pub fn set_message_code(&mut self, message_code: u16) {
        self.message_code = message_code;
    }

    /// Get message ID
    #[must_use]
    pub const fn message_id(&self) -> u32 {
        self.message_id
    }

    /// Set message ID
    pub fn set_message_id(&mut self, message_id: u32) {
        self.message_id = message_id;
    }

    /// Get flags as they will be written to the header
    ///
    /// CONTROL is set for control bodies. BINARY is set and CONTROL cleared
    /// for binary bodies. Both are cleared for field lists. All other bits
    /// pass through unchanged.
    #[must_use]
    pub fn flags(&self) -> Flags {
        let mut flags = self.flags;
        match self.body {
            Body::Control(_) => flags.insert(Flags::CONTROL),
            Body::Binary(_) => {
                flags.insert(Flags::BINARY);
                flags.remove(Flags::CONTROL);
            }
            Body::Fields(_) => flags.remove(Flags::CONTROL | Flags::BINARY),
        }
        flags
    }

    /// Replace the flag word
    ///
    /// CONTROL and BINARY are still governed by the body.
    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Set flag bits
    pub fn insert_flags(&mut self, flags: Flags) {
        self.flags.insert(flags);
    }

    /// Clear flag bits
    pub fn remove_flags(&mut self, flags: Flags) {
        self.flags.remove(flags);
    }

    /// Check if this is a control message
    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(self.body, Body::Control(_))
    }

    /// Check if this is a binary message
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self.body, Body::Binary(_))
    }

    /// Get body
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Take the body
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Get the control value
    #[must_use]
    pub const fn control_data(&self) -> Option<u32> {
        match self.body {
            Body::Control(value) => Some(value),
            _ => None,
        }
    }

    /// Make this a control message carrying `value`
    pub fn set_control_data(&mut self, value: u32) {
        self.body = Body::Control(value);
    }

    /// Get the binary payload
    #[must_use]
    pub const fn binary_data(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Make this a binary message carrying `data`
    pub fn set_binary_data(&mut self, data: impl Into<Bytes>) {
        self.body = Body::Binary(data.into());
    }

    /// Set a field, inferring its type from the value
    pub fn set(&mut self, id: u32, value: impl Into<FieldInput>) -> Result<()> {
        self.insert(Field::from_input(id, value, None)?);
        Ok(())
    }

    /// Set a field with an explicit type
    pub fn set_typed(
        &mut self,
        id: u32,
        value: impl Into<FieldInput>,
        field_type: FieldType,
    ) -> Result<()> {
        self.insert(Field::from_input(id, value, Some(field_type))?);
        Ok(())
    }

    /// Set a 16-bit integer field
    pub fn set_int16(&mut self, id: u32, value: u16) {
        self.insert(Field::new(id, FieldValue::Int16(value)));
    }

    /// Set a 64-bit integer field
    pub fn set_int64(&mut self, id: u32, value: u64) {
        self.insert(Field::new(id, FieldValue::Int64(value)));
    }

    /// Insert a field, returning the one it replaced
    ///
    /// A control or binary message becomes a field-list message.
    pub fn insert(&mut self, field: Field) -> Option<Field> {
        match &mut self.body {
            Body::Fields(fields) => fields.insert(field.id(), field),
            body => {
                *body = Body::Fields(BTreeMap::from([(field.id(), field)]));
                None
            }
        }
    }

    /// Get a field by ID
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Field> {
        match &self.body {
            Body::Fields(fields) => fields.get(&id),
            _ => None,
        }
    }

    /// Get a field value by ID
    #[must_use]
    pub fn value(&self, id: u32) -> Option<&FieldValue> {
        self.get(id).map(Field::value)
    }

    /// Remove a field by ID
    pub fn remove(&mut self, id: u32) -> Option<Field> {
        match &mut self.body {
            Body::Fields(fields) => fields.remove(&id),
            _ => None,
        }
    }

    /// Iterate fields in ascending ID order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        let fields = match &self.body {
            Body::Fields(fields) => Some(fields.values()),
            _ => None,
        };
        fields.into_iter().flatten()
    }

    /// Number of fields (0 for control and binary messages)
    #[must_use]
    pub fn field_count(&self) -> usize {
        match &self.body {
            Body::Fields(fields) => fields.len(),
            _ => 0,
        }
    }

    /// Encode message to bytes
    pub fn encode(&self) -> Result<Bytes> {
        super::encode(self)
    }

    /// Decode message from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        super::decode(bytes)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.message_code == other.message_code
            && self.message_id == other.message_id
            && self.flags() == other.flags()
            && self.body == other.body
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message{{code={}, id={}, flags={}, ",
            self.message_code,
            self.message_id,
            self.flags()
        )?;
        match &self.body {
            Body::Control(value) => write!(f, "control={value}}}"),
            Body::Binary(data) => write!(f, "binary=<{} bytes>}}", data.len()),
            Body::Fields(fields) => {
                write!(f, "fields=[")?;
                for (i, field) in fields.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, "]}}")
            }
        }
    }
}
