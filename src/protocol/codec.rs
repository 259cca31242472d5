//! NXCP message codec (encode/decode)
//!
//! This module turns a [`Message`] into exactly one framed buffer and back.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, instrument, trace};

use super::{
    Body, Error, Field, HEADER_SIZE, MAX_MESSAGE_SIZE, Message, MessageHeader, Result, padded_len,
};

/// Encode a message to bytes
///
/// # Format
///
/// ```text
/// [HEADER (16 bytes)] [BODY (variable, 8-byte aligned)]
/// ```
///
/// The body is empty for control messages, the padded payload for binary
/// messages, and the fields in ascending ID order for field-list messages.
///
/// # Errors
///
/// Returns [`Error::PayloadTooLarge`] if a length does not fit its 32-bit
/// wire slot.
pub fn encode(message: &Message) -> Result<Bytes> {
    let (body_len, aux) = match message.body() {
        Body::Control(value) => (0, *value),
        Body::Binary(data) => (padded_len(data.len()), checked_u32(data.len())?),
        Body::Fields(fields) => (
            fields.values().map(Field::encoded_len).sum::<usize>(),
            checked_u32(fields.len())?,
        ),
    };

    let total_size = HEADER_SIZE + body_len;
    let header = MessageHeader::new(
        message.message_code(),
        message.flags(),
        checked_u32(total_size)?,
        message.message_id(),
        aux,
    );

    let mut bytes = BytesMut::with_capacity(total_size);
    header.write_to(&mut bytes);

    match message.body() {
        Body::Control(_) => {}
        Body::Binary(data) => {
            bytes.put_slice(data);
            bytes.put_bytes(0, body_len - data.len());
        }
        Body::Fields(fields) => {
            for field in fields.values() {
                field.write_to(&mut bytes)?;
            }
        }
    }

    trace!(
        code = message.message_code(),
        id = message.message_id(),
        size = total_size,
        aux,
        "encoded message"
    );
    Ok(bytes.freeze())
}

/// Decode a message from bytes
///
/// The buffer must hold exactly one message: its length must equal the
/// size declared in the header.
///
/// # Errors
///
/// Returns an error if:
/// - Buffer is shorter than the header or the declared size
/// - Buffer is longer than the declared size
/// - Binary body length exceeds the buffer
/// - A field has an unknown type or runs past the buffer
#[instrument(level = "trace", skip_all, fields(len = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<Message> {
    decode_message(bytes).inspect_err(|err| debug!(error = %err, "failed to decode message"))
}

fn decode_message(bytes: &[u8]) -> Result<Message> {
    let header = MessageHeader::from_bytes(bytes)?;

    let declared = header.total_size() as usize;
    if bytes.len() < declared {
        return Err(Error::TruncatedMessage {
            needed: declared,
            got: bytes.len(),
        });
    }
    if bytes.len() != declared {
        return Err(Error::SizeMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    let flags = header.flags();
    let aux = header.aux();
    let body = if flags.is_control() {
        Body::Control(aux)
    } else if flags.is_binary() {
        let available = bytes.len() - HEADER_SIZE;
        let len = aux as usize;
        if len > available {
            return Err(Error::InvalidBinaryLength {
                declared: len,
                available,
            });
        }
        Body::Binary(Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + len]))
    } else {
        Body::Fields(decode_fields(bytes, aux)?)
    };

    trace!(
        code = header.message_code(),
        id = header.message_id(),
        flags = %flags,
        aux,
        "decoded message"
    );
    Ok(Message::from_parts(
        header.message_code(),
        header.message_id(),
        flags,
        body,
    ))
}

fn decode_fields(bytes: &[u8], count: u32) -> Result<BTreeMap<u32, Field>> {
    let mut fields = BTreeMap::new();
    let mut offset = HEADER_SIZE;

    for _ in 0..count {
        let (field, consumed) = Field::from_binary(&bytes[offset..])?;
        offset += consumed;
        if offset > bytes.len() {
            return Err(Error::TruncatedMessage {
                needed: offset,
                got: bytes.len(),
            });
        }
        fields.insert(field.id(), field);
    }

    if offset < bytes.len() {
        debug!(
            trailing = bytes.len() - offset,
            "ignoring bytes after last field"
        );
    }
    Ok(fields)
}

fn checked_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::PayloadTooLarge {
        size: len,
        max: MAX_MESSAGE_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldType, FieldValue, Flags};

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut original = Message::with_id(0x1234, 42);
        original.set(1, "hello").unwrap();
        original.set(2, 7u32).unwrap();
        original.set_int64(3, u64::MAX);

        let encoded = encode(&original).unwrap();
        let decoded = decode(&encoded).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.value(1).and_then(FieldValue::as_str), Some("hello"));
    }

    #[test]
    fn test_control_message_has_no_body() {
        let mut msg = Message::new(100);
        msg.set_control_data(200);

        let encoded = encode(&msg).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(decode(&encoded).unwrap().control_data(), Some(200));
    }

    #[test]
    fn test_binary_padding() {
        for (len, total) in [(0, 16), (1, 24), (16, 32), (19, 40), (20, 40)] {
            let mut msg = Message::new(100);
            msg.set_binary_data(vec![0xAB; len]);

            let encoded = encode(&msg).unwrap();
            assert_eq!(encoded.len(), total, "payload of {len} bytes");
            assert_eq!(&encoded[12..16], &(len as u32).to_be_bytes());
            assert!(encoded[HEADER_SIZE + len..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn test_fields_serialized_in_id_order() {
        let mut msg = Message::new(1);
        for id in [301u32, 300, 303, 302] {
            msg.set(id, id).unwrap();
        }

        let encoded = encode(&msg).unwrap();
        let ids: Vec<u32> = encoded[HEADER_SIZE..]
            .chunks(16)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(ids, [300, 301, 302, 303]);
    }

    #[test]
    fn test_decode_buffer_too_small() {
        let result = decode(&[0u8; 10]);
        assert_eq!(result, Err(Error::TruncatedMessage { needed: 16, got: 10 }));
    }

    #[test]
    fn test_decode_trailing_garbage() {
        let mut msg = Message::new(100);
        msg.set_control_data(1);
        let mut encoded = encode(&msg).unwrap().to_vec();
        encoded.extend_from_slice(&[0; 8]);

        let result = decode(&encoded);
        assert_eq!(
            result,
            Err(Error::SizeMismatch {
                declared: 16,
                actual: 24
            })
        );
    }

    #[test]
    fn test_decode_invalid_binary_length() {
        let mut msg = Message::new(100);
        msg.set_binary_data(vec![1u8; 8]);
        let mut encoded = encode(&msg).unwrap().to_vec();
        encoded[12..16].copy_from_slice(&9u32.to_be_bytes());

        let result = decode(&encoded);
        assert_eq!(
            result,
            Err(Error::InvalidBinaryLength {
                declared: 9,
                available: 8
            })
        );
    }

    #[test]
    fn test_decode_field_count_overrun() {
        let mut msg = Message::new(100);
        msg.set(1, 1u32).unwrap();
        let mut encoded = encode(&msg).unwrap().to_vec();
        encoded[12..16].copy_from_slice(&2u32.to_be_bytes());

        let result = decode(&encoded);
        assert!(matches!(result, Err(Error::TruncatedMessage { .. })));
    }

    #[test]
    fn test_decode_unknown_field_type() {
        let mut msg = Message::new(100);
        msg.set(1, 1u32).unwrap();
        let mut encoded = encode(&msg).unwrap().to_vec();
        encoded[HEADER_SIZE + 4] = 42;

        let result = decode(&encoded);
        assert_eq!(result, Err(Error::UnknownFieldType { tag: 42 }));
    }

    #[test]
    fn test_control_wins_over_binary() {
        let mut header = [0u8; HEADER_SIZE];
        MessageHeader::new(7, Flags::CONTROL | Flags::BINARY, 16, 1, 99)
            .write_to(&mut &mut header[..]);

        let decoded = decode(&header).unwrap();
        assert_eq!(decoded.control_data(), Some(99));
        assert_eq!(decoded.flags(), Flags::CONTROL | Flags::BINARY);
        assert_eq!(&encode(&decoded).unwrap()[..], &header[..]);
    }

    #[test]
    fn test_duplicate_field_ids_last_wins() {
        let first = Field::new(5, FieldValue::Integer(1)).serialize().unwrap();
        let second = Field::new(5, FieldValue::Integer(2)).serialize().unwrap();
        let total = HEADER_SIZE + first.len() + second.len();

        let mut bytes = Vec::with_capacity(total);
        MessageHeader::new(1, Flags::empty(), total as u32, 0, 2).write_to(&mut bytes);
        bytes.extend_from_slice(&first);
        bytes.extend_from_slice(&second);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.field_count(), 1);
        assert_eq!(decoded.value(5), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_explicit_tag_survives_decode() {
        let mut msg = Message::new(1);
        msg.set_typed(9, 1000u32, FieldType::Int16).unwrap();

        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded.get(9).unwrap().field_type(), FieldType::Int16);
    }

    // Property-based tests
    #[cfg(test)]
    mod proptests {
        use super::*;
        use crate::{ALIGNMENT, InetAddress};
        use proptest::prelude::*;
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

        fn inet_strategy() -> impl Strategy<Value = InetAddress> {
            prop_oneof![
                (any::<u32>(), 0u8..=32).prop_map(|(addr, prefix)| {
                    InetAddress::new(IpAddr::V4(Ipv4Addr::from(addr)), prefix).unwrap()
                }),
                (any::<u128>(), 0u8..=128).prop_map(|(addr, prefix)| {
                    InetAddress::new(IpAddr::V6(Ipv6Addr::from(addr)), prefix).unwrap()
                }),
                Just(InetAddress::Unspecified),
            ]
        }

        // NaN is excluded since it never compares equal
        fn value_strategy() -> impl Strategy<Value = FieldValue> {
            prop_oneof![
                any::<u32>().prop_map(FieldValue::Integer),
                any::<u16>().prop_map(FieldValue::Int16),
                any::<u64>().prop_map(FieldValue::Int64),
                any::<f64>()
                    .prop_filter("not NaN", |v| !v.is_nan())
                    .prop_map(FieldValue::Float),
                ".{0,40}".prop_map(FieldValue::String),
                prop::collection::vec(any::<u8>(), 0..=64)
                    .prop_map(|data| FieldValue::Binary(Bytes::from(data))),
                inet_strategy().prop_map(FieldValue::InetAddr),
            ]
        }

        fn field_message_strategy() -> impl Strategy<Value = Message> {
            (
                any::<u16>(),
                any::<u32>(),
                prop::collection::vec((any::<u32>(), value_strategy()), 0..12),
            )
                .prop_map(|(code, id, fields)| {
                    let mut msg = Message::with_id(code, id);
                    for (field_id, value) in fields {
                        msg.insert(Field::new(field_id, value));
                    }
                    msg
                })
        }

        fn message_strategy() -> impl Strategy<Value = Message> {
            prop_oneof![
                field_message_strategy(),
                (any::<u16>(), any::<u32>(), any::<u32>()).prop_map(|(code, id, value)| {
                    let mut msg = Message::with_id(code, id);
                    msg.set_control_data(value);
                    msg
                }),
                (
                    any::<u16>(),
                    any::<u32>(),
                    prop::collection::vec(any::<u8>(), 0..=256)
                )
                    .prop_map(|(code, id, data)| {
                        let mut msg = Message::with_id(code, id);
                        msg.set_binary_data(data);
                        msg
                    }),
            ]
        }

        proptest! {
            /// Property: Any valid message should roundtrip correctly
            #[test]
            fn prop_roundtrip_preserves_data(msg in message_strategy()) {
                let encoded = encode(&msg).unwrap();
                let decoded = decode(&encoded).unwrap();

                prop_assert_eq!(decoded, msg);
            }

            /// Property: Re-encoding a decoded buffer is byte-identical
            #[test]
            fn prop_reencode_is_identical(
                msg in message_strategy(),
                extra_flags in any::<u16>(),
            ) {
                let mut msg = msg;
                msg.insert_flags(Flags::from_u16(extra_flags));
                let encoded = encode(&msg).unwrap();
                let decoded = decode(&encoded).unwrap();

                prop_assert_eq!(encode(&decoded).unwrap(), encoded);
            }

            /// Property: Messages and fields are always 8-byte aligned
            #[test]
            fn prop_alignment(msg in message_strategy()) {
                let encoded = encode(&msg).unwrap();
                prop_assert_eq!(encoded.len() % ALIGNMENT, 0);

                for field in msg.fields() {
                    let bytes = field.serialize().unwrap();
                    prop_assert_eq!(bytes.len() % ALIGNMENT, 0);

                    let (_, consumed) = Field::from_binary(&bytes).unwrap();
                    prop_assert_eq!(consumed, bytes.len());
                }
            }

            /// Property: Any truncation is detected
            #[test]
            fn prop_truncation_rejected(
                msg in message_strategy(),
                cut_ratio in 0.0f64..1.0,
            ) {
                let encoded = encode(&msg).unwrap();
                let cut = 1 + ((encoded.len() - 1) as f64 * cut_ratio) as usize;

                let result = decode(&encoded[..encoded.len() - cut]);
                prop_assert!(
                    matches!(result, Err(Error::TruncatedMessage { .. })),
                    "cut {} bytes: {:?}", cut, result
                );
            }

            /// Property: Trailing bytes are a size mismatch
            #[test]
            fn prop_extension_rejected(
                msg in message_strategy(),
                extra in prop::collection::vec(any::<u8>(), 1..32),
            ) {
                let mut encoded = encode(&msg).unwrap().to_vec();
                encoded.extend_from_slice(&extra);

                let result = decode(&encoded);
                prop_assert!(
                    matches!(result, Err(Error::SizeMismatch { .. })),
                    "{:?}", result
                );
            }

            /// Property: Arbitrary input never panics
            #[test]
            fn prop_garbage_does_not_panic(
                bytes in prop::collection::vec(any::<u8>(), 0..256),
            ) {
                let _ = decode(&bytes);
                let _ = Field::from_binary(&bytes);
            }
        }
    }
}
