//! Control-bus wire format: length-prefixed messages on a local stream
//! socket, built with the shared [`crate::wire`] codec.
//!
//! Requests: `[MSG_METHOD_CALL | name | args]`, `[MSG_GET_PROPERTY |
//! name]`, `[MSG_SUBSCRIBE]`. Replies: `[MSG_REPLY | payload]` or
//! `[MSG_ERROR | code | message]`. Notifications carry only the property
//! name (`[MSG_PROPERTY_CHANGED | name]`), the client re-fetches the
//! value (invalidation style).

use crate::error::{Error, Result};
use crate::wire::{WireReader, WireWriter};

pub const MSG_METHOD_CALL: u8 = 0x00;
pub const MSG_GET_PROPERTY: u8 = 0x01;
pub const MSG_SUBSCRIBE: u8 = 0x02;
pub const MSG_REPLY: u8 = 0x80;
pub const MSG_ERROR: u8 = 0x81;
pub const MSG_PROPERTY_CHANGED: u8 = 0x82;

/// A decoded client request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    MethodCall { name: String, args: Vec<u8> },
    GetProperty { name: String },
    Subscribe,
}

impl Request {
    pub fn decode(payload: &[u8]) -> Result<Request> {
        let mut reader = WireReader::new(payload);
        match reader.pop_u8()? {
            MSG_METHOD_CALL => Ok(Request::MethodCall {
                name: reader.pop_str()?,
                args: reader.peek_rest().to_vec(),
            }),
            MSG_GET_PROPERTY => Ok(Request::GetProperty {
                name: reader.pop_str()?,
            }),
            MSG_SUBSCRIBE => Ok(Request::Subscribe),
            other => Err(Error::Malformed(format!(
                "unknown control message kind 0x{:02x}",
                other
            ))),
        }
    }

    pub fn encode_method_call(name: &str, args: &[u8]) -> Vec<u8> {
        let mut writer = WireWriter::new();
        writer.push_u8(MSG_METHOD_CALL);
        writer.push_str(name);
        writer.push_data(args);
        writer.into_vec()
    }

    pub fn encode_get_property(name: &str) -> Vec<u8> {
        let mut writer = WireWriter::new();
        writer.push_u8(MSG_GET_PROPERTY);
        writer.push_str(name);
        writer.into_vec()
    }

    pub fn encode_subscribe() -> Vec<u8> {
        vec![MSG_SUBSCRIBE]
    }
}

pub fn encode_reply(payload: &[u8]) -> Vec<u8> {
    let mut writer = WireWriter::new();
    writer.push_u8(MSG_REPLY);
    writer.push_data(payload);
    writer.into_vec()
}

pub fn encode_error(err: &Error) -> Vec<u8> {
    let mut writer = WireWriter::new();
    writer.push_u8(MSG_ERROR);
    writer.push_u8(err.code());
    writer.push_str(&err.to_string());
    writer.into_vec()
}

pub fn encode_property_changed(name: &str) -> Vec<u8> {
    let mut writer = WireWriter::new();
    writer.push_u8(MSG_PROPERTY_CHANGED);
    writer.push_str(name);
    writer.into_vec()
}

/// Splits complete `[len:le16 | message]` frames out of a stream buffer.
pub fn next_message(rx: &mut Vec<u8>) -> Option<Vec<u8>> {
    if rx.len() < 2 {
        return None;
    }
    let len = u16::from_le_bytes([rx[0], rx[1]]) as usize;
    if rx.len() < 2 + len {
        return None;
    }
    let message = rx[2..2 + len].to_vec();
    rx.drain(..2 + len);
    Some(message)
}

/// Wraps a message with its length prefix.
pub fn frame_message(message: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(2 + message.len());
    framed.extend_from_slice(&(message.len() as u16).to_le_bytes());
    framed.extend_from_slice(message);
    framed
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let encoded = Request::encode_method_call("InstallGtk", &[1, 2, 3]);
        assert_eq!(
            Request::MethodCall {
                name: "InstallGtk".into(),
                args: vec![1, 2, 3],
            },
            Request::decode(&encoded).unwrap()
        );

        let encoded = Request::encode_get_property("Gtks");
        assert_eq!(
            Request::GetProperty {
                name: "Gtks".into()
            },
            Request::decode(&encoded).unwrap()
        );

        assert_eq!(
            Request::Subscribe,
            Request::decode(&Request::encode_subscribe()).unwrap()
        );
    }

    #[test]
    fn framing() {
        let mut rx = Vec::new();
        rx.extend_from_slice(&frame_message(&[1, 2, 3]));
        rx.extend_from_slice(&frame_message(&[4]));
        assert_eq!(Some(vec![1, 2, 3]), next_message(&mut rx));
        assert_eq!(Some(vec![4]), next_message(&mut rx));
        assert_eq!(None, next_message(&mut rx));
    }

    #[test]
    fn partial_message() {
        let framed = frame_message(&[1, 2, 3, 4]);
        let mut rx = framed[..4].to_vec();
        assert_eq!(None, next_message(&mut rx));
        rx.extend_from_slice(&framed[4..]);
        assert_eq!(Some(vec![1, 2, 3, 4]), next_message(&mut rx));
    }
}
