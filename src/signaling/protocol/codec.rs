use super::{ClientIdentity, Msg, MsgType, ProtoError, SignalPayload};
use std::str;

// ---- Encode to body bytes -------------------------------------------------

/// Serializes `msg` into its type byte and body.
///
/// # Errors
///
/// [`ProtoError::StringTooLong`] if a string exceeds the str16 limit and
/// [`ProtoError::TooLarge`] if a payload does not fit a u32 length.
pub fn encode_msg(msg: &Msg) -> Result<(MsgType, Vec<u8>), ProtoError> {
    use Msg::*;
    let mut body = Vec::new();

    let msg_type = match msg {
        Hello { client_version } => {
            put_str16(&mut body, client_version)?;
            MsgType::Hello
        }
        IdentityAssigned { client_id } => {
            put_str16(&mut body, client_id.as_str())?;
            MsgType::IdentityAssigned
        }
        Invite {
            user_to_call,
            signal_data,
            from,
            name,
        } => {
            put_str16(&mut body, user_to_call.as_str())?;
            put_bytes32(&mut body, signal_data.as_bytes())?;
            put_str16(&mut body, from.as_str())?;
            put_str16(&mut body, name)?;
            MsgType::Invite
        }
        IncomingInvite { signal, from, name } => {
            put_bytes32(&mut body, signal.as_bytes())?;
            put_str16(&mut body, from.as_str())?;
            put_str16(&mut body, name)?;
            MsgType::IncomingInvite
        }
        Accept { signal, to } => {
            put_bytes32(&mut body, signal.as_bytes())?;
            put_str16(&mut body, to.as_str())?;
            MsgType::Accept
        }
        Accepted { signal } => {
            put_bytes32(&mut body, signal.as_bytes())?;
            MsgType::Accepted
        }
        Ping { nonce } => {
            put_u64(&mut body, *nonce);
            MsgType::Ping
        }
        Pong { nonce } => {
            put_u64(&mut body, *nonce);
            MsgType::Pong
        }
    };

    Ok((msg_type, body))
}

// ---- Decode from body bytes ----------------------------------------------

/// Parses a body of the given type. The whole body must be consumed.
///
/// # Errors
///
/// [`ProtoError::Truncated`], [`ProtoError::InvalidUtf8`] or
/// [`ProtoError::InvalidFormat`] for trailing bytes.
pub fn decode_msg(msg_type: MsgType, body: &[u8]) -> Result<Msg, ProtoError> {
    let mut cursor = Cursor::new(body);

    let msg = match msg_type {
        MsgType::Hello => Msg::Hello {
            client_version: cursor.get_str16()?.to_owned(),
        },
        MsgType::IdentityAssigned => Msg::IdentityAssigned {
            client_id: cursor.get_identity()?,
        },
        MsgType::Invite => {
            let user_to_call = cursor.get_identity()?;
            let signal_data = cursor.get_payload()?;
            let from = cursor.get_identity()?;
            let name = cursor.get_str16()?.to_owned();
            Msg::Invite {
                user_to_call,
                signal_data,
                from,
                name,
            }
        }
        MsgType::IncomingInvite => {
            let signal = cursor.get_payload()?;
            let from = cursor.get_identity()?;
            let name = cursor.get_str16()?.to_owned();
            Msg::IncomingInvite { signal, from, name }
        }
        MsgType::Accept => {
            let signal = cursor.get_payload()?;
            let to = cursor.get_identity()?;
            Msg::Accept { signal, to }
        }
        MsgType::Accepted => Msg::Accepted {
            signal: cursor.get_payload()?,
        },
        MsgType::Ping => Msg::Ping {
            nonce: cursor.get_u64()?,
        },
        MsgType::Pong => Msg::Pong {
            nonce: cursor.get_u64()?,
        },
    };

    cursor.finish()?;
    Ok(msg)
}

// ---- Primitive write helpers ---------------------------------------------

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// str16 = u16 length + UTF-8 bytes
fn put_str16(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtoError> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| ProtoError::StringTooLong {
        max: u16::MAX as usize,
        actual: bytes.len(),
    })?;
    put_u16(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// bytes32 = u32 length + raw bytes
fn put_bytes32(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), ProtoError> {
    let len = u32::try_from(bytes.len()).map_err(|_| ProtoError::TooLarge)?;
    put_u32(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

// ---- Cursor for decoding --------------------------------------------------

#[derive(Debug)]
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtoError> {
        let bytes = self.get_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn get_u16(&mut self) -> Result<u16, ProtoError> {
        Ok(u16::from_be_bytes(self.take::<2>()?))
    }

    fn get_u32(&mut self) -> Result<u32, ProtoError> {
        Ok(u32::from_be_bytes(self.take::<4>()?))
    }

    fn get_u64(&mut self) -> Result<u64, ProtoError> {
        Ok(u64::from_be_bytes(self.take::<8>()?))
    }

    fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtoError> {
        if self.buf.len() < len {
            return Err(ProtoError::Truncated);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    fn get_str16(&mut self) -> Result<&'a str, ProtoError> {
        let len = self.get_u16()? as usize;
        let bytes = self.get_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)
    }

    fn get_identity(&mut self) -> Result<ClientIdentity, ProtoError> {
        self.get_str16().map(ClientIdentity::from)
    }

    fn get_payload(&mut self) -> Result<SignalPayload, ProtoError> {
        let len = self.get_u32()? as usize;
        Ok(SignalPayload::new(self.get_bytes(len)?.to_vec()))
    }

    fn finish(self) -> Result<(), ProtoError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtoError::InvalidFormat("trailing bytes in message body"))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn invite() -> Msg {
        Msg::Invite {
            user_to_call: "xyz789".into(),
            signal_data: SignalPayload::new(b"peercall-udp/1 offer 127.0.0.1:4000 7".to_vec()),
            from: "abc123".into(),
            name: "Ana".into(),
        }
    }

    #[test]
    fn invite_body_layout_is_str16_bytes32_str16_str16() {
        let (t, body) = encode_msg(&invite()).unwrap();
        assert_eq!(t, MsgType::Invite);
        assert_eq!(&body[..2], &[0, 6]);
        assert_eq!(&body[2..8], b"xyz789");
        assert_eq!(&body[8..12], &37u32.to_be_bytes());
        assert_eq!(decode_msg(t, &body).unwrap(), invite());
    }

    #[test]
    fn binary_payload_survives_byte_for_byte() {
        let raw: Vec<u8> = (0..=255u8).chain([0, 0, 0xff]).collect();
        let msg = Msg::Accept {
            signal: SignalPayload::new(raw.clone()),
            to: "abc123".into(),
        };
        let (t, body) = encode_msg(&msg).unwrap();
        match decode_msg(t, &body).unwrap() {
            Msg::Accept { signal, to } => {
                assert_eq!(signal.as_bytes(), raw.as_slice());
                assert_eq!(to.as_str(), "abc123");
            }
            other => panic!("expected Accept, got {other:?}"),
        }
    }

    #[test]
    fn empty_identity_and_payload_are_legal() {
        let msg = Msg::Invite {
            user_to_call: "".into(),
            signal_data: SignalPayload::default(),
            from: "".into(),
            name: String::new(),
        };
        let (t, body) = encode_msg(&msg).unwrap();
        assert_eq!(decode_msg(t, &body).unwrap(), msg);
    }

    #[test]
    fn truncated_body_is_rejected() {
        let (t, body) = encode_msg(&invite()).unwrap();
        assert!(matches!(
            decode_msg(t, &body[..body.len() - 1]),
            Err(ProtoError::Truncated)
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let (t, mut body) = encode_msg(&Msg::Ping { nonce: 1 }).unwrap();
        body.push(0);
        assert!(matches!(
            decode_msg(t, &body),
            Err(ProtoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn invalid_utf8_in_identity_is_rejected() {
        let body = [0u8, 2, 0xc3, 0x28];
        assert!(matches!(
            decode_msg(MsgType::IdentityAssigned, &body),
            Err(ProtoError::InvalidUtf8)
        ));
    }

    #[test]
    fn oversize_name_is_rejected_on_encode() {
        let msg = Msg::Hello {
            client_version: "x".repeat(u16::MAX as usize + 1),
        };
        assert!(matches!(
            encode_msg(&msg),
            Err(ProtoError::StringTooLong { .. })
        ));
    }
}
