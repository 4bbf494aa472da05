//! Binary framing for the relay: a fixed 8-byte header followed by a typed body.
mod codec;
mod constants;
mod errors;
mod framing;
mod msg;
mod msg_type;
mod types;

pub use codec::{decode_msg, encode_msg};
pub use constants::{MAX_BODY_LEN, MAX_FRAME_HEADER, PROTO_VERSION};
pub use errors::{FrameError, ProtoError};
pub use framing::{read_frame, write_frame};
pub use msg::Msg;
pub use msg_type::MsgType;
pub use types::{ClientIdentity, SignalPayload};

use std::io::{Read, Write};

/// Reads and decodes exactly one message.
///
/// # Errors
///
/// [`FrameError::Io`] on socket errors (including EOF) and
/// [`FrameError::Proto`] on malformed frames.
pub fn read_msg<R: Read>(r: &mut R) -> Result<Msg, FrameError> {
    let (msg_type, body) = read_frame(r, MAX_BODY_LEN)?;
    Ok(decode_msg(msg_type, &body)?)
}

/// Encodes and writes one message, flushing the writer.
///
/// # Errors
///
/// See [`read_msg`].
pub fn write_msg<W: Write>(w: &mut W, msg: &Msg) -> Result<(), FrameError> {
    let (msg_type, body) = encode_msg(msg)?;
    if body.len() > MAX_BODY_LEN {
        return Err(ProtoError::TooLarge.into());
    }
    write_frame(w, msg_type, &body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stream_of_messages_reads_back_in_order() {
        let mut wire = Vec::new();
        write_msg(
            &mut wire,
            &Msg::IdentityAssigned {
                client_id: ClientIdentity::from("abc123"),
            },
        )
        .unwrap();
        write_msg(&mut wire, &Msg::Ping { nonce: 9 }).unwrap();

        let mut cur = Cursor::new(wire);
        assert_eq!(
            read_msg(&mut cur).unwrap(),
            Msg::IdentityAssigned {
                client_id: ClientIdentity::from("abc123")
            }
        );
        assert_eq!(read_msg(&mut cur).unwrap(), Msg::Ping { nonce: 9 });
        assert!(matches!(read_msg(&mut cur), Err(FrameError::Io(_))));
    }

    #[test]
    fn oversize_payload_is_refused_before_writing() {
        let mut wire = Vec::new();
        let msg = Msg::Accepted {
            signal: SignalPayload::new(vec![0u8; MAX_BODY_LEN + 1]),
        };
        assert!(matches!(
            write_msg(&mut wire, &msg),
            Err(FrameError::Proto(ProtoError::TooLarge))
        ));
        assert!(wire.is_empty());
    }
}
