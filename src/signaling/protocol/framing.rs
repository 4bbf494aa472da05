use super::{FrameError, MAX_FRAME_HEADER, MsgType, PROTO_VERSION, ProtoError};
use std::io::{self, Read, Write};

/// Write a single frame: [ver][type][reserved u16=0][len u32][body...]
///
/// # Errors
///
/// Any I/O error from the writer, or `InvalidInput` if the body overflows u32.
pub fn write_frame<W: Write>(w: &mut W, msg_type: MsgType, body: &[u8]) -> io::Result<()> {
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "body too large"))?;
    let mut header = [0u8; MAX_FRAME_HEADER];
    header[0] = PROTO_VERSION;
    header[1] = msg_type.as_u8();
    header[4..8].copy_from_slice(&len.to_be_bytes());
    w.write_all(&header)?;
    w.write_all(body)?;
    w.flush()
}

/// Read a single frame, enforcing a max body length.
///
/// # Errors
///
/// [`FrameError::Io`] on read failure or EOF, [`FrameError::Proto`] on a bad
/// version, unknown type or oversize body.
pub fn read_frame<R: Read>(r: &mut R, max_body: usize) -> Result<(MsgType, Vec<u8>), FrameError> {
    let mut header = [0u8; MAX_FRAME_HEADER];
    r.read_exact(&mut header)?;

    if header[0] != PROTO_VERSION {
        return Err(ProtoError::InvalidFormat("bad proto version").into());
    }
    let msg_type = MsgType::from_u8(header[1])?;

    // flags (header[2..4]) are reserved
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len > max_body {
        return Err(ProtoError::TooLarge.into());
    }

    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?;
    Ok((msg_type, body))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_carries_version_type_and_length() {
        let mut out = Vec::new();
        write_frame(&mut out, MsgType::Pong, &[1, 2, 3]).unwrap();
        assert_eq!(out, vec![PROTO_VERSION, 0x31, 0, 0, 0, 0, 0, 3, 1, 2, 3]);
    }

    #[test]
    fn bad_version_is_rejected() {
        let frame = [9u8, 0x30, 0, 0, 0, 0, 0, 0];
        let err = read_frame(&mut Cursor::new(frame), 16).unwrap_err();
        assert!(matches!(err, FrameError::Proto(ProtoError::InvalidFormat(_))));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let frame = [PROTO_VERSION, 0x7f, 0, 0, 0, 0, 0, 0];
        let err = read_frame(&mut Cursor::new(frame), 16).unwrap_err();
        assert!(matches!(err, FrameError::Proto(ProtoError::UnknownType(0x7f))));
    }

    #[test]
    fn body_over_limit_is_rejected_without_reading_it() {
        let frame = [PROTO_VERSION, 0x13, 0, 0, 0, 0, 0, 32];
        let err = read_frame(&mut Cursor::new(frame), 16).unwrap_err();
        assert!(matches!(err, FrameError::Proto(ProtoError::TooLarge)));
    }

    #[test]
    fn short_body_is_io_error() {
        let frame = [PROTO_VERSION, 0x30, 0, 0, 0, 0, 0, 8, 1, 2];
        let err = read_frame(&mut Cursor::new(frame), 16).unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }
}
