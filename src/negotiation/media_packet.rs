//! Datagram format of the direct media link.
//!
//! ```text
//! magic u16 | kind u8 | token u64 | seq u32 | idx u16 | count u16 | width u16 | height u16 | data
//! ```
//! All integers big endian. A frame is split into `count` chunks that share
//! `seq`; `Hello` packets carry no data and only prove reachability.
//!
//! `Audio` packets reuse the layout: `width` is the channel count, `height`
//! the sample rate in Hz and the data is interleaved 16-bit PCM. Each audio
//! packet stands on its own, so a lost one is just a short gap.

use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::media::{AudioFrame, VideoFrame};

pub const MAGIC: u16 = 0x5043;
pub const HEADER_LEN: usize = 23;
pub const MAX_DATAGRAM: usize = 1200;
pub const MAX_CHUNK: usize = MAX_DATAGRAM - HEADER_LEN;
const MAX_DIM: u16 = 4096;
const MAX_CHANNELS: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Hello,
    Frame,
    Audio,
}

impl PacketKind {
    const HELLO: u8 = 1;
    const FRAME: u8 = 2;
    const AUDIO: u8 = 3;

    const fn as_u8(self) -> u8 {
        match self {
            Self::Hello => Self::HELLO,
            Self::Frame => Self::FRAME,
            Self::Audio => Self::AUDIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPacket {
    pub kind: PacketKind,
    pub token: u64,
    pub seq: u32,
    pub chunk_idx: u16,
    pub chunk_count: u16,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

impl MediaPacket {
    #[must_use]
    pub const fn hello(token: u64) -> Self {
        Self {
            kind: PacketKind::Hello,
            token,
            seq: 0,
            chunk_idx: 0,
            chunk_count: 0,
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    /// # Errors
    /// Only if the data would not fit one datagram.
    pub fn serialize(&self) -> io::Result<Vec<u8>> {
        if self.data.len() > MAX_CHUNK {
            return Err(invalid(format!("chunk of {} bytes", self.data.len())));
        }
        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len());
        buf.write_u16::<BigEndian>(MAGIC)?;
        buf.write_u8(self.kind.as_u8())?;
        buf.write_u64::<BigEndian>(self.token)?;
        buf.write_u32::<BigEndian>(self.seq)?;
        buf.write_u16::<BigEndian>(self.chunk_idx)?;
        buf.write_u16::<BigEndian>(self.chunk_count)?;
        buf.write_u16::<BigEndian>(self.width)?;
        buf.write_u16::<BigEndian>(self.height)?;
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    /// # Errors
    /// `InvalidData` for foreign magic, an unknown kind or bad chunk indices;
    /// `UnexpectedEof` for a short header.
    pub fn deserialize(datagram: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(datagram);
        if cursor.read_u16::<BigEndian>()? != MAGIC {
            return Err(invalid("bad magic"));
        }
        let kind = match cursor.read_u8()? {
            PacketKind::HELLO => PacketKind::Hello,
            PacketKind::FRAME => PacketKind::Frame,
            PacketKind::AUDIO => PacketKind::Audio,
            other => return Err(invalid(format!("unknown packet kind {other}"))),
        };
        let token = cursor.read_u64::<BigEndian>()?;
        let seq = cursor.read_u32::<BigEndian>()?;
        let chunk_idx = cursor.read_u16::<BigEndian>()?;
        let chunk_count = cursor.read_u16::<BigEndian>()?;
        let width = cursor.read_u16::<BigEndian>()?;
        let height = cursor.read_u16::<BigEndian>()?;
        let mut data = Vec::new();
        cursor.read_to_end(&mut data)?;

        if kind != PacketKind::Hello && chunk_idx >= chunk_count {
            return Err(invalid(format!("chunk {chunk_idx} of {chunk_count}")));
        }
        Ok(Self {
            kind,
            token,
            seq,
            chunk_idx,
            chunk_count,
            width,
            height,
            data,
        })
    }
}

/// Splits a frame into datagram-sized packets. Frames too large for the
/// header fields yield nothing.
#[must_use]
pub fn chunk_frame(token: u64, seq: u32, frame: &VideoFrame) -> Vec<MediaPacket> {
    let (Ok(width), Ok(height)) = (u16::try_from(frame.width), u16::try_from(frame.height)) else {
        return Vec::new();
    };
    if !frame.is_well_formed() || frame.bytes.is_empty() {
        return Vec::new();
    }
    let Ok(chunk_count) = u16::try_from(frame.bytes.len().div_ceil(MAX_CHUNK)) else {
        return Vec::new();
    };
    frame
        .bytes
        .chunks(MAX_CHUNK)
        .zip(0u16..)
        .map(|(data, chunk_idx)| MediaPacket {
            kind: PacketKind::Frame,
            token,
            seq,
            chunk_idx,
            chunk_count,
            width,
            height,
            data: data.to_vec(),
        })
        .collect()
}

/// Splits captured audio into datagram-sized packets sharing `seq`, never
/// cutting a multi-channel sample apart. Rates above 65535 Hz or more than
/// eight channels yield nothing.
#[must_use]
pub fn audio_packets(token: u64, seq: u32, audio: &AudioFrame) -> Vec<MediaPacket> {
    let Ok(rate) = u16::try_from(audio.sample_rate_hz) else {
        return Vec::new();
    };
    let channels = audio.channels;
    if rate == 0 || channels == 0 || channels > MAX_CHANNELS || audio.samples.is_empty() {
        return Vec::new();
    }
    let per_packet = (MAX_CHUNK / 2) / usize::from(channels) * usize::from(channels);
    let Ok(chunk_count) = u16::try_from(audio.samples.len().div_ceil(per_packet)) else {
        return Vec::new();
    };
    audio
        .samples
        .chunks(per_packet)
        .zip(0u16..)
        .map(|(part, chunk_idx)| {
            let mut data = Vec::with_capacity(part.len() * 2);
            for &v in part {
                data.extend_from_slice(&v.to_be_bytes());
            }
            MediaPacket {
                kind: PacketKind::Audio,
                token,
                seq,
                chunk_idx,
                chunk_count,
                width: channels,
                height: rate,
                data,
            }
        })
        .collect()
}

/// Reads the PCM out of one `Audio` packet.
#[must_use]
pub fn decode_audio(pkt: &MediaPacket) -> Option<AudioFrame> {
    let channels = pkt.width;
    if pkt.kind != PacketKind::Audio
        || channels == 0
        || channels > MAX_CHANNELS
        || pkt.height == 0
        || pkt.data.is_empty()
        || pkt.data.len() % (2 * usize::from(channels)) != 0
    {
        return None;
    }
    let mut cursor = Cursor::new(&pkt.data);
    let mut samples = Vec::with_capacity(pkt.data.len() / 2);
    while let Ok(v) = cursor.read_i16::<BigEndian>() {
        samples.push(v);
    }
    Some(AudioFrame::new(u32::from(pkt.height), channels, samples))
}

/// Rebuilds frames from chunks. Only the newest sequence number is tracked;
/// a frame with a missing chunk is simply skipped.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    seq: Option<u32>,
    width: u16,
    height: u16,
    chunks: Vec<Option<Vec<u8>>>,
    received: usize,
}

impl FrameAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one `Frame` packet; returns the frame once all its chunks are in.
    pub fn push(&mut self, pkt: MediaPacket) -> Option<VideoFrame> {
        if pkt.kind != PacketKind::Frame
            || pkt.width == 0
            || pkt.height == 0
            || pkt.width > MAX_DIM
            || pkt.height > MAX_DIM
        {
            return None;
        }
        match self.seq {
            Some(cur) if pkt.seq < cur => return None,
            Some(cur) if pkt.seq == cur => {
                if (pkt.width, pkt.height) != (self.width, self.height)
                    || usize::from(pkt.chunk_count) != self.chunks.len()
                {
                    return None;
                }
            }
            _ => {
                self.seq = Some(pkt.seq);
                self.width = pkt.width;
                self.height = pkt.height;
                self.chunks = vec![None; usize::from(pkt.chunk_count)];
                self.received = 0;
            }
        }

        let slot = self.chunks.get_mut(usize::from(pkt.chunk_idx))?;
        if slot.is_none() {
            *slot = Some(pkt.data);
            self.received += 1;
        }
        if self.received < self.chunks.len() {
            return None;
        }

        let bytes: Vec<u8> = self.chunks.drain(..).flatten().flatten().collect();
        self.received = 0;
        let frame = VideoFrame::new(u32::from(self.width), u32::from(self.height), bytes);
        frame.is_well_formed().then_some(frame)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn hello_survives_the_wire() {
        let bytes = MediaPacket::hello(42).serialize().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        let back = MediaPacket::deserialize(&bytes).unwrap();
        assert_eq!(back.kind, PacketKind::Hello);
        assert_eq!(back.token, 42);
    }

    #[test]
    fn foreign_datagrams_are_rejected() {
        assert!(MediaPacket::deserialize(b"hello world, not ours at all").is_err());
        assert!(MediaPacket::deserialize(&[0x50]).is_err());
        let mut bytes = MediaPacket::hello(1).serialize().unwrap();
        bytes[2] = 9;
        assert!(MediaPacket::deserialize(&bytes).is_err());
    }

    #[test]
    fn frame_is_chunked_within_datagram_limit_and_reassembled() {
        let frame = VideoFrame::synthetic(64, 48, 7);
        let packets = chunk_frame(5, 1, &frame);
        assert_eq!(packets.len(), frame.bytes.len().div_ceil(MAX_CHUNK));

        let mut asm = FrameAssembler::new();
        let mut out = None;
        // deliver in reverse order
        for p in packets.into_iter().rev() {
            let wire = p.serialize().unwrap();
            assert!(wire.len() <= MAX_DATAGRAM);
            out = asm.push(MediaPacket::deserialize(&wire).unwrap());
        }
        let out = out.unwrap();
        assert_eq!((out.width, out.height), (64, 48));
        assert_eq!(out.bytes, frame.bytes);
    }

    #[test]
    fn audio_crosses_the_wire_in_datagram_sized_pieces() {
        let cfg = crate::media::AudioConfig::default_voice();
        let audio = crate::media::AudioFrame::tone(&cfg, 440.0, 0);
        let packets = audio_packets(9, 3, &audio);
        // 960 samples are 1920 bytes, more than one datagram holds
        assert_eq!(packets.len(), 2);

        let mut samples = Vec::new();
        for p in packets {
            let wire = p.serialize().unwrap();
            assert!(wire.len() <= MAX_DATAGRAM);
            let back = MediaPacket::deserialize(&wire).unwrap();
            assert_eq!((back.kind, back.token, back.seq), (PacketKind::Audio, 9, 3));
            let part = decode_audio(&back).unwrap();
            assert_eq!((part.sample_rate_hz, part.channels), (48_000, 1));
            samples.extend(part.samples);
        }
        assert_eq!(samples, audio.samples);
    }

    #[test]
    fn stereo_audio_is_split_on_sample_boundaries() {
        let audio = AudioFrame::new(44_100, 2, (0..1_200).map(|i| i as i16).collect());
        for p in audio_packets(1, 0, &audio) {
            assert_eq!(p.data.len() % 4, 0);
            assert_eq!(decode_audio(&p).unwrap().channels, 2);
        }
        assert!(audio_packets(1, 0, &AudioFrame::new(96_000, 1, vec![1, 2])).is_empty());
    }

    #[test]
    fn malformed_audio_is_not_decoded() {
        let mut p = audio_packets(1, 0, &AudioFrame::new(8_000, 2, vec![1, 2, 3, 4])).remove(0);
        p.data.pop();
        assert!(decode_audio(&p).is_none());
        p.data.clear();
        assert!(decode_audio(&p).is_none());
        assert!(decode_audio(&MediaPacket::hello(1)).is_none());
        // video chunks are not audio
        let v = chunk_frame(1, 0, &VideoFrame::synthetic(4, 4, 0)).remove(0);
        assert!(decode_audio(&v).is_none());
    }

    #[test]
    fn newer_frame_discards_incomplete_one() {
        let a = chunk_frame(1, 1, &VideoFrame::synthetic(32, 32, 0));
        let b = chunk_frame(1, 2, &VideoFrame::synthetic(32, 32, 1));
        assert!(a.len() > 1);

        let mut asm = FrameAssembler::new();
        assert!(asm.push(a[0].clone()).is_none());
        let mut done = None;
        for p in b {
            done = asm.push(p);
        }
        assert!(done.is_some());
        // stale chunk from the abandoned frame is ignored
        assert!(asm.push(a[1].clone()).is_none());
    }
}
