use std::{
    fmt, io,
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use rand::{RngCore, rngs::OsRng};

use crate::log::LogSink;
use crate::media::LocalStream;
use crate::negotiation::{
    media_packet::{self, FrameAssembler, MAX_DATAGRAM, MediaPacket, PacketKind},
    negotiation_error::NegotiationError,
    negotiation_event::NegotiationEvent,
    negotiator::{Negotiator, NegotiatorConfig, NegotiatorFactory},
    remote_stream::RemoteStream,
};
use crate::signaling::protocol::SignalPayload;
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

const SIGNAL_TAG: &str = "peercall-udp/1";
const RECV_POLL: Duration = Duration::from_millis(10);

/// Tunables of the direct UDP link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpLinkConfig {
    pub bind_ip: IpAddr,
    /// Address written into the payload; defaults to `bind_ip`, or loopback
    /// when bound to the wildcard address.
    pub advertise_ip: Option<IpAddr>,
    /// Silence from a linked peer after which `Close` is emitted.
    pub idle_timeout: Duration,
    pub hello_interval: Duration,
    pub fps: u32,
}

impl Default for UdpLinkConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            advertise_ip: None,
            idle_timeout: Duration::from_secs(5),
            hello_interval: Duration::from_millis(200),
            fps: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRole {
    Offer,
    Answer,
}

impl fmt::Display for SignalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => write!(f, "offer"),
            Self::Answer => write!(f, "answer"),
        }
    }
}

/// Decoded form of the link's signal payload:
/// `peercall-udp/1 offer <ip:port> <token hex>` or
/// `peercall-udp/1 answer <ip:port> <token hex> <offer token hex>`.
///
/// An answer echoes the token of the offer it replies to, so a caller can
/// tell a late answer to an abandoned call from the one it is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDescriptor {
    pub role: SignalRole,
    pub addr: SocketAddr,
    pub token: u64,
    /// Set on answers only.
    pub offer_token: Option<u64>,
}

impl LinkDescriptor {
    #[must_use]
    pub fn to_payload(&self) -> SignalPayload {
        let mut text = format!("{SIGNAL_TAG} {} {} {:016x}", self.role, self.addr, self.token);
        if let Some(echo) = self.offer_token {
            text.push_str(&format!(" {echo:016x}"));
        }
        SignalPayload::new(text.into_bytes())
    }

    /// # Errors
    /// `InvalidSignal` if the payload is not a link descriptor.
    pub fn parse(payload: &SignalPayload) -> Result<Self, NegotiationError> {
        let bad = |why: &str| NegotiationError::InvalidSignal(why.to_string());
        let text = std::str::from_utf8(payload.as_bytes()).map_err(|_| bad("not utf-8"))?;
        let mut parts = text.split_whitespace();
        if parts.next() != Some(SIGNAL_TAG) {
            return Err(bad("unknown link version"));
        }
        let role = match parts.next() {
            Some("offer") => SignalRole::Offer,
            Some("answer") => SignalRole::Answer,
            _ => return Err(bad("missing role")),
        };
        let addr = parts
            .next()
            .and_then(|a| SocketAddr::from_str(a).ok())
            .ok_or_else(|| bad("bad address"))?;
        let hex = |t: &str| u64::from_str_radix(t, 16).ok();
        let token = parts.next().and_then(hex).ok_or_else(|| bad("bad token"))?;
        let offer_token = match role {
            SignalRole::Offer => None,
            SignalRole::Answer => Some(
                parts
                    .next()
                    .and_then(hex)
                    .ok_or_else(|| bad("answer without offer token"))?,
            ),
        };
        if parts.next().is_some() {
            return Err(bad("trailing fields"));
        }
        Ok(Self {
            role,
            addr,
            token,
            offer_token,
        })
    }
}

/// Direct media link between two peers over UDP.
///
/// Each side advertises its socket address and a random token in its
/// payload. Once the peer's payload is applied a worker thread exchanges
/// keepalives, video chunks and audio with it.
pub struct UdpNegotiator {
    sock: Arc<UdpSocket>,
    local: LinkDescriptor,
    initiator: bool,
    stream: Option<LocalStream>,
    events: Sender<NegotiationEvent>,
    link: UdpLinkConfig,
    log: Arc<dyn LogSink>,
    remote_applied: bool,
    destroyed: bool,
    run: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl UdpNegotiator {
    /// Binds the socket; the initiator emits its offer right away.
    ///
    /// # Errors
    /// `Io` when the socket cannot be bound or configured.
    pub fn new(
        cfg: NegotiatorConfig,
        link: UdpLinkConfig,
        events: Sender<NegotiationEvent>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, NegotiationError> {
        let sock = UdpSocket::bind((link.bind_ip, 0))?;
        sock.set_read_timeout(Some(RECV_POLL))?;
        let port = sock.local_addr()?.port();
        let ip = match link.advertise_ip {
            Some(ip) => ip,
            None if link.bind_ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            None => link.bind_ip,
        };
        let local = LinkDescriptor {
            role: if cfg.initiator {
                SignalRole::Offer
            } else {
                SignalRole::Answer
            },
            addr: SocketAddr::new(ip, port),
            token: OsRng.next_u64(),
            offer_token: None,
        };
        sink_debug!(log, "link socket bound, advertising {}", local.addr);

        let me = Self {
            sock: Arc::new(sock),
            local,
            initiator: cfg.initiator,
            stream: cfg.stream,
            events,
            link,
            log,
            remote_applied: false,
            destroyed: false,
            run: Arc::new(AtomicBool::new(true)),
            worker: None,
        };
        if me.initiator {
            me.emit_local_signal();
        }
        Ok(me)
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local.addr
    }

    fn emit_local_signal(&self) {
        let _ = self
            .events
            .send(NegotiationEvent::LocalSignal(self.local.to_payload()));
    }

    fn start_worker(&mut self, peer: LinkDescriptor) -> Result<(), NegotiationError> {
        let worker = LinkWorker {
            sock: self.sock.clone(),
            peer,
            local_token: self.local.token,
            stream: self.stream.clone(),
            events: self.events.clone(),
            link: self.link,
            log: self.log.clone(),
            run: self.run.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("link-{}", self.local.addr.port()))
            .spawn(move || worker.run())?;
        self.worker = Some(handle);
        Ok(())
    }
}

impl Negotiator for UdpNegotiator {
    fn signal(&mut self, payload: SignalPayload) -> Result<(), NegotiationError> {
        if self.destroyed {
            return Err(NegotiationError::Destroyed);
        }
        if self.remote_applied {
            return Err(NegotiationError::UnexpectedSignal);
        }
        let peer = LinkDescriptor::parse(&payload)?;
        let expected = if self.initiator {
            SignalRole::Answer
        } else {
            SignalRole::Offer
        };
        if peer.role != expected {
            return Err(NegotiationError::InvalidSignal(format!(
                "expected {expected}, got {}",
                peer.role
            )));
        }
        if self.initiator && peer.offer_token != Some(self.local.token) {
            sink_warn!(self.log, "answer from {} belongs to another offer", peer.addr);
            return Err(NegotiationError::InvalidSignal(
                "answer does not match our offer".into(),
            ));
        }
        self.remote_applied = true;
        sink_info!(self.log, "link peer at {}", peer.addr);
        if !self.initiator {
            self.local.offer_token = Some(peer.token);
            self.emit_local_signal();
        }
        self.start_worker(peer)
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.run.store(false, Ordering::SeqCst);
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
        sink_debug!(self.log, "link {} destroyed", self.local.addr);
    }
}

impl Drop for UdpNegotiator {
    fn drop(&mut self) {
        self.destroy();
    }
}

struct LinkWorker {
    sock: Arc<UdpSocket>,
    peer: LinkDescriptor,
    local_token: u64,
    stream: Option<LocalStream>,
    events: Sender<NegotiationEvent>,
    link: UdpLinkConfig,
    log: Arc<dyn LogSink>,
    run: Arc<AtomicBool>,
}

impl LinkWorker {
    fn run(self) {
        let frame_period = Duration::from_millis(1_000 / u64::from(self.link.fps.clamp(1, 60)));
        let keepalive = (self.link.idle_timeout / 4).max(self.link.hello_interval);
        let mut remote: Option<RemoteStream> = None;
        let mut assembler = FrameAssembler::new();
        let mut buf = vec![0u8; MAX_DATAGRAM + 64];
        let mut seq: u32 = 0;
        let mut audio_seq: u32 = 0;
        let mut last_heard = Instant::now();
        let mut last_hello: Option<Instant> = None;
        let mut next_frame = Instant::now();

        while self.run.load(Ordering::SeqCst) {
            let now = Instant::now();
            let hello_every = if remote.is_some() {
                keepalive
            } else {
                self.link.hello_interval
            };
            if last_hello.is_none_or(|t| now.duration_since(t) >= hello_every) {
                self.send(&MediaPacket::hello(self.local_token));
                last_hello = Some(now);
            }

            if remote.is_some() && now >= next_frame {
                if let Some(frame) = self.stream.as_ref().and_then(LocalStream::latest_frame) {
                    for pkt in media_packet::chunk_frame(self.local_token, seq, &frame) {
                        self.send(&pkt);
                    }
                    seq = seq.wrapping_add(1);
                }
                next_frame = now + frame_period;
            }

            // audio captured before the link is up is stale by the time it could play
            let audio = self.stream.as_ref().map(LocalStream::take_audio).unwrap_or_default();
            if remote.is_some() {
                for chunk in &audio {
                    for pkt in media_packet::audio_packets(self.local_token, audio_seq, chunk) {
                        self.send(&pkt);
                    }
                    audio_seq = audio_seq.wrapping_add(1);
                }
            }

            match self.sock.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let Some(pkt) = self.accept(&buf[..n], from) else {
                        continue;
                    };
                    last_heard = Instant::now();
                    if remote.is_none() {
                        let stream = RemoteStream::new(self.peer.addr.to_string());
                        sink_info!(self.log, "link with {} is up", self.peer.addr);
                        if self
                            .events
                            .send(NegotiationEvent::RemoteStream(stream.clone()))
                            .is_err()
                        {
                            break;
                        }
                        remote = Some(stream);
                    }
                    match (pkt.kind, remote.as_ref()) {
                        (PacketKind::Frame, Some(r)) => {
                            if let Some(frame) = assembler.push(pkt) {
                                r.push_frame(frame);
                            }
                        }
                        (PacketKind::Audio, Some(r)) => match media_packet::decode_audio(&pkt) {
                            Some(chunk) => r.push_audio(chunk),
                            None => sink_trace!(self.log, "bad audio packet from {}", self.peer.addr),
                        },
                        _ => {}
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) => {}
                Err(e) => sink_trace!(self.log, "link recv: {}", e),
            }

            if remote.is_some() && last_heard.elapsed() >= self.link.idle_timeout {
                sink_warn!(
                    self.log,
                    "no media from {} for {:?}, closing",
                    self.peer.addr,
                    self.link.idle_timeout
                );
                if self.run.load(Ordering::SeqCst) {
                    let _ = self.events.send(NegotiationEvent::Close);
                }
                break;
            }
        }
    }

    fn accept(&self, datagram: &[u8], from: SocketAddr) -> Option<MediaPacket> {
        match MediaPacket::deserialize(datagram) {
            Ok(pkt) if pkt.token == self.peer.token => Some(pkt),
            Ok(_) => {
                sink_trace!(self.log, "dropping datagram with foreign token from {}", from);
                None
            }
            Err(e) => {
                sink_trace!(self.log, "dropping malformed datagram from {}: {}", from, e);
                None
            }
        }
    }

    fn send(&self, pkt: &MediaPacket) {
        match pkt.serialize() {
            Ok(bytes) => {
                if let Err(e) = self.sock.send_to(&bytes, self.peer.addr) {
                    sink_trace!(self.log, "link send: {}", e);
                }
            }
            Err(e) => sink_warn!(self.log, "link encode: {}", e),
        }
    }
}

/// Creates a [`UdpNegotiator`] per call with shared link settings.
pub struct UdpNegotiatorFactory {
    link: UdpLinkConfig,
    log: Arc<dyn LogSink>,
}

impl UdpNegotiatorFactory {
    #[must_use]
    pub fn new(link: UdpLinkConfig, log: Arc<dyn LogSink>) -> Self {
        Self { link, log }
    }
}

impl NegotiatorFactory for UdpNegotiatorFactory {
    fn create(
        &mut self,
        cfg: NegotiatorConfig,
        events: Sender<NegotiationEvent>,
    ) -> Result<Box<dyn Negotiator>, NegotiationError> {
        let n = UdpNegotiator::new(cfg, self.link, events, self.log.clone())?;
        Ok(Box::new(n))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::media::{LocalStream, MediaDevices, VideoFrame};
    use std::sync::mpsc::{self, Receiver};

    fn loopback(idle_ms: u64) -> UdpLinkConfig {
        UdpLinkConfig {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            advertise_ip: None,
            idle_timeout: Duration::from_millis(idle_ms),
            hello_interval: Duration::from_millis(20),
            fps: 30,
        }
    }

    fn negotiator(
        initiator: bool,
        stream: Option<LocalStream>,
        idle_ms: u64,
    ) -> (UdpNegotiator, Receiver<NegotiationEvent>) {
        let (tx, rx) = mpsc::channel();
        let cfg = NegotiatorConfig {
            initiator,
            trickle: false,
            stream,
        };
        let n = UdpNegotiator::new(cfg, loopback(idle_ms), tx, Arc::new(NoopLogSink)).unwrap();
        (n, rx)
    }

    fn next_event(rx: &Receiver<NegotiationEvent>) -> NegotiationEvent {
        rx.recv_timeout(Duration::from_secs(3)).expect("event")
    }

    fn local_signal(rx: &Receiver<NegotiationEvent>) -> SignalPayload {
        match next_event(rx) {
            NegotiationEvent::LocalSignal(p) => p,
            other => panic!("expected LocalSignal, got {other:?}"),
        }
    }

    fn remote_stream(rx: &Receiver<NegotiationEvent>) -> RemoteStream {
        loop {
            match next_event(rx) {
                NegotiationEvent::RemoteStream(r) => return r,
                NegotiationEvent::LocalSignal(_) => {}
                other => panic!("expected RemoteStream, got {other:?}"),
            }
        }
    }

    #[test]
    fn descriptor_text_form_round_trips() {
        let offer = LinkDescriptor {
            role: SignalRole::Offer,
            addr: "10.0.0.1:3000".parse().unwrap(),
            token: 0x0bad_f00d,
            offer_token: None,
        };
        let p = offer.to_payload();
        assert_eq!(
            std::str::from_utf8(p.as_bytes()).unwrap(),
            "peercall-udp/1 offer 10.0.0.1:3000 000000000badf00d"
        );
        assert_eq!(LinkDescriptor::parse(&p).unwrap(), offer);

        let answer = LinkDescriptor {
            role: SignalRole::Answer,
            addr: "10.0.0.2:4000".parse().unwrap(),
            token: 0xdead_beef,
            offer_token: Some(0x0bad_f00d),
        };
        let p = answer.to_payload();
        assert_eq!(
            std::str::from_utf8(p.as_bytes()).unwrap(),
            "peercall-udp/1 answer 10.0.0.2:4000 00000000deadbeef 000000000badf00d"
        );
        assert_eq!(LinkDescriptor::parse(&p).unwrap(), answer);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for bad in [
            &b""[..],
            b"peercall-udp/2 offer 1.2.3.4:5 00",
            b"peercall-udp/1 hangup 1.2.3.4:5 00",
            b"peercall-udp/1 offer nowhere 00",
            b"peercall-udp/1 offer 1.2.3.4:5 zz",
            b"peercall-udp/1 offer 1.2.3.4:5 00 extra",
            b"peercall-udp/1 answer 1.2.3.4:5 00",
            b"peercall-udp/1 answer 1.2.3.4:5 00 zz",
            b"peercall-udp/1 answer 1.2.3.4:5 00 01 02",
            &[0xff, 0xfe],
        ] {
            let p = SignalPayload::new(bad.to_vec());
            assert!(
                matches!(LinkDescriptor::parse(&p), Err(NegotiationError::InvalidSignal(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn initiator_offers_immediately_responder_answers_after_offer() {
        let (a, arx) = negotiator(true, None, 1_000);
        let offer = local_signal(&arx);
        assert_eq!(
            LinkDescriptor::parse(&offer).unwrap().role,
            SignalRole::Offer
        );

        let (mut b, brx) = negotiator(false, None, 1_000);
        assert!(brx.try_recv().is_err());
        b.signal(offer).unwrap();
        let answer = LinkDescriptor::parse(&local_signal(&brx)).unwrap();
        assert_eq!(answer.role, SignalRole::Answer);
        assert_eq!(answer.offer_token, Some(a.local.token));
    }

    #[test]
    fn answer_to_an_abandoned_offer_is_rejected() {
        // caller gives up on the first callee and rings a second one
        let (abandoned, old_rx) = negotiator(true, None, 1_000);
        let (mut current, cur_rx) = negotiator(true, None, 1_000);
        let _ = local_signal(&old_rx);
        let _ = local_signal(&cur_rx);

        // the first callee answers late, echoing the abandoned offer
        let (mut late, late_rx) = negotiator(false, None, 1_000);
        late.signal(abandoned.local.to_payload()).unwrap();
        let stale = local_signal(&late_rx);
        assert!(matches!(
            current.signal(stale),
            Err(NegotiationError::InvalidSignal(_))
        ));
        assert!(!current.remote_applied);
        assert!(current.worker.is_none());

        // the real answer still goes through
        let (mut callee, callee_rx) = negotiator(false, None, 1_000);
        callee.signal(current.local.to_payload()).unwrap();
        current.signal(local_signal(&callee_rx)).unwrap();
        assert!(current.remote_applied);
    }

    #[test]
    fn second_or_wrong_role_signal_is_an_error() {
        let (mut a, arx) = negotiator(true, None, 1_000);
        let own_offer = local_signal(&arx);
        assert!(matches!(
            a.signal(own_offer),
            Err(NegotiationError::InvalidSignal(_))
        ));

        let (mut b, brx) = negotiator(false, None, 1_000);
        b.signal(a.local.to_payload()).unwrap();
        let _ = local_signal(&brx);
        assert_eq!(
            b.signal(a.local.to_payload()),
            Err(NegotiationError::UnexpectedSignal)
        );
    }

    #[test]
    fn peers_link_and_exchange_video() {
        let stream = LocalStream::still("cam", VideoFrame::synthetic(40, 30, 9));
        let (mut a, arx) = negotiator(true, Some(stream), 2_000);
        let (mut b, brx) = negotiator(false, None, 2_000);

        b.signal(local_signal(&arx)).unwrap();
        a.signal(local_signal(&brx)).unwrap();

        let _ = remote_stream(&arx);
        let at_b = remote_stream(&brx);

        let deadline = Instant::now() + Duration::from_secs(3);
        let frame = loop {
            if let Some(f) = at_b.latest_frame() {
                break f;
            }
            assert!(Instant::now() < deadline, "no frame reached the responder");
            thread::sleep(Duration::from_millis(10));
        };
        assert_eq!((frame.width, frame.height), (40, 30));

        a.destroy();
        b.destroy();
    }

    #[test]
    fn peers_link_and_exchange_audio_only() {
        let log: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let constraints = crate::media::MediaConstraints {
            video: false,
            audio: true,
            ..crate::media::MediaConstraints::default()
        };
        let mic = crate::media::TestPatternDevices::new()
            .get_user_media(&constraints, &log)
            .unwrap();
        let (mut a, arx) = negotiator(true, Some(mic.clone()), 2_000);
        let (mut b, brx) = negotiator(false, None, 2_000);

        b.signal(local_signal(&arx)).unwrap();
        a.signal(local_signal(&brx)).unwrap();
        let _ = remote_stream(&arx);
        let at_b = remote_stream(&brx);

        let deadline = Instant::now() + Duration::from_secs(3);
        let mut heard = Vec::new();
        while heard.len() < 3 {
            heard.extend(at_b.take_audio());
            assert!(Instant::now() < deadline, "no audio reached the responder");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(heard.iter().all(|c| c.sample_rate_hz == 48_000 && c.channels == 1));
        assert!(heard.iter().any(|c| c.samples.iter().any(|&v| v != 0)));
        assert!(at_b.latest_frame().is_none());

        a.destroy();
        b.destroy();
        mic.stop();
    }

    #[test]
    fn silence_after_link_emits_close_and_destroy_is_quiet() {
        let (mut a, arx) = negotiator(true, None, 300);
        let (mut b, brx) = negotiator(false, None, 300);
        b.signal(local_signal(&arx)).unwrap();
        a.signal(local_signal(&brx)).unwrap();
        let _ = remote_stream(&arx);
        let _ = remote_stream(&brx);

        a.destroy();
        assert!(matches!(next_event(&brx), NegotiationEvent::Close));
        assert!(arx.recv_timeout(Duration::from_millis(500)).is_err());
        assert_eq!(
            a.signal(SignalPayload::default()),
            Err(NegotiationError::Destroyed)
        );
        b.destroy();
    }
}
