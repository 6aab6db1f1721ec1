//! UDP control-stream worker.
//!
//! Datagrams carry a JSON document:
//!
//! ```text
//! { "joysticks": { "left": [x, y], "right": [x, y] } }
//! ```
//!
//! with coordinates nominally in [-1.0, 1.0]. `left` drives the X/Y slots,
//! `right` the RX/RY slots; Y values are inverted. Any other shape is
//! accepted and ignored.
//!
//! Liveness: every received datagram marks the source active. Once active,
//! more than `network_timeout_ms` of silence zeroes all axis slots and
//! marks it inactive again.

use super::InputAxisVector;
use crate::error::PacketError;
use rover_common::config::InputConfig;
use rover_common::consts::{
    JOYSTICK_AXIS_RX, JOYSTICK_AXIS_RY, JOYSTICK_AXIS_X, JOYSTICK_AXIS_Y, MAX_JOYSTICK_VALUE,
};
use rover_common::shutdown::ShutdownToken;
use rover_hal::timing::{MonotonicClock, TickSource};
use serde_json::Value;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receive timeout; bounds how long shutdown can go unnoticed.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Every Nth datagram is logged verbatim at debug level.
pub const RAW_LOG_EVERY: u64 = 20;

/// `true` for the datagrams logged verbatim: the first one and every
/// [`RAW_LOG_EVERY`]th after it. `packet` counts from 1.
#[inline]
pub fn logs_raw(packet: u64) -> bool {
    packet % RAW_LOG_EVERY == 1
}

// ─── Packet parsing ─────────────────────────────────────────────────

/// Stick coordinates carried by one datagram.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickUpdate {
    /// Left stick `[x, y]`
    pub left: Option<[f64; 2]>,
    /// Right stick `[x, y]`
    pub right: Option<[f64; 2]>,
}

impl StickUpdate {
    /// `true` if neither stick is present.
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Parse a control datagram.
///
/// Both sticks are validated before anything is returned, so a bad `right`
/// never lets a good `left` through on its own.
pub fn parse_packet(payload: &[u8]) -> Result<StickUpdate, PacketError> {
    let doc: Value = serde_json::from_slice(payload)?;
    let Some(sticks) = doc.get("joysticks") else {
        return Ok(StickUpdate::default());
    };
    Ok(StickUpdate {
        left: parse_stick(sticks, "left")?,
        right: parse_stick(sticks, "right")?,
    })
}

fn parse_stick(sticks: &Value, name: &'static str) -> Result<Option<[f64; 2]>, PacketError> {
    let Some(Value::Array(items)) = sticks.get(name) else {
        return Ok(None);
    };
    match (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Some([x, y])),
        _ => Err(PacketError::InvalidStick(name)),
    }
}

/// Normalised coordinate to joystick units. Saturates outside [-1, 1].
#[inline]
pub fn scale_coordinate(v: f64) -> i16 {
    (v * f64::from(MAX_JOYSTICK_VALUE)) as i16
}

/// Write an update into the axis slots.
pub fn apply_update(update: &StickUpdate, axes: &InputAxisVector) {
    if let Some([x, y]) = update.left {
        axes.set(JOYSTICK_AXIS_X, scale_coordinate(x));
        axes.set(JOYSTICK_AXIS_Y, scale_coordinate(-y));
    }
    if let Some([x, y]) = update.right {
        axes.set(JOYSTICK_AXIS_RX, scale_coordinate(x));
        axes.set(JOYSTICK_AXIS_RY, scale_coordinate(-y));
    }
}

// ─── Liveness ───────────────────────────────────────────────────────

/// Staleness tracker for the network source.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    timeout_ms: u64,
    active: bool,
    last_packet_ms: u64,
}

impl Liveness {
    /// Inactive tracker with the given silence timeout.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            active: false,
            last_packet_ms: 0,
        }
    }

    /// `true` while packets arrive within the timeout.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record a datagram at `now_ms`.
    pub fn mark(&mut self, now_ms: u64) {
        self.active = true;
        self.last_packet_ms = now_ms;
    }

    /// Evaluate staleness at `now_ms`. Returns `true` exactly once per
    /// active period, at the moment it expires.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        if self.active && now_ms.saturating_sub(self.last_packet_ms) > self.timeout_ms {
            self.active = false;
            return true;
        }
        false
    }
}

// ─── Receive state ──────────────────────────────────────────────────

/// Socket-independent part of the network worker.
#[derive(Debug)]
pub struct NetworkState {
    axes: Arc<InputAxisVector>,
    liveness: Liveness,
    max_datagram: usize,
    last_peer: Option<SocketAddr>,
    packets: u64,
}

impl NetworkState {
    /// State writing into `axes`.
    pub fn new(axes: Arc<InputAxisVector>, max_datagram: usize, timeout_ms: u64) -> Self {
        Self {
            axes,
            liveness: Liveness::new(timeout_ms),
            max_datagram,
            last_peer: None,
            packets: 0,
        }
    }

    /// `true` while the source is live.
    pub fn is_active(&self) -> bool {
        self.liveness.is_active()
    }

    /// Datagrams received so far.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Most recent sender.
    pub fn last_peer(&self) -> Option<SocketAddr> {
        self.last_peer
    }

    /// Handle one received datagram at `now_ms`.
    ///
    /// The source is marked live before the payload is looked at.
    pub fn on_datagram(
        &mut self,
        payload: &[u8],
        peer: SocketAddr,
        now_ms: u64,
    ) -> Result<StickUpdate, PacketError> {
        if self.last_peer != Some(peer) {
            info!("Network control from {peer}");
            self.last_peer = Some(peer);
        }
        self.packets += 1;
        self.liveness.mark(now_ms);

        if payload.len() > self.max_datagram {
            return Err(PacketError::Oversized {
                limit: self.max_datagram,
            });
        }
        if logs_raw(self.packets) {
            debug!(
                packets = self.packets,
                "raw datagram: {}",
                String::from_utf8_lossy(payload)
            );
        }

        let update = parse_packet(payload)?;
        apply_update(&update, &self.axes);
        Ok(update)
    }

    /// Staleness check, run once per worker iteration.
    ///
    /// Returns `true` if the source just went stale and the axes were
    /// zeroed.
    pub fn on_tick(&mut self, now_ms: u64) -> bool {
        if self.liveness.expire(now_ms) {
            self.axes.zero_all();
            info!("Network control stale, axes returned to neutral");
            return true;
        }
        false
    }
}

// ─── Worker ─────────────────────────────────────────────────────────

/// Network producer bound to its UDP port.
pub struct NetworkWorker {
    socket: UdpSocket,
    state: NetworkState,
    clock: MonotonicClock,
    shutdown: ShutdownToken,
}

impl NetworkWorker {
    /// Bind `0.0.0.0:udp_port` with the receive timeout applied.
    pub fn bind(
        config: &InputConfig,
        axes: Arc<InputAxisVector>,
        shutdown: ShutdownToken,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.udp_port))?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        info!(
            "Listening for control packets on UDP port {}",
            socket.local_addr()?.port()
        );
        Ok(Self {
            socket,
            state: NetworkState::new(axes, config.udp_buffer_size, config.network_timeout_ms),
            clock: MonotonicClock::new(),
            shutdown,
        })
    }

    /// Bound address. Resolves port 0 to the port actually assigned.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket
            .local_addr()
            .unwrap_or_else(|_| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
    }

    /// Run until shutdown.
    pub fn run(mut self) {
        // One spare byte detects datagrams over the limit.
        let mut buf = vec![0u8; self.state.max_datagram + 1];

        while !self.shutdown.is_requested() {
            match self.socket.recv_from(&mut buf) {
                Ok((len, peer)) => {
                    let now = self.clock.now_ms();
                    if let Err(e) = self.state.on_datagram(&buf[..len], peer, now) {
                        warn!(%peer, "Ignoring control datagram: {e}");
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) => {}
                Err(e) => {
                    warn!("UDP receive error: {e}");
                    self.shutdown.sleep(RECV_TIMEOUT);
                }
            }
            self.state.on_tick(self.clock.now_ms());
        }
        debug!(packets = self.state.packets(), "network worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 20], port))
    }

    fn state() -> (Arc<InputAxisVector>, NetworkState) {
        let axes = Arc::new(InputAxisVector::new());
        let state = NetworkState::new(Arc::clone(&axes), 4096, 1000);
        (axes, state)
    }

    #[test]
    fn parses_both_sticks() {
        let update =
            parse_packet(br#"{"joysticks":{"left":[0.5,-0.25],"right":[1,0]}}"#).unwrap();
        assert_eq!(update.left, Some([0.5, -0.25]));
        assert_eq!(update.right, Some([1.0, 0.0]));
    }

    #[test]
    fn other_shapes_contribute_nothing() {
        let payloads: [&[u8]; 5] = [
            br#"{}"#,
            br#"[1, 2, 3]"#,
            br#"{"joysticks": 7}"#,
            br#"{"joysticks": {"left": "up"}}"#,
            br#"{"buttons": {"a": true}}"#,
        ];
        for payload in payloads {
            assert!(parse_packet(payload).unwrap().is_empty());
        }
    }

    #[test]
    fn short_or_non_numeric_stick_is_rejected() {
        assert!(matches!(
            parse_packet(br#"{"joysticks":{"left":[0.5]}}"#),
            Err(PacketError::InvalidStick("left"))
        ));
        assert!(matches!(
            parse_packet(br#"{"joysticks":{"left":[0,0],"right":["a","b"]}}"#),
            Err(PacketError::InvalidStick("right"))
        ));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(parse_packet(b"{not json"), Err(PacketError::Json(_))));
    }

    #[test]
    fn scaling_inverts_y_and_saturates() {
        let axes = InputAxisVector::new();
        apply_update(
            &StickUpdate {
                left: Some([0.5, 1.0]),
                right: Some([3.0, -1.0]),
            },
            &axes,
        );
        assert_eq!(axes.get(JOYSTICK_AXIS_X), 16383);
        assert_eq!(axes.get(JOYSTICK_AXIS_Y), -32767);
        assert_eq!(axes.get(JOYSTICK_AXIS_RX), i16::MAX);
        assert_eq!(axes.get(JOYSTICK_AXIS_RY), 32767);
    }

    #[test]
    fn malformed_datagram_keeps_previous_values_but_counts_as_alive() {
        let (axes, mut state) = state();
        state
            .on_datagram(br#"{"joysticks":{"left":[0.2,0]}}"#, peer(1), 0)
            .unwrap();
        let before = axes.snapshot();

        assert!(state.on_datagram(b"garbage", peer(1), 900).is_err());
        assert_eq!(axes.snapshot(), before);
        // Still alive 1000 ms after the malformed packet.
        assert!(!state.on_tick(1_900));
        assert!(state.is_active());
    }

    #[test]
    fn oversized_datagram_is_dropped() {
        let axes = Arc::new(InputAxisVector::new());
        let mut state = NetworkState::new(Arc::clone(&axes), 16, 1000);
        let payload = br#"{"joysticks":{"left":[1,1]}}"#;
        assert!(matches!(
            state.on_datagram(payload, peer(1), 0),
            Err(PacketError::Oversized { limit: 16 })
        ));
        assert_eq!(axes.snapshot(), [0; 8]);
    }

    #[test]
    fn silence_past_timeout_zeroes_all_slots() {
        let (axes, mut state) = state();
        state
            .on_datagram(
                br#"{"joysticks":{"left":[0.5,0.5],"right":[-0.5,0.5]}}"#,
                peer(1),
                10_000,
            )
            .unwrap();
        axes.set(7, 99);

        assert!(!state.on_tick(11_000));
        assert!(state.is_active());
        assert_ne!(axes.get(JOYSTICK_AXIS_X), 0);

        assert!(state.on_tick(11_001));
        assert!(!state.is_active());
        assert_eq!(axes.snapshot(), [0; 8]);

        // Inactive source does not zero again.
        axes.set(JOYSTICK_AXIS_X, 123);
        assert!(!state.on_tick(20_000));
        assert_eq!(axes.get(JOYSTICK_AXIS_X), 123);
    }

    #[test]
    fn peer_changes_are_tracked() {
        let (_axes, mut state) = state();
        state.on_datagram(b"{}", peer(1), 0).unwrap();
        state.on_datagram(b"{}", peer(2), 5).unwrap();
        assert_eq!(state.last_peer(), Some(peer(2)));
        assert_eq!(state.packets(), 2);
    }

    #[test]
    fn raw_logging_starts_with_first_datagram() {
        let logged: Vec<u64> = (1..=45).filter(|&n| logs_raw(n)).collect();
        assert_eq!(logged, vec![1, 21, 41]);
    }
}
