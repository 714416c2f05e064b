//! UDP receive loop for the capture stream
//!
//! A [`MocapListener`] owns one UDP socket and one named background thread.
//! The thread classifies every datagram, keeps the current name table, and
//! pushes decoded poses into a shared [`PoseCache`]. The host pulls the
//! newest pose once per frame with [`MocapListener::fetch_latest_pose`].
//!
//! # Lifecycle
//!
//! ```text
//! start() ──► Running ──stop()──► StopRequested ──join──► Stopped
//! ```
//!
//! There is no pause or restart; start a new listener instead. `stop()`
//! wakes the blocked receive with an empty datagram sent to the listener's
//! own address. The socket read timeout (`poll_interval_ms`) is only the
//! fallback for when that wake-up datagram cannot be delivered.
//!
//! # Dropped Datagrams
//!
//! Wrong signature, unknown kind, truncation, or a rotation count that does
//! not match the name table: the datagram is counted, logged at `trace`, and
//! forgotten. Nothing is reported back to the sender.

use crate::cache::PoseCache;
use crate::config::ListenerConfig;
use crate::error::{Error, Result};
use crate::pose::Pose;
use crate::protocol::{NameTable, PacketKind, classify, decode_names, decode_pose, read_kind};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

/// Receive thread name
const THREAD_NAME: &str = "mocap-receiver";

/// Listener lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    /// Receiving datagrams
    Running = 1,
    /// Stop signalled, thread still winding down
    StopRequested = 2,
    /// Thread exited and socket closed
    Stopped = 3,
}

impl ListenerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::StopRequested,
            _ => Self::Stopped,
        }
    }
}

/// Shared lifecycle cell read by both the handle and the receive thread
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ListenerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> ListenerState {
        ListenerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: ListenerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from` -> `to`; false if the state was something else
    fn transition(&self, from: ListenerState, to: ListenerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Receive counters
///
/// Relaxed atomics: the receive path never takes a lock to count.
#[derive(Debug, Default)]
pub struct ListenerStats {
    datagrams: AtomicU64,
    poses: AtomicU64,
    name_tables: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`ListenerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Datagrams read from the socket
    pub datagrams: u64,
    /// Poses decoded and queued
    pub poses: u64,
    /// Name tables decoded and installed
    pub name_tables: u64,
    /// Datagrams discarded as unrecognized or malformed
    pub dropped: u64,
}

impl ListenerStats {
    /// Current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            poses: self.poses.load(Ordering::Relaxed),
            name_tables: self.name_tables.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of handling one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Pose decoded and queued
    Pose,
    /// Name table replaced
    Names,
    /// Datagram discarded
    Dropped,
}

/// Datagram dispatcher owned by the receive thread
///
/// Holds the current name table. Only the receive thread reads or replaces
/// it, so no synchronization is needed around it.
pub struct PacketHandler {
    names: NameTable,
    cache: Arc<PoseCache>,
    stats: Arc<ListenerStats>,
}

impl PacketHandler {
    /// Create a handler publishing into `cache`
    pub fn new(cache: Arc<PoseCache>, stats: Arc<ListenerStats>) -> Self {
        Self {
            names: NameTable::empty(),
            cache,
            stats,
        }
    }

    /// Name table pose packets are currently decoded against
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    /// Classify and decode one datagram
    pub fn handle(&mut self, datagram: &[u8]) -> Handled {
        ListenerStats::bump(&self.stats.datagrams);

        let Some((kind, payload)) = classify(datagram) else {
            match read_kind(datagram) {
                Ok(tag) => log::trace!("Ignoring packet kind {}", tag),
                Err(e) => log::trace!("Dropping {} byte datagram: {}", datagram.len(), e),
            }
            return self.drop_datagram();
        };

        match kind {
            PacketKind::Pose => match decode_pose(payload, &self.names) {
                Ok(pose) => {
                    self.cache.push(pose);
                    ListenerStats::bump(&self.stats.poses);
                    Handled::Pose
                }
                Err(e) => {
                    log::trace!("Dropping pose packet: {}", e);
                    self.drop_datagram()
                }
            },
            PacketKind::Names => match decode_names(payload) {
                Ok(names) => {
                    if names != self.names {
                        log::debug!(
                            "Name table updated: {} joints, root {:?}",
                            names.len(),
                            names.root()
                        );
                    }
                    self.names = names;
                    ListenerStats::bump(&self.stats.name_tables);
                    Handled::Names
                }
                Err(e) => {
                    log::trace!("Dropping names packet: {}", e);
                    self.drop_datagram()
                }
            },
        }
    }

    fn drop_datagram(&self) -> Handled {
        ListenerStats::bump(&self.stats.dropped);
        Handled::Dropped
    }
}

/// Receive thread body
struct ReceiveLoop {
    socket: UdpSocket,
    handler: PacketHandler,
    state: Arc<StateCell>,
    buffer: Vec<u8>,
}

impl ReceiveLoop {
    fn run(mut self) {
        log::info!(
            "Mocap receiver listening on {:?}",
            self.socket.local_addr().ok()
        );

        while self.state.load() == ListenerState::Running {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((len, _peer)) => {
                    // Stop may have been requested while we were blocked
                    if self.state.load() != ListenerState::Running {
                        break;
                    }
                    self.handler.handle(&self.buffer[..len]);
                }
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => {
                    // ICMP port-unreachable echoes, shutdown races: not fatal
                    log::debug!("UDP receive error: {}", e);
                }
            }
        }

        log::info!("Mocap receiver stopped");
        // Socket is closed when `self` drops here
    }
}

/// Handle to a running capture stream receiver
///
/// Dropping the handle stops the receiver.
pub struct MocapListener {
    local_addr: SocketAddr,
    cache: Arc<PoseCache>,
    stats: Arc<ListenerStats>,
    state: Arc<StateCell>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MocapListener {
    /// Bind the socket and start the receive thread
    pub fn start(config: &ListenerConfig) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr()?;

        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(config.poll_interval()))?;
        let local_addr = socket.local_addr()?;

        let cache = Arc::new(PoseCache::new());
        let stats = Arc::new(ListenerStats::default());
        let state = Arc::new(StateCell::new(ListenerState::Running));

        let receive_loop = ReceiveLoop {
            socket,
            handler: PacketHandler::new(Arc::clone(&cache), Arc::clone(&stats)),
            state: Arc::clone(&state),
            buffer: vec![0u8; config.max_datagram_size],
        };

        let worker = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || receive_loop.run())
            .map_err(|e| {
                state.store(ListenerState::Stopped);
                Error::ThreadSpawn(e.to_string())
            })?;

        Ok(Self {
            local_addr,
            cache,
            stats,
            state,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Start on `port` with every other setting at its default
    pub fn bind(port: u16) -> Result<Self> {
        Self::start(&ListenerConfig::with_port(port))
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current lifecycle state
    pub fn state(&self) -> ListenerState {
        self.state.load()
    }

    /// True until `stop()` is requested
    pub fn is_running(&self) -> bool {
        self.state() == ListenerState::Running
    }

    /// Receive counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Newest pose since the last fetch; older pending poses are discarded
    pub fn fetch_latest_pose(&self) -> Option<Pose> {
        self.cache.fetch_latest()
    }

    /// Oldest pending pose
    pub fn fetch_next_pose(&self) -> Option<Pose> {
        self.cache.fetch_next()
    }

    /// Stop the receive thread and wait for it to release the socket
    ///
    /// Returns as soon as the receive thread wakes, which is immediate when
    /// the wake-up datagram gets through and one poll interval otherwise.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        self.state
            .transition(ListenerState::Running, ListenerState::StopRequested);
        self.wake();
        log::debug!("Stop requested, joining {}", THREAD_NAME);

        if worker.join().is_err() {
            log::warn!("{} thread panicked", THREAD_NAME);
        }
        self.state.store(ListenerState::Stopped);
    }
}

impl MocapListener {
    /// Unblock the receive thread with an empty datagram
    fn wake(&self) {
        let target = wake_address(self.local_addr);
        let bind: SocketAddr = match target.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let sent = UdpSocket::bind(bind).and_then(|socket| socket.send_to(&[], target));
        if let Err(e) = sent {
            log::debug!(
                "Wake-up datagram to {} failed, waiting for poll timeout: {}",
                target,
                e
            );
        }
    }
}

/// Address a local sender reaches the listener on
///
/// A wildcard bind is not a valid destination; use loopback of the same
/// family instead.
fn wake_address(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

impl Drop for MocapListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::writer::{encode_names, encode_raw_pose};

    fn handler() -> (PacketHandler, Arc<PoseCache>, Arc<ListenerStats>) {
        let cache = Arc::new(PoseCache::new());
        let stats = Arc::new(ListenerStats::default());
        (
            PacketHandler::new(Arc::clone(&cache), Arc::clone(&stats)),
            cache,
            stats,
        )
    }

    #[test]
    fn test_pose_before_names_dropped() {
        let (mut h, cache, stats) = handler();
        let pose = encode_raw_pose([0.0; 3], &[[0.0, 0.0, 0.0, 1.0]]);
        assert_eq!(h.handle(&pose), Handled::Dropped);
        assert!(cache.is_empty());
        assert_eq!(stats.snapshot().dropped, 1);
    }

    #[test]
    fn test_names_then_poses() {
        let (mut h, cache, stats) = handler();
        assert_eq!(h.handle(&encode_names(&["Hips", "Spine", "Head"])), Handled::Names);
        assert_eq!(h.names().root(), Some("Hips"));

        let ok = encode_raw_pose([1.0, 2.0, 3.0], &[[0.0, 0.0, 0.0, 1.0]; 3]);
        let short = encode_raw_pose([1.0, 2.0, 3.0], &[[0.0, 0.0, 0.0, 1.0]; 2]);
        assert_eq!(h.handle(&ok), Handled::Pose);
        assert_eq!(h.handle(&short), Handled::Dropped);
        assert_eq!(h.handle(b"noise"), Handled::Dropped);

        assert_eq!(cache.len(), 1);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                datagrams: 4,
                poses: 1,
                name_tables: 1,
                dropped: 2,
            }
        );
    }

    #[test]
    fn test_names_replaced_wholesale() {
        let (mut h, _cache, _stats) = handler();
        h.handle(&encode_names(&["Hips", "Spine", "Head"]));
        h.handle(&encode_names(&["Root"]));
        assert_eq!(&**h.names(), &["Root"]);

        // A broken names packet leaves the current table in place
        let mut broken = encode_names(&["A", "B"]);
        broken.truncate(broken.len() - 1);
        assert_eq!(h.handle(&broken), Handled::Dropped);
        assert_eq!(&**h.names(), &["Root"]);
    }

    #[test]
    fn test_case_colliding_names_keep_table() {
        let (mut h, cache, stats) = handler();
        h.handle(&encode_names(&["Hips", "Spine"]));
        assert_eq!(h.handle(&encode_names(&["Hips", "HIPS"])), Handled::Dropped);
        assert_eq!(&**h.names(), &["Hips", "Spine"]);
        assert_eq!(stats.snapshot().name_tables, 1);

        // Poses for the kept table still decode
        let pose = encode_raw_pose([0.0; 3], &[[0.0, 0.0, 0.0, 1.0]; 2]);
        assert_eq!(h.handle(&pose), Handled::Pose);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_wake_address_replaces_wildcard() {
        let v4: SocketAddr = "0.0.0.0:31455".parse().unwrap();
        assert_eq!(wake_address(v4), "127.0.0.1:31455".parse().unwrap());
        let v6: SocketAddr = "[::]:4000".parse().unwrap();
        assert_eq!(wake_address(v6), "[::1]:4000".parse().unwrap());
        let bound: SocketAddr = "192.168.1.20:9000".parse().unwrap();
        assert_eq!(wake_address(bound), bound);
    }

    #[test]
    fn test_stop_wakes_blocked_receive() {
        let config = ListenerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            poll_interval_ms: 5000,
            ..ListenerConfig::default()
        };
        let listener = MocapListener::start(&config).unwrap();
        // Let the receive thread reach its blocking read
        thread::sleep(std::time::Duration::from_millis(50));

        let started = std::time::Instant::now();
        listener.stop();
        assert!(started.elapsed() < std::time::Duration::from_millis(1000));
        assert_eq!(listener.state(), ListenerState::Stopped);
        // The wake-up datagram is not counted as traffic
        assert_eq!(listener.stats().datagrams, 0);
    }

    #[test]
    fn test_started_listener_is_running() {
        let listener = MocapListener::start(&ListenerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            ..ListenerConfig::default()
        })
        .unwrap();
        assert_eq!(listener.state(), ListenerState::Running);
    }

    #[test]
    fn test_state_transitions() {
        let cell = StateCell::new(ListenerState::Running);
        assert!(cell.transition(ListenerState::Running, ListenerState::StopRequested));
        assert!(!cell.transition(ListenerState::Running, ListenerState::StopRequested));
        assert_eq!(cell.load(), ListenerState::StopRequested);
    }
}
