//! A single-connection client (C6): handshake, health-check gating,
//! blocking request/response, auto-reconnect, and the per-connection
//! single-caller discipline from spec §4.6/§5.

use std::{
    sync::{Mutex, TryLockError},
    time::{Duration, Instant},
};

use tracing::{debug, warn};
use wirequeue_proto::{Command, Envelope, Item, ProtoError, Reply, HI};
use wirequeue_transport::{Connection, Dialer, TransportError};
use wirequeue_utils::hash_secret;

use crate::{config::ClientConfig, error::ClientError};

struct ConnCell {
    connection: Option<Connection>,
    /// Set once a dial+handshake has ever succeeded. Distinguishes the
    /// very first connection attempt (whose failure surfaces its own
    /// error kind — `Unreachable`/`ClientsFull`/`AuthenticationFail`,
    /// matching the handshake contract in spec §4.6) from a later
    /// reconnect attempt after a previously-live connection was lost
    /// (whose failure surfaces as `Disconnected`, per spec §4.6's "if
    /// still lost, surface `Disconnected`").
    ever_connected: bool,
}

#[derive(Default)]
struct HealthState {
    /// Set once a call fails; cleared on the next successful exchange.
    failed: bool,
    /// Earliest time a reconnect may next be attempted while `failed`.
    next_attempt_at: Option<Instant>,
}

/// One logical connection to a wirequeue server. Every public operation
/// is a single request/response exchange guarded by [`Self::cell`]'s
/// `try_lock`: a second caller attempting any operation while one is
/// already in flight gets [`ClientError::ConcurrentUseRefused`]
/// immediately rather than queuing, since the wire protocol is strictly
/// one-request-in-flight per TCP connection (spec §4.6).
pub struct ClientCore {
    host: String,
    port: u16,
    config: ClientConfig,
    cell: Mutex<ConnCell>,
    health: Mutex<HealthState>,
}

impl ClientCore {
    pub fn new(host: impl Into<String>, port: u16, config: ClientConfig) -> Result<Self, ClientError> {
        let client = Self {
            host: host.into(),
            port,
            config,
            cell: Mutex::new(ConnCell { connection: None, ever_connected: false }),
            health: Mutex::new(HealthState::default()),
        };

        if !client.config.pre_connect {
            let mut guard = client.cell.lock().expect("connection cell poisoned");
            client.ensure_connected(&mut guard)?;
        }

        Ok(client)
    }

    pub fn put(&self, item: Item, block: bool, timeout: Option<Duration>) -> Result<(), ClientError> {
        match self.call(Command::Put { block, timeout, item })? {
            Reply::Ok => Ok(()),
            Reply::Full => Err(ClientError::Full),
            _ => Err(ClientError::ProtocolError),
        }
    }

    pub fn put_nowait(&self, item: Item) -> Result<(), ClientError> {
        self.put(item, false, None)
    }

    pub fn get(&self, block: bool, timeout: Option<Duration>) -> Result<Item, ClientError> {
        match self.call(Command::Get { block, timeout })? {
            Reply::Data(item) => Ok(item),
            Reply::Empty => Err(ClientError::Empty),
            _ => Err(ClientError::ProtocolError),
        }
    }

    pub fn get_nowait(&self) -> Result<Item, ClientError> {
        self.get(false, None)
    }

    pub fn full(&self) -> Result<bool, ClientError> {
        self.status_query(Command::Status, false, |r| Ok(matches!(r, Reply::Full)))
    }

    pub fn empty(&self) -> Result<bool, ClientError> {
        self.status_query(Command::Status, false, |r| Ok(matches!(r, Reply::Empty)))
    }

    pub fn connected(&self) -> Result<bool, ClientError> {
        self.status_query(Command::Ping, false, |r| Ok(matches!(r, Reply::Pong)))
    }

    pub fn realtime_qsize(&self) -> Result<u64, ClientError> {
        self.status_query(Command::Size, 0, as_u64)
    }

    pub fn realtime_maxsize(&self) -> Result<u64, ClientError> {
        self.status_query(Command::MaxSize, 0, as_u64)
    }

    pub fn connected_clients(&self) -> Result<u64, ClientError> {
        self.status_query(Command::Clients, 0, as_u64)
    }

    pub fn reset(&self, new_capacity: Option<u64>) -> Result<(), ClientError> {
        match self.call(Command::Reset { max_size: new_capacity })? {
            Reply::Ok => Ok(()),
            _ => Err(ClientError::ProtocolError),
        }
    }

    pub fn task_done(&self) -> Result<(), ClientError> {
        match self.call(Command::TaskDone)? {
            Reply::Ok => Ok(()),
            Reply::Fail => Err(ClientError::InvalidState),
            _ => Err(ClientError::ProtocolError),
        }
    }

    pub fn join(&self) -> Result<(), ClientError> {
        match self.call(Command::Join)? {
            Reply::Ok => Ok(()),
            _ => Err(ClientError::ProtocolError),
        }
    }

    /// Closes the underlying connection, if any. Waits for any in-flight
    /// exchange to finish first rather than refusing, since close is a
    /// terminal operation, not a competing one.
    pub fn close(&self) {
        let mut guard = self.cell.lock().expect("connection cell poisoned");
        if let Some(mut conn) = guard.connection.take() {
            let _ = conn.close();
        }
    }

    /// Status queries (`full`/`empty`/`connected`/`realtime_*`/
    /// `connected_clients`) silence the whole "server is unreachable"
    /// family under `silence_err`, not just `Disconnected`: a status
    /// query that finds the connection gone re-dials, and against a
    /// server that is down (rather than merely having dropped this one
    /// connection) that re-dial itself fails with `Unreachable` or
    /// `ClientsFull` instead of `Disconnected`. `put`/`get`/`task_done`/
    /// `join`/`reset` never go through this path (spec §7).
    fn status_query<T>(
        &self,
        cmd: Command,
        default: T,
        extract: impl FnOnce(Reply) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        match self.call(cmd) {
            Ok(reply) => extract(reply),
            Err(ClientError::Disconnected | ClientError::Unreachable | ClientError::ClientsFull)
                if self.config.silence_err =>
            {
                Ok(default)
            }
            Err(e) => Err(e),
        }
    }

    /// Acquires the single-caller lock, performs the handshake if not
    /// yet connected, sends `cmd`, and retries once on a detected
    /// disconnect when `auto_reconnect` is set (spec §4.6).
    fn call(&self, cmd: Command) -> Result<Reply, ClientError> {
        let mut guard = match self.cell.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ClientError::ConcurrentUseRefused),
            Err(TryLockError::Poisoned(_)) => panic!("connection cell poisoned"),
        };

        if self.should_short_circuit() {
            return Err(ClientError::Disconnected);
        }

        if guard.connection.is_none() {
            self.ensure_connected(&mut guard)?;
        }

        match self.send_recv(&mut guard, &cmd) {
            Ok(reply) => {
                self.record_success();
                Ok(reply)
            }
            Err(ClientError::Disconnected) if self.config.auto_reconnect => {
                guard.connection = None;
                self.record_failure();
                if self.should_short_circuit() {
                    return Err(ClientError::Disconnected);
                }
                self.ensure_connected(&mut guard)?;
                match self.send_recv(&mut guard, &cmd) {
                    Ok(reply) => {
                        self.record_success();
                        Ok(reply)
                    }
                    Err(e) => {
                        self.record_failure();
                        Err(e)
                    }
                }
            }
            Err(e) => {
                guard.connection = None;
                self.record_failure();
                Err(e)
            }
        }
    }

    fn send_recv(&self, guard: &mut ConnCell, cmd: &Command) -> Result<Reply, ClientError> {
        let conn = guard.connection.as_mut().ok_or(ClientError::Disconnected)?;
        let bytes = cmd.to_envelope().encode();
        conn.write_frame(&bytes).map_err(|_| ClientError::Disconnected)?;
        let response = conn.read_frame().map_err(|_| ClientError::Disconnected)?;
        let env = Envelope::decode(&response).map_err(|_| ClientError::ProtocolError)?;
        Reply::from_envelope(&env).map_err(|_| ClientError::ProtocolError)
    }

    /// Dials and handshakes, remapping a failure to `ClientError::Disconnected`
    /// once a connection has previously been established. The very first
    /// attempt (constructor's eager connect, or `pre_connect`'s deferred
    /// first lazy connect) still surfaces the raw error kind — `Unreachable`/
    /// `ClientsFull`/`AuthenticationFail`/`ProtocolError` — since there is no
    /// prior connection to have been "disconnected" from (spec §4.6).
    fn ensure_connected(&self, guard: &mut ConnCell) -> Result<(), ClientError> {
        let first_attempt = !guard.ever_connected;
        match self.dial_and_handshake(guard) {
            Ok(()) => Ok(()),
            Err(e) if first_attempt => Err(e),
            Err(_) => Err(ClientError::Disconnected),
        }
    }

    fn dial_and_handshake(&self, guard: &mut ConnCell) -> Result<(), ClientError> {
        let mut conn = Dialer::connect(&self.host, self.port, self.config.connect_timeout)
            .map_err(|_| ClientError::Unreachable)?;

        // Bounds the handshake itself (HI + optional AUTH_KEY exchange) so a
        // peer that accepts the TCP connection but never completes the
        // application handshake doesn't hang this call forever. Cleared
        // below once the connection is handed to normal request/response
        // use, where an infinite `block=true` wait is legitimate.
        conn.set_read_timeout(Some(self.config.connect_timeout)).ok();

        match conn.read_frame() {
            Ok(bytes) if bytes == HI => {}
            Ok(_) => return Err(ClientError::ProtocolError),
            Err(TransportError::Proto(ProtoError::PeerClosed)) => return Err(ClientError::ClientsFull),
            Err(_) => return Err(ClientError::Unreachable),
        }

        if let Some(auth_key) = &self.config.auth_key {
            let digest_hex = hash_secret(auth_key);
            let bytes = Command::AuthKey { digest_hex }.to_envelope().encode();
            conn.write_frame(&bytes).map_err(|_| ClientError::Disconnected)?;
            let response = conn.read_frame().map_err(|_| ClientError::Disconnected)?;
            let env = Envelope::decode(&response).map_err(|_| ClientError::ProtocolError)?;
            match Reply::from_envelope(&env).map_err(|_| ClientError::ProtocolError)? {
                Reply::Ok => {}
                Reply::Fail => {
                    let _ = conn.close();
                    return Err(ClientError::AuthenticationFail);
                }
                _ => return Err(ClientError::ProtocolError),
            }
        }

        conn.set_read_timeout(None).ok();
        debug!(host = %self.host, port = self.port, "connected");
        guard.connection = Some(conn);
        guard.ever_connected = true;
        Ok(())
    }

    fn should_short_circuit(&self) -> bool {
        let Some(interval) = self.config.health_check_interval.filter(|d| !d.is_zero()) else {
            return false;
        };
        let health = self.health.lock().expect("health state poisoned");
        health.failed && health.next_attempt_at.is_some_and(|t| Instant::now() < t)
    }

    fn record_failure(&self) {
        let mut health = self.health.lock().expect("health state poisoned");
        health.failed = true;
        if let Some(interval) = self.config.health_check_interval.filter(|d| !d.is_zero()) {
            health.next_attempt_at = Some(Instant::now() + interval);
        }
        warn!(host = %self.host, port = self.port, "connection failure recorded");
    }

    fn record_success(&self) {
        let mut health = self.health.lock().expect("health state poisoned");
        health.failed = false;
        health.next_attempt_at = None;
    }
}

fn as_u64(reply: Reply) -> Result<u64, ClientError> {
    match reply {
        Reply::Data(Item::Int(n)) => Ok(n.max(0) as u64),
        _ => Err(ClientError::ProtocolError),
    }
}
