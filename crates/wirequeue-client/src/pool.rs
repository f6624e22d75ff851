//! Bounded connection pool (C7): lend/return discipline across a bounded
//! set of [`ClientCore`]s, preserving the rule that any blocking request
//! fully owns its connection for its lifetime (spec §4.7).

use std::{
    ops::Deref,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{config::ClientConfig, core::ClientCore, error::ClientError};

struct PoolState {
    idle: Vec<Arc<ClientCore>>,
    in_use_count: usize,
    closed: bool,
}

/// `max_connections = 0` means unbounded. Connections are created lazily
/// (and lazily dialed — the pool always builds its `ClientCore`s with
/// `pre_connect = true` regardless of the configured client options, so
/// `acquire` never fails because the network happened to be down at
/// that instant; the dial itself happens on first use).
pub struct Pool {
    host: String,
    port: u16,
    max_connections: usize,
    client_config: ClientConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl Pool {
    pub fn new(host: impl Into<String>, port: u16, max_connections: usize, client_config: ClientConfig) -> Self {
        Self {
            host: host.into(),
            port,
            max_connections,
            client_config: client_config.with_pre_connect(true),
            state: Mutex::new(PoolState { idle: Vec::new(), in_use_count: 0, closed: false }),
            available: Condvar::new(),
        }
    }

    /// `single_connection_client` shorthand from spec §4.7.
    pub fn single(host: impl Into<String>, port: u16, client_config: ClientConfig) -> Self {
        Self::new(host, port, 1, client_config)
    }

    /// Returns an idle connection if one exists; otherwise creates a new
    /// one if the pool has room; otherwise, with `timeout = None`,
    /// refuses immediately with `AtCapacity` (the source's default,
    /// preserved per spec §4.7). Passing `timeout` opts into the
    /// documented extension: wait on a condition variable, notified by
    /// every `release`/`close`, up to `timeout`.
    pub fn acquire(&self, timeout: Option<Duration>) -> Result<PooledConnection<'_>, ClientError> {
        let mut guard = self.state.lock().expect("pool state poisoned");
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if guard.closed {
                return Err(ClientError::PoolClosed);
            }
            if let Some(conn) = guard.idle.pop() {
                guard.in_use_count += 1;
                return Ok(PooledConnection { pool: self, conn: Some(conn) });
            }
            let unbounded = self.max_connections == 0;
            if unbounded || guard.in_use_count + guard.idle.len() < self.max_connections {
                guard.in_use_count += 1;
                let conn = Arc::new(ClientCore::new(self.host.clone(), self.port, self.client_config.clone())?);
                return Ok(PooledConnection { pool: self, conn: Some(conn) });
            }

            let Some(deadline) = deadline else {
                return Err(ClientError::AtCapacity);
            };
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) => remaining,
                None => return Err(ClientError::Timeout),
            };
            let (next, timed_out) =
                self.available.wait_timeout(guard, remaining).expect("pool state poisoned");
            guard = next;
            if timed_out.timed_out() && guard.idle.is_empty() && Instant::now() >= deadline {
                return Err(ClientError::Timeout);
            }
        }
    }

    fn release(&self, conn: Arc<ClientCore>) {
        let mut guard = self.state.lock().expect("pool state poisoned");
        guard.in_use_count = guard.in_use_count.saturating_sub(1);
        if guard.closed {
            conn.close();
        } else {
            guard.idle.push(conn);
        }
        drop(guard);
        self.available.notify_one();
    }

    /// Transitions to closed, closes every idle connection; in-use
    /// connections are closed as they are released.
    pub fn close(&self) {
        let mut guard = self.state.lock().expect("pool state poisoned");
        guard.closed = true;
        for conn in guard.idle.drain(..) {
            conn.close();
        }
        drop(guard);
        self.available.notify_all();
        debug!(host = %self.host, port = self.port, "pool closed");
    }
}

/// A connection on loan from a [`Pool`]. [`Pool::release`] runs
/// automatically on drop, including when the borrowing call returns an
/// error, so a pool never leaks a connection into permanent in-use
/// state.
pub struct PooledConnection<'p> {
    pool: &'p Pool,
    conn: Option<Arc<ClientCore>>,
}

impl Deref for PooledConnection<'_> {
    type Target = ClientCore;

    fn deref(&self) -> &ClientCore {
        self.conn.as_ref().expect("pooled connection used after release")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
