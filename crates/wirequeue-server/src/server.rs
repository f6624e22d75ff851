use std::{
    collections::HashMap,
    net::SocketAddr,
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::Duration,
};

use tracing::info;
use wirequeue_core::{Queue, QueueError};
use wirequeue_proto::Item;
use wirequeue_transport::Listener;
use wirequeue_utils::hash_secret;

use crate::{config::ServerConfig, error::ServerError, shared::ServerShared, worker::accept_loop};

/// The TCP-reachable FIFO queue service. Owns the listener,
/// the queue engine, and the session table; a background accept thread
/// is launched by [`Server::run`] and spawns one worker thread per
/// admitted session.
pub struct Server {
    shared: Arc<ServerShared>,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl Server {
    pub fn bind(host: &str, port: u16, config: ServerConfig) -> Result<Self, ServerError> {
        let listener = Listener::bind(host, port).map_err(ServerError::Bind)?;
        let name = config.name.unwrap_or_else(|| "wirequeue".to_string());
        let auth_digest = config.auth_key.as_deref().map(hash_secret);

        let shared = Arc::new(ServerShared {
            name,
            queue: Queue::new(config.capacity),
            listener,
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            max_clients: config.max_clients,
            auth_digest,
            closed: AtomicBool::new(false),
        });

        Ok(Self { shared, accept_handle: Mutex::new(None), started: AtomicBool::new(false) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.shared.listener.local_addr()
    }

    /// Spawns the background accept loop. Calling `run` a second time
    /// before `close` is an error.
    pub fn run(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyRunning);
        }
        info!(name = %self.shared.name, addr = %self.local_addr(), "server starting");
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("wirequeue-accept".into())
            .spawn(move || accept_loop(shared))
            .expect("failed to spawn accept thread");
        *self.accept_handle.lock().expect("accept handle mutex poisoned") = Some(handle);
        Ok(())
    }

    /// Marks the server closed, releases every blocked queue operation,
    /// force-disconnects every live session, and joins the accept
    /// thread. Idempotent, and never itself blocks on a queue operation.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.queue.shutdown();

        let sessions = std::mem::take(&mut *self.shared.sessions.lock().expect("session table poisoned"));
        for (_, session) in sessions {
            let _ = session.stream.shutdown(std::net::Shutdown::Both);
        }

        self.shared.listener.wake_accept_loop();

        if let Some(handle) = self.accept_handle.lock().expect("accept handle mutex poisoned").take() {
            let _ = handle.join();
        }
        info!(name = %self.shared.name, "server closed");
    }

    pub fn client_count(&self) -> usize {
        self.shared.active_sessions()
    }

    pub fn put(&self, item: Item, block: bool, timeout: Option<Duration>) -> Result<(), QueueError> {
        self.shared.queue.put(item, block, timeout)
    }

    pub fn put_nowait(&self, item: Item) -> Result<(), QueueError> {
        self.put(item, false, None)
    }

    pub fn get(&self, block: bool, timeout: Option<Duration>) -> Result<Item, QueueError> {
        self.shared.queue.get(block, timeout)
    }

    pub fn get_nowait(&self) -> Result<Item, QueueError> {
        self.get(false, None)
    }

    pub fn qsize(&self) -> usize {
        self.shared.queue.qsize()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn full(&self) -> bool {
        self.shared.queue.full()
    }

    pub fn empty(&self) -> bool {
        self.shared.queue.empty()
    }

    pub fn reset(&self, new_capacity: Option<usize>) {
        self.shared.queue.reset(new_capacity);
    }

    pub fn task_done(&self) -> Result<(), QueueError> {
        self.shared.queue.task_done()
    }

    pub fn join(&self) -> Result<(), QueueError> {
        self.shared.queue.join()
    }

    /// Wraps `self` in a guard that calls [`Server::close`] on drop, for
    /// callers that want guaranteed cleanup without remembering to call
    /// `close` on every exit path by hand.
    pub fn into_scoped(self) -> ScopedServer {
        ScopedServer(Some(self))
    }
}

/// See [`Server::into_scoped`].
pub struct ScopedServer(Option<Server>);

impl Deref for ScopedServer {
    type Target = Server;

    fn deref(&self) -> &Server {
        self.0.as_ref().expect("scoped server used after drop")
    }
}

impl DerefMut for ScopedServer {
    fn deref_mut(&mut self) -> &mut Server {
        self.0.as_mut().expect("scoped server used after drop")
    }
}

impl Drop for ScopedServer {
    fn drop(&mut self) {
        if let Some(server) = self.0.take() {
            server.close();
        }
    }
}
