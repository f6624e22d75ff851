//! The consumer-facing `Client` facade (spec §6): either a single
//! [`ClientCore`] or a connection backed by a [`Pool`]. Every operation
//! acquires-use-releases the pool connection automatically, guaranteed
//! even on error, matching the source library's public surface.

use std::{sync::Arc, time::Duration};

use wirequeue_proto::Item;

use crate::{config::ClientConfig, core::ClientCore, error::ClientError, pool::Pool};

enum Backend {
    Single(ClientCore),
    Pooled(Arc<Pool>),
}

/// See the module docs. `Client::new` opens (or defers, per
/// `pre_connect`) a single dedicated connection; `Client::with_pool`
/// borrows a connection from the shared pool per call.
pub struct Client {
    backend: Backend,
}

impl Client {
    pub fn new(host: impl Into<String>, port: u16, config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self { backend: Backend::Single(ClientCore::new(host, port, config)?) })
    }

    pub fn with_pool(pool: Arc<Pool>) -> Self {
        Self { backend: Backend::Pooled(pool) }
    }

    pub fn put(&self, item: Item, block: bool, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.with_connection(|c| c.put(item, block, timeout))
    }

    pub fn put_nowait(&self, item: Item) -> Result<(), ClientError> {
        self.put(item, false, None)
    }

    pub fn get(&self, block: bool, timeout: Option<Duration>) -> Result<Item, ClientError> {
        self.with_connection(|c| c.get(block, timeout))
    }

    pub fn get_nowait(&self) -> Result<Item, ClientError> {
        self.get(false, None)
    }

    pub fn full(&self) -> Result<bool, ClientError> {
        self.with_connection(ClientCore::full)
    }

    pub fn empty(&self) -> Result<bool, ClientError> {
        self.with_connection(ClientCore::empty)
    }

    pub fn connected(&self) -> Result<bool, ClientError> {
        self.with_connection(ClientCore::connected)
    }

    pub fn realtime_qsize(&self) -> Result<u64, ClientError> {
        self.with_connection(ClientCore::realtime_qsize)
    }

    pub fn realtime_maxsize(&self) -> Result<u64, ClientError> {
        self.with_connection(ClientCore::realtime_maxsize)
    }

    pub fn connected_clients(&self) -> Result<u64, ClientError> {
        self.with_connection(ClientCore::connected_clients)
    }

    pub fn reset(&self, new_capacity: Option<u64>) -> Result<(), ClientError> {
        self.with_connection(|c| c.reset(new_capacity))
    }

    pub fn task_done(&self) -> Result<(), ClientError> {
        self.with_connection(ClientCore::task_done)
    }

    pub fn join(&self) -> Result<(), ClientError> {
        self.with_connection(ClientCore::join)
    }

    pub fn close(&self) {
        match &self.backend {
            Backend::Single(core) => core.close(),
            Backend::Pooled(pool) => pool.close(),
        }
    }

    fn with_connection<T>(&self, f: impl FnOnce(&ClientCore) -> Result<T, ClientError>) -> Result<T, ClientError> {
        match &self.backend {
            Backend::Single(core) => f(core),
            Backend::Pooled(pool) => {
                let conn = pool.acquire(None)?;
                f(&conn)
            }
        }
    }
}
