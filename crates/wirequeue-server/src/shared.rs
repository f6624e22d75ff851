use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

use wirequeue_core::Queue;
use wirequeue_transport::Listener;

use crate::session::SessionInfo;

/// State shared between the accept loop and every session worker. Held
/// behind an `Arc` by the owning [`crate::Server`] and cloned into each
/// worker thread; no component here owns a `Server` back-reference.
pub(crate) struct ServerShared {
    pub name: String,
    pub queue: Queue,
    pub listener: Listener,
    pub sessions: Mutex<HashMap<u64, SessionInfo>>,
    pub next_session_id: AtomicU64,
    pub max_clients: usize,
    pub auth_digest: Option<String>,
    pub closed: AtomicBool,
}

impl ServerShared {
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().expect("session table poisoned").len()
    }
}
