//! The accept loop and the per-session worker loop.

use std::sync::{atomic::Ordering, Arc};

use tracing::{debug, info, warn};
use wirequeue_proto::{Command, Envelope, Reply, HI};
use wirequeue_transport::{Connection, TransportError};
use wirequeue_utils::{spawn_named, ScopeGuard};

use crate::{
    dispatch::{dispatch, DispatchOutcome},
    session::SessionInfo,
    shared::ServerShared,
};

/// Runs until the listener is closed. Admits a connection only when
/// `max_clients == 0` or the current session count is below it;
/// otherwise the socket is closed immediately with no protocol bytes
/// sent, so the peer observes a close during its handshake read and
/// surfaces `ClientsFull`.
pub(crate) fn accept_loop(shared: Arc<ServerShared>) {
    loop {
        let (mut conn, addr) = match shared.listener.accept() {
            Ok(pair) => pair,
            Err(TransportError::Closed) => break,
            Err(err) => {
                if shared.closed.load(Ordering::Acquire) {
                    break;
                }
                warn!(%err, "accept failed");
                continue;
            }
        };

        if shared.closed.load(Ordering::Acquire) {
            break;
        }

        if shared.max_clients > 0 && shared.active_sessions() >= shared.max_clients {
            debug!(%addr, max_clients = shared.max_clients, "refusing connection: at capacity");
            let _ = conn.close();
            continue;
        }

        let stream_clone = match conn.try_clone_stream() {
            Ok(s) => s,
            Err(err) => {
                warn!(%addr, %err, "failed to clone accepted stream, dropping connection");
                continue;
            }
        };

        if conn.write_frame(HI).is_err() {
            continue;
        }

        let id = shared.next_session_id.fetch_add(1, Ordering::Relaxed);
        shared
            .sessions
            .lock()
            .expect("session table poisoned")
            .insert(id, SessionInfo { remote_addr: addr, stream: stream_clone });
        info!(%addr, session = id, "session admitted");

        let shared = Arc::clone(&shared);
        spawn_named(format!("wirequeue-session-{id}"), move || run_session(shared, id, conn));
    }
    debug!("accept loop exiting");
}

/// One worker thread per session. Entering registers it in the session
/// table; every exit path — peer close, decode error, or a queue
/// shutdown observed mid-call — runs the same deregistration via
/// `ScopeGuard`, mirroring the source's `_wk_svr_helper` context manager.
fn run_session(shared: Arc<ServerShared>, id: u64, mut conn: Connection) {
    let dereg_shared = Arc::clone(&shared);
    let _guard = ScopeGuard::new(move || {
        let removed = dereg_shared.sessions.lock().expect("session table poisoned").remove(&id);
        match removed {
            Some(session) => debug!(session = id, addr = %session.remote_addr, "session deregistered"),
            None => debug!(session = id, "session deregistered"),
        }
    });

    let mut authenticated = shared.auth_digest.is_none();

    loop {
        let frame = match conn.read_frame() {
            Ok(frame) => frame,
            Err(_) => break,
        };
        let env = match Envelope::decode(&frame) {
            Ok(env) => env,
            Err(_) => break,
        };

        if !authenticated {
            let Ok(Command::AuthKey { digest_hex }) = Command::from_envelope(&env) else {
                let _ = conn.write_frame(&Reply::NeedAuth.to_envelope().encode());
                break;
            };
            let matches = shared.auth_digest.as_deref() == Some(digest_hex.as_str());
            let reply = if matches { Reply::Ok } else { Reply::Fail };
            if conn.write_frame(&reply.to_envelope().encode()).is_err() {
                break;
            }
            if !matches {
                break;
            }
            // Authentication succeeds and the session continues serving
            // requests rather than terminating right after the handshake.
            authenticated = true;
            continue;
        }

        let cmd = match Command::from_envelope(&env) {
            Ok(cmd) => cmd,
            Err(_) => break,
        };

        match dispatch(&shared, cmd) {
            DispatchOutcome::Reply(reply) => {
                if conn.write_frame(&reply.to_envelope().encode()).is_err() {
                    break;
                }
            }
            DispatchOutcome::ShuttingDown => break,
        }
    }
}
