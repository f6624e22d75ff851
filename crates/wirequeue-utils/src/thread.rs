//! Background-worker spawning. The server launches one accept thread and
//! one worker thread per admitted session (spec §5); naming every thread
//! helps a `jstack`-equivalent dump read like the component table rather
//! than a wall of `<unnamed>`.

use std::thread::{Builder, JoinHandle};

use tracing::error;

/// Spawns `f` on a named background thread, logging (rather than
/// panicking the caller) if thread creation itself fails — an accept
/// loop should keep accepting even if the OS is briefly out of threads.
pub fn spawn_named<F>(name: impl Into<String>, f: F) -> Option<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    match Builder::new().name(name.clone()).spawn(f) {
        Ok(handle) => Some(handle),
        Err(err) => {
            error!(%name, %err, "failed to spawn background thread");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

    use super::*;

    #[test]
    fn spawned_thread_runs_to_completion() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        let handle = spawn_named("test-worker", move || ran2.store(true, Ordering::SeqCst)).unwrap();
        handle.join().unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
