//! Shared utilities used by both the server and client halves (C8):
//! secret hashing, named background-worker spawning, and a `Drop`-based
//! scope guard for paired enter/exit bookkeeping.

pub mod scope_guard;
pub mod secret;
pub mod thread;

pub use scope_guard::ScopeGuard;
pub use secret::hash_secret;
pub use thread::spawn_named;
