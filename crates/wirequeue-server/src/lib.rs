//! The server dispatcher (C5): accept loop, per-connection worker,
//! authentication, command dispatch, and admission control, layered on
//! top of [`wirequeue_core::Queue`] and [`wirequeue_transport`].

mod config;
mod dispatch;
mod error;
mod server;
mod session;
mod shared;
mod worker;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{ScopedServer, Server};
