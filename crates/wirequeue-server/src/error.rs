use thiserror::Error;

use wirequeue_transport::TransportError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind listener")]
    Bind(#[source] TransportError),

    #[error("server is already running")]
    AlreadyRunning,
}
