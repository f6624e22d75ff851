use thiserror::Error;

/// Errors raised by the queue engine itself, independent of any wire
/// transport. The server dispatcher maps these onto the reply table in
/// the protocol (`FULL`, `EMPTY`, `FAIL`, ...).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is at capacity")]
    Full,
    #[error("queue is empty")]
    Empty,
    #[error("task_done called with no matching put outstanding")]
    InvalidState,
    #[error("queue was closed")]
    Closed,
}
