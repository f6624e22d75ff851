//! Maps a decoded [`Command`] onto the queue engine and a [`Reply`].

use wirequeue_core::QueueError;
use wirequeue_proto::{Command, Item, Reply};

use crate::shared::ServerShared;

/// Outcome of dispatching one command. `ShuttingDown` means the queue
/// observed a shutdown signal mid-call; the worker must exit without
/// attempting a reply, since the connection may already be gone.
pub(crate) enum DispatchOutcome {
    Reply(Reply),
    ShuttingDown,
}

pub(crate) fn dispatch(shared: &ServerShared, cmd: Command) -> DispatchOutcome {
    match cmd {
        Command::AuthKey { .. } => DispatchOutcome::Reply(Reply::Fail),
        Command::Put { block, timeout, item } => match shared.queue.put(item, block, timeout) {
            Ok(()) => DispatchOutcome::Reply(Reply::Ok),
            Err(QueueError::Full) => DispatchOutcome::Reply(Reply::Full),
            Err(QueueError::Closed) => DispatchOutcome::ShuttingDown,
            Err(_) => DispatchOutcome::Reply(Reply::Fail),
        },
        Command::Get { block, timeout } => match shared.queue.get(block, timeout) {
            Ok(item) => DispatchOutcome::Reply(Reply::Data(item)),
            Err(QueueError::Empty) => DispatchOutcome::Reply(Reply::Empty),
            Err(QueueError::Closed) => DispatchOutcome::ShuttingDown,
            Err(_) => DispatchOutcome::Reply(Reply::Fail),
        },
        Command::Status => {
            let reply = if shared.queue.full() {
                Reply::Full
            } else if shared.queue.empty() {
                Reply::Empty
            } else {
                Reply::Normal
            };
            DispatchOutcome::Reply(reply)
        }
        Command::Ping => DispatchOutcome::Reply(Reply::Pong),
        Command::Size => DispatchOutcome::Reply(Reply::Data(Item::Int(shared.queue.qsize() as i64))),
        Command::MaxSize => DispatchOutcome::Reply(Reply::Data(Item::Int(shared.queue.capacity() as i64))),
        Command::Reset { max_size } => {
            shared.queue.reset(max_size.map(|m| m as usize));
            DispatchOutcome::Reply(Reply::Ok)
        }
        Command::Clients => {
            let count = shared.sessions.lock().expect("session table poisoned").len();
            DispatchOutcome::Reply(Reply::Data(Item::Int(count as i64)))
        }
        Command::TaskDone => match shared.queue.task_done() {
            Ok(()) => DispatchOutcome::Reply(Reply::Ok),
            Err(_) => DispatchOutcome::Reply(Reply::Fail),
        },
        Command::Join => match shared.queue.join() {
            Ok(()) => DispatchOutcome::Reply(Reply::Ok),
            Err(_) => DispatchOutcome::ShuttingDown,
        },
    }
}
