//! The bounded FIFO queue engine (C4): thread-safe, condvar-blocking,
//! with `put`/`task_done` accounting and a `reset` that can atomically
//! swap in a fresh queue without leaving any waiter blocked on the old
//! one.
//!
//! Grounded in the same `Mutex` + `Condvar` `wait_while` shape used
//! elsewhere in this codebase for one-shot latches, generalised here to a
//! bounded ring of items with two wait conditions (not-full, not-empty)
//! plus a third (`unfinished == 0`) for `join`.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

use tracing::debug;
use wirequeue_proto::Item;

use crate::error::QueueError;

struct State {
    items: VecDeque<Item>,
    capacity: usize,
    unfinished: u64,
    closed: bool,
    /// Bumped on every `reset` and on `close`. A waiter records the
    /// generation it started waiting under; if the generation changes
    /// while it slept, it knows the queue instance it was waiting on no
    /// longer exists and unwinds instead of re-evaluating against
    /// whatever replaced it: a blocked `put`/`get` observes `Full`/`Empty`
    /// once, immediately after `reset`, rather than being silently
    /// reclassified against the new capacity (see DESIGN.md).
    generation: u64,
}

impl State {
    fn is_full(&self) -> bool {
        self.capacity > 0 && self.items.len() >= self.capacity
    }
}

/// A bounded, thread-safe FIFO queue of [`Item`]s with task accounting.
/// `capacity == 0` means unbounded.
pub struct Queue {
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
    joined: Condvar,
}

impl Queue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                capacity,
                unfinished: 0,
                closed: false,
                generation: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            joined: Condvar::new(),
        }
    }

    /// Inserts `item`, following §4.4's blocking contract: `block=false`
    /// returns `Full` immediately when there is no room; `block=true`
    /// waits up to `timeout` (or forever when `None`).
    pub fn put(&self, item: Item, block: bool, timeout: Option<Duration>) -> Result<(), QueueError> {
        let mut guard = self.state.lock().expect("queue mutex poisoned");
        let my_generation = guard.generation;

        if guard.is_full() {
            if !block {
                return Err(QueueError::Full);
            }
            let deadline = timeout.map(|t| Instant::now() + t);
            loop {
                if guard.closed {
                    return Err(QueueError::Closed);
                }
                if guard.generation != my_generation {
                    return Err(QueueError::Full);
                }
                if !guard.is_full() {
                    break;
                }
                let wait_for = match deadline {
                    Some(d) => match d.checked_duration_since(Instant::now()) {
                        Some(remaining) => remaining,
                        None => return Err(QueueError::Full),
                    },
                    None => Duration::from_secs(3600),
                };
                let (next, _) = self.not_full.wait_timeout(guard, wait_for).expect("queue mutex poisoned");
                guard = next;
            }
        }

        if guard.closed {
            return Err(QueueError::Closed);
        }

        guard.items.push_back(item);
        guard.unfinished += 1;
        let qsize = guard.items.len();
        drop(guard);
        debug!(qsize, "put");
        self.not_empty.notify_all();
        Ok(())
    }

    /// Removes and returns the oldest item, following the same blocking
    /// contract as [`Queue::put`].
    pub fn get(&self, block: bool, timeout: Option<Duration>) -> Result<Item, QueueError> {
        let mut guard = self.state.lock().expect("queue mutex poisoned");
        let my_generation = guard.generation;

        if guard.items.is_empty() {
            if !block {
                return Err(QueueError::Empty);
            }
            let deadline = timeout.map(|t| Instant::now() + t);
            loop {
                if guard.closed {
                    return Err(QueueError::Closed);
                }
                if guard.generation != my_generation {
                    return Err(QueueError::Empty);
                }
                if !guard.items.is_empty() {
                    break;
                }
                let wait_for = match deadline {
                    Some(d) => match d.checked_duration_since(Instant::now()) {
                        Some(remaining) => remaining,
                        None => return Err(QueueError::Empty),
                    },
                    None => Duration::from_secs(3600),
                };
                let (next, _) = self.not_empty.wait_timeout(guard, wait_for).expect("queue mutex poisoned");
                guard = next;
            }
        }

        if guard.closed && guard.items.is_empty() {
            return Err(QueueError::Closed);
        }

        let item = guard.items.pop_front().expect("checked non-empty above");
        let qsize = guard.items.len();
        drop(guard);
        debug!(qsize, "get");
        self.not_full.notify_all();
        Ok(item)
    }

    pub fn qsize(&self) -> usize {
        self.state.lock().expect("queue mutex poisoned").items.len()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().expect("queue mutex poisoned").capacity
    }

    pub fn full(&self) -> bool {
        self.state.lock().expect("queue mutex poisoned").is_full()
    }

    pub fn empty(&self) -> bool {
        self.state.lock().expect("queue mutex poisoned").items.is_empty()
    }

    /// Atomically drops all current items and recreates an empty queue,
    /// optionally with a new capacity. Wakes every waiter blocked on the
    /// old generation so none is left stuck on an instance that no
    /// longer exists.
    pub fn reset(&self, new_capacity: Option<usize>) {
        {
            let mut guard = self.state.lock().expect("queue mutex poisoned");
            guard.items.clear();
            guard.unfinished = 0;
            if let Some(cap) = new_capacity {
                guard.capacity = cap;
            }
            guard.generation = guard.generation.wrapping_add(1);
        }
        debug!(?new_capacity, "reset");
        self.not_full.notify_all();
        self.not_empty.notify_all();
        self.joined.notify_all();
    }

    /// Decrements the outstanding-put count. Errors with `InvalidState`
    /// if there is no outstanding `put` to account for, matching the
    /// source's `task_done()` contract.
    pub fn task_done(&self) -> Result<(), QueueError> {
        let mut guard = self.state.lock().expect("queue mutex poisoned");
        if guard.unfinished == 0 {
            return Err(QueueError::InvalidState);
        }
        guard.unfinished -= 1;
        let reached_zero = guard.unfinished == 0;
        drop(guard);
        if reached_zero {
            self.joined.notify_all();
        }
        Ok(())
    }

    /// Blocks until `unfinished` reaches zero, or returns `Closed` if the
    /// queue is shut down while waiting.
    pub fn join(&self) -> Result<(), QueueError> {
        let guard = self.state.lock().expect("queue mutex poisoned");
        let guard = self
            .joined
            .wait_while(guard, |s| s.unfinished > 0 && !s.closed)
            .expect("queue mutex poisoned");
        if guard.closed && guard.unfinished > 0 {
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    /// Marks the queue closed and wakes every waiter so in-progress
    /// `put`/`get`/`join` calls unwind with `Closed` instead of blocking
    /// forever on a server that is shutting down.
    pub fn shutdown(&self) {
        {
            let mut guard = self.state.lock().expect("queue mutex poisoned");
            guard.closed = true;
        }
        debug!("shutdown");
        self.not_full.notify_all();
        self.not_empty.notify_all();
        self.joined.notify_all();
    }

    pub fn unfinished(&self) -> u64 {
        self.state.lock().expect("queue mutex poisoned").unfinished
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn capacity_zero_is_unbounded() {
        let q = Queue::new(0);
        for i in 0..1000 {
            q.put(Item::Int(i), false, None).unwrap();
        }
        assert_eq!(q.qsize(), 1000);
    }

    #[test]
    fn nonblocking_put_fails_full_and_get_fails_empty() {
        let q = Queue::new(2);
        q.put(Item::Str("a".into()), false, None).unwrap();
        q.put(Item::Str("b".into()), false, None).unwrap();
        assert_eq!(q.put(Item::Str("c".into()), false, None), Err(QueueError::Full));

        assert_eq!(q.get(false, None).unwrap(), Item::Str("a".into()));
        assert_eq!(q.get(false, None).unwrap(), Item::Str("b".into()));
        assert_eq!(q.get(false, None), Err(QueueError::Empty));
    }

    #[test]
    fn fifo_order_is_preserved() {
        let q = Queue::new(0);
        for i in 0..10 {
            q.put(Item::Int(i), true, None).unwrap();
        }
        for i in 0..10 {
            assert_eq!(q.get(true, None).unwrap(), Item::Int(i));
        }
    }

    #[test]
    fn blocked_put_completes_once_a_slot_opens() {
        let q = Arc::new(Queue::new(1));
        q.put(Item::Str("1".into()), true, None).unwrap();

        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || q2.put(Item::Str("2".into()), true, None));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(q.get(true, None).unwrap(), Item::Str("1".into()));
        handle.join().unwrap().unwrap();
        assert_eq!(q.qsize(), 1);
    }

    #[test]
    fn timed_get_times_out_on_empty_queue() {
        let q = Queue::new(0);
        let start = Instant::now();
        assert_eq!(q.get(true, Some(Duration::from_millis(50))), Err(QueueError::Empty));
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn task_done_without_outstanding_put_is_invalid_state() {
        let q = Queue::new(0);
        assert_eq!(q.task_done(), Err(QueueError::InvalidState));
    }

    #[test]
    fn join_returns_when_unfinished_reaches_zero() {
        let q = Arc::new(Queue::new(0));
        q.put(Item::Int(1), true, None).unwrap();
        q.put(Item::Int(2), true, None).unwrap();

        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || q2.join());

        std::thread::sleep(Duration::from_millis(20));
        q.task_done().unwrap();
        q.task_done().unwrap();
        handle.join().unwrap().unwrap();
        assert_eq!(q.task_done(), Err(QueueError::InvalidState));
    }

    #[test]
    fn reset_clears_state_and_releases_waiters() {
        let q = Arc::new(Queue::new(1));
        q.put(Item::Int(1), true, None).unwrap();

        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || q2.put(Item::Int(2), true, None));
        std::thread::sleep(Duration::from_millis(30));

        q.reset(Some(5));
        assert_eq!(handle.join().unwrap(), Err(QueueError::Full));

        assert_eq!(q.qsize(), 0);
        assert_eq!(q.capacity(), 5);
        assert_eq!(q.unfinished(), 0);
    }

    #[test]
    fn shutdown_releases_blocked_get() {
        let q = Arc::new(Queue::new(0));
        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || q2.get(true, None));
        std::thread::sleep(Duration::from_millis(30));
        q.shutdown();
        assert_eq!(handle.join().unwrap(), Err(QueueError::Closed));
    }

    #[test]
    fn shutdown_releases_blocked_join() {
        let q = Arc::new(Queue::new(0));
        q.put(Item::Int(1), true, None).unwrap();
        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || q2.join());
        std::thread::sleep(Duration::from_millis(30));
        q.shutdown();
        assert_eq!(handle.join().unwrap(), Err(QueueError::Closed));
    }
}
