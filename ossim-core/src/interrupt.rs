//! Interrupt queue.
//!
//! `InterruptQueue` is a fixed-capacity circular FIFO of pids. I/O workers
//! push into it from their own threads while the engine drains it, so the
//! engine and the workers share it through an `InterruptLine`.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::error::{SimError, SimResult};
use crate::process::Pid;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interrupt queue full")]
pub struct QueueFull;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interrupt queue empty")]
pub struct QueueEmpty;

/// Bounded circular buffer of pids.
#[derive(Debug, Clone)]
pub struct InterruptQueue {
    slots: Vec<Pid>,
    head: usize,
    rear: usize,
    len: usize,
}

impl InterruptQueue {
    /// Capacity is fixed for the queue's lifetime; the engine sizes it to
    /// the process count.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity],
            head: 0,
            rear: capacity.saturating_sub(1),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn enqueue(&mut self, pid: Pid) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull);
        }
        self.rear = (self.rear + 1) % self.slots.len();
        self.slots[self.rear] = pid;
        self.len += 1;
        Ok(())
    }

    pub fn dequeue(&mut self) -> Result<Pid, QueueEmpty> {
        if self.is_empty() {
            return Err(QueueEmpty);
        }
        let pid = self.slots[self.head];
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        Ok(pid)
    }

    pub fn peek_head(&self) -> Option<Pid> {
        (!self.is_empty()).then(|| self.slots[self.head])
    }

    pub fn peek_rear(&self) -> Option<Pid> {
        (!self.is_empty()).then(|| self.slots[self.rear])
    }
}

/// Thread-safe handle to an `InterruptQueue`.
///
/// Clone is cheap (just clones the Arc).
#[derive(Clone)]
pub struct InterruptLine {
    inner: Arc<Mutex<InterruptQueue>>,
}

impl InterruptLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InterruptQueue::new(capacity))),
        }
    }

    fn lock(&self) -> SimResult<MutexGuard<'_, InterruptQueue>> {
        self.inner.lock().map_err(|_| SimError::LockPoisoned)
    }

    /// Signal that `pid`'s I/O has completed.
    pub fn raise(&self, pid: Pid) -> SimResult<Result<(), QueueFull>> {
        Ok(self.lock()?.enqueue(pid))
    }

    /// Take the oldest pending interrupt, if any.
    pub fn take(&self) -> SimResult<Option<Pid>> {
        Ok(self.lock()?.dequeue().ok())
    }

    pub fn is_empty(&self) -> SimResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}
