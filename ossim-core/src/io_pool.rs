//! Asynchronous I/O workers.
//!
//! Every dispatched I/O operation runs on its own thread: it sleeps for the
//! operation's simulated duration, raises an interrupt for its pid and then
//! reports completion to the pool. The engine owns the pool and is the only
//! caller, so the handle table needs no locking.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, trace};

use crate::error::{SimError, SimResult};
use crate::interrupt::{InterruptLine, QueueFull};
use crate::process::Pid;
use crate::timer::SimTimer;

/// Default cap on concurrently outstanding I/O operations.
pub const MAX_IO_WORKERS: usize = 100;

type WorkerId = u64;

/// Message a worker sends once its interrupt has been raised.
struct Completion {
    worker: WorkerId,
    pid: Pid,
    raised: SimResult<Result<(), QueueFull>>,
}

/// Pool of in-flight I/O workers.
pub struct IoWorkerPool {
    capacity: usize,
    interrupts: InterruptLine,
    workers: HashMap<WorkerId, JoinHandle<()>>,
    next_id: WorkerId,
    done_tx: Sender<Completion>,
    done_rx: Receiver<Completion>,
}

impl IoWorkerPool {
    pub fn new(capacity: usize, interrupts: InterruptLine) -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            capacity,
            interrupts,
            workers: HashMap::new(),
            next_id: 0,
            done_tx,
            done_rx,
        }
    }

    /// Number of workers not yet reclaimed.
    pub fn outstanding(&self) -> usize {
        self.workers.len()
    }

    /// Start a worker that waits `wait_ms` and then interrupts on behalf of
    /// `pid`. Fails when the pool is already at capacity.
    pub fn submit(&mut self, pid: Pid, wait_ms: u64) -> SimResult<()> {
        self.reap()?;
        if self.workers.len() >= self.capacity {
            error!(pid, capacity = self.capacity, "I/O worker pool exhausted");
            return Err(SimError::WorkerCapacity {
                capacity: self.capacity,
            });
        }

        let worker = self.next_id;
        self.next_id += 1;

        let interrupts = self.interrupts.clone();
        let done_tx = self.done_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("io-worker-{}", worker))
            .spawn(move || {
                SimTimer::wait(wait_ms);
                let raised = interrupts.raise(pid);
                trace!(pid, worker, "I/O complete");
                // The pool may already be gone during teardown.
                let _ = done_tx.send(Completion {
                    worker,
                    pid,
                    raised,
                });
            })?;

        debug!(pid, worker, wait_ms, "I/O worker started");
        self.workers.insert(worker, handle);
        Ok(())
    }

    /// Reclaim every worker that has already finished, without blocking.
    pub fn reap(&mut self) -> SimResult<usize> {
        let mut reclaimed = 0;
        loop {
            match self.done_rx.try_recv() {
                Ok(done) => {
                    self.reclaim(done)?;
                    reclaimed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(reclaimed)
    }

    /// Block until some outstanding worker finishes and reclaim it. Returns
    /// the pid it served, or `None` immediately when nothing is in flight.
    pub fn wait_any(&mut self) -> SimResult<Option<Pid>> {
        if self.workers.is_empty() {
            return Ok(None);
        }
        // The pool holds a sender itself, so this only returns once a worker
        // reports in.
        match self.done_rx.recv() {
            Ok(done) => self.reclaim(done).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn reclaim(&mut self, done: Completion) -> SimResult<Pid> {
        if let Some(handle) = self.workers.remove(&done.worker) {
            handle
                .join()
                .map_err(|_| SimError::WorkerPanicked(done.pid))?;
        }
        if done.raised?.is_err() {
            return Err(SimError::InterruptOverflow(done.pid));
        }
        Ok(done.pid)
    }

    /// Wait for every outstanding worker.
    pub fn join_all(&mut self) -> SimResult<()> {
        while self.wait_any()?.is_some() {}
        Ok(())
    }
}

impl Drop for IoWorkerPool {
    fn drop(&mut self) {
        for (_, handle) in self.workers.drain() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_completion_raises_interrupt() {
        let line = InterruptLine::new(2);
        let mut pool = IoWorkerPool::new(4, line.clone());

        pool.submit(1, 10).unwrap();
        assert_eq!(pool.outstanding(), 1);

        assert_eq!(pool.wait_any().unwrap(), Some(1));
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(line.take().unwrap(), Some(1));
    }

    #[test]
    fn test_interrupts_arrive_in_completion_order() {
        let line = InterruptLine::new(3);
        let mut pool = IoWorkerPool::new(4, line.clone());

        pool.submit(0, 150).unwrap();
        pool.submit(1, 10).unwrap();
        pool.submit(2, 80).unwrap();
        pool.join_all().unwrap();

        let order: Vec<Pid> = std::iter::from_fn(|| line.take().unwrap()).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let line = InterruptLine::new(4);
        let mut pool = IoWorkerPool::new(2, line);

        pool.submit(0, 200).unwrap();
        pool.submit(1, 200).unwrap();
        assert!(matches!(
            pool.submit(2, 1),
            Err(SimError::WorkerCapacity { capacity: 2 })
        ));
        pool.join_all().unwrap();

        // Finished workers free their slots.
        pool.submit(2, 1).unwrap();
        pool.join_all().unwrap();
    }

    #[test]
    fn test_wait_any_with_nothing_in_flight() {
        let mut pool = IoWorkerPool::new(1, InterruptLine::new(1));
        let start = Instant::now();
        assert_eq!(pool.wait_any().unwrap(), None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_queue_overflow_is_reported() {
        let line = InterruptLine::new(1);
        let mut pool = IoWorkerPool::new(4, line);

        pool.submit(0, 1).unwrap();
        pool.submit(1, 1).unwrap();
        let first = pool.wait_any();
        let second = pool.wait_any();
        let overflowed = [first, second]
            .into_iter()
            .filter(|r| matches!(r, Err(SimError::InterruptOverflow(_))))
            .count();
        assert_eq!(overflowed, 1);
    }
}
