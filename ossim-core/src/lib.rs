//! Operating System Process Simulator Core
//!
//! This crate simulates the lifecycle of processes scripted in a metadata
//! program:
//! - Configuration and metadata loading
//! - CPU scheduling (FCFS, SJF)
//! - A segment-based memory management unit
//! - Asynchronous I/O with an interrupt queue
//!
//! # Architecture
//!
//! The simulator uses a layered design:
//! - `Config` / `Program`: Immutable inputs, parsed from text files
//! - `ProcessTable`: PCBs with program counters into the shared `Program`
//! - `MemoryManager`, `InterruptLine`, `IoWorkerPool`: Machine components
//! - `EventSink` trait: Where log events go
//! - `SimulationEngine`: Runs the main loop and emits events

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod interrupt;
pub mod io_pool;
pub mod metadata;
pub mod mmu;
pub mod op;
pub mod process;
pub mod scheduler;
pub mod timer;

use std::time::Duration;

pub use config::{Config, LogTo, SchedulingPolicy};
pub use engine::SimulationEngine;
pub use error::{SimError, SimResult};
pub use event::{
    write_json_lines, write_log_file, Actor, EventRecord, EventSink, LogCode, Payload,
    RecordingSink,
};
pub use interrupt::{InterruptLine, InterruptQueue, QueueEmpty, QueueFull};
pub use io_pool::{IoWorkerPool, MAX_IO_WORKERS};
pub use metadata::Program;
pub use mmu::{Fault, MemoryManager, MemorySegment};
pub use op::{OpKind, OpLetter, OpName, Operation, SegmentAddress};
pub use process::{Pcb, Pid, ProcessState, ProcessTable};
pub use timer::SimTimer;

/// Outcome of a completed simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSummary {
    /// Number of processes in the program.
    pub processes: usize,
    /// Processes ended by a segmentation fault.
    pub faulted: usize,
    /// Wall-clock time from `BeginSim` to `EndSim`.
    pub elapsed: Duration,
}
