//! Process control blocks and the process table.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::metadata::Program;
use crate::mmu::MemorySegment;
use crate::op::{OpKind, Operation};

/// Process identifier, assigned in discovery order starting at 0.
pub type Pid = usize;

/// Process lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Exited,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "NEW",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Blocked => "BLOCKED",
            Self::Exited => "EXIT",
        })
    }
}

/// Process control block.
#[derive(Debug, Clone)]
pub struct Pcb {
    pub pid: Pid,
    pub state: ProcessState,
    /// Operations of this process in the shared program, `A(start)` through
    /// `A(end)` inclusive.
    span: Range<usize>,
    /// Index into `span` of the next operation to dispatch.
    program_counter: usize,
    /// Total CPU and I/O time of the process, computed once at load.
    pub remaining_time_ms: u64,
    /// Most recent MMU request, kept for log context.
    pub memory_segment: Option<MemorySegment>,
}

impl Pcb {
    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

/// Owns every PCB and the program they execute.
#[derive(Debug, Clone)]
pub struct ProcessTable {
    program: Arc<Program>,
    pcbs: Vec<Pcb>,
}

impl ProcessTable {
    /// Create one PCB per process block, all in `New`. Program counters start
    /// just past each `A(start)` marker.
    pub fn new(program: Arc<Program>) -> Self {
        let pcbs = program
            .process_spans()
            .into_iter()
            .enumerate()
            .map(|(pid, span)| Pcb {
                pid,
                state: ProcessState::New,
                span,
                program_counter: 1,
                remaining_time_ms: 0,
                memory_segment: None,
            })
            .collect();
        Self { program, pcbs }
    }

    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.pcbs.iter()
    }

    pub fn get(&self, pid: Pid) -> Option<&Pcb> {
        self.pcbs.get(pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        self.pcbs.get_mut(pid)
    }

    pub fn state(&self, pid: Pid) -> Option<ProcessState> {
        self.get(pid).map(|p| p.state)
    }

    pub fn set_state(&mut self, pid: Pid, state: ProcessState) {
        if let Some(pcb) = self.get_mut(pid) {
            pcb.state = state;
        }
    }

    /// Move every process to `Ready`.
    pub fn admit_all(&mut self) {
        for pcb in &mut self.pcbs {
            pcb.state = ProcessState::Ready;
        }
    }

    /// Sum each process's CPU and I/O cost. Memory operands are addresses,
    /// not durations, and are skipped.
    pub fn compute_remaining_times(&mut self, config: &Config) {
        let ops = self.program.operations();
        for pcb in &mut self.pcbs {
            pcb.remaining_time_ms = ops[pcb.span.clone()]
                .iter()
                .map(|op| {
                    let rate = match op.kind {
                        OpKind::CpuRun => config.proc_cycle_rate_ms,
                        kind if kind.is_io() => config.io_cycle_rate_ms,
                        _ => 0,
                    };
                    u64::from(op.value) * u64::from(rate)
                })
                .sum();
        }
    }

    /// Operation at `pid`'s program counter.
    pub fn current_op(&self, pid: Pid) -> Option<&Operation> {
        let pcb = self.get(pid)?;
        if pcb.program_counter >= pcb.span.len() {
            return None;
        }
        self.program
            .operations()
            .get(pcb.span.start + pcb.program_counter)
    }

    /// Move `pid` to its next operation.
    pub fn advance(&mut self, pid: Pid) {
        if let Some(pcb) = self.get_mut(pid) {
            if pcb.program_counter < pcb.span.len() {
                pcb.program_counter += 1;
            }
        }
    }

    /// Every process is blocked or exited, i.e. none can run.
    pub fn all_waiting(&self) -> bool {
        self.pcbs
            .iter()
            .all(|p| matches!(p.state, ProcessState::Blocked | ProcessState::Exited))
    }

    pub fn all_exited(&self) -> bool {
        self.pcbs.iter().all(|p| p.state == ProcessState::Exited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpName;

    fn program() -> Arc<Program> {
        Arc::new(
            Program::new(vec![
                Operation::new(OpKind::SystemStart, OpName::Start, 0),
                Operation::new(OpKind::Begin, OpName::Start, 0),
                Operation::new(OpKind::CpuRun, OpName::Run, 5),
                Operation::new(OpKind::MemAllocate, OpName::Allocate, 2_034_056),
                Operation::new(OpKind::Input, OpName::Keyboard, 3),
                Operation::new(OpKind::End, OpName::End, 0),
                Operation::new(OpKind::Begin, OpName::Start, 0),
                Operation::new(OpKind::Output, OpName::Printer, 2),
                Operation::new(OpKind::End, OpName::End, 0),
                Operation::new(OpKind::SystemEnd, OpName::End, 0),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_creation() {
        let table = ProcessTable::new(program());
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|p| p.state == ProcessState::New));
        assert_eq!(table.get(0).unwrap().len(), 5);
        assert_eq!(table.get(1).unwrap().pid, 1);
        assert_eq!(table.current_op(0).unwrap().kind, OpKind::CpuRun);
        assert_eq!(table.current_op(1).unwrap().kind, OpKind::Output);
    }

    #[test]
    fn test_remaining_times_skip_memory() {
        let mut table = ProcessTable::new(program());
        let config = Config {
            proc_cycle_rate_ms: 10,
            io_cycle_rate_ms: 100,
            ..Config::default()
        };
        table.compute_remaining_times(&config);
        assert_eq!(table.get(0).unwrap().remaining_time_ms, 5 * 10 + 3 * 100);
        assert_eq!(table.get(1).unwrap().remaining_time_ms, 2 * 100);
    }

    #[test]
    fn test_advance_stops_past_end() {
        let mut table = ProcessTable::new(program());
        for _ in 0..3 {
            table.advance(1);
        }
        assert_eq!(table.get(1).unwrap().program_counter(), 3);
        assert!(table.current_op(1).is_none());
    }

    #[test]
    fn test_waiting_and_exited() {
        let mut table = ProcessTable::new(program());
        table.admit_all();
        assert!(!table.all_waiting());
        table.set_state(0, ProcessState::Blocked);
        table.set_state(1, ProcessState::Exited);
        assert!(table.all_waiting());
        assert!(!table.all_exited());
        table.set_state(0, ProcessState::Exited);
        assert!(table.all_exited());
    }
}
