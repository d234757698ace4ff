//! Simulation engine - runs every process of a program to completion.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{SimError, SimResult};
use crate::event::{Actor, EventRecord, EventSink, LogCode, Payload};
use crate::interrupt::InterruptLine;
use crate::io_pool::{IoWorkerPool, MAX_IO_WORKERS};
use crate::metadata::Program;
use crate::mmu::{MemoryManager, MemorySegment};
use crate::op::{OpKind, Operation, SegmentAddress};
use crate::process::{Pid, ProcessState, ProcessTable};
use crate::scheduler;
use crate::timer::SimTimer;
use crate::SimSummary;

/// What happened to the dispatched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Keep running; the program counter moves on.
    Continue,
    /// Waiting on I/O; the program counter has already moved on.
    Blocked,
    /// Reached `A(end)`.
    Finished,
    /// Memory fault.
    Faulted,
}

/// Per-run machine state.
struct Machine {
    table: ProcessTable,
    mmu: MemoryManager,
    interrupts: InterruptLine,
    io: IoWorkerPool,
}

/// Simulation engine.
pub struct SimulationEngine<S: EventSink> {
    config: Config,
    program: Arc<Program>,
    sink: S,
    timer: SimTimer,
    io_capacity: usize,
}

impl<S: EventSink> SimulationEngine<S> {
    pub fn new(config: Config, program: Arc<Program>, sink: S) -> Self {
        Self {
            config,
            program,
            sink,
            timer: SimTimer::new(),
            io_capacity: MAX_IO_WORKERS,
        }
    }

    /// Override the cap on outstanding I/O operations.
    pub fn with_io_capacity(mut self, capacity: usize) -> Self {
        self.io_capacity = capacity;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn emit(&mut self, actor: Actor, code: LogCode, payload: Payload) {
        let record = EventRecord::new(self.timer.since_zero(), actor, code, payload);
        trace!(event = %record, "emit");
        self.sink.record(&record);
    }

    fn emit_os(&mut self, code: LogCode) {
        self.emit(Actor::Os, code, Payload::None);
    }

    fn emit_for(&mut self, table: &ProcessTable, code: LogCode, pid: Pid) {
        let remaining_ms = table.get(pid).map_or(0, |p| p.remaining_time_ms);
        self.emit(Actor::Os, code, Payload::Process { pid, remaining_ms });
    }

    /// Run the program until every process has exited.
    ///
    /// Memory faults end only the faulting process. Exhausting the I/O
    /// worker pool, or a stall with no I/O left to wait for, ends the run
    /// with an error.
    pub fn run(&mut self) -> SimResult<SimSummary> {
        self.timer.zero();
        self.emit_os(LogCode::BeginSim);
        self.emit_os(LogCode::SystemStart);

        self.emit_os(LogCode::CreatePCBs);
        let mut table = ProcessTable::new(Arc::clone(&self.program));
        self.emit_os(LogCode::AllProcNew);

        table.compute_remaining_times(&self.config);
        table.admit_all();
        self.emit_os(LogCode::AllProcReady);

        let interrupts = InterruptLine::new(table.len());
        let mut machine = Machine {
            mmu: MemoryManager::new(self.config.memory_available_kb),
            io: IoWorkerPool::new(self.io_capacity, interrupts.clone()),
            interrupts,
            table,
        };

        debug!(
            processes = machine.table.len(),
            policy = %self.config.cpu_sched_policy,
            "simulation started"
        );

        let result = self.main_loop(&mut machine);
        if result.is_err() {
            // Let in-flight workers finish before the pool is dropped.
            if let Err(e) = machine.io.join_all() {
                warn!(error = %e, "I/O workers did not shut down cleanly");
            }
        }
        let faulted = result?;

        self.emit_os(LogCode::SystemStop);
        self.emit_os(LogCode::EndSim);

        let summary = SimSummary {
            processes: machine.table.len(),
            faulted,
            elapsed: self.timer.since_zero(),
        };
        debug!(?summary, "simulation complete");
        Ok(summary)
    }

    /// Returns the number of processes ended by a memory fault.
    fn main_loop(&mut self, m: &mut Machine) -> SimResult<usize> {
        let policy = self.config.cpu_sched_policy;
        let mut previous: Option<Option<Pid>> = None;
        let mut idle = false;
        let mut faulted = 0;

        while !m.table.all_exited() {
            let selected = scheduler::select(&m.table, policy);
            let changed = previous != Some(selected);
            previous = Some(selected);

            if idle {
                // Drop completions whose interrupts were already serviced so
                // the wait below only returns for I/O still in flight. Reap
                // before checking the queue: workers raise, then report.
                m.io.reap()?;
                if m.interrupts.is_empty()? {
                    self.emit_os(LogCode::SystemIdle);
                    self.timer.lap();
                    let woken = m.io.wait_any()?;
                    let waited = self.timer.lap();
                    match woken {
                        Some(pid) => debug!(pid, ?waited, "woke from idle"),
                        None => return Err(SimError::Stalled),
                    }
                }
            }

            if let Some(pid) = m.interrupts.take()? {
                m.table.set_state(pid, ProcessState::Ready);
                self.emit_for(&m.table, LogCode::Interrupt, pid);
                trace!(pid, "interrupt serviced");
            }

            idle = m.table.all_waiting();

            let Some(pid) = selected else {
                continue;
            };

            if changed {
                self.emit_for(&m.table, LogCode::ProcSelected, pid);
            }

            if m.table.state(pid) != Some(ProcessState::Running) {
                m.table.set_state(pid, ProcessState::Running);
                self.emit_for(&m.table, LogCode::ProcSetIn, pid);
            }

            match self.dispatch(m, pid)? {
                Outcome::Continue => m.table.advance(pid),
                Outcome::Blocked => {}
                Outcome::Finished => self.exit(m, pid),
                Outcome::Faulted => {
                    faulted += 1;
                    self.emit_for(&m.table, LogCode::SegFault, pid);
                    self.exit(m, pid);
                }
            }
        }

        Ok(faulted)
    }

    fn exit(&mut self, m: &mut Machine, pid: Pid) {
        m.table.set_state(pid, ProcessState::Exited);
        self.emit_for(&m.table, LogCode::ProcEnd, pid);
    }

    /// Execute the operation at `pid`'s program counter.
    fn dispatch(&mut self, m: &mut Machine, pid: Pid) -> SimResult<Outcome> {
        let Some(op) = m.table.current_op(pid).copied() else {
            // Only reachable if a process ran off its own end marker.
            warn!(pid, "no operation at program counter");
            return Ok(Outcome::Finished);
        };
        trace!(pid, %op, "dispatch");

        match op.kind {
            OpKind::CpuRun => {
                self.emit_op(pid, LogCode::ProcOpStart, &op);
                SimTimer::wait(self.cycles_ms(op.value, self.config.proc_cycle_rate_ms));
                self.emit_op(pid, LogCode::ProcOpEnd, &op);
                Ok(Outcome::Continue)
            }
            OpKind::MemAllocate | OpKind::MemAccess => Ok(self.memory(m, pid, &op)),
            OpKind::Input | OpKind::Output => {
                self.emit_op(pid, LogCode::ProcOpStart, &op);
                let wait_ms = self.cycles_ms(op.value, self.config.io_cycle_rate_ms);
                m.table.advance(pid);
                m.io.submit(pid, wait_ms)?;
                m.table.set_state(pid, ProcessState::Blocked);
                self.emit_for(&m.table, LogCode::ProcBlocked, pid);
                Ok(Outcome::Blocked)
            }
            OpKind::End => Ok(Outcome::Finished),
            OpKind::Begin | OpKind::SystemStart | OpKind::SystemEnd => Ok(Outcome::Continue),
        }
    }

    fn memory(&mut self, m: &mut Machine, pid: Pid, op: &Operation) -> Outcome {
        let request = MemorySegment::new(pid, SegmentAddress::decode(op.value));
        if let Some(pcb) = m.table.get_mut(pid) {
            pcb.memory_segment = Some(request);
        }

        let allocate = op.kind == OpKind::MemAllocate;
        let (attempt, success, failed) = if allocate {
            (
                LogCode::MmuAllocAttempt,
                LogCode::MmuAllocSuccess,
                LogCode::MmuAllocFailed,
            )
        } else {
            (
                LogCode::MmuAccessAttempt,
                LogCode::MmuAccessSuccess,
                LogCode::MmuAccessFailed,
            )
        };

        let actor = Actor::Process(pid);
        self.emit(actor, attempt, Payload::Memory(request));
        let result = if allocate {
            m.mmu.allocate(request)
        } else {
            m.mmu.access(request)
        };

        match result {
            Ok(()) => {
                self.emit(actor, success, Payload::Memory(request));
                Outcome::Continue
            }
            Err(fault) => {
                debug!(pid, %fault, address = %request.address(), "memory fault");
                self.emit(
                    actor,
                    failed,
                    Payload::Fault {
                        segment: request,
                        fault,
                    },
                );
                Outcome::Faulted
            }
        }
    }

    fn emit_op(&mut self, pid: Pid, code: LogCode, op: &Operation) {
        self.emit(
            Actor::Process(pid),
            code,
            Payload::Operation {
                description: op.describe(),
            },
        );
    }

    fn cycles_ms(&self, cycles: u32, rate_ms: u32) -> u64 {
        u64::from(cycles) * u64::from(rate_ms)
    }
}

impl<S: EventSink> std::fmt::Debug for SimulationEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("policy", &self.config.cpu_sched_policy)
            .field("operations", &self.program.len())
            .field("io_capacity", &self.io_capacity)
            .finish()
    }
}
