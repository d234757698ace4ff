//! Simulation event stream.
//!
//! The engine reports everything it does as an `EventRecord` delivered to an
//! `EventSink`. Sinks decide where records go: `RecordingSink` keeps them in
//! memory for tests, the CLI prints them as they arrive.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::SimResult;
use crate::mmu::{Fault, MemorySegment};
use crate::process::Pid;
use crate::timer::format_seconds;

/// Who an event is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Os,
    Process(Pid),
}

/// Every kind of event the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCode {
    BeginSim,
    SystemStart,
    CreatePCBs,
    AllProcNew,
    AllProcReady,
    Interrupt,
    ProcOpStart,
    ProcOpEnd,
    ProcSelected,
    ProcSetIn,
    ProcBlocked,
    ProcEnd,
    MmuAllocAttempt,
    MmuAllocSuccess,
    MmuAllocFailed,
    MmuAccessAttempt,
    MmuAccessSuccess,
    MmuAccessFailed,
    SegFault,
    SystemIdle,
    SystemStop,
    EndSim,
}

/// Context attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    None,
    /// Operation being started or finished, e.g. `"printer output"`.
    Operation { description: String },
    Process { pid: Pid, remaining_ms: u64 },
    Memory(MemorySegment),
    Fault {
        segment: MemorySegment,
        fault: Fault,
    },
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Time since the simulation started.
    #[serde(with = "seconds")]
    pub timestamp: Duration,
    pub actor: Actor,
    pub code: LogCode,
    pub payload: Payload,
}

impl EventRecord {
    pub fn new(timestamp: Duration, actor: Actor, code: LogCode, payload: Payload) -> Self {
        Self {
            timestamp,
            actor,
            code,
            payload,
        }
    }

    /// The process this event concerns, if any.
    pub fn pid(&self) -> Option<Pid> {
        match (&self.payload, self.actor) {
            (Payload::Process { pid, .. }, _) => Some(*pid),
            (_, Actor::Process(pid)) => Some(pid),
            (Payload::Memory(segment), _) | (Payload::Fault { segment, .. }, _) => {
                Some(segment.owner_pid)
            }
            _ => None,
        }
    }

    fn process_label(&self) -> String {
        match self.pid() {
            Some(pid) => format!("Process {}", pid),
            None => "Process".to_string(),
        }
    }

    fn write_message(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            LogCode::BeginSim => f.write_str("Begin Simulation"),
            LogCode::SystemStart => f.write_str("System Start"),
            LogCode::CreatePCBs => f.write_str("Create Process Control Blocks"),
            LogCode::AllProcNew => f.write_str("All processes initialized in NEW state"),
            LogCode::AllProcReady => f.write_str("All processes initialized in READY state"),
            LogCode::Interrupt => write!(f, "Interrupt called by {}", self.process_label()),
            LogCode::ProcOpStart | LogCode::ProcOpEnd => {
                let phase = if self.code == LogCode::ProcOpStart {
                    "start"
                } else {
                    "end"
                };
                match &self.payload {
                    Payload::Operation { description } => write!(f, "{} {}", description, phase),
                    _ => write!(f, "operation {}", phase),
                }
            }
            LogCode::ProcSelected => {
                let remaining = match self.payload {
                    Payload::Process { remaining_ms, .. } => remaining_ms,
                    _ => 0,
                };
                write!(
                    f,
                    "{} selected with {} ms remaining",
                    self.process_label(),
                    remaining
                )
            }
            LogCode::ProcSetIn => write!(f, "{} set in RUNNING state", self.process_label()),
            LogCode::ProcBlocked => write!(f, "{} set in BLOCKED state", self.process_label()),
            LogCode::ProcEnd => write!(f, "{} ended and set in EXIT state", self.process_label()),
            LogCode::MmuAllocAttempt | LogCode::MmuAccessAttempt => {
                let verb = if self.code == LogCode::MmuAllocAttempt {
                    "allocate"
                } else {
                    "access"
                };
                match &self.payload {
                    Payload::Memory(segment) => {
                        write!(f, "MMU attempt to {} {}", verb, segment.address())
                    }
                    _ => write!(f, "MMU attempt to {}", verb),
                }
            }
            LogCode::MmuAllocSuccess => f.write_str("MMU successful allocate"),
            LogCode::MmuAccessSuccess => f.write_str("MMU successful access"),
            LogCode::MmuAllocFailed | LogCode::MmuAccessFailed => {
                let verb = if self.code == LogCode::MmuAllocFailed {
                    "allocate"
                } else {
                    "access"
                };
                match &self.payload {
                    Payload::Fault { fault, .. } => write!(f, "MMU failed to {}: {}", verb, fault),
                    _ => write!(f, "MMU failed to {}", verb),
                }
            }
            LogCode::SegFault => write!(
                f,
                "{} experiences segmentation fault",
                self.process_label()
            ),
            LogCode::SystemIdle => f.write_str("CPU idle, all active processes blocked"),
            LogCode::SystemStop => f.write_str("System Stop"),
            LogCode::EndSim => f.write_str("End Simulation"),
        }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, ", format_seconds(self.timestamp))?;
        match self.actor {
            Actor::Os => f.write_str("OS: ")?,
            Actor::Process(pid) => write!(f, "Process: {}, ", pid)?,
        }
        self.write_message(f)
    }
}

/// Destination for simulation events.
pub trait EventSink: Send {
    /// Receive one event, in emission order.
    fn record(&mut self, event: &EventRecord);
}

/// Sink that keeps every event, for inspection after a run.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<EventRecord>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EventRecord> {
        self.events
    }

    /// Just the codes, in order.
    pub fn codes(&self) -> Vec<LogCode> {
        self.events.iter().map(|e| e.code).collect()
    }

    /// Events concerning `pid`.
    pub fn for_pid(&self, pid: Pid) -> impl Iterator<Item = &EventRecord> {
        self.events.iter().filter(move |e| e.pid() == Some(pid))
    }
}

impl EventSink for RecordingSink {
    fn record(&mut self, event: &EventRecord) {
        self.events.push(event.clone());
    }
}

/// Write a log file: a header with the run's configuration followed by one
/// line per event.
pub fn write_log_file<W: Write>(
    mut writer: W,
    config: &Config,
    records: &[EventRecord],
) -> SimResult<()> {
    writeln!(writer, "==================================================")?;
    writeln!(writer, "Simulator Log File Header")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "File Name                       : {}",
        config.metadata_path.display()
    )?;
    writeln!(
        writer,
        "CPU Scheduling                  : {}",
        config.cpu_sched_policy
    )?;
    writeln!(
        writer,
        "Quantum Cycles                  : {}",
        config.quantum_cycles
    )?;
    writeln!(
        writer,
        "Memory Available (KB)           : {}",
        config.memory_available_kb
    )?;
    writeln!(
        writer,
        "Processor Cycle Rate (ms/cycle) : {}",
        config.proc_cycle_rate_ms
    )?;
    writeln!(
        writer,
        "I/O Cycle Rate (ms/cycle)       : {}",
        config.io_cycle_rate_ms
    )?;
    writeln!(writer)?;
    for record in records {
        writeln!(writer, "{}", record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write events as JSON lines, one object per event.
pub fn write_json_lines<W: Write>(mut writer: W, records: &[EventRecord]) -> SimResult<()> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialize durations as fractional seconds.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
