//! Simulator configuration file loading.
//!
//! The file is a fixed header line, nine `Prompt: value` lines in any order,
//! and a fixed footer line:
//!
//! ```text
//! Start Simulator Configuration File:
//! Version/Phase: 4.0
//! File Path: program.mdf
//! CPU Scheduling Code: FCFS-N
//! Quantum Time (cycles): 3
//! Memory Available (KB): 2048
//! Processor Cycle Time (msec): 10
//! I/O Cycle Time (msec): 20
//! Log To: Both
//! Log File Path: logfile.lgf
//! End Simulator Configuration File.
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

const HEADER: &str = "Start Simulator Configuration File:";
const FOOTER: &str = "End Simulator Configuration File.";
const ITEM_COUNT: usize = 9;

/// CPU scheduling policy codes.
///
/// Only `FcfsN` and `SjfN` have distinct selection logic; the preemptive
/// codes are accepted and scheduled first-come first-served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    #[serde(rename = "FCFS-N")]
    FcfsN,
    #[serde(rename = "SJF-N")]
    SjfN,
    #[serde(rename = "SRTF-P")]
    SrtfP,
    #[serde(rename = "FCFS-P")]
    FcfsP,
    #[serde(rename = "RR-P")]
    RrP,
}

impl SchedulingPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FcfsN => "FCFS-N",
            Self::SjfN => "SJF-N",
            Self::SrtfP => "SRTF-P",
            Self::FcfsP => "FCFS-P",
            Self::RrP => "RR-P",
        }
    }
}

impl FromStr for SchedulingPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "fcfs-n" => Ok(Self::FcfsN),
            "sjf-n" => Ok(Self::SjfN),
            "srtf-p" => Ok(Self::SrtfP),
            "fcfs-p" => Ok(Self::FcfsP),
            "rr-p" => Ok(Self::RrP),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where event log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTo {
    Monitor,
    File,
    Both,
}

impl LogTo {
    pub fn to_monitor(self) -> bool {
        matches!(self, Self::Monitor | Self::Both)
    }

    pub fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

impl FromStr for LogTo {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monitor" => Ok(Self::Monitor),
            "file" => Ok(Self::File),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Monitor => "Monitor",
            Self::File => "File",
            Self::Both => "Both",
        })
    }
}

/// Immutable simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: f64,
    pub metadata_path: PathBuf,
    pub cpu_sched_policy: SchedulingPolicy,
    pub quantum_cycles: u32,
    pub memory_available_kb: u32,
    pub proc_cycle_rate_ms: u32,
    pub io_cycle_rate_ms: u32,
    pub log_to: LogTo,
    pub log_file_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 4.0,
            metadata_path: PathBuf::from("program.mdf"),
            cpu_sched_policy: SchedulingPolicy::FcfsN,
            quantum_cycles: 3,
            memory_available_kb: 2048,
            proc_cycle_rate_ms: 10,
            io_cycle_rate_ms: 20,
            log_to: LogTo::Monitor,
            log_file_path: PathBuf::from("logfile.lgf"),
        }
    }
}

/// Recognized prompt lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Version,
    FilePath,
    CpuSchedule,
    Quantum,
    MemoryAvailable,
    ProcessorCycle,
    IoCycle,
    LogTo,
    LogFilePath,
}

impl Prompt {
    fn identify(label: &str) -> Option<Self> {
        match label {
            "Version/Phase" => Some(Self::Version),
            "File Path" => Some(Self::FilePath),
            "CPU Scheduling Code" => Some(Self::CpuSchedule),
            "Quantum Time (cycles)" => Some(Self::Quantum),
            "Memory Available (KB)" | "Memory Available (MB)" => Some(Self::MemoryAvailable),
            "Processor Cycle Time (msec)" => Some(Self::ProcessorCycle),
            "I/O Cycle Time (msec)" => Some(Self::IoCycle),
            "Log To" => Some(Self::LogTo),
            "Log File Path" => Some(Self::LogFilePath),
            _ => None,
        }
    }
}

impl Config {
    /// Load a configuration file. Relative file paths inside it are resolved
    /// against the configuration file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::ConfigAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&text)?;
        if let Some(dir) = path.parent() {
            if config.metadata_path.is_relative() {
                config.metadata_path = dir.join(&config.metadata_path);
            }
            if config.log_file_path.is_relative() {
                config.log_file_path = dir.join(&config.log_file_path);
            }
        }
        Ok(config)
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> SimResult<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        if lines.next() != Some(HEADER) {
            return Err(SimError::CorruptConfigDescriptor);
        }

        let mut config = Self::default();
        for _ in 0..ITEM_COUNT {
            let line = lines.next().ok_or(SimError::IncompleteFile)?;
            let (label, value) = line.split_once(':').ok_or(SimError::IncompleteFile)?;
            let prompt = Prompt::identify(label.trim())
                .ok_or_else(|| SimError::CorruptConfigPrompt(label.trim().to_string()))?;
            // Values are single whitespace-delimited tokens.
            let value = value.split_whitespace().next().unwrap_or("");
            config.apply(prompt, label.trim(), value)?;
        }

        match lines.next() {
            Some(FOOTER) => Ok(config),
            Some(_) => Err(SimError::CorruptConfigDescriptor),
            None => Err(SimError::IncompleteFile),
        }
    }

    fn apply(&mut self, prompt: Prompt, label: &str, value: &str) -> SimResult<()> {
        let out_of_range = || SimError::ConfigOutOfRange {
            prompt: label.to_string(),
            value: value.to_string(),
        };
        let int_in = |lo: u32, hi: u32| -> SimResult<u32> {
            value
                .parse::<u32>()
                .ok()
                .filter(|v| (lo..=hi).contains(v))
                .ok_or_else(out_of_range)
        };

        match prompt {
            Prompt::Version => {
                self.version = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| (0.0..=10.0).contains(v))
                    .ok_or_else(out_of_range)?;
            }
            Prompt::FilePath => self.metadata_path = PathBuf::from(value),
            Prompt::CpuSchedule => {
                self.cpu_sched_policy = value.parse().map_err(|_| out_of_range())?;
            }
            Prompt::Quantum => self.quantum_cycles = int_in(0, 100)?,
            Prompt::MemoryAvailable => self.memory_available_kb = int_in(0, 102_400)?,
            Prompt::ProcessorCycle => self.proc_cycle_rate_ms = int_in(0, 1000)?,
            Prompt::IoCycle => self.io_cycle_rate_ms = int_in(1, 10_000)?,
            Prompt::LogTo => self.log_to = value.parse().map_err(|_| out_of_range())?,
            Prompt::LogFilePath => self.log_file_path = PathBuf::from(value),
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config File Display")?;
        writeln!(f, "===================")?;
        writeln!(f, "Version                : {:.2}", self.version)?;
        writeln!(f, "Program file name      : {}", self.metadata_path.display())?;
        writeln!(f, "CPU schedule selection : {}", self.cpu_sched_policy)?;
        writeln!(f, "Quantum time           : {}", self.quantum_cycles)?;
        writeln!(f, "Memory available       : {}", self.memory_available_kb)?;
        writeln!(f, "Process cycle rate     : {}", self.proc_cycle_rate_ms)?;
        writeln!(f, "I/O cycle rate         : {}", self.io_cycle_rate_ms)?;
        writeln!(f, "Log to selection       : {}", self.log_to)?;
        write!(f, "Log file name          : {}", self.log_file_path.display())
    }
}
