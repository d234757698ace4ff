//! Error types for the process simulator.

use std::path::PathBuf;

use thiserror::Error;

use crate::process::Pid;

/// Errors that can occur while loading input files or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration file access error: {path}: {source}")]
    ConfigAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt configuration descriptor error")]
    CorruptConfigDescriptor,

    #[error("Corrupt configuration prompt error: {0}")]
    CorruptConfigPrompt(String),

    #[error("Data out of range configuration error: {prompt} = {value}")]
    ConfigOutOfRange { prompt: String, value: String },

    #[error("Incomplete file error")]
    IncompleteFile,

    #[error("MD file access error: {path}: {source}")]
    MetaDataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("MD corrupt descriptor error")]
    CorruptMetaDataDescriptor,

    #[error("Op command access error")]
    OpCommandAccess,

    #[error("Corrupt op command letter error: {0:?}")]
    CorruptOpLetter(char),

    #[error("Corrupt op command name error: {0:?}")]
    CorruptOpName(String),

    #[error("Corrupt op command value error: {0:?}")]
    CorruptOpValue(String),

    #[error("Unbalanced start end code error")]
    UnbalancedStartEnd,

    #[error("I/O worker capacity exhausted ({capacity} outstanding)")]
    WorkerCapacity { capacity: usize },

    #[error("Interrupt queue overflow for process {0}")]
    InterruptOverflow(Pid),

    #[error("I/O worker for process {0} panicked")]
    WorkerPanicked(Pid),

    #[error("Simulation stalled: blocked processes with no outstanding I/O")]
    Stalled,

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
