//! OS Simulator CLI - Run a process simulation from the command line.
//!
//! Usage:
//!   ossim <config.cnf> [--trace] [--json events.jsonl]
//!
//! Examples:
//!   ossim config.cnf                       # Run, logging where the config says
//!   ossim config.cnf --json events.jsonl   # Also export every event as JSON
//!   RUST_LOG=ossim_core=trace ossim config.cnf

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::metadata::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ossim_core::{
    write_json_lines, write_log_file, Config, EventRecord, EventSink, LogCode, Program,
    SimulationEngine,
};

type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Operating system process simulator
#[derive(Parser, Debug)]
#[command(name = "ossim")]
#[command(about = "Simulate process scheduling, memory management and I/O")]
struct Args {
    /// Simulator configuration file
    config: Option<PathBuf>,

    /// Enable engine diagnostics on stderr
    #[arg(short, long)]
    trace: bool,

    /// Write every event as a JSON line to this file
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

/// Sink that echoes events to stdout and keeps them for the log file.
struct MonitorSink {
    echo: bool,
    records: Vec<EventRecord>,
}

impl MonitorSink {
    fn new(echo: bool) -> Self {
        Self {
            echo,
            records: Vec::new(),
        }
    }

    fn records(&self) -> &[EventRecord] {
        &self.records
    }
}

impl EventSink for MonitorSink {
    fn record(&mut self, event: &EventRecord) {
        if self.echo {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{}", event);
            if event.code == LogCode::ProcEnd {
                // Blank line between processes
                let _ = writeln!(handle);
            }
            let _ = handle.flush();
        }
        self.records.push(event.clone());
    }
}

fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("debug")
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(config_path: PathBuf, json: Option<PathBuf>) -> Result<(), DynError> {
    println!("Uploading Configuration Files");
    let config = Config::from_path(&config_path)?;
    println!();
    println!("{}", config);

    println!("Uploading Meta Data Files");
    let program = Arc::new(Program::from_path(&config.metadata_path)?);
    debug!(operations = program.len(), "metadata loaded");

    println!();
    println!("==========================");
    println!("Begin Simulation");
    println!();

    let sink = MonitorSink::new(config.log_to.to_monitor());
    let engine_config = config.clone();

    // Simulation blocks on timed waits; keep it off the async runtime.
    let handle = tokio::task::spawn_blocking(move || {
        let mut engine = SimulationEngine::new(engine_config, program, sink);
        let result = engine.run();
        (result, engine.into_sink())
    });
    let (result, sink) = handle.await?;
    let summary = result?;

    println!("End Simulation - Complete");
    println!("==========================");
    info!(
        processes = summary.processes,
        faulted = summary.faulted,
        elapsed = ?summary.elapsed,
        "simulation finished"
    );

    if config.log_to.to_file() {
        let file = File::create(&config.log_file_path)?;
        write_log_file(BufWriter::new(file), &config, sink.records())?;
        info!(path = %config.log_file_path.display(), "log file written");
    }

    if let Some(path) = json {
        let file = File::create(&path)?;
        write_json_lines(BufWriter::new(file), sink.records())?;
        info!(path = %path.display(), events = sink.records().len(), "events exported");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.trace);

    println!("Simulator Program");
    println!("=================");
    println!();

    let Some(config_path) = args.config else {
        println!("Program aborted, configuration file argument missing");
        return ExitCode::from(1);
    };

    // Failures after startup are reported, not reflected in the exit status.
    if let Err(e) = run(config_path, args.json).await {
        println!("FATAL ERROR: {}, Program aborted", e);
    }

    ExitCode::SUCCESS
}
