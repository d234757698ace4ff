//! Integration tests running whole simulations from fixture files.

use std::path::PathBuf;
use std::sync::Arc;

use ossim_core::{
    write_json_lines, write_log_file, Config, EventRecord, Fault, LogCode, Payload, Pid, Program,
    RecordingSink, SchedulingPolicy, SimError, SimulationEngine,
};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn simulate(config_name: &str) -> (Config, Vec<EventRecord>) {
    let config = Config::from_path(data_path(config_name)).expect("config should load");
    let program = Program::from_path(&config.metadata_path).expect("metadata should load");
    let mut engine =
        SimulationEngine::new(config.clone(), Arc::new(program), RecordingSink::new());
    let summary = engine.run().expect("simulation should complete");
    assert_eq!(summary.processes, 3);
    assert_eq!(summary.faulted, 1);
    (config, engine.into_sink().into_events())
}

fn selections(events: &[EventRecord]) -> Vec<Pid> {
    events
        .iter()
        .filter(|e| e.code == LogCode::ProcSelected)
        .filter_map(EventRecord::pid)
        .collect()
}

fn first_index(events: &[EventRecord], code: LogCode, pid: Pid) -> usize {
    events
        .iter()
        .position(|e| e.code == code && e.pid() == Some(pid))
        .unwrap_or_else(|| panic!("no {:?} for process {}", code, pid))
}

#[test]
fn test_fixture_paths_resolve_against_config_dir() {
    let config = Config::from_path(data_path("fcfs.cnf")).unwrap();
    assert_eq!(config.metadata_path, data_path("mixed.mdf"));
    assert_eq!(config.cpu_sched_policy, SchedulingPolicy::FcfsN);
    assert_eq!(config.memory_available_kb, 102_400);

    let program = Program::from_path(&config.metadata_path).unwrap();
    assert_eq!(program.process_spans().len(), 3);
}

#[test]
fn test_every_process_exits_once() {
    let (_, events) = simulate("fcfs.cnf");

    assert_eq!(events.first().map(|e| e.code), Some(LogCode::BeginSim));
    let tail: Vec<LogCode> = events.iter().rev().take(2).map(|e| e.code).collect();
    assert_eq!(tail, vec![LogCode::EndSim, LogCode::SystemStop]);

    for pid in 0..3 {
        let ends = events
            .iter()
            .filter(|e| e.code == LogCode::ProcEnd && e.pid() == Some(pid))
            .count();
        assert_eq!(ends, 1, "process {} should end exactly once", pid);

        // Nothing happens to a process after it exits.
        let end = first_index(&events, LogCode::ProcEnd, pid);
        assert!(events[end + 1..].iter().all(|e| e.pid() != Some(pid)));
    }

    assert!(events
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[test]
fn test_fcfs_runs_in_pid_order_and_overlaps_io() {
    let (_, events) = simulate("fcfs.cnf");

    assert_eq!(selections(&events).first(), Some(&0));

    // Process 1 runs while process 0 waits on the hard drive.
    let blocked = first_index(&events, LogCode::ProcBlocked, 0);
    let other = first_index(&events, LogCode::ProcOpStart, 1);
    let resumed = first_index(&events, LogCode::Interrupt, 0);
    assert!(blocked < other);
    assert!(other < resumed);

    // Process 0's access falls inside its own allocation.
    assert!(events
        .iter()
        .any(|e| e.code == LogCode::MmuAccessSuccess && e.pid() == Some(0)));
}

#[test]
fn test_duplicate_base_faults_only_that_process() {
    let (_, events) = simulate("fcfs.cnf");

    let failed = first_index(&events, LogCode::MmuAllocFailed, 2);
    assert!(matches!(
        events[failed].payload,
        Payload::Fault {
            fault: Fault::DuplicateBase,
            ..
        }
    ));
    assert_eq!(events[failed + 1].code, LogCode::SegFault);
    assert_eq!(events[failed + 2].code, LogCode::ProcEnd);
    assert_eq!(events[failed + 2].pid(), Some(2));

    // The faulting process never reaches its run operation.
    assert!(!events
        .iter()
        .any(|e| e.code == LogCode::ProcOpStart && e.pid() == Some(2)));
}

#[test]
fn test_sjf_prefers_shortest_total() {
    let (_, events) = simulate("sjf.cnf");

    let picks = selections(&events);
    assert_eq!(picks.first(), Some(&2));
    assert_eq!(
        events[first_index(&events, LogCode::ProcSelected, 2)].payload,
        Payload::Process {
            pid: 2,
            remaining_ms: 8
        }
    );

    let fault = first_index(&events, LogCode::SegFault, 2);
    let second = first_index(&events, LogCode::ProcSelected, 1);
    assert!(fault < second);
}

#[test]
fn test_log_file_and_json_export() {
    let (config, events) = simulate("fcfs.cnf");

    let mut log = Vec::new();
    write_log_file(&mut log, &config, &events).unwrap();
    let log = String::from_utf8(log).unwrap();
    assert!(log.contains("Simulator Log File Header"));
    assert!(log.contains("mixed.mdf"));
    assert!(log.contains("OS: System Stop"));
    assert!(log.contains("Process: 0, MMU attempt to allocate 1/10/100"));

    let mut json = Vec::new();
    write_json_lines(&mut json, &events).unwrap();
    let json = String::from_utf8(json).unwrap();
    assert_eq!(json.lines().count(), events.len());
    let parsed: Vec<EventRecord> = json
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let codes: Vec<LogCode> = parsed.iter().map(|e| e.code).collect();
    let expected: Vec<LogCode> = events.iter().map(|e| e.code).collect();
    assert_eq!(codes, expected);
}

#[test]
fn test_missing_metadata_file() {
    let config = Config::from_path(data_path("missing_program.cnf")).unwrap();
    match Program::from_path(&config.metadata_path) {
        Err(SimError::MetaDataAccess { path, .. }) => {
            assert!(path.ends_with("does_not_exist.mdf"));
        }
        other => panic!("expected metadata access error, got {:?}", other),
    }
}

#[test]
fn test_missing_config_file() {
    assert!(matches!(
        Config::from_path(data_path("nope.cnf")),
        Err(SimError::ConfigAccess { .. })
    ));
}
