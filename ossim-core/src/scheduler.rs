//! CPU scheduler.

use crate::config::SchedulingPolicy;
use crate::process::{Pid, ProcessState, ProcessTable};

fn is_candidate(state: ProcessState) -> bool {
    matches!(state, ProcessState::Ready | ProcessState::Running)
}

/// Pick the next process to run, or `None` when nothing is runnable.
///
/// Candidates are scanned in pid order. The preemptive codes select like
/// first-come first-served.
pub fn select(table: &ProcessTable, policy: SchedulingPolicy) -> Option<Pid> {
    let mut candidates = table.iter().filter(|p| is_candidate(p.state));
    match policy {
        SchedulingPolicy::SjfN => {
            let first = candidates.next()?;
            let shortest = candidates.fold(first, |best, p| {
                if p.remaining_time_ms < best.remaining_time_ms {
                    p
                } else {
                    best
                }
            });
            Some(shortest.pid)
        }
        SchedulingPolicy::FcfsN
        | SchedulingPolicy::SrtfP
        | SchedulingPolicy::FcfsP
        | SchedulingPolicy::RrP => candidates.next().map(|p| p.pid),
    }
}
