use serde::Serialize;
use tracing::{debug, info};

use crate::types::Group;

/// Stages of a run, reported through [`GroupObserver::on_phase_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Partner,
    WidthFill,
    Repetition,
    Fallback,
    Optimize,
    Merge,
}

impl Phase {
    /// Greedy phases in the order they run.
    pub const GREEDY: [Phase; 4] = [
        Phase::Partner,
        Phase::WidthFill,
        Phase::Repetition,
        Phase::Fallback,
    ];
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Partner => "partner",
            Phase::WidthFill => "width-fill",
            Phase::Repetition => "repetition",
            Phase::Fallback => "fallback",
            Phase::Optimize => "optimize",
            Phase::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Progress hooks. Both default to doing nothing.
pub trait GroupObserver {
    fn on_group_committed(&mut self, _phase: Phase, _group: &Group) {}

    fn on_phase_complete(&mut self, _phase: Phase, _group_count: usize) {}
}

/// Observer used when the caller does not bring one.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl GroupObserver for TracingObserver {
    fn on_group_committed(&mut self, phase: Phase, group: &Group) {
        debug!(
            %phase,
            group_id = group.group_id,
            pieces = ?group.piece_ids(),
            width = group.total_width(),
            qty = group.total_qty(),
            spread = group.length_spread(),
            "group committed"
        );
    }

    fn on_phase_complete(&mut self, phase: Phase, group_count: usize) {
        info!(%phase, group_count, "phase complete");
    }
}

/// Keeps every event; handy for callers that render progress later.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub committed: Vec<(Phase, u32)>,
    pub phases: Vec<(Phase, usize)>,
}

impl GroupObserver for RecordingObserver {
    fn on_group_committed(&mut self, phase: Phase, group: &Group) {
        self.committed.push((phase, group.group_id));
    }

    fn on_phase_complete(&mut self, phase: Phase, group_count: usize) {
        self.phases.push((phase, group_count));
    }
}
