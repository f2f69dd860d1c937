use serde::{Deserialize, Serialize};

use crate::shot::ShotRecord;

use super::worker::{RejectionCounts, WorkerOutput};

/// Totals over every worker of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub workers: usize,
    pub events: usize,
    pub visited: usize,
    /// Records accepted by all workers together, before truncation.
    pub accepted: usize,
    /// Records kept for averaging.
    pub kept: usize,
    pub rejections: RejectionCounts,
}

/// Concatenate the worker outputs in ascending rank order and keep the first
/// `max_shots` records.
///
/// Completion order of the workers does not matter: outputs are sorted by
/// rank first.
pub fn reduce_worker_outputs(
    mut outputs: Vec<WorkerOutput>,
    max_shots: usize,
) -> (Vec<ShotRecord>, RunSummary) {
    outputs.sort_by_key(|output| output.rank);

    let mut summary = RunSummary {
        workers: outputs.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(outputs.iter().map(|o| o.records.len()).sum());
    for output in outputs {
        summary.events += output.stats.assigned;
        summary.visited += output.stats.visited;
        summary.accepted += output.records.len();
        summary.rejections.merge(&output.stats.rejections);
        records.extend(output.records);
    }

    records.truncate(max_shots);
    summary.kept = records.len();
    (records, summary)
}
