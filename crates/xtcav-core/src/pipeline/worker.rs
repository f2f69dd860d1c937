use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::PROGRESS_INTERVAL;
use crate::error::Result;
use crate::filter::{EventFilter, Rejection};
use crate::io::EventSource;
use crate::shot::ShotRecord;

use super::partition::assigned_events;
use super::types::ProgressReporter;

/// Number of rejected events per reason.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts(BTreeMap<Rejection, usize>);

impl RejectionCounts {
    pub fn record(&mut self, reason: Rejection) {
        *self.0.entry(reason).or_insert(0) += 1;
    }

    pub fn get(&self, reason: Rejection) -> usize {
        self.0.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn merge(&mut self, other: &RejectionCounts) {
        for (reason, count) in other.iter() {
            *self.0.entry(reason).or_insert(0) += count;
        }
    }

    /// Reasons with a non-zero count, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Rejection, usize)> + '_ {
        self.0.iter().map(|(&reason, &count)| (reason, count))
    }
}

/// Bookkeeping of one worker's pass over its events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Events assigned by the partitioner.
    pub assigned: usize,
    /// Events actually fed to the filter before the target was met.
    pub visited: usize,
    pub accepted: usize,
    pub rejections: RejectionCounts,
}

/// Everything a worker hands to the reducer.
#[derive(Clone, Debug)]
pub struct WorkerOutput {
    pub rank: usize,
    /// Accepted records, in processing order.
    pub records: Vec<ShotRecord>,
    pub stats: WorkerStats,
}

/// Number of records each of `workers` workers tries to accept.
pub fn worker_target(max_shots: usize, workers: usize) -> usize {
    if workers == 0 {
        return 0;
    }
    max_shots.div_ceil(workers)
}

/// Feed the events assigned to `rank` through the filter, last event first,
/// until `ceil(max_shots / workers)` records are accepted or the events run
/// out.
///
/// Rejected events are counted and skipped. Event source failures abort the
/// worker.
pub fn run_worker(
    source: &dyn EventSource,
    filter: &EventFilter<'_>,
    rank: usize,
    workers: usize,
    max_shots: usize,
    reporter: &dyn ProgressReporter,
) -> Result<WorkerOutput> {
    let events = assigned_events(source.event_count(), rank, workers);
    let target = worker_target(max_shots, workers);
    debug!(rank, assigned = events.len(), target, "Worker starting");

    let mut records = Vec::with_capacity(target.min(events.len()));
    let mut stats = WorkerStats {
        assigned: events.len(),
        ..Default::default()
    };
    let mut reported = 0;

    for &index in events.iter().rev() {
        if records.len() >= target {
            break;
        }
        stats.visited += 1;

        let image = source.image_at(index)?;
        let metadata = source.metadata_at(index)?;
        match filter.process(image.as_ref(), &metadata) {
            Ok(record) => records.push(record),
            Err(reason) => {
                stats.rejections.record(reason);
                continue;
            }
        }

        if records.len() % PROGRESS_INTERVAL == 0 {
            reporter.advance(records.len() - reported);
            reported = records.len();
            info!(
                rank,
                accepted = records.len(),
                target,
                percent = (1000.0 * records.len() as f64 / target as f64).round() / 10.0,
                "Worker progress"
            );
        }
    }

    if records.len() > reported {
        reporter.advance(records.len() - reported);
    }
    stats.accepted = records.len();
    debug!(
        rank,
        accepted = stats.accepted,
        visited = stats.visited,
        rejected = stats.rejections.total(),
        "Worker finished"
    );

    Ok(WorkerOutput {
        rank,
        records,
        stats,
    })
}
