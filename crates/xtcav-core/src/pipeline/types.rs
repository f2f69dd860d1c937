/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Resolving,
    Processing,
    Reducing,
    Averaging,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolving => write!(f, "Resolving configuration"),
            Self::Processing => write!(f, "Processing shots"),
            Self::Reducing => write!(f, "Gathering worker results"),
            Self::Averaging => write!(f, "Averaging profiles"),
            Self::Writing => write!(f, "Writing reference"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., shot target), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` more work items within the current stage have completed.
    /// Called concurrently from worker threads.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `generate_reference` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
