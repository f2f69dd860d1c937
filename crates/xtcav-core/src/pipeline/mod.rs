pub mod config;
pub mod partition;
pub mod reduce;
pub mod worker;
mod orchestrator;
mod types;

pub use orchestrator::{
    generate_reference, generate_reference_reported, load_dark_reference, prepare_run,
    write_reference, RunOutput,
};
pub use types::{NoOpReporter, PipelineStage, ProgressReporter};
