pub mod ser;
pub mod source;

pub use source::{EventSource, ManifestEvent, MemoryRun, RunManifest, SerRun};
