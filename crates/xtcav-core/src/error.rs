use thiserror::Error;

#[derive(Error, Debug)]
pub enum XtcavError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Event index {index} out of range (total: {total})")]
    EventIndexOutOfRange { index: usize, total: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid run selector: {0}")]
    InvalidRunSelector(String),

    #[error("Invalid validity range: {0}")]
    InvalidValidityRange(String),

    #[error("Event source error: {0}")]
    EventSource(String),

    #[error("Empty shot sequence")]
    EmptySequence,

    #[error("Inconsistent shot records: {0}")]
    Inconsistent(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, XtcavError>;
