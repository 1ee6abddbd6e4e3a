use thiserror::Error;

#[derive(Error, Debug)]
pub enum MayflyError {
    // Admission errors
    #[error("update queue full")]
    QueueFull,

    #[error("update pipeline stopped")]
    PipelineStopped,

    // Validation errors
    #[error("validation error: {0}")]
    Validation(String),

    // Snapshot errors
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("snapshot checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    // Config errors
    #[error("config error: {0}")]
    Config(String),

    // IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MayflyError>;

impl MayflyError {
    pub fn status_code(&self) -> u16 {
        match self {
            MayflyError::Validation(_) => 400,

            // Callers may retry a full queue; a stopped pipeline means the
            // service is shutting down. Both are unavailability.
            MayflyError::QueueFull | MayflyError::PipelineStopped => 503,

            _ => 500,
        }
    }
}
