#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid sequence file: {0}")]
    InvalidSequence(#[from] serde_json::Error),
}
