use std::path::PathBuf;

use imgflow_comfyui::api::ComfyUIApiError;
use imgflow_core::error::CoreError;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("ComfyUI request failed: {0}")]
    Api(#[from] ComfyUIApiError),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}
