/// Unified error taxonomy for the Mediagate system.
use thiserror::Error;

/// Top-level error type for gateway operations.
///
/// Every collaborator failure is translated into one of these kinds at
/// the gateway boundary. Collaborator error text may ride along in the
/// message for diagnostics, but control flow only ever branches on the
/// variant.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Locator was empty, malformed, or did not match the hinted platform.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Search resolution produced zero candidates.
    #[error("not found: {0}")]
    NotFound(String),

    /// External downloader errored or produced no artifact (after any fallback).
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// Transfer to the client failed after the response started.
    /// No further response is possible; log and clean up.
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),
}

impl GatewayError {
    /// Stable machine-readable kind string, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput(_) => "invalid_input",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::DownloadFailed(_) => "download_failed",
            GatewayError::Stream(_) => "stream_error",
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
