use std::path::PathBuf;

use thiserror::Error;

/// Library error type for quilt-display operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The calibration file does not exist or could not be read.
    #[error("calibration file not readable at {0}")]
    MissingCalibration(PathBuf),

    /// The calibration file exists but holds no JSON object at all.
    #[error("calibration file at {0} is empty")]
    EmptyCalibration(PathBuf),

    /// A device-memory profile carries a schema version other than the one
    /// this reader understands. Compatibility is exact, not range-based.
    #[error("calibration schema version {found} does not match expected {expected}")]
    VersionMismatch { found: f32, expected: f32 },

    /// The screenshot destination is not a directory.
    #[error("invalid screenshot directory: {0}")]
    BadScreenshotDir(PathBuf),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON/serde calibration error.
    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    /// PNG encode error during screenshot export.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Rendering error from the GPU backend.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}
