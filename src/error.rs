//! Error types for depthconv

use thiserror::Error;

/// Result type alias for depthconv operations
pub type Result<T> = std::result::Result<T, Error>;

/// depthconv error type
#[derive(Error, Debug)]
pub enum Error {
    // Conversion errors
    #[error("Point cloud conversion requires camera intrinsics")]
    MissingIntrinsics,

    #[error(
        "Intrinsics resolution {intrinsics_width}x{intrinsics_height} does not match depth frame {frame_width}x{frame_height}"
    )]
    IntrinsicsMismatch {
        intrinsics_width: u32,
        intrinsics_height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Invalid camera intrinsics: {0}")]
    InvalidIntrinsics(String),

    #[error("Frame buffer holds {actual} samples, expected {expected} ({width}x{height})")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown depth mode: {0}")]
    UnknownMode(String),

    // Source errors
    #[error("Depth source not started")]
    SourceNotStarted,

    #[error("Depth source ended")]
    SourceEnded,

    #[error("Depth source error: {0}")]
    Source(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // Output errors
    #[error("Output error: {0}")]
    Output(String),

    // Pipeline errors
    #[error("Pipeline already running")]
    PipelineAlreadyRunning,

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if the pipeline can keep going with the next frame after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingIntrinsics
                | Error::IntrinsicsMismatch { .. }
                | Error::InvalidIntrinsics(_)
                | Error::Timeout(_)
        )
    }

    /// Check if this error means the source has no more frames to give
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::SourceEnded)
    }
}
