//! Error types and result utilities for separation operations.

use thiserror::Error;

/// Convenience type alias for results that may contain SeparationError
pub type SeparationResult<T> = Result<T, SeparationError>;

/// Error types that can occur during source separation.
#[derive(Error, Debug)]
pub enum SeparationError {
    /// Error that occurs when an input buffer or operation argument is malformed.
    ///
    /// This includes empty buffers, zero window sizes, hop sizes larger than the
    /// window, and mismatched lengths or sample rates between related buffers.
    #[error("Invalid input error: {0}")]
    InvalidInput(String),

    /// Error that occurs when a buffer's channel layout cannot be processed.
    ///
    /// This typically happens when a stereo-only strategy receives a mono buffer.
    #[error("Unsupported format error: {0}")]
    UnsupportedFormat(String),

    /// Error that occurs when a configuration field is out of range.
    ///
    /// Raised by validation before any signal processing starts, so a bad
    /// config never produces partial output.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when a transform would exceed the FFT safety ceiling.
    ///
    /// This guards spectrogram and whole-buffer FFT allocations against
    /// buffers large enough to overflow practical memory.
    #[error("Numeric overflow error: {0}")]
    NumericOverflow(String),
}
