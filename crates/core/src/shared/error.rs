use thiserror::Error;

use super::frame::PixelFormat;

/// Failure inside a colour-space or geometric transform.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("{format:?} buffer for {width}x{height} must be {expected} bytes, got {actual}")]
    BufferLength {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("{format:?} requires even dimensions, got {width}x{height}")]
    OddDimensions {
        format: PixelFormat,
        width: u32,
        height: u32,
    },
    #[error("cannot convert {from:?} to {to:?}")]
    Unsupported { from: PixelFormat, to: PixelFormat },
    #[error("scale factor must be finite and positive, got {0}")]
    InvalidScale(f64),
    #[error("scaling by {factor} gives a {width}x{height} frame, above the {max_pixels} pixel limit")]
    TooLarge {
        factor: f64,
        width: f64,
        height: f64,
        max_pixels: u64,
    },
}

/// Coarse failure category reported to callers deciding whether to retry
/// with a different input or a different classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Classifier missing, unreadable or malformed.
    Resource,
    /// Frame rejected before any conversion ran.
    Input,
    /// A colour-space or resize step rejected the frame.
    Conversion,
    /// Detection parameters out of range.
    Config,
}
