use thiserror::Error;

use crate::kinetics::ModelKind;

#[derive(Error, Debug)]
pub enum FrapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Stack too short: {frames} frame(s), at least {required} required")]
    StackTooShort { frames: usize, required: usize },

    #[error("No foreground pixels found in the stack")]
    NoForeground,

    #[error("Too many bleached regions: {count} (at most {max} supported)")]
    TooManyRegions { count: usize, max: usize },

    #[error("No unbleached foreground pixels left to use as reference")]
    NoReferencePixels,

    #[error("Analysis cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FrapError>;

/// Failure of a single nonlinear fit. Never aborts the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("maximum iteration count ({max}) exceeded")]
    TooManyIterations { max: usize },

    #[error("{points} data point(s) cannot constrain {params} parameter(s)")]
    InsufficientData { points: usize, params: usize },

    #[error("model produced a non-finite residual")]
    NonFinite,

    #[error("normal equations are singular")]
    Singular,
}

/// A fit attempt that failed, with enough context to report it.
#[derive(Clone, Debug)]
pub struct FitFailure {
    pub region_id: u8,
    pub model: ModelKind,
    pub error: FitError,
}
