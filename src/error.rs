//! Error types for every stage of animation assembly.
//!
//! Each stage has its own enum so callers can match on the stage that failed,
//! and [`AnimError`] wraps all of them for `?` propagation.

use thiserror::Error;

use crate::pixel_source::PixelLayout;

/// Rejected encoder or per-frame configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("canvas dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("canvas dimensions {width}x{height} exceed the WebP limit of {max}x{max}")]
    DimensionTooLarge { width: u32, height: u32, max: u32 },
    #[error("minimum keyframe interval {min} is larger than maximum {max}")]
    KeyframeBounds { min: i32, max: i32 },
    #[error("quality must be within 0..=100, got {0}")]
    QualityOutOfRange(f32),
    #[error("compression method must be within 0..=6, got {0}")]
    MethodOutOfRange(u8),
}

/// The native encoder could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("failed to initialize animation encoder options")]
    OptionsInitFailed,
    #[error("failed to create animation encoder")]
    EncoderCreateFailed,
}

/// A frame could not be turned into a native picture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("unsupported pixel format: {found}")]
    UnsupportedFormat { found: String },
    #[error("frame is {actual_width}x{actual_height} but the animation canvas is {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("frame dimensions {width}x{height} exceed the WebP limit of {max}x{max}")]
    DimensionTooLarge { width: u32, height: u32, max: u32 },
    #[error("frame {index} is {found} but the first frame is {expected}")]
    MixedLayouts {
        index: usize,
        expected: PixelLayout,
        found: PixelLayout,
    },
    #[error("row stride {stride} is shorter than a {width}-pixel row of {bytes_per_pixel}-byte pixels")]
    InvalidStride {
        stride: u32,
        width: u32,
        bytes_per_pixel: u32,
    },
    #[error("pixel buffer holds {actual} bytes, at least {required} are needed")]
    BufferTooSmall { required: usize, actual: usize },
    #[error("failed to initialize WebP picture")]
    PictureInitFailed,
    #[error("failed to import pixels into WebP picture (error code {code})")]
    ImportFailed { code: i32 },
}

/// The native encoder rejected a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("failed to initialize per-frame WebP config")]
    FrameConfigInitFailed,
    #[error("per-frame WebP config was rejected by libwebp")]
    InvalidFrameConfig,
    #[error("animation timeline of {elapsed_ms} ms does not fit into a WebP timestamp")]
    TimestampOverflow { elapsed_ms: u64 },
    #[error("frame duration of {duration_ms} ms is longer than the WebP limit of {max_ms} ms")]
    DurationTooLong { duration_ms: u64, max_ms: u64 },
    #[error("encoding error: {code} - {message}")]
    AddFailed { code: i32, message: String },
}

/// The animation could not be finalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("couldn't add final empty frame: {message}")]
    ClosingFrameFailed { message: String },
    #[error("error assembling animation: {message}")]
    AssembleFailed { message: String },
}

/// The session was used after it stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MisuseError {
    #[error("the animation has already been assembled")]
    SessionFinalized,
    #[error("the encoder session has been closed")]
    SessionClosed,
    #[error("the encoder session failed earlier and must be discarded")]
    SessionFailed,
}

#[derive(Debug, Error)]
pub enum AnimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Misuse(#[from] MisuseError),
    /// Bad command line, only produced by `webp-anim`
    #[error("webp-anim: {0}")]
    Usage(String),
    #[error("unable to read or write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to decode '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[macro_export]
macro_rules! usage_err {
    ($($arg:tt)*) => {
        $crate::error::AnimError::Usage(format!($($arg)*))
    };
}
