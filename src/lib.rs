//! Assembles sequences of same-sized RGB/RGBA frames into animated WebP files using libwebp.
//!
//! Start an [`EncoderSession`], add frames with their display durations, then
//! [`assemble`](EncoderSession::assemble) the finished file. For frames that all share
//! one duration, [`encode_sequence`] does all of that in one call.

#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(feature = "hardened_malloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod args;
mod batch;
pub mod config;
mod decode;
pub mod error;
pub mod help;
mod native;
pub mod pixel_source;
pub mod plan;
mod session;
pub mod timeline;

pub use batch::{encode_sequence, encode_sequence_with};
pub use config::{EncoderConfig, FrameConfig};
pub use error::AnimError;
pub use pixel_source::{normalize_pixel_format, FrameDescriptor, PixelLayout, PixelSource};
pub use session::EncoderSession;
