//! Owned wrappers around the libwebp handles used for animation encoding.
//!
//! Every native allocation is held by exactly one value here and released in its `Drop`,
//! so early returns and `?` never leak or double-free. This is the only module with `unsafe`.

mod anim_encoder;
mod data;
mod picture;

use std::os::raw::c_int;

use libwebp_sys::WebPConfig;

use crate::config::FrameConfig;
use crate::error::EncodeError;

pub use anim_encoder::AnimEncoderHandle;
pub use data::NativeData;
pub use picture::Picture;

/// Builds the libwebp per-frame compression settings for a [`FrameConfig`].
///
/// The result is a plain value with no native allocation behind it.
pub fn frame_config(frame: &FrameConfig) -> Result<WebPConfig, EncodeError> {
    let mut config = WebPConfig::new().map_err(|_| EncodeError::FrameConfigInitFailed)?;
    config.lossless = c_int::from(frame.lossless);
    if let Some(quality) = frame.quality {
        config.quality = quality;
    }
    if let Some(method) = frame.method {
        config.method = c_int::from(method);
    }
    // SAFETY: `config` is a fully initialized WebPConfig that outlives the call
    if unsafe { libwebp_sys::WebPValidateConfig(&config) } == 0 {
        return Err(EncodeError::InvalidFrameConfig);
    }
    Ok(config)
}
