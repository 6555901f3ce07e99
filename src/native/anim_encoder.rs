use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::raw::c_int;
use std::ptr::{self, NonNull};

use libwebp_sys::{WebPAnimEncoder, WebPAnimEncoderOptions, WebPConfig};

use crate::config::EncoderConfig;
use crate::error::{EncodeError, InitError};
use crate::native::{NativeData, Picture};

/// Exclusive owner of a `WebPAnimEncoder`, deleted exactly once on drop.
pub struct AnimEncoderHandle {
    encoder: NonNull<WebPAnimEncoder>,
}

// SAFETY: the encoder has no thread affinity; it only needs to be used from one thread
// at a time, which `&mut self` on every call already enforces. It is deliberately not Sync.
unsafe impl Send for AnimEncoderHandle {}

impl AnimEncoderHandle {
    /// `config` must already be validated.
    pub fn new(config: &EncoderConfig) -> Result<Self, InitError> {
        let mut options = MaybeUninit::<WebPAnimEncoderOptions>::uninit();
        // SAFETY: the options struct is written in full by libwebp when it reports success
        let ok = unsafe {
            libwebp_sys::WebPAnimEncoderOptionsInitInternal(
                options.as_mut_ptr(),
                libwebp_sys::WEBP_MUX_ABI_VERSION as c_int,
            )
        };
        if ok == 0 {
            return Err(InitError::OptionsInitFailed);
        }
        // SAFETY: initialized above
        let mut options = unsafe { options.assume_init() };
        let (kmin, kmax) = keyframe_bounds(config);
        options.kmin = kmin;
        options.kmax = kmax;
        options.minimize_size = c_int::from(config.minimize_size);
        options.allow_mixed = c_int::from(config.allow_mixed);
        options.anim_params.loop_count = c_int::from(config.loop_count);
        options.anim_params.bgcolor = config.background_color;

        // SAFETY: `options` is initialized and outlives the call; libwebp copies it
        let encoder = unsafe {
            libwebp_sys::WebPAnimEncoderNewInternal(
                config.width as c_int,
                config.height as c_int,
                &options,
                libwebp_sys::WEBP_MUX_ABI_VERSION as c_int,
            )
        };
        let encoder = NonNull::new(encoder).ok_or(InitError::EncoderCreateFailed)?;
        Ok(Self { encoder })
    }

    /// Adds `picture` to be shown starting at `timestamp_ms`.
    ///
    /// With `config == None` libwebp picks its own default compression settings.
    pub fn add(
        &mut self,
        picture: &mut Picture,
        timestamp_ms: c_int,
        config: Option<&WebPConfig>,
    ) -> Result<(), EncodeError> {
        let config_ptr = config.map_or(ptr::null(), |c| c as *const WebPConfig);
        // SAFETY: the encoder is live, the picture holds imported pixels,
        // and the config, if any, is borrowed for the duration of the call
        let ok = unsafe {
            libwebp_sys::WebPAnimEncoderAdd(
                self.encoder.as_ptr(),
                picture.as_mut_ptr(),
                timestamp_ms,
                config_ptr,
            )
        };
        if ok == 0 {
            // the numeric code lands on the picture, the readable reason on the encoder
            return Err(EncodeError::AddFailed {
                code: picture.error_code(),
                message: self.last_error(),
            });
        }
        Ok(())
    }

    /// Marks the end of the last frame's display time by adding a frame with no picture.
    pub fn add_closing_frame(&mut self, timestamp_ms: c_int) -> Result<(), String> {
        // SAFETY: a null picture is how libwebp is told the timeline ends here
        let ok = unsafe {
            libwebp_sys::WebPAnimEncoderAdd(
                self.encoder.as_ptr(),
                ptr::null_mut(),
                timestamp_ms,
                ptr::null(),
            )
        };
        if ok == 0 {
            return Err(self.last_error());
        }
        Ok(())
    }

    pub fn assemble(&mut self) -> Result<NativeData, String> {
        let mut data = NativeData::new();
        // SAFETY: `data` starts out empty; on success libwebp fills it with a buffer
        // that `NativeData` frees on drop
        let ok =
            unsafe { libwebp_sys::WebPAnimEncoderAssemble(self.encoder.as_ptr(), data.as_mut_ptr()) };
        if ok == 0 {
            return Err(self.last_error());
        }
        Ok(data)
    }

    /// The encoder's description of its most recent failure.
    pub fn last_error(&self) -> String {
        // SAFETY: the encoder is live; the returned string is owned by it
        // and copied out before anything else touches the encoder
        unsafe {
            let message = libwebp_sys::WebPAnimEncoderGetError(self.encoder.as_ptr());
            if message.is_null() {
                String::from("unknown error")
            } else {
                CStr::from_ptr(message).to_string_lossy().into_owned()
            }
        }
    }
}

/// Maps the configured keyframe interval onto libwebp's `kmin`/`kmax`.
///
/// libwebp reads `kmax <= 0` as "no keyframes after the first", while `0/0` here means
/// every frame is a keyframe, which libwebp spells `kmax == 1`.
fn keyframe_bounds(config: &EncoderConfig) -> (c_int, c_int) {
    match (config.min_keyframe_interval, config.max_keyframe_interval) {
        (0, 0) => (0, 1),
        bounds => bounds,
    }
}

impl Drop for AnimEncoderHandle {
    fn drop(&mut self) {
        // SAFETY: we are the only owner and this runs once
        unsafe { libwebp_sys::WebPAnimEncoderDelete(self.encoder.as_ptr()) };
    }
}
