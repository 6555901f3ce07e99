use std::os::raw::c_int;

use libwebp_sys::WebPPicture;

use crate::config::MAX_DIMENSION;
use crate::error::ImportError;
use crate::pixel_source::{FrameDescriptor, PixelLayout};

/// One frame's pixels, copied into libwebp's own ARGB layout.
///
/// Lives for a single `add_frame` call. Dropping it frees the pixel memory libwebp allocated
/// during import, on the success path and on every error path.
pub struct Picture {
    inner: WebPPicture,
}

impl Picture {
    /// Copies `frame` into a new picture of the frame's own size.
    ///
    /// libwebp walks the buffer purely by stride and picture size, so the size always
    /// comes from the descriptor that `validate` checked the buffer against.
    pub fn import(frame: &FrameDescriptor<'_>) -> Result<Self, ImportError> {
        frame.validate()?;
        let (width, height) = (frame.width, frame.height);
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ImportError::DimensionTooLarge {
                width,
                height,
                max: MAX_DIMENSION,
            });
        }
        let stride = c_int::try_from(frame.stride).map_err(|_| ImportError::InvalidStride {
            stride: frame.stride,
            width: frame.width,
            bytes_per_pixel: frame.layout.bytes_per_pixel(),
        })?;

        let mut inner = WebPPicture::new().map_err(|_| ImportError::PictureInitFailed)?;
        // animation frames always go through the ARGB path, never raw YUV
        inner.use_argb = 1;
        // both fit, they were checked against MAX_DIMENSION above
        inner.width = width as c_int;
        inner.height = height as c_int;
        // from here on, Drop takes care of whatever the import allocates
        let mut picture = Self { inner };

        tracing::trace!(width, height, layout = %frame.layout, stride, "importing picture");
        let pixels = frame.pixels.as_ptr();
        // SAFETY: `validate` guarantees `pixels` holds at least `stride * height` bytes
        // and each row holds `width` pixels of the given layout
        let ok = unsafe {
            match frame.layout {
                PixelLayout::Rgb8 => {
                    libwebp_sys::WebPPictureImportRGB(&mut picture.inner, pixels, stride)
                }
                PixelLayout::Rgba8 => {
                    libwebp_sys::WebPPictureImportRGBA(&mut picture.inner, pixels, stride)
                }
            }
        };
        if ok == 0 {
            return Err(ImportError::ImportFailed {
                code: picture.error_code(),
            });
        }
        Ok(picture)
    }

    pub fn error_code(&self) -> i32 {
        self.inner.error_code as i32
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut WebPPicture {
        &mut self.inner
    }
}

impl Drop for Picture {
    fn drop(&mut self) {
        // SAFETY: `inner` was initialized by WebPPictureInit, and freeing
        // a picture that never received pixels is a no-op
        unsafe { libwebp_sys::WebPPictureFree(&mut self.inner) };
    }
}
