//! Turns caller bitmaps into the `(pixels, stride, has_alpha)` view libwebp consumes.
//!
//! Only packed 8-bit RGB and RGBA are accepted. Anything else is rejected here,
//! before any native call, rather than being guessed at.
//! Callers holding other formats can opt into [`normalize_pixel_format`] first.

use image::{DynamicImage, RgbImage, RgbaImage};
use strum::{Display, IntoStaticStr};

use crate::error::ImportError;

mod normalize;

pub use normalize::normalize_pixel_format;

/// The closed set of pixel layouts the importer knows how to hand to libwebp.
/// Supporting a new layout means adding a variant here and an import call in
/// `Picture::import`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, IntoStaticStr)]
pub enum PixelLayout {
    /// 3 bytes per pixel, no alpha channel
    Rgb8,
    /// 4 bytes per pixel; premultiplied and straight alpha are both accepted
    Rgba8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        match self {
            PixelLayout::Rgb8 => false,
            PixelLayout::Rgba8 => true,
        }
    }
}

/// Borrowed view of one frame's pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameDescriptor<'a> {
    pub pixels: &'a [u8],
    /// Distance between the starts of two consecutive rows, in bytes
    pub stride: u32,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl<'a> FrameDescriptor<'a> {
    /// Describes a tightly packed buffer with no padding between rows.
    pub fn packed(pixels: &'a [u8], width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            pixels,
            stride: width.saturating_mul(layout.bytes_per_pixel()),
            width,
            height,
            layout,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.layout.has_alpha()
    }

    /// Checks that libwebp will not read past the end of `pixels`.
    pub fn validate(&self) -> Result<(), ImportError> {
        let bytes_per_pixel = self.layout.bytes_per_pixel();
        let row_bytes = u64::from(self.width) * u64::from(bytes_per_pixel);
        if u64::from(self.stride) < row_bytes {
            return Err(ImportError::InvalidStride {
                stride: self.stride,
                width: self.width,
                bytes_per_pixel,
            });
        }
        let required = u64::from(self.stride) * u64::from(self.height);
        let required = usize::try_from(required).unwrap_or(usize::MAX);
        if self.pixels.len() < required {
            return Err(ImportError::BufferTooSmall {
                required,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

/// Anything that can lend its pixels to the encoder as a [`FrameDescriptor`].
pub trait PixelSource {
    fn descriptor(&self) -> Result<FrameDescriptor<'_>, ImportError>;
}

impl<'a> PixelSource for FrameDescriptor<'a> {
    fn descriptor(&self) -> Result<FrameDescriptor<'_>, ImportError> {
        Ok(*self)
    }
}

impl PixelSource for RgbImage {
    fn descriptor(&self) -> Result<FrameDescriptor<'_>, ImportError> {
        Ok(FrameDescriptor::packed(
            self.as_raw(),
            self.width(),
            self.height(),
            PixelLayout::Rgb8,
        ))
    }
}

impl PixelSource for RgbaImage {
    fn descriptor(&self) -> Result<FrameDescriptor<'_>, ImportError> {
        Ok(FrameDescriptor::packed(
            self.as_raw(),
            self.width(),
            self.height(),
            PixelLayout::Rgba8,
        ))
    }
}

impl PixelSource for DynamicImage {
    fn descriptor(&self) -> Result<FrameDescriptor<'_>, ImportError> {
        match self {
            DynamicImage::ImageRgb8(pixels) => pixels.descriptor(),
            DynamicImage::ImageRgba8(pixels) => pixels.descriptor(),
            other => Err(ImportError::UnsupportedFormat {
                found: format!("DynamicImage with color type {:?}", other.color()),
            }),
        }
    }
}

impl<T: PixelSource + ?Sized> PixelSource for &T {
    fn descriptor(&self) -> Result<FrameDescriptor<'_>, ImportError> {
        (**self).descriptor()
    }
}
