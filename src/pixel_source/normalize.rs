use image::{DynamicImage, ImageBuffer, Pixel, Primitive};
use std::borrow::Cow;
use std::fmt::Debug;

/// Converts the input image to Rgba8 or Rgb8, whichever the encoder accepts without losing
/// information that survives 8-bit precision.
///
/// Rgb8 and Rgba8 images are borrowed unchanged. Other formats with an alpha channel
/// are scanned, and the alpha channel is only kept if some pixel is not fully opaque.
pub fn normalize_pixel_format(pixels: &DynamicImage) -> Cow<'_, DynamicImage> {
    use image::DynamicImage::*;
    match pixels {
        ImageRgb8(_) | ImageRgba8(_) => Cow::Borrowed(pixels),
        _ => {
            if pixels.color().has_alpha() && !is_opaque(pixels) {
                Cow::Owned(ImageRgba8(pixels.to_rgba8()))
            } else {
                Cow::Owned(ImageRgb8(pixels.to_rgb8()))
            }
        }
    }
}

fn is_opaque(image: &DynamicImage) -> bool {
    match image {
        DynamicImage::ImageLumaA8(pixels) => is_opaque_inner(pixels),
        DynamicImage::ImageRgba8(pixels) => is_opaque_inner(pixels),
        DynamicImage::ImageLumaA16(pixels) => is_opaque_inner(pixels),
        DynamicImage::ImageRgba16(pixels) => is_opaque_inner(pixels),
        DynamicImage::ImageRgba32F(pixels) => is_opaque_inner(pixels),
        // everything else has no alpha channel, or is a variant added to `image` later;
        // for those keep the alpha channel to be safe
        other => !other.color().has_alpha(),
    }
}

fn is_opaque_inner<S, P, Container>(input: &ImageBuffer<P, Container>) -> bool
where
    S: Primitive + Debug,
    P: Pixel<Subpixel = S>,
    Container: std::ops::Deref<Target = [P::Subpixel]>,
{
    // checked a row at a time so the inner loop stays branch-free
    for row in input.rows() {
        let mut opaque = true;
        for pixel in row {
            opaque &= has_max_alpha(*pixel);
        }
        if !opaque {
            return false;
        }
    }
    true
}

#[inline]
fn has_max_alpha<P: Pixel>(pixel: P) -> bool {
    // This assumes that the alpha channel is always the last.
    // This holds for all DynamicImage variants but isn't safe to expose to fully generic code.
    match pixel.channels().last() {
        Some(alpha) if P::HAS_ALPHA => *alpha == P::Subpixel::DEFAULT_MAX_VALUE,
        _ => true,
    }
}
