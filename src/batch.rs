//! One-shot encoding of frames that are all shown for the same time.

use std::time::Duration;

use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::{AnimError, ImportError};
use crate::pixel_source::PixelSource;
use crate::session::EncoderSession;

/// Encodes `frames` into an animated WebP, each shown for `frame_duration`.
///
/// All frames must have the size and pixel layout of the first one.
/// An empty slice produces an empty buffer rather than an error.
pub fn encode_sequence<S: PixelSource>(
    frames: &[S],
    frame_duration: Duration,
) -> Result<Vec<u8>, AnimError> {
    encode_sequence_with(frames, frame_duration, |config| config)
}

/// Like [`encode_sequence`], but lets the caller adjust the [`EncoderConfig`]
/// derived from the first frame before the encoder is created.
pub fn encode_sequence_with<S, F>(
    frames: &[S],
    frame_duration: Duration,
    configure: F,
) -> Result<Vec<u8>, AnimError>
where
    S: PixelSource,
    F: FnOnce(EncoderConfig) -> EncoderConfig,
{
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };
    let first = first.descriptor()?;
    // check everything up front so a bad frame at the end doesn't waste the encoding work
    for (index, frame) in frames.iter().enumerate().skip(1) {
        let frame = frame.descriptor()?;
        if (frame.width, frame.height) != (first.width, first.height) {
            return Err(ImportError::DimensionMismatch {
                expected_width: first.width,
                expected_height: first.height,
                actual_width: frame.width,
                actual_height: frame.height,
            }
            .into());
        }
        if frame.layout != first.layout {
            return Err(ImportError::MixedLayouts {
                index,
                expected: first.layout,
                found: frame.layout,
            }
            .into());
        }
    }

    let config = configure(EncoderConfig::new(first.width, first.height));
    debug!(frames = frames.len(), layout = %first.layout, "encoding frame sequence");
    let mut session = EncoderSession::new(config)?;
    for frame in frames {
        session.add_frame(frame, frame_duration, None)?;
    }
    let webp = session.assemble()?;
    session.close();
    Ok(webp)
}
