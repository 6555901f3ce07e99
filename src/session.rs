use std::time::Duration;

use tracing::debug;

use crate::config::{EncoderConfig, FrameConfig};
use crate::error::{AnimError, AssembleError, ImportError, MisuseError};
use crate::native::{self, AnimEncoderHandle, Picture};
use crate::pixel_source::PixelSource;
use crate::timeline::Timeline;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SessionState {
    Open,
    Assembled,
    /// libwebp rejected a frame or the final assembly; its internal state is unknown
    Failed,
    Closed,
}

/// Builds one animated WebP, frame by frame.
///
/// Frames must be added from one thread at a time, in display order:
/// `&mut self` on every call serializes them, and the session is `Send` but not `Sync`.
///
/// ```no_run
/// use std::time::Duration;
/// use image::{Rgba, RgbaImage};
/// use webpanim::{EncoderConfig, EncoderSession};
///
/// let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
/// let blue = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
///
/// let mut session = EncoderSession::new(EncoderConfig::new(2, 2))?;
/// session.add_frame(&red, Duration::from_millis(100), None)?;
/// session.add_frame(&blue, Duration::from_millis(100), None)?;
/// let webp = session.assemble()?;
/// session.close();
/// # Ok::<(), webpanim::AnimError>(())
/// ```
pub struct EncoderSession {
    config: EncoderConfig,
    encoder: Option<AnimEncoderHandle>,
    timeline: Timeline,
    frame_count: usize,
    state: SessionState,
}

impl EncoderSession {
    pub fn new(config: EncoderConfig) -> Result<Self, AnimError> {
        config.validate()?;
        let encoder = AnimEncoderHandle::new(&config)?;
        debug!(
            width = config.width,
            height = config.height,
            kmin = config.min_keyframe_interval,
            kmax = config.max_keyframe_interval,
            minimize_size = config.minimize_size,
            allow_mixed = config.allow_mixed,
            "created animation encoder"
        );
        Ok(Self {
            config,
            encoder: Some(encoder),
            timeline: Timeline::new(),
            frame_count: 0,
            state: SessionState::Open,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Total display time of the frames added so far.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.timeline.elapsed_ms())
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Whether the session still accepts frames.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    fn check_open(&self) -> Result<(), MisuseError> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Assembled => Err(MisuseError::SessionFinalized),
            SessionState::Failed => Err(MisuseError::SessionFailed),
            SessionState::Closed => Err(MisuseError::SessionClosed),
        }
    }

    /// Appends a frame shown for `duration`, starting where the previous frame ended.
    ///
    /// `duration` is floored to whole milliseconds. A zero duration is allowed.
    /// With `frame_config == None` libwebp chooses the compression settings.
    ///
    /// Problems found before reaching libwebp (unsupported pixel layout, wrong size,
    /// short buffer, bad `frame_config`, a duration over
    /// [`MAX_FRAME_DURATION_MS`](crate::timeline::MAX_FRAME_DURATION_MS)) leave the session unchanged.
    /// If libwebp itself rejects the frame, the session can no longer be used.
    pub fn add_frame<S: PixelSource + ?Sized>(
        &mut self,
        frame: &S,
        duration: Duration,
        frame_config: Option<&FrameConfig>,
    ) -> Result<(), AnimError> {
        self.check_open()?;
        let descriptor = frame.descriptor()?;
        let (width, height) = (self.config.width, self.config.height);
        // libwebp would read a wrongly sized buffer using the canvas size, so refuse it here
        if (descriptor.width, descriptor.height) != (width, height) {
            return Err(ImportError::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                actual_width: descriptor.width,
                actual_height: descriptor.height,
            }
            .into());
        }

        crate::timeline::check_frame_duration(duration)?;
        let timestamp = self.timeline.next_timestamp()?;
        // the closing frame has to fit as well, so catch overflow before libwebp sees the frame
        let mut after = self.timeline;
        after.advance(duration);
        after.next_timestamp()?;

        let native_config = match frame_config {
            Some(frame_config) => {
                frame_config.validate()?;
                Some(native::frame_config(frame_config)?)
            }
            None => None,
        };

        let mut picture = Picture::import(&descriptor)?;
        let encoder = self.encoder.as_mut().ok_or(MisuseError::SessionClosed)?;
        if let Err(err) = encoder.add(&mut picture, timestamp, native_config.as_ref()) {
            self.state = SessionState::Failed;
            return Err(err.into());
        }

        self.timeline = after;
        self.frame_count += 1;
        debug!(
            frame = self.frame_count,
            timestamp,
            duration_ms = crate::timeline::to_millis(duration),
            layout = %descriptor.layout,
            lossless = frame_config.map(|c| c.lossless),
            "added frame"
        );
        Ok(())
    }

    /// Ends the timeline at the current total duration and returns the finished file.
    ///
    /// Can only succeed once. Later calls fail with [`MisuseError::SessionFinalized`].
    pub fn assemble(&mut self) -> Result<Vec<u8>, AnimError> {
        self.check_open()?;
        let closing_timestamp = self.timeline.next_timestamp()?;
        let encoder = self.encoder.as_mut().ok_or(MisuseError::SessionClosed)?;
        // whatever happens below, the encoder must not be fed again
        self.state = SessionState::Failed;

        encoder
            .add_closing_frame(closing_timestamp)
            .map_err(|message| AssembleError::ClosingFrameFailed { message })?;
        let data = encoder
            .assemble()
            .map_err(|message| AssembleError::AssembleFailed { message })?;
        let bytes = data.to_vec();
        drop(data);

        self.state = SessionState::Assembled;
        debug!(
            frames = self.frame_count,
            closing_timestamp,
            bytes = bytes.len(),
            "assembled animation"
        );
        Ok(bytes)
    }

    /// Releases the native encoder. Calling it again, or after [`assemble`](Self::assemble),
    /// is fine; dropping the session has the same effect.
    pub fn close(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            drop(encoder);
            debug!(frames = self.frame_count, "closed animation encoder");
        }
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, EncodeError};
    use image::{DynamicImage, GrayImage, Rgb, RgbImage, Rgba, RgbaImage};

    use quickcheck_macros::quickcheck;
    use std::num::NonZeroU8;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    fn session(width: u32, height: u32) -> EncoderSession {
        EncoderSession::new(EncoderConfig::new(width, height)).unwrap()
    }

    #[quickcheck]
    // small sizes keep this fast while still covering odd dimensions
    fn new_then_close_without_frames(width: NonZeroU8, height: NonZeroU8) {
        let mut session = session(width.get() as u32, height.get() as u32);
        assert!(session.is_open());
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn zero_dimension_is_a_config_error() {
        assert!(matches!(
            EncoderSession::new(EncoderConfig::new(0, 4)),
            Err(AnimError::Config(ConfigError::ZeroDimension { .. }))
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let mut session = session(4, 4);
        session.close();
        session.close();
        assert!(matches!(
            session.add_frame(&solid(4, 4, [0; 4]), Duration::ZERO, None),
            Err(AnimError::Misuse(MisuseError::SessionClosed))
        ));
        assert!(matches!(
            session.assemble(),
            Err(AnimError::Misuse(MisuseError::SessionClosed))
        ));
    }

    #[test]
    fn durations_accumulate() {
        let mut session = session(2, 2);
        session
            .add_frame(&solid(2, 2, [255, 0, 0, 255]), Duration::from_millis(100), None)
            .unwrap();
        session
            .add_frame(&solid(2, 2, [0, 255, 0, 255]), Duration::ZERO, None)
            .unwrap();
        session
            .add_frame(&solid(2, 2, [0, 0, 255, 255]), Duration::from_micros(40_900), None)
            .unwrap();
        assert_eq!(session.elapsed(), Duration::from_millis(140));
        assert_eq!(session.frame_count(), 3);
    }

    #[test]
    fn assembles_a_riff_webp() {
        let mut session = session(2, 2);
        session
            .add_frame(&solid(2, 2, [255, 0, 0, 255]), Duration::from_millis(100), None)
            .unwrap();
        session
            .add_frame(&solid(2, 2, [0, 0, 255, 255]), Duration::from_millis(100), None)
            .unwrap();
        let webp = session.assemble().unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
        session.close();
    }

    #[test]
    fn second_assemble_is_rejected() {
        let mut session = session(2, 2);
        session
            .add_frame(&solid(2, 2, [9, 9, 9, 255]), Duration::from_millis(50), None)
            .unwrap();
        assert!(session.assemble().is_ok());
        assert!(matches!(
            session.assemble(),
            Err(AnimError::Misuse(MisuseError::SessionFinalized))
        ));
        assert!(matches!(
            session.add_frame(&solid(2, 2, [0; 4]), Duration::ZERO, None),
            Err(AnimError::Misuse(MisuseError::SessionFinalized))
        ));
        session.close();
        session.close();
    }

    #[test]
    fn unsupported_layout_leaves_timeline_alone() {
        let mut session = session(3, 3);
        session
            .add_frame(&solid(3, 3, [1, 2, 3, 255]), Duration::from_millis(30), None)
            .unwrap();
        let gray = DynamicImage::ImageLuma8(GrayImage::new(3, 3));
        assert!(matches!(
            session.add_frame(&gray, Duration::from_millis(500), None),
            Err(AnimError::Import(ImportError::UnsupportedFormat { .. }))
        ));
        assert_eq!(session.elapsed(), Duration::from_millis(30));
        assert_eq!(session.frame_count(), 1);
        // still usable
        assert!(session.is_open());
        session
            .add_frame(&solid(3, 3, [3, 2, 1, 255]), Duration::from_millis(30), None)
            .unwrap();
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut session = session(4, 4);
        let err = session
            .add_frame(&solid(4, 5, [0; 4]), Duration::from_millis(10), None)
            .unwrap_err();
        assert!(matches!(
            err,
            AnimError::Import(ImportError::DimensionMismatch {
                expected_width: 4,
                expected_height: 4,
                actual_width: 4,
                actual_height: 5,
            })
        ));
        assert_eq!(session.elapsed(), Duration::ZERO);
        assert_eq!(session.frame_count(), 0);
    }

    #[test]
    fn rgb_frames_are_accepted() {
        let mut session = session(5, 3);
        let frame = RgbImage::from_pixel(5, 3, Rgb([10, 200, 30]));
        session
            .add_frame(&frame, Duration::from_millis(80), None)
            .unwrap();
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 3, Rgb([200, 10, 30])));
        session
            .add_frame(&frame, Duration::from_millis(80), None)
            .unwrap();
        assert!(!session.assemble().unwrap().is_empty());
    }

    #[test]
    fn per_frame_overrides() {
        let config = EncoderConfig::new(4, 4).allow_mixed(true);
        let mut session = EncoderSession::new(config).unwrap();
        session
            .add_frame(
                &solid(4, 4, [255, 255, 0, 255]),
                Duration::from_millis(20),
                Some(&FrameConfig::lossless()),
            )
            .unwrap();
        session
            .add_frame(
                &solid(4, 4, [0, 255, 255, 255]),
                Duration::from_millis(20),
                Some(&FrameConfig::lossy(60.0)),
            )
            .unwrap();
        assert!(session.assemble().is_ok());
    }

    #[test]
    fn invalid_frame_config_leaves_session_usable() {
        let mut session = session(2, 2);
        let bad = FrameConfig::lossy(250.0);
        assert!(matches!(
            session.add_frame(&solid(2, 2, [0; 4]), Duration::from_millis(10), Some(&bad)),
            Err(AnimError::Config(ConfigError::QualityOutOfRange(_)))
        ));
        assert!(session.is_open());
        assert_eq!(session.frame_count(), 0);
    }

    #[test]
    fn timeline_overflow_is_caught_before_libwebp() {
        let mut session = session(2, 2);
        session.timeline.advance(Duration::from_millis(i32::MAX as u64 - 10));
        let before = session.elapsed();
        assert!(matches!(
            session.add_frame(&solid(2, 2, [0; 4]), Duration::from_millis(11), None),
            Err(AnimError::Encode(EncodeError::TimestampOverflow { .. }))
        ));
        assert!(session.is_open());
        assert_eq!(session.elapsed(), before);
        assert_eq!(session.frame_count(), 0);
    }

    #[test]
    fn native_rejection_fails_the_session() {
        let mut session = session(2, 2);
        for (i, ms) in [100, 100].into_iter().enumerate() {
            session
                .add_frame(&solid(2, 2, [i as u8 * 80, 0, 0, 255]), Duration::from_millis(ms), None)
                .unwrap();
        }
        // rewinding makes libwebp see a timestamp earlier than the previous frame's
        session.timeline = Timeline::new();
        match session.add_frame(&solid(2, 2, [0, 0, 200, 255]), Duration::from_millis(10), None) {
            Err(AnimError::Encode(EncodeError::AddFailed { code, message })) => {
                // VP8_ENC_ERROR_INVALID_CONFIGURATION, set on the picture by libwebp
                assert_eq!(code, 4);
                assert!(message.contains("timestamp"), "{message}");
            }
            other => panic!("expected a native rejection, got {other:?}"),
        }
        assert!(!session.is_open());
        assert_eq!(session.frame_count(), 2);
        assert!(matches!(
            session.add_frame(&solid(2, 2, [0; 4]), Duration::from_millis(10), None),
            Err(AnimError::Misuse(MisuseError::SessionFailed))
        ));
        assert!(matches!(
            session.assemble(),
            Err(AnimError::Misuse(MisuseError::SessionFailed))
        ));
    }

    #[test]
    fn overlong_frame_is_rejected_before_libwebp() {
        let mut session = session(2, 2);
        session
            .add_frame(&solid(2, 2, [1, 2, 3, 255]), Duration::from_millis(10), None)
            .unwrap();
        assert!(matches!(
            session.add_frame(&solid(2, 2, [0; 4]), Duration::from_millis(1 << 24), None),
            Err(AnimError::Encode(EncodeError::DurationTooLong { duration_ms, .. }))
                if duration_ms == 1 << 24
        ));
        assert!(session.is_open());
        assert_eq!(session.elapsed(), Duration::from_millis(10));
        assert_eq!(session.frame_count(), 1);

        session
            .add_frame(&solid(2, 2, [3, 2, 1, 255]), Duration::from_millis(20), None)
            .unwrap();
        assert!(session.assemble().is_ok());
    }

    #[test]
    fn assembling_without_frames_fails_cleanly() {
        let mut session = session(2, 2);
        // libwebp refuses to build an animation with no frames
        assert!(matches!(
            session.assemble(),
            Err(AnimError::Assemble(_))
        ));
        assert!(matches!(
            session.assemble(),
            Err(AnimError::Misuse(MisuseError::SessionFailed))
        ));
    }

    #[test]
    fn session_can_move_to_another_thread() {
        let mut session = session(2, 2);
        session
            .add_frame(&solid(2, 2, [1, 1, 1, 255]), Duration::from_millis(10), None)
            .unwrap();
        let webp = std::thread::spawn(move || session.assemble())
            .join()
            .unwrap()
            .unwrap();
        assert!(!webp.is_empty());
    }
}
