use crate::error::ConfigError;

#[cfg(test)]
use quickcheck::Arbitrary;

/// Largest canvas side length the WebP container can describe.
pub const MAX_DIMENSION: u32 = 16383;

/// Settings that apply to the whole animation.
/// Fixed once an [`EncoderSession`](crate::EncoderSession) is created.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    /// Minimum distance between keyframes. `0` together with `max_keyframe_interval == 0`
    /// makes every frame a keyframe.
    pub min_keyframe_interval: i32,
    pub max_keyframe_interval: i32,
    /// Spend more time encoding to get a smaller file
    pub minimize_size: bool,
    /// Lets the encoder pick lossy or lossless per frame
    pub allow_mixed: bool,
    /// Number of times to play the animation, 0 means forever
    pub loop_count: u16,
    /// Background color hint in ARGB order
    pub background_color: u32,
}

impl EncoderConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            min_keyframe_interval: 0,
            max_keyframe_interval: 0,
            minimize_size: false,
            allow_mixed: false,
            loop_count: 0,
            background_color: 0xFFFF_FFFF,
        }
    }

    pub fn keyframe_interval(mut self, min: i32, max: i32) -> Self {
        self.min_keyframe_interval = min;
        self.max_keyframe_interval = max;
        self
    }

    pub fn minimize_size(mut self, minimize_size: bool) -> Self {
        self.minimize_size = minimize_size;
        self
    }

    pub fn allow_mixed(mut self, allow_mixed: bool) -> Self {
        self.allow_mixed = allow_mixed;
        self
    }

    pub fn loop_count(mut self, loop_count: u16) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn background_color(mut self, argb: u32) -> Self {
        self.background_color = argb;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ConfigError::DimensionTooLarge {
                width,
                height,
                max: MAX_DIMENSION,
            });
        }
        let (min, max) = (self.min_keyframe_interval, self.max_keyframe_interval);
        // negative values are passed through, libwebp gives them its own meaning
        if min >= 0 && max >= 0 && min > max {
            return Err(ConfigError::KeyframeBounds { min, max });
        }
        Ok(())
    }
}

#[cfg(test)]
impl Arbitrary for EncoderConfig {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self {
            width: u32::arbitrary(g),
            height: u32::arbitrary(g),
            min_keyframe_interval: i32::arbitrary(g),
            max_keyframe_interval: i32::arbitrary(g),
            minimize_size: bool::arbitrary(g),
            allow_mixed: bool::arbitrary(g),
            loop_count: u16::arbitrary(g),
            background_color: u32::arbitrary(g),
        }
    }
}

/// Per-frame compression override.
///
/// Frames added without one are compressed with libwebp's default policy.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FrameConfig {
    pub lossless: bool,
    /// 0..=100. For lossless frames this trades encoding speed for size instead.
    pub quality: Option<f32>,
    /// 0 (fast) ..= 6 (slow, smaller)
    pub method: Option<u8>,
}

impl FrameConfig {
    pub fn lossless() -> Self {
        Self {
            lossless: true,
            ..Default::default()
        }
    }

    pub fn lossy(quality: f32) -> Self {
        Self {
            lossless: false,
            quality: Some(quality),
            method: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(quality) = self.quality {
            // also catches NaN
            if !(0.0..=100.0).contains(&quality) {
                return Err(ConfigError::QualityOutOfRange(quality));
            }
        }
        if let Some(method) = self.method {
            if method > 6 {
                return Err(ConfigError::MethodOutOfRange(method));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quickcheck_macros::quickcheck;

    #[test]
    fn defaults_make_every_frame_a_keyframe() {
        let config = EncoderConfig::new(2, 2);
        assert_eq!(config.min_keyframe_interval, 0);
        assert_eq!(config.max_keyframe_interval, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_independent_flags() {
        let config = EncoderConfig::new(10, 10)
            .minimize_size(true)
            .allow_mixed(false);
        assert!(config.minimize_size);
        assert!(!config.allow_mixed);

        let config = EncoderConfig::new(10, 10)
            .minimize_size(false)
            .allow_mixed(true);
        assert!(!config.minimize_size);
        assert!(config.allow_mixed);
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert_eq!(
            EncoderConfig::new(0, 5).validate(),
            Err(ConfigError::ZeroDimension {
                width: 0,
                height: 5
            })
        );
        assert!(EncoderConfig::new(5, 0).validate().is_err());
        assert!(EncoderConfig::new(MAX_DIMENSION + 1, 5).validate().is_err());
        assert!(EncoderConfig::new(MAX_DIMENSION, MAX_DIMENSION)
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_inverted_keyframe_bounds() {
        let config = EncoderConfig::new(4, 4).keyframe_interval(9, 3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::KeyframeBounds { min: 9, max: 3 })
        );
        let config = EncoderConfig::new(4, 4).keyframe_interval(3, 9);
        assert!(config.validate().is_ok());
        let config = EncoderConfig::new(4, 4).keyframe_interval(9, -1);
        assert!(config.validate().is_ok());
    }

    #[quickcheck]
    fn validation_matches_the_rules(config: EncoderConfig) {
        let dims_ok = (1..=MAX_DIMENSION).contains(&config.width)
            && (1..=MAX_DIMENSION).contains(&config.height);
        let (min, max) = (config.min_keyframe_interval, config.max_keyframe_interval);
        let bounds_ok = min < 0 || max < 0 || min <= max;
        assert_eq!(config.validate().is_ok(), dims_ok && bounds_ok);
    }

    #[test]
    fn frame_config_ranges() {
        assert!(FrameConfig::lossless().validate().is_ok());
        assert!(FrameConfig::lossy(75.0).validate().is_ok());
        assert!(FrameConfig::lossy(100.5).validate().is_err());
        assert!(FrameConfig::lossy(-1.0).validate().is_err());
        assert!(FrameConfig::lossy(f32::NAN).validate().is_err());
        let slow = FrameConfig {
            method: Some(7),
            ..FrameConfig::lossless()
        };
        assert_eq!(slow.validate(), Err(ConfigError::MethodOutOfRange(7)));
    }
}
