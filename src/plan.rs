use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use image::DynamicImage;
use tracing::info;

use crate::config::{EncoderConfig, FrameConfig};
use crate::decode::decode;
use crate::error::AnimError;
use crate::pixel_source::normalize_pixel_format;
use crate::session::EncoderSession;
use crate::usage_err;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    Path(PathBuf),
    #[default]
    Stdio,
}

/// Settings that apply to every frame listed after them on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSettings {
    pub delay_ms: u64,
    frame_config: Option<FrameConfig>,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            delay_ms: 100,
            frame_config: None,
        }
    }
}

impl FrameSettings {
    /// Starts a per-frame override on first use; until then libwebp picks the settings.
    pub fn frame_config_mut(&mut self) -> &mut FrameConfig {
        self.frame_config.get_or_insert_with(FrameConfig::default)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub path: PathBuf,
    pub delay_ms: u64,
    pub frame_config: Option<FrameConfig>,
}

/// Everything `webp-anim` has to do, in order
#[derive(Debug, Clone)]
pub struct AnimationPlan {
    frames: Vec<FramePlan>,
    output: Location,
    pub settings: FrameSettings,
    /// Canvas size is filled in from the first frame
    pub config: EncoderConfig,
}

impl Default for AnimationPlan {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            output: Location::default(),
            settings: FrameSettings::default(),
            config: EncoderConfig::new(0, 0),
        }
    }
}

impl AnimationPlan {
    pub fn add_frame(&mut self, path: PathBuf) {
        self.frames.push(FramePlan {
            path,
            delay_ms: self.settings.delay_ms,
            frame_config: self.settings.frame_config,
        });
    }

    pub fn frames(&self) -> &[FramePlan] {
        &self.frames
    }

    pub fn set_output(&mut self, output: Location) {
        self.output = output;
    }

    pub fn output(&self) -> &Location {
        &self.output
    }

    pub fn execute(&self) -> Result<(), AnimError> {
        let mut frames = self.frames.iter();
        let Some(first) = frames.next() else {
            return Err(usage_err!("no images defined"));
        };

        // frames are decoded one at a time so long animations don't have to fit in memory
        let first_image = decode(&first.path)?;
        let config = EncoderConfig {
            width: first_image.width(),
            height: first_image.height(),
            ..self.config
        };
        let mut session = EncoderSession::new(config)?;
        add_decoded_frame(&mut session, first, &first_image)?;
        drop(first_image);
        for frame in frames {
            let image = decode(&frame.path)?;
            add_decoded_frame(&mut session, frame, &image)?;
        }

        let webp = session.assemble()?;
        session.close();
        info!(
            frames = self.frames.len(),
            bytes = webp.len(),
            "writing animation"
        );
        write_output(&self.output, &webp)
    }
}

fn add_decoded_frame(
    session: &mut EncoderSession,
    frame: &FramePlan,
    image: &DynamicImage,
) -> Result<(), AnimError> {
    let pixels = normalize_pixel_format(image);
    session.add_frame(
        &*pixels,
        Duration::from_millis(frame.delay_ms),
        frame.frame_config.as_ref(),
    )
}

fn write_output(location: &Location, webp: &[u8]) -> Result<(), AnimError> {
    match location {
        // `fs::write` truncates (overwrites) the file if it exists
        Location::Path(path) => std::fs::write(path, webp).map_err(|source| AnimError::Io {
            path: path.display().to_string(),
            source,
        }),
        Location::Stdio => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(webp)
                .and_then(|()| stdout.flush())
                .map_err(|source| AnimError::Io {
                    path: String::from("-"),
                    source,
                })
        }
    }
}
