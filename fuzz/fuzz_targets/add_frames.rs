#![no_main]

use std::num::NonZeroU8;
use std::time::Duration;

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;
use webpanim::{EncoderConfig, EncoderSession, FrameConfig, FrameDescriptor, PixelLayout};

/// A raw frame whose size, stride and buffer length may or may not agree with each other
#[derive(Debug)]
struct RawFrame {
    width: u8,
    height: u8,
    stride: u16,
    layout: PixelLayout,
    pixels: Vec<u8>,
    duration_ms: u16,
    lossless: Option<bool>,
}

impl<'a> arbitrary::Arbitrary<'a> for RawFrame {
    fn arbitrary(unstructured: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let width: u8 = unstructured.arbitrary()?;
        let height: u8 = unstructured.arbitrary()?;
        let layout = if unstructured.arbitrary()? {
            PixelLayout::Rgba8
        } else {
            PixelLayout::Rgb8
        };
        let stride: u16 = unstructured.arbitrary()?;
        let len = unstructured.int_in_range(0..=usize::from(stride) * usize::from(height) + 8)?;
        let pixels = unstructured.bytes(len)?.to_vec();
        Ok(Self {
            width,
            height,
            stride,
            layout,
            pixels,
            duration_ms: unstructured.arbitrary()?,
            lossless: unstructured.arbitrary()?,
        })
    }
}

fuzz_target!(|input: (NonZeroU8, NonZeroU8, Vec<RawFrame>)| {
    let (width, height, frames) = input;
    let config = EncoderConfig::new(u32::from(width.get()), u32::from(height.get()));
    let mut session = EncoderSession::new(config).expect("valid config must create an encoder");

    let mut expected_ms = 0u64;
    for frame in &frames {
        let descriptor = FrameDescriptor {
            pixels: &frame.pixels,
            stride: u32::from(frame.stride),
            width: u32::from(frame.width),
            height: u32::from(frame.height),
            layout: frame.layout,
        };
        let frame_config = frame.lossless.map(|lossless| FrameConfig {
            lossless,
            ..Default::default()
        });
        let result = session.add_frame(
            &descriptor,
            Duration::from_millis(u64::from(frame.duration_ms)),
            frame_config.as_ref(),
        );
        if result.is_ok() {
            expected_ms += u64::from(frame.duration_ms);
        } else if !session.is_open() {
            break;
        }
        // rejected frames never move the timeline
        assert_eq!(session.elapsed(), Duration::from_millis(expected_ms));
    }

    let _ = session.assemble();
    session.close();
});
