//! `webp-anim` argument parsing.
//!
//! Options follow the imagemagick convention of a single leading `-`, and settings like
//! `-delay` apply to every frame listed after them. No argument parsing library supports
//! that, so the parser is hand-rolled.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::str::FromStr;

use strum::{EnumString, IntoStaticStr, VariantArray};

use crate::error::AnimError;
use crate::plan::{AnimationPlan, Location};
use crate::usage_err;

#[derive(EnumString, IntoStaticStr, VariantArray, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum Arg {
    Delay,
    Loop,
    Kmin,
    Kmax,
    Lossless,
    Lossy,
    Quality,
    Method,
    Minimize,
    Mixed,
}

impl Arg {
    pub fn needs_value(&self) -> bool {
        match self {
            Arg::Delay => true,
            Arg::Loop => true,
            Arg::Kmin => true,
            Arg::Kmax => true,
            Arg::Lossless => false,
            Arg::Lossy => false,
            Arg::Quality => true,
            Arg::Method => true,
            Arg::Minimize => false,
            Arg::Mixed => false,
        }
    }

    pub fn help_text(&self) -> &'static str {
        match self {
            Arg::Delay => "display time of the following frames, in milliseconds",
            Arg::Loop => "number of times to play the animation, 0 loops forever",
            Arg::Kmin => "minimum distance between keyframes",
            Arg::Kmax => "maximum distance between keyframes",
            Arg::Lossless => "compress the following frames losslessly",
            Arg::Lossy => "compress the following frames lossily",
            Arg::Quality => "compression quality of the following frames, 0 to 100",
            Arg::Method => "compression effort of the following frames, 0 to 6",
            Arg::Minimize => "spend more time to make the file smaller",
            Arg::Mixed => "let the encoder choose lossy or lossless per frame",
        }
    }
}

pub fn parse_args(mut args: Vec<OsString>) -> Result<AnimationPlan, AnimError> {
    if args.len() <= 1 {
        return Err(usage_err!("no command-line arguments provided"));
    }

    let output = args.pop().unwrap_or_default();
    if output != "-" && starts_with_sign(&output) {
        return Err(usage_err!(
            "missing an output filename `{}'",
            output.to_string_lossy()
        ));
    }

    let mut plan = AnimationPlan::default();
    plan.set_output(if output == "-" {
        Location::Stdio
    } else {
        Location::Path(PathBuf::from(output))
    });

    let mut iter = args.into_iter().skip(1); // skip argv[0], path to our binary
    while let Some(raw_arg) = iter.next() {
        if starts_with_sign(&raw_arg) {
            let name = arg_name(raw_arg)?;
            let arg = Arg::try_from(name.as_str())
                .map_err(|_| usage_err!("unrecognized option `{name}'"))?;
            let value = if arg.needs_value() {
                let value = iter
                    .next()
                    .ok_or_else(|| usage_err!("argument requires a value: {name}"))?;
                Some(value)
            } else {
                None
            };
            apply_arg(&mut plan, arg, value.as_deref())?;
        } else {
            plan.add_frame(PathBuf::from(raw_arg));
        }
    }

    if plan.frames().is_empty() {
        return Err(usage_err!("no images defined"));
    }
    Ok(plan)
}

fn apply_arg(plan: &mut AnimationPlan, arg: Arg, value: Option<&OsStr>) -> Result<(), AnimError> {
    match arg {
        Arg::Delay => plan.settings.delay_ms = parse_value(arg, value)?,
        Arg::Loop => plan.config = plan.config.loop_count(parse_value(arg, value)?),
        Arg::Kmin => plan.config.min_keyframe_interval = parse_value(arg, value)?,
        Arg::Kmax => plan.config.max_keyframe_interval = parse_value(arg, value)?,
        Arg::Lossless => plan.settings.frame_config_mut().lossless = true,
        Arg::Lossy => plan.settings.frame_config_mut().lossless = false,
        Arg::Quality => plan.settings.frame_config_mut().quality = Some(parse_value(arg, value)?),
        Arg::Method => plan.settings.frame_config_mut().method = Some(parse_value(arg, value)?),
        Arg::Minimize => plan.config = plan.config.minimize_size(true),
        Arg::Mixed => plan.config = plan.config.allow_mixed(true),
    }
    Ok(())
}

fn parse_value<T: FromStr>(arg: Arg, value: Option<&OsStr>) -> Result<T, AnimError> {
    let name: &'static str = arg.into();
    let value = value.unwrap_or_default();
    value
        .to_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
            usage_err!(
                "invalid argument for option `{name}': {}",
                value.to_string_lossy()
            )
        })
}

/// Checks if the string starts with a `-` or a `+`
fn starts_with_sign(arg: &OsStr) -> bool {
    let bytes = arg.as_encoded_bytes();
    let first_byte = bytes.first();
    (first_byte == Some(&b'-') || first_byte == Some(&b'+'))
        // Anything starting with two dashes instead of one is treated as filename
        && bytes.get(1) != Some(&b'-')
}

/// Strips the sign off an option
fn arg_name(raw_arg: OsString) -> Result<String, AnimError> {
    let string = raw_arg
        .into_string()
        .map_err(|s| usage_err!("unrecognized option `{}'", s.to_string_lossy()))?;
    Ok(string[1..].to_owned())
}
