use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::error::AnimError;

/// Decodes one input frame, guessing the format from the file contents.
pub fn decode(path: &Path) -> Result<DynamicImage, AnimError> {
    let io_err = |source| AnimError::Io {
        path: path.display().to_string(),
        source,
    };
    let reader = ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?;
    reader.decode().map_err(|source| AnimError::Decode {
        path: path.display().to_string(),
        source,
    })
}
