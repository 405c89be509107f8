//! Format-agnostic decoding of staged and resolved image files.
//!
//! Decoding never applies EXIF orientation; callers that receive pixels
//! from an untrusted handler run them through
//! [`crate::orientation::normalize`] themselves.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;

use super::{DecodeError, DecodedImage};

/// Decode an image (any enabled format) from bytes into RGB pixels.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format cannot be recognized.
/// Returns `DecodeError::CorruptedFile` if the data is truncated or corrupt.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat(format!(
            "unrecognized header ({} bytes)",
            bytes.len()
        )));
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
}

/// Read and decode the image stored at `path`.
pub fn decode_file(path: &Path) -> Result<DecodedImage, DecodeError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}
