//! EXIF orientation correction for handler-supplied pixels.
//!
//! External crop handlers that hand back a content reference instead of
//! writing the requested output file may return the raw sensor-oriented
//! pixels. The orientation tag stored next to those pixels says how they
//! should have been displayed; [`normalize`] applies that transform.
//!
//! Only the five unambiguous transforms are corrected:
//!
//! | Tag | Meaning            | Correction                 |
//! |-----|--------------------|----------------------------|
//! | 2   | flip horizontal    | mirror across vertical axis|
//! | 3   | rotate 180         | rotate 180                 |
//! | 4   | flip vertical      | mirror across horizontal   |
//! | 6   | rotate 90 CW       | rotate 90 CW (dims swap)   |
//! | 8   | rotate 270 CW      | rotate 270 CW (dims swap)  |
//!
//! Every other value, a missing tag, or a file without an EXIF block
//! leaves the pixels untouched.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use exif::{In, Reader, Tag};
use image::imageops;
use thiserror::Error;

use crate::decode::{DecodedImage, Orientation};

/// The orientation metadata at a path could not be read.
#[derive(Debug, Error)]
#[error("Failed to read orientation metadata from {}: {source}", path.display())]
pub struct MetadataReadError {
    pub path: PathBuf,
    #[source]
    pub source: exif::Error,
}

/// Read the primary-image orientation tag stored in the file at `path`.
///
/// Returns `Orientation::Normal` when the container has no EXIF block or
/// the block has no orientation field.
pub fn read_orientation(path: &Path) -> Result<Orientation, MetadataReadError> {
    let file = File::open(path).map_err(|e| MetadataReadError {
        path: path.to_path_buf(),
        source: exif::Error::Io(e),
    })?;

    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(Orientation::Normal),
        Err(source) => {
            return Err(MetadataReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let orientation = exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from)
        .unwrap_or_default();

    Ok(orientation)
}

/// Apply the geometric correction for `orientation` to `image`.
pub fn apply_orientation(image: DecodedImage, orientation: Orientation) -> DecodedImage {
    if !orientation.is_corrected() {
        return image;
    }

    let Some(rgb) = image.to_rgb_image() else {
        // Inconsistent buffer; nothing sensible to rotate.
        return image;
    };

    let corrected = match orientation {
        Orientation::Rotate90CW => imageops::rotate90(&rgb),
        Orientation::Rotate180 => imageops::rotate180(&rgb),
        Orientation::Rotate270CW => imageops::rotate270(&rgb),
        Orientation::FlipHorizontal => imageops::flip_horizontal(&rgb),
        Orientation::FlipVertical => imageops::flip_vertical(&rgb),
        Orientation::Normal | Orientation::Transpose | Orientation::Transverse => rgb,
    };

    DecodedImage::from_rgb_image(corrected)
}

/// Correct `image` using the orientation tag stored at `metadata_source`.
///
/// # Errors
///
/// Returns `MetadataReadError` if the file cannot be opened or its metadata
/// is corrupt. Callers are expected to continue with the unmodified image.
pub fn normalize(
    image: &DecodedImage,
    metadata_source: &Path,
) -> Result<DecodedImage, MetadataReadError> {
    let orientation = read_orientation(metadata_source)?;
    Ok(apply_orientation(image.clone(), orientation))
}

/// [`normalize`], degrading a metadata failure to "no correction needed".
pub fn normalize_or_keep(image: DecodedImage, metadata_source: &Path) -> DecodedImage {
    match read_orientation(metadata_source) {
        Ok(orientation) => {
            if orientation.is_corrected() {
                log::debug!(
                    "Applying {:?} correction to {}x{} image from {}",
                    orientation,
                    image.width,
                    image.height,
                    metadata_source.display()
                );
            }
            apply_orientation(image, orientation)
        }
        Err(e) => {
            log::warn!("{e}; assuming normal orientation");
            image
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
