//! Image decoding for the acquisition pipeline.
//!
//! This module provides functionality for:
//! - Decoding staged crop output and resolved source files (JPEG or PNG)
//! - The shared `DecodedImage` pixel container and EXIF `Orientation` values
//!
//! # Examples
//!
//! ```ignore
//! use avatar_core::decode::{decode_file, DecodedImage};
//!
//! let image = decode_file(Path::new("cropped.jpg"))?;
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod reader;
mod types;

pub use reader::{decode_file, decode_image};
pub use types::{DecodeError, DecodedImage, Orientation};
