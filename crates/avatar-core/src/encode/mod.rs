//! Image encoding for avatar persistence.
//!
//! This module provides functionality for:
//! - Encoding RGB pixels to lossless PNG
//!
//! # Examples
//!
//! ```ignore
//! use avatar_core::encode::encode_png;
//!
//! let pixels = vec![128u8; 100 * 100 * 3]; // Gray image
//! let png_bytes = encode_png(&pixels, 100, 100).unwrap();
//! println!("Encoded {} bytes", png_bytes.len());
//! ```

mod png;

pub use png::{encode_png, EncodeError};
