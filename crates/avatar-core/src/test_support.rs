//! Fakes and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::decode::DecodedImage;
use crate::encode::encode_png;
use crate::external::{
    ContentResolver, ExternalLauncher, ExternalRequest, HandleIssuanceError, LaunchError,
    ResolutionError, ShareProvider, ShareableHandle, SourceRef,
};

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Image whose pixel `i` (row-major) is a color unique to `indices[i]`.
pub(crate) fn indexed_image(width: u32, height: u32, indices: &[u32]) -> DecodedImage {
    assert_eq!(indices.len(), (width * height) as usize);
    let pixels = indices
        .iter()
        .flat_map(|&k| [(k * 37) as u8, (k * 91 + 7) as u8, (k / 256) as u8])
        .collect();
    DecodedImage::new(width, height, pixels)
}

/// Smooth gradient, large enough to survive JPEG compression recognizably.
pub(crate) fn gradient_image(width: u32, height: u32) -> DecodedImage {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width.max(1)) as u8);
            pixels.push((y * 255 / height.max(1)) as u8);
            pixels.push(128);
        }
    }
    DecodedImage::new(width, height, pixels)
}

pub(crate) fn png_bytes(image: &DecodedImage) -> Vec<u8> {
    encode_png(&image.pixels, image.width, image.height).unwrap()
}

pub(crate) fn jpeg_bytes(image: &DecodedImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 95)
        .write_image(
            &image.pixels,
            image.width,
            image.height,
            ExtendedColorType::Rgb8,
        )
        .unwrap();
    buffer
}

/// Insert an APP1 EXIF segment holding only an orientation tag after SOI.
pub(crate) fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[0..2], &[0xFF, 0xD8], "not a JPEG");
    let [hi, lo] = orientation.to_be_bytes();

    #[rustfmt::skip]
    let app1: [u8; 36] = [
        0xFF, 0xE1, 0x00, 0x22,                 // APP1, length 34
        b'E', b'x', b'i', b'f', 0x00, 0x00,
        b'M', b'M', 0x00, 0x2A,                 // big-endian TIFF header
        0x00, 0x00, 0x00, 0x08,                 // IFD0 offset
        0x00, 0x01,                             // one entry
        0x01, 0x12, 0x00, 0x03,                 // Orientation, SHORT
        0x00, 0x00, 0x00, 0x01,                 // count 1
        hi, lo, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,                 // no IFD1
    ];

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[0..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Launcher that records every request.
#[derive(Debug, Default)]
pub(crate) struct RecordingLauncher {
    pub(crate) requests: Vec<ExternalRequest>,
    pub(crate) refuse: bool,
}

impl RecordingLauncher {
    pub(crate) fn last(&self) -> Option<&ExternalRequest> {
        self.requests.last()
    }
}

impl ExternalLauncher for RecordingLauncher {
    fn launch(&mut self, request: ExternalRequest) -> Result<(), LaunchError> {
        if self.refuse {
            return Err(LaunchError {
                request: request.id(),
                reason: "no handler installed".to_string(),
            });
        }
        self.requests.push(request);
        Ok(())
    }
}

/// Reader that fails after yielding `remaining` bytes.
pub(crate) struct FailingReader {
    pub(crate) remaining: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "stream reset"));
        }
        let n = self.remaining.min(buf.len());
        buf[..n].fill(0xAB);
        self.remaining -= n;
        Ok(n)
    }
}

/// Resolver backed by in-memory content and a path table.
#[derive(Debug, Default)]
pub(crate) struct MemoryResolver {
    contents: HashMap<SourceRef, Vec<u8>>,
    broken: HashMap<SourceRef, usize>,
    paths: HashMap<SourceRef, PathBuf>,
}

impl MemoryResolver {
    pub(crate) fn with_content(mut self, source: &SourceRef, bytes: Vec<u8>) -> Self {
        self.contents.insert(source.clone(), bytes);
        self
    }

    /// Content whose stream breaks after `good_bytes` bytes.
    pub(crate) fn with_broken_stream(mut self, source: &SourceRef, good_bytes: usize) -> Self {
        self.broken.insert(source.clone(), good_bytes);
        self
    }

    pub(crate) fn with_path(mut self, source: &SourceRef, path: PathBuf) -> Self {
        self.paths.insert(source.clone(), path);
        self
    }
}

impl ContentResolver for MemoryResolver {
    fn open(&self, source: &SourceRef) -> Result<Box<dyn Read + '_>, ResolutionError> {
        if let Some(&remaining) = self.broken.get(source) {
            return Ok(Box::new(FailingReader { remaining }));
        }
        match self.contents.get(source) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(ResolutionError::new(source, "no such content")),
        }
    }

    fn resolve_path(&self, source: &SourceRef) -> Result<Option<PathBuf>, ResolutionError> {
        Ok(self.paths.get(source).cloned())
    }
}

/// Share provider that only shares files below one root.
#[derive(Debug)]
pub(crate) struct ScratchShareProvider {
    authority: String,
    root: PathBuf,
}

impl ScratchShareProvider {
    pub(crate) fn new(authority: &str, root: &Path) -> Self {
        Self {
            authority: authority.to_string(),
            root: root.to_path_buf(),
        }
    }
}

impl ShareProvider for ScratchShareProvider {
    fn issue(&self, path: &Path, authority: &str) -> Result<ShareableHandle, HandleIssuanceError> {
        if authority != self.authority {
            return Err(HandleIssuanceError::UnknownAuthority(authority.to_string()));
        }
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| HandleIssuanceError::PathNotShared(path.to_path_buf()))?;
        Ok(ShareableHandle(format!("content://{authority}/{}", relative.display())))
    }
}
