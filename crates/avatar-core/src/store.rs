//! The persisted avatar file.
//!
//! Exactly one file holds the current avatar. It is written as lossless PNG
//! through a sibling temp file and an atomic rename, and every load, save,
//! and clear in the process runs under one lock, so a reader never sees a
//! half-written avatar.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::decode::{decode_image, DecodedImage};
use crate::encode::{encode_png, EncodeError};

/// Serializes every avatar file operation in the process.
static AVATAR_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    // The lock guards no data, so a panic elsewhere cannot leave it inconsistent.
    AVATAR_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to encode avatar: {0}")]
    Encode(#[from] EncodeError),

    #[error("Failed to write avatar {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load/save/clear access to the avatar file.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    path: PathBuf,
}

impl AvatarStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.avatar_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the stored avatar.
    ///
    /// A missing, unreadable, or corrupt file yields `None`.
    pub fn load(&self) -> Option<DecodedImage> {
        let _guard = lock();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Failed to read avatar {}: {}", self.path.display(), e);
                return None;
            }
        };

        match decode_image(&bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Ignoring undecodable avatar {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Encode `image` and replace the stored avatar with it.
    pub fn save(&self, image: &DecodedImage) -> Result<(), PersistError> {
        let png = encode_png(&image.pixels, image.width, image.height)?;

        let _guard = lock();
        self.write_atomically(&png)?;

        log::info!(
            "Saved {}x{} avatar to {}",
            image.width,
            image.height,
            self.path.display()
        );
        Ok(())
    }

    /// Delete the stored avatar. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, PersistError> {
        let _guard = lock();

        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed avatar {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    pub fn exists(&self) -> bool {
        let _guard = lock();
        self.path.is_file()
    }

    fn write_atomically(&self, bytes: &[u8]) -> Result<(), PersistError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| self.io_error(e))?;
        temp.write_all(bytes).map_err(|e| self.io_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: save followed by load returns pixel-identical data.
        #[test]
        fn prop_save_load_is_lossless(
            (width, height, pixels) in (1u32..=16, 1u32..=16).prop_flat_map(|(w, h)| {
                let size = (w * h * 3) as usize;
                (Just(w), Just(h), prop::collection::vec(any::<u8>(), size..=size))
            })
        ) {
            let dir = tempfile::tempdir().unwrap();
            let store = AvatarStore::new(dir.path().join("user_image"));
            let image = DecodedImage::new(width, height, pixels);

            store.save(&image).unwrap();
            prop_assert_eq!(store.load(), Some(image));
        }
    }
}
