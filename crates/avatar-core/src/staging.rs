//! Staged files shared with the external crop handler.
//!
//! Two fixed-name files in one scratch directory carry image bytes across
//! the process boundary:
//!
//! - `PickedRaw` holds a copy of the picked content and is the crop input.
//! - `CroppedResult` is the output the crop handler is asked to write.
//!
//! Reusing the same two names bounds disk usage to one pending run; two
//! overlapping runs would clobber each other, which is why the coordinator
//! rejects reentry.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::PipelineConfig;
use crate::external::{HandleIssuanceError, ShareProvider, ShareableHandle};

/// One of the two staged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagedKind {
    PickedRaw,
    CroppedResult,
}

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to prepare staging file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write staged {kind:?} file: {source}")]
    Write {
        kind: StagedKind,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read staged {kind:?} file: {source}")]
    Read {
        kind: StagedKind,
        #[source]
        source: io::Error,
    },

    #[error("Failed to share staged file: {0}")]
    Handle(#[from] HandleIssuanceError),
}

/// Owns the scratch directory and both staged files.
#[derive(Debug, Clone)]
pub struct StagingFileManager {
    dir: PathBuf,
    picked_name: String,
    cropped_name: String,
    authority: String,
    copy_buffer_size: usize,
}

impl StagingFileManager {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            dir: config.scratch_dir(),
            picked_name: config.picked_file_name.clone(),
            cropped_name: config.cropped_file_name.clone(),
            authority: config.authority.clone(),
            copy_buffer_size: config.copy_buffer_size.max(1),
        }
    }

    /// Absolute path of a staged file; does not touch the filesystem.
    pub fn path(&self, kind: StagedKind) -> PathBuf {
        match kind {
            StagedKind::PickedRaw => self.dir.join(&self.picked_name),
            StagedKind::CroppedResult => self.dir.join(&self.cropped_name),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the scratch directory and the staged file if missing.
    ///
    /// Existing directory or file counts as success, including when another
    /// caller created it concurrently. Existing contents are left alone.
    pub fn ensure_file(&self, kind: StagedKind) -> Result<PathBuf, StagingError> {
        fs::create_dir_all(&self.dir).map_err(|source| StagingError::Create {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path(kind);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => log::debug!("Created staged file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => return Err(StagingError::Create { path, source }),
        }

        Ok(path)
    }

    /// Copy `source` into the staged file, replacing any previous contents.
    ///
    /// Returns the number of bytes written.
    pub fn write_stream<R: Read>(&self, kind: StagedKind, source: R) -> Result<u64, StagingError> {
        let path = self.ensure_file(kind)?;
        let write_err = |source| StagingError::Write { kind, source };

        let file = File::create(&path).map_err(write_err)?;
        let mut reader = BufReader::with_capacity(self.copy_buffer_size, source);
        let mut writer = BufWriter::with_capacity(self.copy_buffer_size, file);

        let written = io::copy(&mut reader, &mut writer).map_err(write_err)?;
        writer.flush().map_err(write_err)?;
        writer
            .into_inner()
            .map_err(|e| write_err(e.into_error()))?
            .sync_all()
            .map_err(write_err)?;

        log::debug!("Staged {} bytes into {}", written, path.display());
        Ok(written)
    }

    /// Empty the staged file, creating it if needed.
    pub fn truncate(&self, kind: StagedKind) -> Result<PathBuf, StagingError> {
        let path = self.ensure_file(kind)?;
        File::create(&path).map_err(|source| StagingError::Write { kind, source })?;
        Ok(path)
    }

    /// Read and delete the staged file if it holds any bytes.
    ///
    /// `Ok(None)` means the file is missing or empty, i.e. the crop handler
    /// did not write its output there.
    pub fn consume_and_delete(&self, kind: StagedKind) -> Result<Option<Vec<u8>>, StagingError> {
        let path = self.path(kind);
        let len = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StagingError::Read { kind, source }),
        };
        if len == 0 {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|source| StagingError::Read { kind, source })?;
        if let Err(e) = fs::remove_file(&path) {
            log::warn!("Failed to delete consumed {}: {}", path.display(), e);
        }
        Ok(Some(bytes))
    }

    /// Delete the staged file; a missing file is not an error.
    pub fn discard(&self, kind: StagedKind) -> Result<(), StagingError> {
        match fs::remove_file(self.path(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StagingError::Write { kind, source }),
        }
    }

    /// Whether the staged file exists and holds at least one byte.
    pub fn has_content(&self, kind: StagedKind) -> bool {
        fs::metadata(self.path(kind))
            .map(|meta| meta.len() > 0)
            .unwrap_or(false)
    }

    /// Issue a cross-process handle for the staged file, creating it first.
    pub fn shareable_handle<P: ShareProvider + ?Sized>(
        &self,
        kind: StagedKind,
        provider: &P,
    ) -> Result<ShareableHandle, StagingError> {
        let path = self.ensure_file(kind)?;
        Ok(provider.issue(&path, &self.authority)?)
    }
}
