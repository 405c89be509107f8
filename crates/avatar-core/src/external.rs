//! Boundary with the out-of-process collaborators.
//!
//! The pipeline never talks to a picker, a cropper, or the platform's file
//! sharing service directly. Hosts implement the three traits here and feed
//! the asynchronous results back through the coordinator.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque reference to content owned by another process (a content URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cross-process readable reference to one of the staged files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareableHandle(pub String);

impl ShareableHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifies which external request a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestId {
    Pick,
    Crop,
}

/// Whether the external handler completed or the user backed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Ok,
    Cancelled,
}

/// Ask the picker for a single item matching a MIME filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub mime_filter: String,
}

/// Ask the cropper to crop `source` into `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropRequest {
    pub source: ShareableHandle,
    pub output: ShareableHandle,
    pub aspect_x: u32,
    pub aspect_y: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub scale_up_if_needed: bool,
    pub face_detection: bool,
    /// The handler may read `source`.
    pub grant_read: bool,
    /// The handler may write `output`.
    pub grant_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalRequest {
    Pick(PickRequest),
    Crop(CropRequest),
}

impl ExternalRequest {
    pub fn id(&self) -> RequestId {
        match self {
            ExternalRequest::Pick(_) => RequestId::Pick,
            ExternalRequest::Crop(_) => RequestId::Crop,
        }
    }
}

/// Result delivered by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResult {
    pub outcome: Outcome,
    pub source: Option<SourceRef>,
}

impl PickResult {
    pub fn picked(source: SourceRef) -> Self {
        Self {
            outcome: Outcome::Ok,
            source: Some(source),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            outcome: Outcome::Cancelled,
            source: None,
        }
    }
}

/// Payload attached to a successful crop result.
///
/// Handlers that honour the requested output leave `source` empty; older
/// handlers report where they put the image instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropData {
    pub source: Option<SourceRef>,
}

/// Result delivered by the cropper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropResult {
    pub outcome: Outcome,
    pub data: Option<CropData>,
}

impl CropResult {
    /// The handler wrote into the requested output.
    pub fn written() -> Self {
        Self {
            outcome: Outcome::Ok,
            data: Some(CropData::default()),
        }
    }

    /// The handler returned a content reference.
    pub fn with_source(source: SourceRef) -> Self {
        Self {
            outcome: Outcome::Ok,
            data: Some(CropData {
                source: Some(source),
            }),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            outcome: Outcome::Cancelled,
            data: None,
        }
    }
}

#[derive(Debug, Error)]
#[error("Failed to launch {request:?} handler: {reason}")]
pub struct LaunchError {
    pub request: RequestId,
    pub reason: String,
}

#[derive(Debug, Error)]
#[error("Failed to resolve {source_ref}: {reason}")]
pub struct ResolutionError {
    pub source_ref: String,
    pub reason: String,
}

impl ResolutionError {
    pub fn new(source: &SourceRef, reason: impl Into<String>) -> Self {
        Self {
            source_ref: source.0.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandleIssuanceError {
    #[error("Authority '{0}' is not registered")]
    UnknownAuthority(String),

    #[error("Path {} is outside the shared roots", .0.display())]
    PathNotShared(PathBuf),
}

/// Starts external pick and crop handlers.
///
/// `launch` returns once the request is handed off; its result arrives later
/// through `AcquisitionCoordinator::deliver_pick_result` or
/// `deliver_crop_result`.
pub trait ExternalLauncher {
    fn launch(&mut self, request: ExternalRequest) -> Result<(), LaunchError>;
}

/// Resolves content references handed out by other processes.
pub trait ContentResolver {
    /// Open the referenced content as a byte stream.
    fn open(&self, source: &SourceRef) -> Result<Box<dyn Read + '_>, ResolutionError>;

    /// Map the reference to a local file path, if the provider exposes one.
    fn resolve_path(&self, source: &SourceRef) -> Result<Option<PathBuf>, ResolutionError>;
}

/// Issues cross-process handles for local files.
pub trait ShareProvider {
    fn issue(&self, path: &Path, authority: &str) -> Result<ShareableHandle, HandleIssuanceError>;
}
