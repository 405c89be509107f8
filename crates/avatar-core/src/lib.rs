//! Avatar Core - single-image acquisition pipeline
//!
//! This crate lets a host application obtain one user-selected image through
//! an external picker and an external cropper, correct its orientation, and
//! persist it as the canonical avatar.
//!
//! # Components
//!
//! - [`orientation`] - EXIF orientation correction
//! - [`staging`] - the two fixed-name files shared with the crop handler
//! - [`store`] - the persisted avatar file behind a process-wide lock
//! - [`coordinator`] - the pick → crop → persist state machine
//!
//! The picker, cropper, content resolution and file sharing are supplied by
//! the host through the traits in [`external`].
//!
//! # Usage
//!
//! ```ignore
//! let config = PipelineConfig::new(cache_dir, files_dir, "com.example.fileprovider");
//! let mut coordinator = AcquisitionCoordinator::new(&config, launcher, resolver, share);
//!
//! coordinator.start_pick()?;
//! // ... later, when the picker returns:
//! coordinator.deliver_pick_result(pick_result, true)?;
//! // ... later, when the cropper returns:
//! coordinator.deliver_crop_result(crop_result)?;
//! ```

pub mod config;
pub mod coordinator;
pub mod decode;
pub mod encode;
pub mod error;
pub mod external;
pub mod orientation;
pub mod session;
pub mod staging;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::PipelineConfig;
pub use coordinator::{AcquisitionCoordinator, PersistStatus, Transition};
pub use decode::{DecodeError, DecodedImage, Orientation};
pub use error::{PipelineError, SelectionError};
pub use external::{
    ContentResolver, CropRequest, CropResult, ExternalLauncher, ExternalRequest, Outcome,
    PickRequest, PickResult, RequestId, ShareProvider, ShareableHandle, SourceRef,
};
pub use orientation::{normalize, MetadataReadError};
pub use session::{AcquisitionSession, DisplayState, PendingStep, UserAction};
pub use staging::{StagedKind, StagingError, StagingFileManager};
pub use store::{AvatarStore, PersistError};
