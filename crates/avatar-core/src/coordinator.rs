//! The pick → crop → persist state machine.
//!
//! ```text
//!            start_pick            deliver_pick_result(ok)
//!   Idle ───────────────▶ AwaitingPick ───────────────────▶ AwaitingCrop
//!    ▲                         │ cancelled / failure              │
//!    └─────────────────────────┴──────────────────────────────────┘
//!                          deliver_crop_result (any outcome)
//! ```
//!
//! Each external step only hands off a request; its result comes back
//! later through `deliver_*`. A result that does not match the pending step
//! is ignored, so stray or duplicate deliveries cannot corrupt the session.
//!
//! After a crop, the image is taken from the staged crop output when the
//! handler wrote one. Otherwise the handler's own content reference is
//! resolved to a file, decoded, and orientation-corrected. Anything that
//! goes wrong after an image is shown (persisting it) is reported but never
//! takes the image off the display.

use crate::config::PipelineConfig;
use crate::decode::{decode_file, decode_image, DecodedImage};
use crate::error::{PipelineError, SelectionError};
use crate::external::{
    ContentResolver, CropData, CropRequest, CropResult, ExternalLauncher, ExternalRequest, Outcome,
    PickRequest, PickResult, RequestId, ShareProvider, SourceRef,
};
use crate::orientation::normalize_or_keep;
use crate::session::{AcquisitionSession, DisplayState, PendingStep, UserAction};
use crate::staging::{StagedKind, StagingFileManager};
use crate::store::{AvatarStore, PersistError};

/// What a delivered result did to the session.
#[derive(Debug)]
pub enum Transition {
    /// The picked image is staged and the cropper was launched.
    CropLaunched,
    /// The user backed out; nothing changed.
    Cancelled,
    /// A new image is displayed.
    ImageApplied { persist: PersistStatus },
    /// The result did not match the pending step and was dropped.
    Ignored,
}

#[derive(Debug)]
pub enum PersistStatus {
    Saved,
    /// Persisting was not requested for this run.
    Skipped,
    /// The image stays displayed but is not on disk.
    Failed(PersistError),
}

pub struct AcquisitionCoordinator<L, R, S> {
    launcher: L,
    resolver: R,
    share: S,
    staging: StagingFileManager,
    store: AvatarStore,
    session: AcquisitionSession,
    mime_filter: String,
    display_size: (u32, u32),
}

impl<L, R, S> AcquisitionCoordinator<L, R, S>
where
    L: ExternalLauncher,
    R: ContentResolver,
    S: ShareProvider,
{
    /// Build a coordinator, showing the persisted avatar if there is one.
    pub fn new(config: &PipelineConfig, launcher: L, resolver: R, share: S) -> Self {
        let store = AvatarStore::from_config(config);
        let initial = store.load();
        log::debug!(
            "Acquisition session starts with persisted avatar: {}",
            initial.is_some()
        );

        Self {
            launcher,
            resolver,
            share,
            staging: StagingFileManager::from_config(config),
            store,
            session: AcquisitionSession::new(initial),
            mime_filter: config.mime_filter.clone(),
            display_size: config.default_output_size,
        }
    }

    pub fn session(&self) -> &AcquisitionSession {
        &self.session
    }

    pub fn display_state(&self) -> DisplayState {
        self.session.display_state()
    }

    pub fn current_image(&self) -> Option<&DecodedImage> {
        self.session.current_image()
    }

    /// The external result the session is waiting for, if any.
    pub fn pending_request(&self) -> Option<RequestId> {
        self.session.pending().request()
    }

    pub fn available_actions(&self) -> Vec<UserAction> {
        self.session.available_actions()
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    pub fn staging(&self) -> &StagingFileManager {
        &self.staging
    }

    pub fn store(&self) -> &AvatarStore {
        &self.store
    }

    /// Record the current size of the display target; used as crop output size.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.display_size = (width, height);
    }

    /// Dispatch a user's menu choice.
    pub fn perform(&mut self, action: UserAction) -> Result<(), PipelineError> {
        match action {
            UserAction::Pick => self.start_pick(),
            UserAction::Remove => self.remove_image(),
        }
    }

    /// Ask the picker for an image.
    pub fn start_pick(&mut self) -> Result<(), PipelineError> {
        self.ensure_idle()?;

        self.launcher.launch(ExternalRequest::Pick(PickRequest {
            mime_filter: self.mime_filter.clone(),
        }))?;
        self.session.set_pending(PendingStep::AwaitingPick);
        Ok(())
    }

    /// Handle the picker's result: stage the picked bytes and launch the cropper.
    ///
    /// `persist_on_completion` decides whether the final image is saved to the
    /// avatar store once the crop completes.
    pub fn deliver_pick_result(
        &mut self,
        result: PickResult,
        persist_on_completion: bool,
    ) -> Result<Transition, PipelineError> {
        if self.session.pending() != PendingStep::AwaitingPick {
            log::warn!("Ignoring pick result while {:?}", self.session.pending());
            return Ok(Transition::Ignored);
        }
        self.session.set_pending(PendingStep::None);

        let source = match (result.outcome, result.source) {
            (Outcome::Ok, Some(source)) => source,
            (outcome, _) => {
                log::info!("Pick finished without a selection ({:?})", outcome);
                return Ok(Transition::Cancelled);
            }
        };

        if let Err(e) = self.stage_and_launch_crop(&source) {
            log::error!("Could not start crop for {}: {}", source.as_str(), e);
            self.discard_staged();
            return Err(e);
        }

        self.session.set_pending(PendingStep::AwaitingCrop {
            persist_on_completion,
        });
        Ok(Transition::CropLaunched)
    }

    /// Handle the cropper's result: load the final image and show it.
    pub fn deliver_crop_result(&mut self, result: CropResult) -> Result<Transition, PipelineError> {
        let persist = match self.session.pending() {
            PendingStep::AwaitingCrop {
                persist_on_completion,
            } => persist_on_completion,
            other => {
                log::warn!("Ignoring crop result while {:?}", other);
                return Ok(Transition::Ignored);
            }
        };
        self.session.set_pending(PendingStep::None);

        let resolved = self.resolve_crop(result);
        self.discard_staged();

        let image = match resolved {
            Ok(Some(image)) => image,
            Ok(None) => {
                log::info!("Crop cancelled");
                return Ok(Transition::Cancelled);
            }
            Err(e) => {
                log::warn!("{e}");
                return Err(e);
            }
        };

        log::info!("Selected {}x{} image", image.width, image.height);
        self.session.show(image);

        let persist = if persist {
            self.persist_current()
        } else {
            PersistStatus::Skipped
        };
        Ok(Transition::ImageApplied { persist })
    }

    /// Persist the displayed image. Returns false when nothing is displayed.
    pub fn save_current_image(&self) -> Result<bool, PipelineError> {
        match self.session.current_image() {
            Some(image) => {
                self.store.save(image)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Go back to the default display and delete the persisted avatar.
    ///
    /// A no-op when the default is already displayed. Failing to delete the
    /// file is logged; the display is reset regardless.
    pub fn remove_image(&mut self) -> Result<(), PipelineError> {
        self.ensure_idle()?;

        if self.session.display_state() == DisplayState::Default {
            return Ok(());
        }

        self.session.reset_display();
        if let Err(e) = self.store.clear() {
            log::error!("Avatar removed from display but not from disk: {}", e);
        }
        Ok(())
    }

    /// The avatar currently on disk.
    pub fn persisted_avatar(&self) -> Option<DecodedImage> {
        self.store.load()
    }

    fn ensure_idle(&self) -> Result<(), PipelineError> {
        match self.session.pending().request() {
            Some(request) => Err(PipelineError::Busy(request)),
            None => Ok(()),
        }
    }

    fn stage_and_launch_crop(&mut self, source: &SourceRef) -> Result<(), PipelineError> {
        let reader = self.resolver.open(source)?;
        self.staging.write_stream(StagedKind::PickedRaw, reader)?;
        // A stale output from an earlier run must not be mistaken for this crop.
        self.staging.truncate(StagedKind::CroppedResult)?;

        let input = self
            .staging
            .shareable_handle(StagedKind::PickedRaw, &self.share)?;
        let output = self
            .staging
            .shareable_handle(StagedKind::CroppedResult, &self.share)?;

        let (output_width, output_height) = self.display_size;
        self.launcher.launch(ExternalRequest::Crop(CropRequest {
            source: input,
            output,
            aspect_x: 1,
            aspect_y: 1,
            output_width,
            output_height,
            scale_up_if_needed: true,
            face_detection: false,
            grant_read: true,
            grant_write: true,
        }))?;
        Ok(())
    }

    /// `Ok(None)` for a cancelled crop.
    fn resolve_crop(&self, result: CropResult) -> Result<Option<DecodedImage>, PipelineError> {
        if result.outcome == Outcome::Cancelled {
            return Ok(None);
        }
        let Some(CropData { source }) = result.data else {
            return Err(SelectionError::new("crop handler returned no data").into());
        };

        if let Some(image) = self.take_staged_crop() {
            return Ok(Some(image));
        }

        let Some(source) = source else {
            return Err(SelectionError::new("crop handler wrote no output").into());
        };
        match self.load_from_source(&source) {
            Some(image) => Ok(Some(image)),
            None => {
                let reason = format!("could not load {}", source.as_str());
                Err(SelectionError::new(reason).into())
            }
        }
    }

    fn take_staged_crop(&self) -> Option<DecodedImage> {
        let bytes = match self.staging.consume_and_delete(StagedKind::CroppedResult) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("{e}");
                return None;
            }
        };

        match decode_image(&bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Staged crop output is not an image: {}", e);
                None
            }
        }
    }

    /// Fallback for handlers that return a content reference; their pixels
    /// may not be rotated yet.
    fn load_from_source(&self, source: &SourceRef) -> Option<DecodedImage> {
        let path = match self.resolver.resolve_path(source) {
            Ok(Some(path)) => path,
            Ok(None) => {
                log::warn!("{} has no local path", source.as_str());
                return None;
            }
            Err(e) => {
                log::warn!("{e}");
                return None;
            }
        };

        match decode_file(&path) {
            Ok(image) => Some(normalize_or_keep(image, &path)),
            Err(e) => {
                log::warn!("Failed to decode {}: {}", path.display(), e);
                None
            }
        }
    }

    fn persist_current(&self) -> PersistStatus {
        let Some(image) = self.session.current_image() else {
            return PersistStatus::Skipped;
        };
        match self.store.save(image) {
            Ok(()) => PersistStatus::Saved,
            Err(e) => {
                log::error!("Selected image is displayed but was not saved: {}", e);
                PersistStatus::Failed(e)
            }
        }
    }

    fn discard_staged(&self) {
        for kind in [StagedKind::PickedRaw, StagedKind::CroppedResult] {
            if let Err(e) = self.staging.discard(kind) {
                log::warn!("{e}");
            }
        }
    }
}
