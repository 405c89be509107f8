//! Per-UI-context acquisition state.

use crate::decode::DecodedImage;
use crate::external::RequestId;

/// What the display shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// The host's placeholder image.
    Default,
    /// A user-selected image.
    Custom,
}

/// Which external result the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStep {
    None,
    AwaitingPick,
    AwaitingCrop { persist_on_completion: bool },
}

impl PendingStep {
    pub fn request(self) -> Option<RequestId> {
        match self {
            PendingStep::None => None,
            PendingStep::AwaitingPick => Some(RequestId::Pick),
            PendingStep::AwaitingCrop { .. } => Some(RequestId::Crop),
        }
    }
}

/// Actions the host may offer the user for the current display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Pick,
    Remove,
}

/// `display_state == Custom` exactly when `current_image` is set.
#[derive(Debug)]
pub struct AcquisitionSession {
    pending: PendingStep,
    current_image: Option<DecodedImage>,
    display_state: DisplayState,
}

impl AcquisitionSession {
    pub fn new(initial: Option<DecodedImage>) -> Self {
        let mut session = Self {
            pending: PendingStep::None,
            current_image: None,
            display_state: DisplayState::Default,
        };
        if let Some(image) = initial {
            session.show(image);
        }
        session
    }

    pub fn pending(&self) -> PendingStep {
        self.pending
    }

    pub fn display_state(&self) -> DisplayState {
        self.display_state
    }

    pub fn current_image(&self) -> Option<&DecodedImage> {
        self.current_image.as_ref()
    }

    pub fn available_actions(&self) -> Vec<UserAction> {
        match self.display_state {
            DisplayState::Default => vec![UserAction::Pick],
            DisplayState::Custom => vec![UserAction::Pick, UserAction::Remove],
        }
    }

    pub(crate) fn set_pending(&mut self, step: PendingStep) {
        log::debug!("Acquisition step {:?} -> {:?}", self.pending, step);
        self.pending = step;
    }

    pub(crate) fn show(&mut self, image: DecodedImage) {
        self.current_image = Some(image);
        self.display_state = DisplayState::Custom;
        self.check_invariant();
    }

    pub(crate) fn reset_display(&mut self) {
        self.current_image = None;
        self.display_state = DisplayState::Default;
        self.check_invariant();
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.display_state == DisplayState::Custom,
            self.current_image.is_some(),
            "display state out of sync with current image"
        );
    }
}
