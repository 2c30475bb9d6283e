//! Focus coordination between the search surface and auxiliary pickers.
//!
//! Losing focus on the primary surface is ambiguous while a picker (a folder
//! chooser, say) is open: focus may simply have moved into the picker. The
//! coordinator therefore asks the surfaces for their actual state before
//! requesting that a picker be closed.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Idle,
    Focused,
    AuxiliaryPickerOpen,
    Blurred,
}

/// Inputs driving the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    PrimaryFocused,
    PrimaryBlurred,
    PrimaryHidden,
    PickerOpened,
    PickerClosed,
}

/// What the host should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusAction {
    None,
    /// The picker still owns focus or is on screen; leave it alone
    KeepPicker,
    ClosePicker,
}

/// Live view of surface state, queried at decision time.
pub trait SurfaceProbe {
    fn primary_visible(&self) -> bool;
    fn primary_focused(&self) -> bool;
    fn picker_visible(&self) -> bool;
    fn picker_focused(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct FocusCoordinator {
    state: FocusState,
}

impl FocusCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Apply `event` and return the action the host should take.
    pub fn handle(&mut self, event: FocusEvent, probe: &dyn SurfaceProbe) -> FocusAction {
        let before = self.state;
        let action = match (self.state, event) {
            (FocusState::Idle | FocusState::Blurred, FocusEvent::PrimaryFocused) => {
                self.state = FocusState::Focused;
                FocusAction::None
            }
            (FocusState::Focused | FocusState::Blurred, FocusEvent::PickerOpened) => {
                self.state = FocusState::AuxiliaryPickerOpen;
                FocusAction::None
            }
            (FocusState::AuxiliaryPickerOpen, FocusEvent::PickerClosed) => {
                self.state = if probe.primary_focused() {
                    FocusState::Focused
                } else {
                    FocusState::Blurred
                };
                FocusAction::None
            }
            (FocusState::AuxiliaryPickerOpen, FocusEvent::PrimaryBlurred) => {
                self.resolve_picker(probe, FocusState::Blurred)
            }
            (FocusState::AuxiliaryPickerOpen, FocusEvent::PrimaryHidden) => {
                self.resolve_picker(probe, FocusState::Idle)
            }
            (FocusState::Focused, FocusEvent::PrimaryBlurred) => {
                self.state = FocusState::Blurred;
                FocusAction::None
            }
            (FocusState::Focused | FocusState::Blurred, FocusEvent::PrimaryHidden) => {
                self.state = FocusState::Idle;
                FocusAction::None
            }
            _ => FocusAction::None,
        };

        if before != self.state || action != FocusAction::None {
            debug!("Focus {before:?} --{event:?}--> {:?} ({action:?})", self.state);
        }
        action
    }

    /// Decide the picker's fate after the primary surface lost focus or was
    /// hidden.
    fn resolve_picker(&mut self, probe: &dyn SurfaceProbe, next: FocusState) -> FocusAction {
        if probe.picker_visible() || probe.picker_focused() {
            return FocusAction::KeepPicker;
        }

        self.state = next;
        if !probe.primary_focused() && !probe.primary_visible() {
            FocusAction::ClosePicker
        } else {
            FocusAction::None
        }
    }
}
