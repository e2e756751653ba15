//! Button controls with an edge-triggered hit latch.

use super::{Control, ControlState};

/// Value of a button control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Character produced by the key, if any.
    pub character: Option<char>,
    /// True while the button is held.
    pub pressed: bool,
    /// Latched on every press; cleared by [`Button::check_hit_and_release`].
    pub hit: bool,
    /// Set on every press; consumed when the dispatcher informs the button.
    pub(crate) press_edge: bool,
}

/// Typed handle to a button control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    control: Control,
}

impl Button {
    pub(crate) fn from_control(control: Control) -> Self {
        Self { control }
    }

    /// Returns the underlying control.
    #[must_use]
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Presses or releases the button and schedules an update on change.
    ///
    /// A release→press transition latches the hit flag.
    pub fn set_pressed(&self, pressed: bool) -> bool {
        let changed = self.apply(pressed);
        if changed {
            self.control.inform_update();
        }
        changed
    }

    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.state().pressed
    }

    /// Returns the hit latch without clearing it.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.state().hit
    }

    /// Returns the hit latch and clears it.
    pub fn check_hit_and_release(&self) -> bool {
        let mut state = self.control.lock();
        match &mut *state {
            ControlState::Button(button) => std::mem::take(&mut button.hit),
            _ => false,
        }
    }

    #[must_use]
    pub fn character(&self) -> Option<char> {
        self.state().character
    }

    #[must_use]
    pub fn state(&self) -> ButtonState {
        match self.control.state() {
            ControlState::Button(state) => state,
            _ => ButtonState::default(),
        }
    }

    /// Returns true if the button was pressed since the last call.
    pub(crate) fn take_press_edge(&self) -> bool {
        let mut state = self.control.lock();
        match &mut *state {
            ControlState::Button(button) => std::mem::take(&mut button.press_edge),
            _ => false,
        }
    }

    /// Stores the pressed flag without scheduling. Returns true if it changed.
    pub(crate) fn apply(&self, pressed: bool) -> bool {
        let mut state = self.control.lock();
        match &mut *state {
            ControlState::Button(button) if button.pressed != pressed => {
                button.pressed = pressed;
                if pressed {
                    button.hit = true;
                    button.press_edge = true;
                }
                true
            }
            _ => false,
        }
    }
}
