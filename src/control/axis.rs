//! Axis controls: a scalar value plus a relative/absolute flag.

use super::{Control, ControlState};

/// Value of an axis control. Equality is component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisState {
    /// Current value (absolute position or relative delta).
    pub value: f32,
    /// True if `value` is a delta (mouse motion, wheel).
    pub relative: bool,
}

/// Typed handle to an axis control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    control: Control,
}

impl Axis {
    pub(crate) fn from_control(control: Control) -> Self {
        Self { control }
    }

    /// Returns the underlying control.
    #[must_use]
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Sets the axis value and schedules an update.
    ///
    /// An absolute value equal to the current state is ignored. Relative
    /// values are deltas, so every non-zero delta schedules an update even if
    /// it repeats the previous one.
    ///
    /// Returns true if an update was scheduled.
    pub fn set_value(&self, value: f32, relative: bool) -> bool {
        let changed = self.apply(AxisState { value, relative });
        if changed {
            self.control.inform_update();
        }
        changed
    }

    /// Returns the current value (0.0 if the control is not an axis).
    #[must_use]
    pub fn value(&self) -> f32 {
        self.state().value
    }

    #[must_use]
    pub fn is_relative_value(&self) -> bool {
        self.state().relative
    }

    #[must_use]
    pub fn state(&self) -> AxisState {
        match self.control.state() {
            ControlState::Axis(state) => state,
            _ => AxisState::default(),
        }
    }

    /// Stores a new state without scheduling. Returns true if it changed.
    pub(crate) fn apply(&self, next: AxisState) -> bool {
        let mut state = self.control.lock();
        match &mut *state {
            ControlState::Axis(current) => {
                let changed = *current != next || (next.relative && next.value != 0.0);
                if changed {
                    *current = next;
                }
                changed
            }
            _ => false,
        }
    }
}
