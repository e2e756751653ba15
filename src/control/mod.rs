//! # Control Module
//!
//! The smallest addressable value holders of the routing graph.
//!
//! A [`Control`] is a named, typed value owned by exactly one controller. It is
//! a cheap, cloneable handle: device backends on polling threads keep clones to
//! write new values, while the dispatcher keeps the same control in the
//! owning controller's table.
//!
//! ## Control Types
//!
//! | Type | State | Direction |
//! |------|-------|-----------|
//! | Button | pressed / hit latch / character | input |
//! | Axis | value / relative flag | input |
//! | Led | on / off | output |
//! | Effect | magnitude | output |
//!
//! Mutating a control never propagates anything by itself. The setter only
//! records the new state and schedules the control in the dispatcher's dirty
//! queue; propagation happens during the next [`Dispatcher::update`].
//!
//! [`Dispatcher::update`]: crate::dispatch::Dispatcher::update

pub mod axis;
pub mod button;

pub use axis::{Axis, AxisState};
pub use button::{Button, ButtonState};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dispatch::queue::DirtyQueue;
use crate::routing::controller::{ControllerId, ControllerType};

/// Stable identifier of a control: owning controller plus declaration index.
///
/// Controller ids are never reused, so a `ControlId` of a removed controller
/// never aliases a live control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId {
    controller: ControllerId,
    index: u32,
}

impl ControlId {
    pub(crate) fn new(controller: ControllerId, index: usize) -> Self {
        Self {
            controller,
            index: index as u32,
        }
    }

    /// Returns the id of the owning controller.
    #[must_use]
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Returns the declaration index inside the owning controller.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.controller, self.index)
    }
}

/// Kind of a control. Never changes after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Unknown,
    Button,
    Axis,
    Led,
    Effect,
}

impl ControlType {
    /// Returns true for output-only kinds (LEDs and effects).
    #[must_use]
    pub fn is_output_kind(self) -> bool {
        matches!(self, ControlType::Led | ControlType::Effect)
    }
}

/// Current state of a control, tagged by control type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlState {
    Unknown,
    Axis(AxisState),
    Button(ButtonState),
    /// LED on/off.
    Led(bool),
    /// Effect magnitude (rumble strength, etc.).
    Effect(f32),
}

impl ControlState {
    /// Returns the control type this state belongs to.
    #[must_use]
    pub fn control_type(&self) -> ControlType {
        match self {
            ControlState::Unknown => ControlType::Unknown,
            ControlState::Axis(_) => ControlType::Axis,
            ControlState::Button(_) => ControlType::Button,
            ControlState::Led(_) => ControlType::Led,
            ControlState::Effect(_) => ControlType::Effect,
        }
    }
}

struct ControlInner {
    id: ControlId,
    name: String,
    description: String,
    control_type: ControlType,
    is_input: bool,
    owner_type: ControllerType,
    state: Mutex<ControlState>,
    queue: DirtyQueue,
}

/// Shared handle to a control.
///
/// Cloning is cheap; all clones refer to the same control. Equality is
/// identity: two handles are equal only if they point at the same control.
#[derive(Clone)]
pub struct Control {
    inner: Arc<ControlInner>,
}

impl Control {
    pub(crate) fn new(
        id: ControlId,
        name: &str,
        description: &str,
        initial: ControlState,
        is_input: bool,
        owner_type: ControllerType,
        queue: DirtyQueue,
    ) -> Self {
        Self {
            inner: Arc::new(ControlInner {
                id,
                name: name.to_string(),
                description: description.to_string(),
                control_type: initial.control_type(),
                is_input,
                owner_type,
                state: Mutex::new(initial),
                queue,
            }),
        }
    }

    /// Returns the stable id of this control.
    #[must_use]
    pub fn id(&self) -> ControlId {
        self.inner.id
    }

    /// Returns the control name (unique within its controller).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    #[must_use]
    pub fn control_type(&self) -> ControlType {
        self.inner.control_type
    }

    /// Returns true if this control is a source of values (buttons, axes).
    #[must_use]
    pub fn is_input_control(&self) -> bool {
        self.inner.is_input
    }

    /// Returns the id of the owning controller.
    #[must_use]
    pub fn controller(&self) -> ControllerId {
        self.inner.id.controller()
    }

    /// Returns the type of the owning controller.
    #[must_use]
    pub fn controller_type(&self) -> ControllerType {
        self.inner.owner_type
    }

    /// Returns true if both controls may be linked by a connection.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Control) -> bool {
        self.control_type() == other.control_type()
            && self.is_input_control() == other.is_input_control()
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> ControlState {
        *self.lock()
    }

    /// Returns an axis view of this control, if it is an axis.
    #[must_use]
    pub fn as_axis(&self) -> Option<Axis> {
        (self.control_type() == ControlType::Axis).then(|| Axis::from_control(self.clone()))
    }

    /// Returns a button view of this control, if it is a button.
    #[must_use]
    pub fn as_button(&self) -> Option<Button> {
        (self.control_type() == ControlType::Button).then(|| Button::from_control(self.clone()))
    }

    /// Returns the LED state, or `None` for non-LED controls.
    #[must_use]
    pub fn led(&self) -> Option<bool> {
        match self.state() {
            ControlState::Led(on) => Some(on),
            _ => None,
        }
    }

    /// Returns the effect magnitude, or `None` for non-effect controls.
    #[must_use]
    pub fn effect(&self) -> Option<f32> {
        match self.state() {
            ControlState::Effect(level) => Some(level),
            _ => None,
        }
    }

    /// Switches an LED control, scheduling an update if it changed.
    ///
    /// Returns `false` for non-LED controls or when the state is unchanged.
    pub fn set_led(&self, on: bool) -> bool {
        let changed = self.apply_led(on);
        if changed {
            self.inform_update();
        }
        changed
    }

    /// Sets an effect magnitude, scheduling an update if it changed.
    pub fn set_effect(&self, level: f32) -> bool {
        let changed = {
            let mut state = self.lock();
            match &mut *state {
                ControlState::Effect(current) if *current != level => {
                    *current = level;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.inform_update();
        }
        changed
    }

    /// Schedules this control in the dispatcher's dirty queue.
    ///
    /// Safe to call from any thread. Does not propagate the value.
    pub fn inform_update(&self) {
        self.inner.queue.mark(self.id());
    }

    pub(crate) fn apply_led(&self, on: bool) -> bool {
        let mut state = self.lock();
        match &mut *state {
            ControlState::Led(current) if *current != on => {
                *current = on;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Control {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Control {}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("control_type", &self.inner.control_type)
            .field("is_input", &self.inner.is_input)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
