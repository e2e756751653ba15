//! # Connection Module
//!
//! A connection links one input control to one output control on another
//! controller, with a scalar gain for axes.
//!
//! ## Validity
//!
//! Validity is computed once at construction. A connection is rejected if:
//!
//! 1. input and output are the same control
//! 2. the control types differ
//! 3. one end is an input control and the other is not
//! 4. the output belongs to a device (devices are sources, never sinks)
//!
//! An invalid connection can still be built and inspected, but the
//! dispatcher never registers it.
//!
//! ## Propagation
//!
//! | Direction | Dispatch on | Button | Axis | Led / Effect |
//! |-----------|-------------|--------|------|--------------|
//! | forward | input type | copy `pressed` | `value * scale`, keep relative flag | no-op |
//! | backward | output type | no-op | no-op | reserved, no-op |

use std::fmt;

use crate::control::{AxisState, Control, ControlState, ControlType};
use crate::routing::controller::ControllerType;

/// Identifier of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reason a connection failed its validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRejection {
    /// Input and output are the same control.
    SelfLoop,
    /// The two controls have different types.
    TypeMismatch { input: ControlType, output: ControlType },
    /// One control is an input control and the other is not.
    DirectionMismatch,
    /// The output control belongs to a device.
    DeviceSink,
}

impl fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRejection::SelfLoop => write!(f, "control cannot be connected to itself"),
            ConnectionRejection::TypeMismatch { input, output } => {
                write!(f, "type mismatch ({:?} -> {:?})", input, output)
            }
            ConnectionRejection::DirectionMismatch => {
                write!(f, "input/output direction mismatch")
            }
            ConnectionRejection::DeviceSink => {
                write!(f, "output control belongs to a device")
            }
        }
    }
}

/// Link between an input control and an output control.
///
/// # Examples
///
/// ```
/// use input_router::dispatch::Dispatcher;
/// use input_router::routing::controller::ControllerType;
/// use input_router::routing::connection::Connection;
///
/// let mut dispatcher = Dispatcher::new();
/// let mut stick = dispatcher.controller_builder("Stick", "", ControllerType::Unknown);
/// let x = stick.add_axis("X", "", false)?;
/// let mut game = dispatcher.controller_builder("Game", "", ControllerType::Virtual);
/// let steer = game.add_axis("Steer", "", false)?;
///
/// let connection = Connection::new(x.control().clone(), steer.control().clone(), 0.5);
/// assert!(connection.is_valid());
///
/// x.set_value(2.0, false);
/// connection.pass_value();
/// assert_eq!(steer.value(), 1.0);
/// # Ok::<(), input_router::error::RouterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Connection {
    input: Control,
    output: Control,
    scale: f32,
    rejection: Option<ConnectionRejection>,
}

impl Connection {
    /// Builds a connection and runs the validity check.
    #[must_use]
    pub fn new(input: Control, output: Control, scale: f32) -> Self {
        let rejection = Self::check(&input, &output);
        Self {
            input,
            output,
            scale,
            rejection,
        }
    }

    fn check(input: &Control, output: &Control) -> Option<ConnectionRejection> {
        if input == output {
            return Some(ConnectionRejection::SelfLoop);
        }
        if input.control_type() != output.control_type() {
            return Some(ConnectionRejection::TypeMismatch {
                input: input.control_type(),
                output: output.control_type(),
            });
        }
        if input.is_input_control() != output.is_input_control() {
            return Some(ConnectionRejection::DirectionMismatch);
        }
        if output.controller_type() == ControllerType::Device {
            return Some(ConnectionRejection::DeviceSink);
        }
        None
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }

    /// Returns why the connection is invalid, if it is.
    #[must_use]
    pub fn rejection(&self) -> Option<ConnectionRejection> {
        self.rejection
    }

    #[must_use]
    pub fn input(&self) -> &Control {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &Control {
        &self.output
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns true if this connection links exactly `input` to `output`.
    #[must_use]
    pub fn links(&self, input: &Control, output: &Control) -> bool {
        self.input == *input && self.output == *output
    }

    /// Copies the input value to the output.
    ///
    /// Returns true if the output changed. The output is not scheduled in the
    /// dirty queue; the dispatcher informs it within the current drain pass.
    pub fn pass_value(&self) -> bool {
        match self.input.control_type() {
            ControlType::Button => {
                let (Some(input), Some(output)) = (self.input.as_button(), self.output.as_button())
                else {
                    return false;
                };
                output.apply(input.is_pressed())
            }
            ControlType::Axis => {
                let (Some(input), Some(output)) = (self.input.as_axis(), self.output.as_axis())
                else {
                    return false;
                };
                let state = input.state();
                output.apply(AxisState {
                    value: state.value * self.scale,
                    relative: state.relative,
                })
            }
            ControlType::Led | ControlType::Effect | ControlType::Unknown => false,
        }
    }

    /// Propagates from the output side back to the input side.
    ///
    /// Only LED and effect outputs are candidates for this direction and both
    /// are currently no-ops; buttons and axes never flow backwards.
    pub fn pass_value_backwards(&self) -> bool {
        match self.output.state() {
            ControlState::Led(_) | ControlState::Effect(_) => false,
            ControlState::Button(_) | ControlState::Axis(_) | ControlState::Unknown => false,
        }
    }
}
