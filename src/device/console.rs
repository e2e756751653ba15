//! # Console Device Provider
//!
//! Registers the standard keyboard and mouse and drives their controls from
//! text commands, one per line:
//!
//! ```text
//! Keyboard W down
//! Keyboard W up
//! Keyboard Space tap
//! Mouse X 0.5 rel
//! Mouse Wheel -1 rel
//! Keyboard CapsLockLed on
//! ```
//!
//! Commands are read on a tokio task and written through the regular
//! control setters, so they reach the routing graph through the dirty queue
//! exactly like a polling thread would.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::control::Control;
use crate::device::standard::{self, KeyboardBackend, MouseBackend};
use crate::device::{DeviceProvider, DeviceScan};
use crate::error::Result;
use crate::routing::controller::ControllerBuilder;

/// Provider name reported to the dispatcher.
pub const PROVIDER_NAME: &str = "console";

/// What to do with the addressed control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleAction {
    Press,
    Release,
    /// Press and release within one frame. Latches the hit flag and the
    /// key character on the device.
    Tap,
    Axis { value: f32, relative: bool },
    Led(bool),
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleCommand {
    pub device: String,
    pub control: String,
    pub action: ConsoleAction,
}

/// Parses one command line.
///
/// Returns `None` for blank lines, `#` comments and malformed commands.
///
/// # Examples
///
/// ```
/// use input_router::device::console::{parse_command, ConsoleAction};
///
/// let command = parse_command("Mouse X -2.5 rel").unwrap();
/// assert_eq!(command.device, "Mouse");
/// assert_eq!(command.action, ConsoleAction::Axis { value: -2.5, relative: true });
/// assert!(parse_command("# comment").is_none());
/// ```
#[must_use]
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let device = tokens.next()?;
    let control = tokens.next()?;
    let verb = tokens.next()?;
    let modifier = tokens.next();
    if tokens.next().is_some() {
        return None;
    }

    let action = match (verb.to_ascii_lowercase().as_str(), modifier) {
        ("down" | "press", None) => ConsoleAction::Press,
        ("up" | "release", None) => ConsoleAction::Release,
        ("tap", None) => ConsoleAction::Tap,
        ("on", None) => ConsoleAction::Led(true),
        ("off", None) => ConsoleAction::Led(false),
        (number, modifier) => {
            let value: f32 = number.parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            let relative = match modifier {
                None | Some("abs") => false,
                Some("rel") => true,
                Some(_) => return None,
            };
            ConsoleAction::Axis { value, relative }
        }
    };

    Some(ConsoleCommand {
        device: device.to_string(),
        control: control.to_string(),
        action,
    })
}

/// Shared table of console-driven controls keyed by `Device.Control`.
#[derive(Debug, Clone, Default)]
pub struct ConsoleInputs {
    controls: Arc<RwLock<HashMap<String, Control>>>,
}

impl ConsoleInputs {
    fn key(device: &str, control: &str) -> String {
        format!("{}.{}", device, control)
    }

    pub(crate) fn register(&self, device: &str, controls: &[Control]) {
        let mut table = self
            .controls
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for control in controls {
            table.insert(Self::key(device, control.name()), control.clone());
        }
    }

    /// Number of addressable controls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies a command to its control.
    ///
    /// Returns false if the control is unknown or the action does not fit
    /// its type.
    pub fn apply(&self, command: &ConsoleCommand) -> bool {
        let control = {
            let table = self.controls.read().unwrap_or_else(PoisonError::into_inner);
            table
                .get(&Self::key(&command.device, &command.control))
                .cloned()
        };
        let Some(control) = control else {
            return false;
        };

        match command.action {
            ConsoleAction::Press | ConsoleAction::Release | ConsoleAction::Tap => {
                let Some(button) = control.as_button() else {
                    return false;
                };
                match command.action {
                    ConsoleAction::Press => {
                        button.set_pressed(true);
                    }
                    ConsoleAction::Release => {
                        button.set_pressed(false);
                    }
                    _ => {
                        button.set_pressed(true);
                        button.set_pressed(false);
                    }
                }
                true
            }
            ConsoleAction::Axis { value, relative } => match control.as_axis() {
                Some(axis) => {
                    axis.set_value(value, relative);
                    true
                }
                None => false,
            },
            ConsoleAction::Led(on) => {
                if control.led().is_none() {
                    return false;
                }
                control.set_led(on);
                true
            }
        }
    }
}

/// Provider for the console-driven keyboard and mouse.
#[derive(Debug, Default)]
pub struct ConsoleProvider {
    inputs: ConsoleInputs,
}

impl ConsoleProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the control table, for the command reader task.
    #[must_use]
    pub fn inputs(&self) -> ConsoleInputs {
        self.inputs.clone()
    }

    fn add(
        &self,
        scan: &mut DeviceScan<'_>,
        name: &str,
        declare: impl FnOnce(&mut ControllerBuilder) -> Result<()>,
    ) {
        let mut builder = scan.device_builder(name, "Console driven device");
        if let Err(e) = declare(&mut builder) {
            warn!("Failed to declare console device '{}': {}", name, e);
            return;
        }
        let controls = builder.controls().to_vec();
        match scan.add_device(builder) {
            Ok(_) => self.inputs.register(name, &controls),
            Err(e) => warn!("Console device '{}' skipped: {}", name, e),
        }
    }
}

impl DeviceProvider for ConsoleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn query_devices(&mut self, scan: &mut DeviceScan<'_>) {
        if !scan.check_device(standard::KEYBOARD) {
            self.add(scan, standard::KEYBOARD, |builder| {
                standard::declare_keyboard(builder)?;
                builder.set_backend(Box::new(KeyboardBackend));
                Ok(())
            });
        }
        if !scan.check_device(standard::MOUSE) {
            self.add(scan, standard::MOUSE, |builder| {
                let axes = standard::declare_mouse(builder)?;
                builder.set_backend(Box::new(MouseBackend::new(axes)));
                Ok(())
            });
        }
    }
}

/// Reads commands until EOF and applies them.
///
/// Returns the number of commands applied.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub async fn read_commands<R>(reader: R, inputs: ConsoleInputs) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut applied = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match parse_command(&line) {
            Some(command) if inputs.apply(&command) => {
                debug!("Console: {:?}", command);
                applied += 1;
            }
            Some(command) => warn!(
                "Console: no control '{}.{}' for {:?}",
                command.device, command.control, command.action
            ),
            None => warn!("Console: cannot parse '{}'", line.trim()),
        }
    }
    Ok(applied)
}
