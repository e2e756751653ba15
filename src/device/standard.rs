//! # Standard Desktop Devices
//!
//! Control layouts for the `Keyboard` and `Mouse` devices that virtual
//! layouts look up by name.
//!
//! ## Keyboard
//!
//! One button per key, named after the key (`A`, `Digit1`, `F5`, `Space`,
//! `LeftShift`, ...). Printable keys carry their lowercase character so
//! controllers can record the last typed character. Lock LEDs are declared
//! as output controls.
//!
//! ## Mouse
//!
//! | Control | Type | Notes |
//! |---------|------|-------|
//! | X, Y | relative axis | motion delta per frame |
//! | Wheel | relative axis | detents per frame |
//! | Left, Right, Middle, Back, Forward | button | |

use tracing::debug;

use crate::control::{Axis, Control};
use crate::device::DeviceBackend;
use crate::error::Result;
use crate::routing::controller::ControllerBuilder;

/// Device name of the standard keyboard.
pub const KEYBOARD: &str = "Keyboard";

/// Device name of the standard mouse.
pub const MOUSE: &str = "Mouse";

/// Keyboard keys as `(name, description, character)`.
pub const KEYS: &[(&str, &str, Option<char>)] = &[
    ("A", "A key", Some('a')),
    ("B", "B key", Some('b')),
    ("C", "C key", Some('c')),
    ("D", "D key", Some('d')),
    ("E", "E key", Some('e')),
    ("F", "F key", Some('f')),
    ("G", "G key", Some('g')),
    ("H", "H key", Some('h')),
    ("I", "I key", Some('i')),
    ("J", "J key", Some('j')),
    ("K", "K key", Some('k')),
    ("L", "L key", Some('l')),
    ("M", "M key", Some('m')),
    ("N", "N key", Some('n')),
    ("O", "O key", Some('o')),
    ("P", "P key", Some('p')),
    ("Q", "Q key", Some('q')),
    ("R", "R key", Some('r')),
    ("S", "S key", Some('s')),
    ("T", "T key", Some('t')),
    ("U", "U key", Some('u')),
    ("V", "V key", Some('v')),
    ("W", "W key", Some('w')),
    ("X", "X key", Some('x')),
    ("Y", "Y key", Some('y')),
    ("Z", "Z key", Some('z')),
    ("Digit0", "0 key", Some('0')),
    ("Digit1", "1 key", Some('1')),
    ("Digit2", "2 key", Some('2')),
    ("Digit3", "3 key", Some('3')),
    ("Digit4", "4 key", Some('4')),
    ("Digit5", "5 key", Some('5')),
    ("Digit6", "6 key", Some('6')),
    ("Digit7", "7 key", Some('7')),
    ("Digit8", "8 key", Some('8')),
    ("Digit9", "9 key", Some('9')),
    ("F1", "F1 key", None),
    ("F2", "F2 key", None),
    ("F3", "F3 key", None),
    ("F4", "F4 key", None),
    ("F5", "F5 key", None),
    ("F6", "F6 key", None),
    ("F7", "F7 key", None),
    ("F8", "F8 key", None),
    ("F9", "F9 key", None),
    ("F10", "F10 key", None),
    ("F11", "F11 key", None),
    ("F12", "F12 key", None),
    ("Up", "Up arrow", None),
    ("Down", "Down arrow", None),
    ("Left", "Left arrow", None),
    ("Right", "Right arrow", None),
    ("Home", "Home", None),
    ("End", "End", None),
    ("PageUp", "Page up", None),
    ("PageDown", "Page down", None),
    ("Insert", "Insert", None),
    ("Delete", "Delete", None),
    ("Space", "Space bar", Some(' ')),
    ("Enter", "Enter", Some('\n')),
    ("Escape", "Escape", None),
    ("Tab", "Tab", Some('\t')),
    ("Backspace", "Backspace", None),
    ("CapsLock", "Caps lock", None),
    ("LeftShift", "Left shift", None),
    ("RightShift", "Right shift", None),
    ("LeftCtrl", "Left control", None),
    ("RightCtrl", "Right control", None),
    ("LeftAlt", "Left alt", None),
    ("RightAlt", "Right alt", None),
    ("Minus", "Minus", Some('-')),
    ("Equals", "Equals", Some('=')),
    ("LeftBracket", "Left bracket", Some('[')),
    ("RightBracket", "Right bracket", Some(']')),
    ("Semicolon", "Semicolon", Some(';')),
    ("Apostrophe", "Apostrophe", Some('\'')),
    ("Comma", "Comma", Some(',')),
    ("Period", "Period", Some('.')),
    ("Slash", "Slash", Some('/')),
    ("Backslash", "Backslash", Some('\\')),
    ("Grave", "Grave accent", Some('`')),
    ("PrintScreen", "Print screen", None),
    ("Pause", "Pause", None),
];

/// Keyboard lock LEDs.
pub const KEYBOARD_LEDS: &[(&str, &str)] = &[
    ("CapsLockLed", "Caps lock indicator"),
    ("NumLockLed", "Num lock indicator"),
    ("ScrollLockLed", "Scroll lock indicator"),
];

/// Mouse relative axes.
pub const MOUSE_AXES: &[(&str, &str)] = &[
    ("X", "Horizontal motion"),
    ("Y", "Vertical motion"),
    ("Wheel", "Scroll wheel"),
];

/// Mouse buttons.
pub const MOUSE_BUTTONS: &[(&str, &str)] = &[
    ("Left", "Left button"),
    ("Right", "Right button"),
    ("Middle", "Middle button"),
    ("Back", "Back side button"),
    ("Forward", "Forward side button"),
];

/// Declares every keyboard key and LED on `builder`.
///
/// # Errors
///
/// Returns `DuplicateControl` if the builder already declares one of the
/// key names.
pub fn declare_keyboard(builder: &mut ControllerBuilder) -> Result<()> {
    for (name, description, character) in KEYS {
        builder.add_button(name, description, *character)?;
    }
    for (name, description) in KEYBOARD_LEDS {
        builder.add_led(name, description)?;
    }
    Ok(())
}

/// Declares the mouse axes and buttons on `builder`.
///
/// Returns the relative axes so a backend can reset them every frame.
///
/// # Errors
///
/// Returns `DuplicateControl` on a name clash.
pub fn declare_mouse(builder: &mut ControllerBuilder) -> Result<Vec<Axis>> {
    let mut axes = Vec::with_capacity(MOUSE_AXES.len());
    for (name, description) in MOUSE_AXES {
        axes.push(builder.add_axis(name, description, true)?);
    }
    for (name, description) in MOUSE_BUTTONS {
        builder.add_button(name, description, None)?;
    }
    Ok(axes)
}

/// Backend for the standard mouse.
///
/// Motion is reported as deltas, so every axis that moved during a frame is
/// brought back to rest once the frame has been dispatched.
#[derive(Debug)]
pub struct MouseBackend {
    axes: Vec<Axis>,
}

impl MouseBackend {
    #[must_use]
    pub fn new(axes: Vec<Axis>) -> Self {
        Self { axes }
    }
}

impl DeviceBackend for MouseBackend {
    fn update(&mut self) {
        for axis in &self.axes {
            if axis.value() != 0.0 {
                axis.set_value(0.0, true);
            }
        }
    }
}

/// Backend for the standard keyboard. Only reports LED output.
#[derive(Debug, Default)]
pub struct KeyboardBackend;

impl DeviceBackend for KeyboardBackend {
    fn update_output_control(&mut self, control: &Control) {
        if let Some(on) = control.led() {
            debug!("Keyboard LED '{}' -> {}", control.name(), if on { "on" } else { "off" });
        }
    }
}
