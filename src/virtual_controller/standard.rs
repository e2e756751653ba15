//! # Standard Virtual Controller
//!
//! The application-level input vocabulary. Game or application code reads
//! these named controls instead of device controls, so bindings can change
//! without touching the code that consumes them.
//!
//! ## Vocabulary
//!
//! | Group | Controls |
//! |-------|----------|
//! | Keys | `Key<name>` mirror of every keyboard key (`KeyW`, `KeySpace`, ...) |
//! | Mouse | `MouseLeft` .. `MouseForward`, relative `MouseX`, `MouseY`, `MouseWheel` |
//! | Look | relative `LookX`, `LookY`, `Zoom` |
//! | Actions | movement, combat, interface and `Weapon1`..`Weapon9` buttons |
//! | LEDs | lock indicators mirrored from the keyboard |
//!
//! ## Default Bindings
//!
//! | Action | Keyboard | Mouse |
//! |--------|----------|-------|
//! | Forward / Backward | W, Up / S, Down | |
//! | StrafeLeft / StrafeRight | A, Left / D, Right | |
//! | Jump / Crouch | Space / C, LeftCtrl | |
//! | Fire / AltFire | | Left / Right |
//! | NextWeapon / PreviousWeapon | | Forward / Back |
//! | LookX / LookY | | X / Y, scaled by look sensitivity |
//!
//! The full tables are [`KEY_BINDINGS`] and [`MOUSE_BINDINGS`].

use tracing::debug;

use super::VirtualLayout;
use crate::config::StandardConfig;
use crate::device::standard::{self as devices, KEYS, KEYBOARD_LEDS, MOUSE_BUTTONS};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::routing::controller::{ControllerBuilder, ControllerId};

/// Controller name.
pub const STANDARD: &str = "Standard";

/// Prefix of the keyboard key mirror controls.
pub const KEY_PREFIX: &str = "Key";

/// Prefix of the mouse mirror controls.
pub const MOUSE_PREFIX: &str = "Mouse";

/// Names of the semantic controls.
pub mod names {
    pub const FORWARD: &str = "Forward";
    pub const BACKWARD: &str = "Backward";
    pub const STRAFE_LEFT: &str = "StrafeLeft";
    pub const STRAFE_RIGHT: &str = "StrafeRight";
    pub const UP: &str = "Up";
    pub const DOWN: &str = "Down";
    pub const JUMP: &str = "Jump";
    pub const CROUCH: &str = "Crouch";
    pub const RUN: &str = "Run";
    pub const WALK: &str = "Walk";
    pub const USE: &str = "Use";
    pub const PICKUP: &str = "Pickup";
    pub const DROP: &str = "Drop";
    pub const FIRE: &str = "Fire";
    pub const ALT_FIRE: &str = "AltFire";
    pub const RELOAD: &str = "Reload";
    pub const NEXT_WEAPON: &str = "NextWeapon";
    pub const PREVIOUS_WEAPON: &str = "PreviousWeapon";
    pub const INVENTORY: &str = "Inventory";
    pub const MAP: &str = "Map";
    pub const MENU: &str = "Menu";
    pub const PAUSE: &str = "Pause";
    pub const SCREENSHOT: &str = "Screenshot";
    pub const CONSOLE: &str = "Console";
    pub const CHAT: &str = "Chat";
    pub const QUICK_SAVE: &str = "QuickSave";
    pub const QUICK_LOAD: &str = "QuickLoad";
    pub const CONFIRM: &str = "Confirm";
    pub const CANCEL: &str = "Cancel";
    /// Horizontal look, relative.
    pub const LOOK_X: &str = "LookX";
    /// Vertical look, relative.
    pub const LOOK_Y: &str = "LookY";
    /// Zoom steps, relative.
    pub const ZOOM: &str = "Zoom";
}

/// Semantic buttons as `(name, description)`.
pub const ACTIONS: &[(&str, &str)] = &[
    (names::FORWARD, "Move forward"),
    (names::BACKWARD, "Move backward"),
    (names::STRAFE_LEFT, "Strafe left"),
    (names::STRAFE_RIGHT, "Strafe right"),
    (names::UP, "Move up"),
    (names::DOWN, "Move down"),
    (names::JUMP, "Jump"),
    (names::CROUCH, "Crouch"),
    (names::RUN, "Run modifier"),
    (names::WALK, "Walk modifier"),
    (names::USE, "Use / interact"),
    (names::PICKUP, "Pick up item"),
    (names::DROP, "Drop item"),
    (names::FIRE, "Primary fire"),
    (names::ALT_FIRE, "Secondary fire"),
    (names::RELOAD, "Reload"),
    (names::NEXT_WEAPON, "Next weapon"),
    (names::PREVIOUS_WEAPON, "Previous weapon"),
    (names::INVENTORY, "Open inventory"),
    (names::MAP, "Open map"),
    (names::MENU, "Open menu"),
    (names::PAUSE, "Pause"),
    (names::SCREENSHOT, "Take screenshot"),
    (names::CONSOLE, "Toggle console"),
    (names::CHAT, "Open chat"),
    (names::QUICK_SAVE, "Quick save"),
    (names::QUICK_LOAD, "Quick load"),
    (names::CONFIRM, "Confirm"),
    (names::CANCEL, "Cancel"),
    ("Weapon1", "Select weapon 1"),
    ("Weapon2", "Select weapon 2"),
    ("Weapon3", "Select weapon 3"),
    ("Weapon4", "Select weapon 4"),
    ("Weapon5", "Select weapon 5"),
    ("Weapon6", "Select weapon 6"),
    ("Weapon7", "Select weapon 7"),
    ("Weapon8", "Select weapon 8"),
    ("Weapon9", "Select weapon 9"),
];

/// Relative look axes as `(name, description)`.
pub const LOOK_AXES: &[(&str, &str)] = &[
    (names::LOOK_X, "Look horizontal"),
    (names::LOOK_Y, "Look vertical"),
    (names::ZOOM, "Zoom"),
];

/// Keyboard key to action, as `(key, action)`.
pub const KEY_BINDINGS: &[(&str, &str)] = &[
    ("W", names::FORWARD),
    ("Up", names::FORWARD),
    ("S", names::BACKWARD),
    ("Down", names::BACKWARD),
    ("A", names::STRAFE_LEFT),
    ("Left", names::STRAFE_LEFT),
    ("D", names::STRAFE_RIGHT),
    ("Right", names::STRAFE_RIGHT),
    ("PageUp", names::UP),
    ("PageDown", names::DOWN),
    ("Space", names::JUMP),
    ("C", names::CROUCH),
    ("LeftCtrl", names::CROUCH),
    ("LeftShift", names::RUN),
    ("LeftAlt", names::WALK),
    ("E", names::USE),
    ("F", names::PICKUP),
    ("G", names::DROP),
    ("R", names::RELOAD),
    ("Tab", names::INVENTORY),
    ("I", names::INVENTORY),
    ("M", names::MAP),
    ("Escape", names::MENU),
    ("Escape", names::CANCEL),
    ("P", names::PAUSE),
    ("F12", names::SCREENSHOT),
    ("PrintScreen", names::SCREENSHOT),
    ("Grave", names::CONSOLE),
    ("T", names::CHAT),
    ("F5", names::QUICK_SAVE),
    ("F9", names::QUICK_LOAD),
    ("Enter", names::CONFIRM),
    ("Digit1", "Weapon1"),
    ("Digit2", "Weapon2"),
    ("Digit3", "Weapon3"),
    ("Digit4", "Weapon4"),
    ("Digit5", "Weapon5"),
    ("Digit6", "Weapon6"),
    ("Digit7", "Weapon7"),
    ("Digit8", "Weapon8"),
    ("Digit9", "Weapon9"),
];

/// Mouse button to action, as `(button, action)`.
pub const MOUSE_BINDINGS: &[(&str, &str)] = &[
    ("Left", names::FIRE),
    ("Right", names::ALT_FIRE),
    ("Forward", names::NEXT_WEAPON),
    ("Back", names::PREVIOUS_WEAPON),
];

/// The standard virtual controller layout.
///
/// # Examples
///
/// ```
/// use input_router::device::console::ConsoleProvider;
/// use input_router::dispatch::Dispatcher;
/// use input_router::virtual_controller::standard::{names, StandardController};
///
/// let mut dispatcher = Dispatcher::with_providers(vec![Box::new(ConsoleProvider::new())]);
/// let standard = dispatcher.add_virtual_controller(&StandardController::default())?;
///
/// let w = dispatcher.get_keyboard().unwrap().get_control("W").unwrap().clone();
/// w.as_button().unwrap().set_pressed(true);
/// dispatcher.update();
///
/// let forward = dispatcher.find_control(standard, names::FORWARD).unwrap();
/// assert!(forward.as_button().unwrap().is_pressed());
/// # Ok::<(), input_router::error::RouterError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StandardController {
    look_sensitivity: f32,
    invert_look_y: bool,
}

impl Default for StandardController {
    fn default() -> Self {
        Self {
            look_sensitivity: 1.0,
            invert_look_y: false,
        }
    }
}

impl StandardController {
    #[must_use]
    pub fn new(look_sensitivity: f32, invert_look_y: bool) -> Self {
        Self {
            look_sensitivity,
            invert_look_y,
        }
    }

    #[must_use]
    pub fn from_config(config: &StandardConfig) -> Self {
        Self::new(config.look_sensitivity, config.invert_look_y)
    }

    #[must_use]
    pub fn look_sensitivity(&self) -> f32 {
        self.look_sensitivity
    }

    #[must_use]
    pub fn invert_look_y(&self) -> bool {
        self.invert_look_y
    }

    fn connect_keyboard(&self, dispatcher: &mut Dispatcher, controller: ControllerId) -> usize {
        let Some(keyboard) = dispatcher.get_keyboard().map(|keyboard| keyboard.id()) else {
            debug!("No keyboard, skipping keyboard bindings");
            return 0;
        };

        let mut wired = dispatcher.connect_all(controller, keyboard, KEY_PREFIX, "");
        for (key, action) in KEY_BINDINGS {
            wired += link(dispatcher, controller, action, keyboard, key, 1.0);
        }
        for (led, _) in KEYBOARD_LEDS {
            wired += link(dispatcher, controller, led, keyboard, led, 1.0);
        }
        wired
    }

    fn connect_mouse(&self, dispatcher: &mut Dispatcher, controller: ControllerId) -> usize {
        let Some(mouse) = dispatcher.get_mouse().map(|mouse| mouse.id()) else {
            debug!("No mouse, skipping mouse bindings");
            return 0;
        };

        let look_y = if self.invert_look_y {
            -self.look_sensitivity
        } else {
            self.look_sensitivity
        };

        let mut wired = dispatcher.connect_all(controller, mouse, MOUSE_PREFIX, "");
        for (button, action) in MOUSE_BINDINGS {
            wired += link(dispatcher, controller, action, mouse, button, 1.0);
        }
        wired += link(dispatcher, controller, names::LOOK_X, mouse, "X", self.look_sensitivity);
        wired += link(dispatcher, controller, names::LOOK_Y, mouse, "Y", look_y);
        wired += link(dispatcher, controller, names::ZOOM, mouse, "Wheel", 1.0);
        wired
    }
}

impl VirtualLayout for StandardController {
    fn name(&self) -> &str {
        STANDARD
    }

    fn description(&self) -> &str {
        "Standard keyboard and mouse actions"
    }

    fn declare_controls(&self, builder: &mut ControllerBuilder) -> Result<()> {
        for (key, description, character) in KEYS {
            builder.add_button(&format!("{}{}", KEY_PREFIX, key), description, *character)?;
        }
        for (button, description) in MOUSE_BUTTONS {
            builder.add_button(&format!("{}{}", MOUSE_PREFIX, button), description, None)?;
        }
        for (axis, description) in devices::MOUSE_AXES {
            builder.add_axis(&format!("{}{}", MOUSE_PREFIX, axis), description, true)?;
        }
        for (axis, description) in LOOK_AXES {
            builder.add_axis(axis, description, true)?;
        }
        for (action, description) in ACTIONS {
            builder.add_button(action, description, None)?;
        }
        for (led, description) in KEYBOARD_LEDS {
            builder.add_led(led, description)?;
        }
        Ok(())
    }

    fn connect_to_devices(&self, dispatcher: &mut Dispatcher, controller: ControllerId) {
        let keyboard = self.connect_keyboard(dispatcher, controller);
        let mouse = self.connect_mouse(dispatcher, controller);
        debug!(
            "Standard controller wired: {} keyboard, {} mouse connection(s)",
            keyboard, mouse
        );
    }
}

/// Connects one device control to one virtual control. Returns 1 on success.
fn link(
    dispatcher: &mut Dispatcher,
    controller: ControllerId,
    output: &str,
    device: ControllerId,
    input: &str,
    scale: f32,
) -> usize {
    let Some(input) = dispatcher.find_control(device, input).cloned() else {
        debug!("Device control '{}' not found", input);
        return 0;
    };
    usize::from(dispatcher.connect(controller, output, &input, scale).is_ok())
}
