//! # Controller Module
//!
//! A controller is a named aggregate of controls plus the routing
//! connections touching them. Physical devices and virtual controllers are
//! both controllers, distinguished by [`ControllerType`].
//!
//! Controllers are declared with a [`ControllerBuilder`] and then handed to
//! the [`Dispatcher`](crate::dispatch::Dispatcher), which owns them for the
//! rest of their lifetime. Wiring and teardown go through the dispatcher
//! because every connection touches two controllers.

use std::collections::HashMap;
use std::fmt;

use crate::control::{
    Axis, AxisState, Button, ButtonState, Control, ControlId, ControlState,
};
use crate::device::DeviceBackend;
use crate::dispatch::queue::DirtyQueue;
use crate::error::{Result, RouterError};
use crate::routing::connection::ConnectionId;
use crate::routing::signal::Signal;

/// Identifier of a controller. Allocated by the dispatcher, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub(crate) u64);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerType {
    Unknown,
    /// Physical device; its controls can only be connection sources.
    Device,
    /// Application-side controller with no physical backing.
    Virtual,
}

/// A registered controller.
pub struct Controller {
    id: ControllerId,
    name: String,
    description: String,
    controller_type: ControllerType,
    active: bool,
    pub(crate) changed: bool,
    pub(crate) last_hit_char: Option<char>,
    controls: Vec<Control>,
    controls_by_name: HashMap<String, usize>,
    pub(crate) connections: Vec<ConnectionId>,
    pub(crate) backend: Option<Box<dyn DeviceBackend>>,
    pub(crate) confirmed: bool,
    pub(crate) on_control: Signal<Control>,
    on_activate: Signal<bool>,
    pub(crate) on_changed: Signal<ControllerId>,
}

impl Controller {
    #[must_use]
    pub fn id(&self) -> ControllerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn controller_type(&self) -> ControllerType {
        self.controller_type
    }

    #[must_use]
    pub fn is_device(&self) -> bool {
        self.controller_type == ControllerType::Device
    }

    /// Returns true if the controller receives and sends updates.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enables or disables the controller, firing `on_activate` on change.
    ///
    /// An inactive controller ignores its own dirty controls and receives
    /// nothing through its connections.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        tracing::debug!("Controller '{}' active: {}", self.name, active);
        self.on_activate.emit(&active);
    }

    /// Returns true if any control of this controller was informed during
    /// the last frame.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Returns the character of the last hit button without clearing it.
    #[must_use]
    pub fn get_char(&self) -> Option<char> {
        self.last_hit_char
    }

    /// Returns and clears the character of the last hit button.
    pub fn take_char(&mut self) -> Option<char> {
        self.last_hit_char.take()
    }

    /// Returns true once the owning provider confirmed the device during the
    /// last scan. Always true for controllers added outside a provider.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Controls in declaration order.
    #[must_use]
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    #[must_use]
    pub fn num_controls(&self) -> usize {
        self.controls.len()
    }

    /// Looks up a control by name.
    #[must_use]
    pub fn get_control(&self, name: &str) -> Option<&Control> {
        self.controls_by_name
            .get(name)
            .and_then(|&index| self.controls.get(index))
    }

    pub(crate) fn control_by_id(&self, id: ControlId) -> Option<&Control> {
        if id.controller() != self.id {
            return None;
        }
        self.controls.get(id.index())
    }

    /// Ids of the connections this controller takes part in.
    #[must_use]
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    #[must_use]
    pub fn get_num_of_connections(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn has_connection(&self, id: ConnectionId) -> bool {
        self.connections.contains(&id)
    }

    pub(crate) fn add_connection(&mut self, id: ConnectionId) {
        if !self.connections.contains(&id) {
            self.connections.push(id);
        }
    }

    pub(crate) fn remove_connection(&mut self, id: ConnectionId) -> bool {
        match self.connections.iter().position(|existing| *existing == id) {
            Some(index) => {
                self.connections.remove(index);
                true
            }
            None => false,
        }
    }

    /// Fired for every informed control, before connection fan-out.
    pub fn on_control(&mut self) -> &mut Signal<Control> {
        &mut self.on_control
    }

    /// Fired with the new flag when the controller is (de)activated.
    pub fn on_activate(&mut self) -> &mut Signal<bool> {
        &mut self.on_activate
    }

    /// Fired once per frame after the drain if the controller changed.
    pub fn on_changed(&mut self) -> &mut Signal<ControllerId> {
        &mut self.on_changed
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("controller_type", &self.controller_type)
            .field("active", &self.active)
            .field("controls", &self.controls.len())
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

/// Declares the controls of a controller before it is registered.
///
/// Obtained from [`Dispatcher::controller_builder`] (or a device scan) so
/// that every control is already bound to the dispatcher's dirty queue.
///
/// [`Dispatcher::controller_builder`]: crate::dispatch::Dispatcher::controller_builder
pub struct ControllerBuilder {
    id: ControllerId,
    name: String,
    description: String,
    controller_type: ControllerType,
    queue: DirtyQueue,
    controls: Vec<Control>,
    controls_by_name: HashMap<String, usize>,
    backend: Option<Box<dyn DeviceBackend>>,
}

impl ControllerBuilder {
    pub(crate) fn new(
        id: ControllerId,
        name: &str,
        description: &str,
        controller_type: ControllerType,
        queue: DirtyQueue,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            controller_type,
            queue,
            controls: Vec::new(),
            controls_by_name: HashMap::new(),
            backend: None,
        }
    }

    /// Id the controller will be registered under.
    #[must_use]
    pub fn id(&self) -> ControllerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn controller_type(&self) -> ControllerType {
        self.controller_type
    }

    /// Controls declared so far.
    #[must_use]
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Declares a control with an explicit initial state and direction.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateControl` if the name is already taken.
    pub fn add_control(
        &mut self,
        name: &str,
        description: &str,
        initial: ControlState,
        is_input: bool,
    ) -> Result<Control> {
        if self.controls_by_name.contains_key(name) {
            return Err(RouterError::DuplicateControl {
                controller: self.name.clone(),
                control: name.to_string(),
            });
        }
        let index = self.controls.len();
        let control = Control::new(
            ControlId::new(self.id, index),
            name,
            description,
            initial,
            is_input,
            self.controller_type,
            self.queue.clone(),
        );
        self.controls.push(control.clone());
        self.controls_by_name.insert(name.to_string(), index);
        Ok(control)
    }

    /// Declares an axis input control.
    pub fn add_axis(&mut self, name: &str, description: &str, relative: bool) -> Result<Axis> {
        let initial = ControlState::Axis(AxisState {
            value: 0.0,
            relative,
        });
        let control = self.add_control(name, description, initial, true)?;
        Ok(Axis::from_control(control))
    }

    /// Declares a button input control.
    pub fn add_button(
        &mut self,
        name: &str,
        description: &str,
        character: Option<char>,
    ) -> Result<Button> {
        let initial = ControlState::Button(ButtonState {
            character,
            ..ButtonState::default()
        });
        let control = self.add_control(name, description, initial, true)?;
        Ok(Button::from_control(control))
    }

    /// Declares an LED output control.
    pub fn add_led(&mut self, name: &str, description: &str) -> Result<Control> {
        self.add_control(name, description, ControlState::Led(false), false)
    }

    /// Declares an effect output control (rumble, force feedback).
    pub fn add_effect(&mut self, name: &str, description: &str) -> Result<Control> {
        self.add_control(name, description, ControlState::Effect(0.0), false)
    }

    /// Attaches the device backend serviced once per frame.
    pub fn set_backend(&mut self, backend: Box<dyn DeviceBackend>) {
        self.backend = Some(backend);
    }

    pub(crate) fn build(self) -> Controller {
        Controller {
            id: self.id,
            name: self.name,
            description: self.description,
            controller_type: self.controller_type,
            active: true,
            changed: false,
            last_hit_char: None,
            controls: self.controls,
            controls_by_name: self.controls_by_name,
            connections: Vec::new(),
            backend: self.backend,
            confirmed: true,
            on_control: Signal::new(),
            on_activate: Signal::new(),
            on_changed: Signal::new(),
        }
    }
}

impl fmt::Debug for ControllerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("controller_type", &self.controller_type)
            .field("controls", &self.controls.len())
            .finish_non_exhaustive()
    }
}
