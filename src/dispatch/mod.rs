//! # Dispatch Module
//!
//! The [`Dispatcher`] coordinates every controller, device, provider and
//! connection, and drains the dirty-control queue once per frame.
//!
//! This module handles:
//! - Controller registration and teardown
//! - Device lookup by name (`Keyboard`, `Mouse`, ...)
//! - Provider reconciliation (`detect_devices`)
//! - Connection wiring (`connect`, `connect_all`, `disconnect`)
//! - Per-frame fan-out (`update`)
//!
//! ## Threading
//!
//! The graph is owned by the dispatcher and only mutated through
//! `&mut Dispatcher`, which keeps topology changes on the frame thread.
//! Other threads interact only through [`DirtyQueue`] handles (held by every
//! control) to mark controls dirty.
//!
//! ## Usage
//!
//! ```
//! use input_router::dispatch::Dispatcher;
//! use input_router::routing::controller::ControllerType;
//!
//! let mut dispatcher = Dispatcher::new();
//!
//! let mut pad = dispatcher.controller_builder("Pad", "Game pad", ControllerType::Device);
//! let fire = pad.add_button("Fire", "Trigger", None)?;
//! dispatcher.add_controller(pad)?;
//!
//! let mut game = dispatcher.controller_builder("Game", "Actions", ControllerType::Virtual);
//! let shoot = game.add_button("Shoot", "Shoot", None)?;
//! let game = dispatcher.add_controller(game)?;
//!
//! dispatcher.connect(game, "Shoot", fire.control(), 1.0)?;
//!
//! fire.set_pressed(true);
//! dispatcher.update();
//! assert!(shoot.is_pressed());
//! # Ok::<(), input_router::error::RouterError>(())
//! ```

pub mod frame;
pub mod queue;
pub mod wiring;

pub use frame::FrameStats;
pub use queue::DirtyQueue;

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::control::{Control, ControlId};
use crate::device::{standard, DeviceProvider, DeviceScan, ProviderEntry};
use crate::error::{Result, RouterError};
use crate::routing::connection::{Connection, ConnectionId};
use crate::routing::controller::{Controller, ControllerBuilder, ControllerId, ControllerType};

/// Owner of the routing graph and the per-frame entry point.
///
/// One dispatcher is created by the application's startup sequence and
/// passed by reference to whatever needs to build or read the graph.
#[derive(Debug, Default)]
pub struct Dispatcher {
    queue: DirtyQueue,
    next_controller_id: u64,
    next_connection_id: u64,
    controllers: BTreeMap<ControllerId, Controller>,
    devices: Vec<ControllerId>,
    devices_by_name: HashMap<String, ControllerId>,
    connections: HashMap<ConnectionId, Connection>,
    providers: Vec<ProviderEntry>,
}

impl Dispatcher {
    /// Creates an empty dispatcher with no providers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher, registers the providers and runs the initial
    /// device detection.
    #[must_use]
    pub fn with_providers(providers: Vec<Box<dyn DeviceProvider>>) -> Self {
        let mut dispatcher = Self::new();
        for provider in providers {
            dispatcher.providers.push(ProviderEntry::new(provider));
        }
        dispatcher.detect_devices(false);
        dispatcher
    }

    // ==================== Controllers ====================

    /// Starts declaring a controller. The id is reserved immediately.
    pub fn controller_builder(
        &mut self,
        name: &str,
        description: &str,
        controller_type: ControllerType,
    ) -> ControllerBuilder {
        let id = ControllerId(self.next_controller_id);
        self.next_controller_id += 1;
        ControllerBuilder::new(id, name, description, controller_type, self.queue.clone())
    }

    /// Registers a declared controller.
    ///
    /// Devices are also indexed by name.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDevice` if a device with the same name exists.
    pub fn add_controller(&mut self, builder: ControllerBuilder) -> Result<ControllerId> {
        let controller = builder.build();
        let id = controller.id();
        if controller.is_device() {
            if self.devices_by_name.contains_key(controller.name()) {
                return Err(RouterError::DuplicateDevice(controller.name().to_string()));
            }
            self.devices_by_name.insert(controller.name().to_string(), id);
            self.devices.push(id);
        }
        debug!(
            "Registered controller '{}' ({:?}, {} controls)",
            controller.name(),
            controller.controller_type(),
            controller.num_controls()
        );
        self.controllers.insert(id, controller);
        Ok(id)
    }

    /// Removes a controller with all of its controls and connections.
    ///
    /// Returns false if no such controller is registered.
    pub fn remove_controller(&mut self, id: ControllerId) -> bool {
        if !self.controllers.contains_key(&id) {
            return false;
        }

        // Disconnect from the front until the list is empty
        while let Some(&first) = self
            .controllers
            .get(&id)
            .and_then(|controller| controller.connections().first())
        {
            if !self.disconnect(id, first) {
                if let Some(controller) = self.controllers.get_mut(&id) {
                    controller.remove_connection(first);
                }
            }
        }

        self.queue.remove_controller(id);

        let Some(controller) = self.controllers.remove(&id) else {
            return false;
        };
        if controller.is_device() {
            self.devices.retain(|device| *device != id);
            if self.devices_by_name.get(controller.name()) == Some(&id) {
                self.devices_by_name.remove(controller.name());
            }
            for entry in &mut self.providers {
                entry.devices.retain(|device| *device != id);
            }
            info!("Device '{}' removed", controller.name());
        } else {
            debug!("Controller '{}' removed", controller.name());
        }
        true
    }

    #[must_use]
    pub fn controller(&self, id: ControllerId) -> Option<&Controller> {
        self.controllers.get(&id)
    }

    pub fn controller_mut(&mut self, id: ControllerId) -> Option<&mut Controller> {
        self.controllers.get_mut(&id)
    }

    /// All controllers in registration order.
    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.values()
    }

    /// Finds the first controller with the given name.
    #[must_use]
    pub fn find_controller(&self, name: &str) -> Option<ControllerId> {
        self.controllers
            .values()
            .find(|controller| controller.name() == name)
            .map(Controller::id)
    }

    /// Resolves a control id. Returns `None` for stale ids.
    #[must_use]
    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.controllers
            .get(&id.controller())
            .and_then(|controller| controller.control_by_id(id))
    }

    /// Looks up a control by controller id and name.
    #[must_use]
    pub fn find_control(&self, controller: ControllerId, name: &str) -> Option<&Control> {
        self.controllers
            .get(&controller)
            .and_then(|controller| controller.get_control(name))
    }

    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    #[must_use]
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    // ==================== Devices ====================

    /// All registered devices in registration order.
    pub fn devices(&self) -> impl Iterator<Item = &Controller> {
        self.devices
            .iter()
            .filter_map(|id| self.controllers.get(id))
    }

    #[must_use]
    pub fn get_device(&self, name: &str) -> Option<&Controller> {
        self.devices_by_name
            .get(name)
            .and_then(|id| self.controllers.get(id))
    }

    #[must_use]
    pub fn get_keyboard(&self) -> Option<&Controller> {
        self.get_device(standard::KEYBOARD)
    }

    #[must_use]
    pub fn get_mouse(&self) -> Option<&Controller> {
        self.get_device(standard::MOUSE)
    }

    // ==================== Providers ====================

    /// Registers a provider without scanning. Call `detect_devices` after.
    pub fn add_device_provider(&mut self, provider: Box<dyn DeviceProvider>) {
        self.providers.push(ProviderEntry::new(provider));
    }

    #[must_use]
    pub fn get_device_provider(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|entry| entry.name() == name)
    }

    /// Reconciles the devices of every provider.
    ///
    /// With `reset`, all provider-owned devices are removed first and
    /// rediscovered from scratch.
    pub fn detect_devices(&mut self, reset: bool) {
        for slot in 0..self.providers.len() {
            self.detect_provider_devices(slot, reset);
        }
    }

    fn detect_provider_devices(&mut self, slot: usize, reset: bool) {
        if reset {
            let owned = std::mem::take(&mut self.providers[slot].devices);
            for id in owned {
                self.remove_controller(id);
            }
        }

        for id in &self.providers[slot].devices {
            if let Some(device) = self.controllers.get_mut(id) {
                device.confirmed = false;
            }
        }

        let Some(mut provider) = self.providers[slot].provider.take() else {
            return;
        };
        {
            let mut scan = DeviceScan::new(self, slot);
            provider.query_devices(&mut scan);
        }
        self.providers[slot].provider = Some(provider);

        let stale: Vec<ControllerId> = self.providers[slot]
            .devices
            .iter()
            .copied()
            .filter(|id| {
                self.controllers
                    .get(id)
                    .map_or(true, |device| !device.confirmed)
            })
            .collect();
        for id in stale {
            self.remove_controller(id);
            self.providers[slot].devices.retain(|device| *device != id);
        }

        debug!(
            "Provider '{}' owns {} device(s)",
            self.providers[slot].name(),
            self.providers[slot].devices.len()
        );
    }

    pub(crate) fn provider_devices(&self, slot: usize) -> &[ControllerId] {
        &self.providers[slot].devices
    }

    pub(crate) fn provider_devices_mut(&mut self, slot: usize) -> &mut Vec<ControllerId> {
        &mut self.providers[slot].devices
    }

    // ==================== Dirty Queue ====================

    /// Returns a handle to the dirty queue, usable from any thread.
    #[must_use]
    pub fn queue(&self) -> DirtyQueue {
        self.queue.clone()
    }

    /// Marks a control dirty. Safe to call concurrently with `update`.
    pub fn update_control(&self, id: ControlId) -> bool {
        self.queue.mark(id)
    }

    /// Drops a control from the dirty queue if present.
    pub fn remove_control(&self, id: ControlId) -> bool {
        self.queue.remove(id)
    }
}
