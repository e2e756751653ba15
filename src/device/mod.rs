//! # Device Module
//!
//! Physical devices and the providers that enumerate them.
//!
//! This module handles:
//! - The per-device polling backend ([`DeviceBackend`])
//! - Provider enumeration hooks ([`DeviceProvider`])
//! - Mark-and-sweep reconciliation of devices across rescans ([`DeviceScan`])
//! - Standard keyboard and mouse layouts
//! - A console-driven provider for manual input
//!
//! ## Reconciliation
//!
//! On every `detect_devices` pass the dispatcher marks all devices of a
//! provider unconfirmed, runs [`DeviceProvider::query_devices`], and removes
//! every device the provider did not confirm or re-add. Removing a device
//! tears down its controls and connections like any other controller.

pub mod console;
pub mod standard;

use tracing::{debug, info, warn};

use crate::control::Control;
use crate::dispatch::Dispatcher;
use crate::error::{Result, RouterError};
use crate::routing::controller::{ControllerBuilder, ControllerId, ControllerType};

/// Polling backend of a device.
///
/// Backends own clones of their device's controls and write new values
/// through the regular setters, which schedule the controls in the dirty
/// queue.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceBackend: Send {
    /// Called once per frame after the dirty queue has been drained.
    fn update(&mut self) {}

    /// Called when an LED or effect control of this device is informed.
    fn update_output_control(&mut self, control: &Control) {
        let _ = control;
    }
}

/// Enumerates one family of devices and owns their lifetime.
pub trait DeviceProvider: Send {
    /// Unique provider name.
    fn name(&self) -> &str;

    /// Reports the devices currently visible.
    ///
    /// Must call [`DeviceScan::check_device`] for every device it still sees
    /// and [`DeviceScan::add_device`] for newly discovered ones.
    fn query_devices(&mut self, scan: &mut DeviceScan<'_>);
}

/// Scan context handed to [`DeviceProvider::query_devices`].
pub struct DeviceScan<'a> {
    dispatcher: &'a mut Dispatcher,
    slot: usize,
}

impl<'a> DeviceScan<'a> {
    pub(crate) fn new(dispatcher: &'a mut Dispatcher, slot: usize) -> Self {
        Self { dispatcher, slot }
    }

    /// Confirms an existing device of this provider.
    ///
    /// Returns false if the provider owns no device with that name.
    pub fn check_device(&mut self, name: &str) -> bool {
        let Some(id) = self.owned_device(name) else {
            return false;
        };
        match self.dispatcher.controller_mut(id) {
            Some(device) => {
                device.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Starts declaring a new device.
    pub fn device_builder(&mut self, name: &str, description: &str) -> ControllerBuilder {
        self.dispatcher
            .controller_builder(name, description, ControllerType::Device)
    }

    /// Registers a new device with the dispatcher and this provider.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDevice` if a device with that name already exists.
    /// Providers should treat this as a skip.
    pub fn add_device(&mut self, builder: ControllerBuilder) -> Result<ControllerId> {
        if builder.controller_type() != ControllerType::Device {
            warn!(
                "Provider added '{}' which is not declared as a device",
                builder.name()
            );
        }
        if self.dispatcher.get_device(builder.name()).is_some() {
            return Err(RouterError::DuplicateDevice(builder.name().to_string()));
        }
        let name = builder.name().to_string();
        let id = self.dispatcher.add_controller(builder)?;
        self.dispatcher.provider_devices_mut(self.slot).push(id);
        info!("Device '{}' added", name);
        Ok(id)
    }

    /// Read access to the dispatcher during the scan.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &*self.dispatcher
    }

    fn owned_device(&self, name: &str) -> Option<ControllerId> {
        let id = self.dispatcher.get_device(name)?.id();
        let owned = self
            .dispatcher
            .provider_devices(self.slot)
            .contains(&id);
        if !owned {
            debug!("Device '{}' exists but belongs to another provider", name);
        }
        owned.then_some(id)
    }
}

/// A provider together with the devices it owns.
pub struct ProviderEntry {
    name: String,
    pub(crate) provider: Option<Box<dyn DeviceProvider>>,
    pub(crate) devices: Vec<ControllerId>,
}

impl ProviderEntry {
    pub(crate) fn new(provider: Box<dyn DeviceProvider>) -> Self {
        Self {
            name: provider.name().to_string(),
            provider: Some(provider),
            devices: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Devices currently owned by this provider.
    #[must_use]
    pub fn get_devices(&self) -> &[ControllerId] {
        &self.devices
    }
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Provider whose visible device names are controlled by the test.
    pub(crate) struct ScriptedProvider {
        pub(crate) visible: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(names: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let visible = Arc::new(Mutex::new(
                names.iter().map(|name| name.to_string()).collect(),
            ));
            (
                Self {
                    visible: Arc::clone(&visible),
                },
                visible,
            )
        }
    }

    impl DeviceProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn query_devices(&mut self, scan: &mut DeviceScan<'_>) {
            let names = self.visible.lock().unwrap().clone();
            for name in names {
                if scan.check_device(&name) {
                    continue;
                }
                let mut builder = scan.device_builder(&name, "scripted device");
                builder.add_button("Fire", "", None).unwrap();
                scan.add_device(builder).unwrap();
            }
        }
    }
}
