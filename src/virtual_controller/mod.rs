//! # Virtual Controllers
//!
//! Application-side controllers with no physical backing. A
//! [`VirtualLayout`] declares the controls of the controller and wires them
//! to devices once, when the controller is added to the dispatcher.

pub mod standard;

pub use standard::StandardController;

use tracing::info;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::routing::controller::{ControllerBuilder, ControllerId, ControllerType};

/// Declares a virtual controller.
pub trait VirtualLayout {
    /// Controller name.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Declares every control of the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if a control cannot be declared (duplicate name).
    fn declare_controls(&self, builder: &mut ControllerBuilder) -> Result<()>;

    /// Wires the registered controller to devices. Runs once after
    /// registration. Wiring is best effort.
    fn connect_to_devices(&self, dispatcher: &mut Dispatcher, controller: ControllerId) {
        let _ = (dispatcher, controller);
    }
}

impl Dispatcher {
    /// Builds, registers and wires a virtual controller.
    ///
    /// # Errors
    ///
    /// Returns the error of [`VirtualLayout::declare_controls`].
    pub fn add_virtual_controller(&mut self, layout: &dyn VirtualLayout) -> Result<ControllerId> {
        let mut builder =
            self.controller_builder(layout.name(), layout.description(), ControllerType::Virtual);
        layout.declare_controls(&mut builder)?;
        let id = self.add_controller(builder)?;
        layout.connect_to_devices(self, id);

        if let Some(controller) = self.controller(id) {
            info!(
                "Virtual controller '{}' ready: {} controls, {} connections",
                controller.name(),
                controller.num_controls(),
                controller.get_num_of_connections()
            );
        }
        Ok(id)
    }
}
