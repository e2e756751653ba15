//! # Connection Wiring
//!
//! Creating and removing connections between controllers.
//!
//! Every registered connection lives in the dispatcher's registry and is
//! referenced by id from the connection lists of both endpoint
//! controllers. Registration and removal always touch both lists.

use tracing::{debug, warn};

use super::Dispatcher;
use crate::control::Control;
use crate::error::{Result, RouterError};
use crate::routing::connection::{Connection, ConnectionId, ConnectionRejection};
use crate::routing::controller::ControllerId;

impl Dispatcher {
    /// Connects `input` to the control named `output_name` on `controller`.
    ///
    /// If the same pair is already linked, the existing connection id is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `UnknownController` / `UnknownControl` if the output cannot be found
    /// - `SameController` if both ends belong to `controller`
    /// - `InvalidConnection` if the pair fails the validity check
    pub fn connect(
        &mut self,
        controller: ControllerId,
        output_name: &str,
        input: &Control,
        scale: f32,
    ) -> Result<ConnectionId> {
        self.try_connect(controller, output_name, input, scale)
            .map_err(|e| {
                warn!(
                    "Cannot connect '{}' -> '{}' on controller {}: {}",
                    input.name(),
                    output_name,
                    controller,
                    e
                );
                e
            })
    }

    /// Connects every control of `other` whose name starts with `prefix_in`
    /// to the control named `prefix_out + rest` on `controller`.
    ///
    /// Best effort: pairs that cannot be wired are skipped. Returns the
    /// number of connections made.
    pub fn connect_all(
        &mut self,
        controller: ControllerId,
        other: ControllerId,
        prefix_out: &str,
        prefix_in: &str,
    ) -> usize {
        let Some(inputs) = self
            .controllers
            .get(&other)
            .map(|other| other.controls().to_vec())
        else {
            debug!("connect_all: controller {} not found", other);
            return 0;
        };

        let mut wired = 0;
        for input in &inputs {
            let Some(rest) = input.name().strip_prefix(prefix_in) else {
                continue;
            };
            let output_name = format!("{}{}", prefix_out, rest);
            match self.try_connect(controller, &output_name, input, 1.0) {
                Ok(_) => wired += 1,
                Err(e) => debug!("connect_all: skipped '{}': {}", input.name(), e),
            }
        }
        debug!(
            "connect_all: wired {} of {} control(s) from controller {}",
            wired,
            inputs.len(),
            other
        );
        wired
    }

    /// Removes a connection from both endpoint controllers and frees it.
    ///
    /// Returns false if `controller` does not take part in it.
    pub fn disconnect(&mut self, controller: ControllerId, connection: ConnectionId) -> bool {
        let listed = self
            .controllers
            .get(&controller)
            .is_some_and(|owner| owner.has_connection(connection));
        if !listed {
            return false;
        }
        let Some(removed) = self.connections.remove(&connection) else {
            return false;
        };

        for end in [removed.input().controller(), removed.output().controller()] {
            if let Some(endpoint) = self.controllers.get_mut(&end) {
                endpoint.remove_connection(connection);
            }
        }
        debug!(
            "Disconnected {} ('{}' -> '{}')",
            connection,
            removed.input().name(),
            removed.output().name()
        );
        true
    }

    fn try_connect(
        &mut self,
        controller: ControllerId,
        output_name: &str,
        input: &Control,
        scale: f32,
    ) -> Result<ConnectionId> {
        let owner = self
            .controllers
            .get(&controller)
            .ok_or(RouterError::UnknownController(controller))?;
        let output = owner
            .get_control(output_name)
            .cloned()
            .ok_or_else(|| RouterError::UnknownControl {
                controller: owner.name().to_string(),
                control: output_name.to_string(),
            })?;

        if output == *input {
            return Err(RouterError::InvalidConnection(ConnectionRejection::SelfLoop));
        }
        if input.controller() == controller {
            return Err(RouterError::SameController(owner.name().to_string()));
        }
        if !self.controllers.contains_key(&input.controller()) {
            return Err(RouterError::UnknownController(input.controller()));
        }

        if let Some(existing) = owner.connections().iter().copied().find(|id| {
            self.connections
                .get(id)
                .is_some_and(|connection| connection.links(input, &output))
        }) {
            return Ok(existing);
        }

        let connection = Connection::new(input.clone(), output, scale);
        if let Some(rejection) = connection.rejection() {
            return Err(RouterError::InvalidConnection(rejection));
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        for end in [controller, input.controller()] {
            if let Some(endpoint) = self.controllers.get_mut(&end) {
                endpoint.add_connection(id);
            }
        }
        debug!(
            "Connected {} ('{}' -> '{}', scale {})",
            id,
            input.name(),
            output_name,
            scale
        );
        self.connections.insert(id, connection);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Axis, Button};
    use crate::routing::controller::ControllerType;
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn add_buttons(
        dispatcher: &mut Dispatcher,
        name: &str,
        controller_type: ControllerType,
        buttons: &[&str],
    ) -> (ControllerId, Vec<Button>) {
        let mut builder = dispatcher.controller_builder(name, "", controller_type);
        let handles = buttons
            .iter()
            .map(|button| builder.add_button(button, "", None).unwrap())
            .collect();
        (dispatcher.add_controller(builder).unwrap(), handles)
    }

    fn add_axis(
        dispatcher: &mut Dispatcher,
        name: &str,
        controller_type: ControllerType,
        axis: &str,
    ) -> (ControllerId, Axis) {
        let mut builder = dispatcher.controller_builder(name, "", controller_type);
        let handle = builder.add_axis(axis, "", false).unwrap();
        (dispatcher.add_controller(builder).unwrap(), handle)
    }

    fn connections(dispatcher: &Dispatcher, id: ControllerId) -> usize {
        dispatcher.controller(id).unwrap().get_num_of_connections()
    }

    // ==================== Connect Tests ====================

    #[test]
    fn test_end_to_end_device_to_virtual() {
        let mut dispatcher = Dispatcher::new();
        let (device, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, shoot) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);
        let fire = &fire[0];
        let shoot = &shoot[0];

        // Device controls are never sinks
        let result = dispatcher.connect(device, "Fire", shoot.control(), 1.0);
        assert!(matches!(
            result,
            Err(RouterError::InvalidConnection(ConnectionRejection::DeviceSink))
        ));
        assert_eq!(connections(&dispatcher, device), 0);
        assert_eq!(connections(&dispatcher, game), 0);
        assert_eq!(dispatcher.num_connections(), 0);

        dispatcher.connect(game, "Shoot", fire.control(), 1.0).unwrap();
        fire.set_pressed(true);
        let stats = dispatcher.update();

        assert!(shoot.is_pressed());
        assert!(shoot.is_hit());
        assert_eq!(stats.informed, 2);
        assert_eq!(stats.propagated, 1);
        assert!(dispatcher.controller(game).unwrap().is_changed());
    }

    #[test]
    fn test_connection_registered_on_both_ends() {
        let mut dispatcher = Dispatcher::new();
        let (device, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, _) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);

        let id = dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();

        assert!(dispatcher.controller(device).unwrap().has_connection(id));
        assert!(dispatcher.controller(game).unwrap().has_connection(id));
        let connection = dispatcher.connection(id).unwrap();
        assert_eq!(connection.input(), fire[0].control());
        assert_eq!(connection.output().name(), "Shoot");
    }

    #[test]
    fn test_duplicate_connect_returns_existing() {
        let mut dispatcher = Dispatcher::new();
        let (device, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, _) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);

        let first = dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();
        let second = dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();

        assert_eq!(first, second);
        assert_eq!(connections(&dispatcher, device), 1);
        assert_eq!(dispatcher.num_connections(), 1);
    }

    #[test]
    fn test_connect_errors() {
        let mut dispatcher = Dispatcher::new();
        let (device, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, shoot) =
            add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot", "Aim"]);
        let (_, stick) = add_axis(&mut dispatcher, "Stick", ControllerType::Device, "X");

        assert!(matches!(
            dispatcher.connect(game, "Missing", fire[0].control(), 1.0),
            Err(RouterError::UnknownControl { .. })
        ));
        assert!(matches!(
            dispatcher.connect(ControllerId(99), "Shoot", fire[0].control(), 1.0),
            Err(RouterError::UnknownController(_))
        ));
        assert!(matches!(
            dispatcher.connect(game, "Shoot", shoot[0].control(), 1.0),
            Err(RouterError::InvalidConnection(ConnectionRejection::SelfLoop))
        ));
        assert!(matches!(
            dispatcher.connect(game, "Aim", shoot[0].control(), 1.0),
            Err(RouterError::SameController(_))
        ));
        assert!(matches!(
            dispatcher.connect(game, "Shoot", stick.control(), 1.0),
            Err(RouterError::InvalidConnection(
                ConnectionRejection::TypeMismatch { .. }
            ))
        ));
        assert_eq!(connections(&dispatcher, device), 0);
        assert_eq!(connections(&dispatcher, game), 0);
    }

    #[test]
    fn test_axis_scale_applied_through_update() {
        let mut dispatcher = Dispatcher::new();
        let (_, stick) = add_axis(&mut dispatcher, "Stick", ControllerType::Device, "X");
        let (game, steer) = add_axis(&mut dispatcher, "Game", ControllerType::Virtual, "Steer");

        dispatcher.connect(game, "Steer", stick.control(), 0.5).unwrap();
        stick.set_value(2.0, false);
        dispatcher.update();

        assert_eq!(steer.value(), 1.0);
        assert!(!steer.is_relative_value());
    }

    // ==================== Connect All Tests ====================

    #[test]
    fn test_connect_all_with_prefixes() {
        let mut dispatcher = Dispatcher::new();
        let (keyboard, _) = add_buttons(
            &mut dispatcher,
            "Keyboard",
            ControllerType::Device,
            &["W", "A", "Space"],
        );
        let (game, _) = add_buttons(
            &mut dispatcher,
            "Game",
            ControllerType::Virtual,
            &["KeyW", "KeyA"],
        );

        // Space has no KeySpace counterpart and is skipped
        assert_eq!(dispatcher.connect_all(game, keyboard, "Key", ""), 2);
        assert_eq!(connections(&dispatcher, keyboard), 2);
        assert_eq!(connections(&dispatcher, game), 2);
    }

    #[test]
    fn test_connect_all_strips_input_prefix() {
        let mut dispatcher = Dispatcher::new();
        let (pad, _) = add_buttons(
            &mut dispatcher,
            "Pad",
            ControllerType::Device,
            &["BtnA", "BtnB", "Start"],
        );
        let (game, _) = add_buttons(
            &mut dispatcher,
            "Game",
            ControllerType::Virtual,
            &["PadA", "PadB", "PadStart"],
        );

        assert_eq!(dispatcher.connect_all(game, pad, "Pad", "Btn"), 2);
        assert_eq!(dispatcher.connect_all(ControllerId(42), pad, "", ""), 0);
        assert_eq!(dispatcher.connect_all(game, ControllerId(42), "", ""), 0);
    }

    // ==================== Disconnect Tests ====================

    #[test]
    fn test_disconnect_removes_both_ends() {
        let mut dispatcher = Dispatcher::new();
        let (device, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, shoot) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);
        let id = dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();

        assert!(dispatcher.disconnect(device, id));
        assert!(!dispatcher.disconnect(device, id));
        assert!(!dispatcher.disconnect(game, id));
        assert_eq!(connections(&dispatcher, device), 0);
        assert_eq!(connections(&dispatcher, game), 0);
        assert!(dispatcher.connection(id).is_none());

        fire[0].set_pressed(true);
        dispatcher.update();
        assert!(!shoot[0].is_pressed());
    }

    #[test]
    fn test_disconnect_requires_membership() {
        let mut dispatcher = Dispatcher::new();
        let (_, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, _) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);
        let (other, _) = add_buttons(&mut dispatcher, "Other", ControllerType::Virtual, &["X"]);
        let id = dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();

        assert!(!dispatcher.disconnect(other, id));
        assert!(dispatcher.connection(id).is_some());
    }

    #[test]
    fn test_remove_controller_tears_down_connections() {
        let mut dispatcher = Dispatcher::new();
        let (device, buttons) = add_buttons(
            &mut dispatcher,
            "Keyboard",
            ControllerType::Device,
            &["W", "A", "S", "D"],
        );
        let (game, _) = add_buttons(
            &mut dispatcher,
            "Game",
            ControllerType::Virtual,
            &["KeyW", "KeyA", "KeyS", "KeyD"],
        );
        assert_eq!(dispatcher.connect_all(game, device, "Key", ""), 4);

        buttons[0].set_pressed(true);
        assert!(dispatcher.remove_controller(device));

        assert_eq!(connections(&dispatcher, game), 0);
        assert_eq!(dispatcher.num_connections(), 0);
        assert!(dispatcher.queue().is_empty());
    }

    // ==================== Propagation Tests ====================

    #[test]
    fn test_inactive_output_controller_receives_nothing() {
        let mut dispatcher = Dispatcher::new();
        let (_, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, shoot) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);
        dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();
        dispatcher.controller_mut(game).unwrap().set_active(false);

        fire[0].set_pressed(true);
        let stats = dispatcher.update();

        assert!(!shoot[0].is_pressed());
        assert_eq!(stats.propagated, 0);

        // Re-activating does not replay the missed event
        dispatcher.controller_mut(game).unwrap().set_active(true);
        dispatcher.update();
        assert!(!shoot[0].is_pressed());
    }

    #[test]
    fn test_chain_propagates_in_same_pass() {
        let mut dispatcher = Dispatcher::new();
        let (_, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (middle, relay) =
            add_buttons(&mut dispatcher, "Middle", ControllerType::Virtual, &["Relay"]);
        let (game, shoot) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);
        dispatcher.connect(middle, "Relay", fire[0].control(), 1.0).unwrap();
        dispatcher.connect(game, "Shoot", relay[0].control(), 1.0).unwrap();

        fire[0].set_pressed(true);
        let stats = dispatcher.update();

        assert!(relay[0].is_pressed());
        assert!(shoot[0].is_pressed());
        assert_eq!(stats.informed, 3);
        assert!(dispatcher.queue().is_empty());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut dispatcher = Dispatcher::new();
        let (a, left) = add_buttons(&mut dispatcher, "A", ControllerType::Virtual, &["Ping"]);
        let (b, right) = add_buttons(&mut dispatcher, "B", ControllerType::Virtual, &["Pong"]);
        dispatcher.connect(b, "Pong", left[0].control(), 1.0).unwrap();
        dispatcher.connect(a, "Ping", right[0].control(), 1.0).unwrap();

        left[0].set_pressed(true);
        let stats = dispatcher.update();

        assert!(right[0].is_pressed());
        assert_eq!(stats.informed, 2);
    }

    #[test]
    fn test_fan_in_from_two_keys() {
        let mut dispatcher = Dispatcher::new();
        let (keyboard, keys) =
            add_buttons(&mut dispatcher, "Keyboard", ControllerType::Device, &["W", "Up"]);
        let (game, forward) =
            add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Forward"]);
        dispatcher.connect(game, "Forward", keys[0].control(), 1.0).unwrap();
        dispatcher.connect(game, "Forward", keys[1].control(), 1.0).unwrap();
        assert_eq!(connections(&dispatcher, game), 2);
        assert_eq!(connections(&dispatcher, keyboard), 2);

        keys[1].set_pressed(true);
        dispatcher.update();
        assert!(forward[0].is_pressed());
    }

    #[test]
    fn test_fan_in_chain_carries_latest_value() {
        let mut dispatcher = Dispatcher::new();
        let (_, a) = add_axis(&mut dispatcher, "PadA", ControllerType::Device, "A");
        let (_, b) = add_axis(&mut dispatcher, "PadB", ControllerType::Device, "B");
        let (mid, m) = add_axis(&mut dispatcher, "Mid", ControllerType::Virtual, "M");
        let (game, g) = add_axis(&mut dispatcher, "Game", ControllerType::Virtual, "G");
        dispatcher.connect(mid, "M", a.control(), 1.0).unwrap();
        dispatcher.connect(mid, "M", b.control(), 1.0).unwrap();
        dispatcher.connect(game, "G", m.control(), 1.0).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher
            .controller_mut(game)
            .unwrap()
            .on_control()
            .connect(move |control| {
                let value = control.as_axis().map_or(0.0, |axis| axis.value());
                sink.lock().unwrap().push(value);
            });

        a.set_value(1.0, false);
        b.set_value(2.0, false);
        dispatcher.update();

        assert_eq!(m.value(), 2.0);
        assert_eq!(g.value(), 2.0);
        assert_eq!(seen.lock().unwrap().last().copied(), Some(2.0));
    }

    #[test]
    fn test_cycle_closing_hop_is_not_taken() {
        let mut dispatcher = Dispatcher::new();
        let (_, input) = add_axis(&mut dispatcher, "Pad", ControllerType::Device, "X");
        let (left, l) = add_axis(&mut dispatcher, "Left", ControllerType::Virtual, "L");
        let (right, r) = add_axis(&mut dispatcher, "Right", ControllerType::Virtual, "R");
        dispatcher.connect(left, "L", input.control(), 1.0).unwrap();
        dispatcher.connect(right, "R", l.control(), 2.0).unwrap();
        dispatcher.connect(left, "L", r.control(), 1.0).unwrap();

        input.set_value(1.0, false);
        let stats = dispatcher.update();

        // R -> L closes the loop and is not taken
        assert_eq!(l.value(), 1.0);
        assert_eq!(r.value(), 2.0);
        assert_eq!(stats.informed, 3);
    }

    #[test]
    fn test_output_on_control_signal_sees_propagated_value() {
        let mut dispatcher = Dispatcher::new();
        let (_, fire) = add_buttons(&mut dispatcher, "Pad", ControllerType::Device, &["Fire"]);
        let (game, _) = add_buttons(&mut dispatcher, "Game", ControllerType::Virtual, &["Shoot"]);
        dispatcher.connect(game, "Shoot", fire[0].control(), 1.0).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher
            .controller_mut(game)
            .unwrap()
            .on_control()
            .connect(move |control| {
                let pressed = control.as_button().is_some_and(|b| b.is_pressed());
                sink.lock().unwrap().push((control.name().to_string(), pressed));
            });

        fire[0].set_pressed(true);
        dispatcher.update();

        assert_eq!(*seen.lock().unwrap(), vec![("Shoot".to_string(), true)]);
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_producers_on_other_threads() {
        let mut dispatcher = Dispatcher::new();
        let mut builder = dispatcher.controller_builder("Pad", "", ControllerType::Device);
        let axes: Vec<Axis> = (0..4)
            .map(|i| builder.add_axis(&format!("Axis{}", i), "", false).unwrap())
            .collect();
        dispatcher.add_controller(builder).unwrap();

        let handles: Vec<_> = axes
            .iter()
            .cloned()
            .map(|axis| {
                thread::spawn(move || {
                    for step in 1..=100 {
                        axis.set_value(step as f32, false);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = dispatcher.update();
        assert_eq!(stats.dirty, 4);
        assert!(axes.iter().all(|axis| axis.value() == 100.0));
    }
}
