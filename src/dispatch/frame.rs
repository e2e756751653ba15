//! # Frame Drain
//!
//! Per-frame fan-out of the dirty queue.
//!
//! ## Drain order
//!
//! 1. Clear every controller's `changed` flag
//! 2. Swap the dirty queue out under its lock
//! 3. For each queued control in insertion order, inform its controller and
//!    follow connections depth-first within the same pass
//! 4. Fire `on_changed` for every changed controller
//! 5. Service every device backend once
//!
//! A control is informed again every time an incoming connection changes
//! it, so fan-in reaches downstream controls with the latest value. A hop
//! whose output is already on the current propagation path is not taken,
//! which terminates connection cycles. A control dirtied several times
//! between frames is queued once and seen with its latest value.

use tracing::trace;

use super::Dispatcher;
use crate::control::{Control, ControlId, ControlState};
use crate::routing::controller::ControllerId;

/// Counters for one [`Dispatcher::update`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Controls found in the dirty queue.
    pub dirty: usize,
    /// Controls informed, including those reached through connections.
    pub informed: usize,
    /// Connection hops that changed their output.
    pub propagated: usize,
}

impl FrameStats {
    /// Accumulates another frame into this one.
    pub fn merge(&mut self, other: FrameStats) {
        self.dirty += other.dirty;
        self.informed += other.informed;
        self.propagated += other.propagated;
    }
}

impl Dispatcher {
    /// Drains the dirty queue and fans changes out through connections.
    ///
    /// Must be called once per frame from the thread that owns the
    /// dispatcher. Producers on other threads may keep marking controls
    /// while this runs; those land in the next frame.
    pub fn update(&mut self) -> FrameStats {
        for controller in self.controllers.values_mut() {
            controller.changed = false;
        }

        let snapshot = self.queue.take();
        let mut stats = FrameStats {
            dirty: snapshot.len(),
            ..FrameStats::default()
        };

        let mut path: Vec<ControlId> = Vec::new();
        for id in snapshot {
            let mut pending = vec![(id, 0)];
            while let Some((current, depth)) = pending.pop() {
                path.truncate(depth);
                let Some(control) = self.control(current).cloned() else {
                    trace!("Skipping stale control {}", current);
                    continue;
                };
                path.push(current);
                let Some(outputs) = self.inform_control(&control, &path) else {
                    continue;
                };
                stats.informed += 1;
                stats.propagated += outputs.len();
                pending.extend(outputs.into_iter().rev().map(|output| (output, depth + 1)));
            }
        }

        for controller in self.controllers.values_mut() {
            if controller.changed {
                let id = controller.id();
                controller.on_changed.emit(&id);
            }
        }

        for id in &self.devices {
            if let Some(backend) = self
                .controllers
                .get_mut(id)
                .and_then(|device| device.backend.as_mut())
            {
                backend.update();
            }
        }

        if stats.dirty > 0 {
            trace!(
                "Frame: {} dirty, {} informed, {} propagated",
                stats.dirty,
                stats.informed,
                stats.propagated
            );
        }
        stats
    }

    /// Runs the controller-side state machine for one control.
    ///
    /// `path` holds the controls the current change travelled through,
    /// ending with `control`. Forward hops into a control on the path are
    /// skipped.
    ///
    /// Returns `None` if the owning controller is missing or inactive,
    /// otherwise the outputs whose value changed through forward
    /// propagation, in connection order.
    pub(crate) fn inform_control(
        &mut self,
        control: &Control,
        path: &[ControlId],
    ) -> Option<Vec<ControlId>> {
        // Consumed even while inactive so an old press is never replayed
        let pressed_now = control
            .as_button()
            .is_some_and(|button| button.take_press_edge());

        let connections = {
            let controller = self.controllers.get_mut(&control.controller())?;
            if !controller.is_active() {
                return None;
            }
            controller.changed = true;

            match control.state() {
                ControlState::Button(button) if pressed_now => {
                    if let Some(character) = button.character {
                        controller.last_hit_char = Some(character);
                    }
                }
                ControlState::Led(_) | ControlState::Effect(_) => {
                    if let Some(backend) = controller.backend.as_mut() {
                        backend.update_output_control(control);
                    }
                }
                _ => {}
            }

            controller.on_control.emit(control);
            controller.connections.clone()
        };

        let mut outputs = Vec::new();
        for id in connections {
            let Some(connection) = self.connections.get(&id) else {
                continue;
            };
            if *connection.input() == *control {
                let output = connection.output();
                if path.contains(&output.id()) {
                    trace!("Cycle at {}, hop {} not taken", output.id(), id);
                    continue;
                }
                if self.is_active(output.controller()) && connection.pass_value() {
                    outputs.push(output.id());
                }
            } else if *connection.output() == *control
                && self.is_active(connection.input().controller())
            {
                connection.pass_value_backwards();
            }
        }
        Some(outputs)
    }

    /// Returns true if the controller exists and is active.
    #[must_use]
    pub fn is_active(&self, id: ControllerId) -> bool {
        self.controllers
            .get(&id)
            .is_some_and(|controller| controller.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockDeviceBackend;
    use crate::routing::controller::ControllerType;
    use std::sync::{Arc, Mutex};

    fn controller_with_button(
        dispatcher: &mut Dispatcher,
        name: &str,
        controller_type: ControllerType,
        character: Option<char>,
    ) -> (ControllerId, crate::control::Button) {
        let mut builder = dispatcher.controller_builder(name, "", controller_type);
        let button = builder.add_button("Button", "", character).unwrap();
        let id = dispatcher.add_controller(builder).unwrap();
        (id, button)
    }

    // ==================== Drain Tests ====================

    #[test]
    fn test_update_on_empty_queue() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.update(), FrameStats::default());
    }

    #[test]
    fn test_update_sets_and_clears_changed() {
        let mut dispatcher = Dispatcher::new();
        let (pad, fire) =
            controller_with_button(&mut dispatcher, "Pad", ControllerType::Device, None);

        fire.set_pressed(true);
        let stats = dispatcher.update();
        assert_eq!(stats.dirty, 1);
        assert_eq!(stats.informed, 1);
        assert!(dispatcher.controller(pad).unwrap().is_changed());
        assert!(dispatcher.queue().is_empty());

        dispatcher.update();
        assert!(!dispatcher.controller(pad).unwrap().is_changed());
    }

    #[test]
    fn test_dirty_twice_is_informed_once() {
        let mut dispatcher = Dispatcher::new();
        let (pad, fire) =
            controller_with_button(&mut dispatcher, "Pad", ControllerType::Device, None);
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        dispatcher
            .controller_mut(pad)
            .unwrap()
            .on_control()
            .connect(move |_| *counter.lock().unwrap() += 1);

        fire.set_pressed(true);
        fire.set_pressed(false);
        fire.set_pressed(true);
        let stats = dispatcher.update();

        assert_eq!(stats.dirty, 1);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut dispatcher = Dispatcher::new();
        let mut builder = dispatcher.controller_builder("Pad", "", ControllerType::Device);
        let a = builder.add_button("A", "", None).unwrap();
        let b = builder.add_button("B", "", None).unwrap();
        let c = builder.add_button("C", "", None).unwrap();
        let pad = dispatcher.add_controller(builder).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher
            .controller_mut(pad)
            .unwrap()
            .on_control()
            .connect(move |control| sink.lock().unwrap().push(control.name().to_string()));

        c.set_pressed(true);
        a.set_pressed(true);
        b.set_pressed(true);
        dispatcher.update();

        assert_eq!(*seen.lock().unwrap(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_inactive_controller_ignores_its_controls() {
        let mut dispatcher = Dispatcher::new();
        let (pad, fire) =
            controller_with_button(&mut dispatcher, "Pad", ControllerType::Device, Some('f'));
        dispatcher.controller_mut(pad).unwrap().set_active(false);

        fire.set_pressed(true);
        let stats = dispatcher.update();

        assert_eq!(stats.informed, 0);
        let pad = dispatcher.controller(pad).unwrap();
        assert!(!pad.is_changed());
        assert_eq!(pad.get_char(), None);
    }

    #[test]
    fn test_hit_character_is_captured() {
        let mut dispatcher = Dispatcher::new();
        let (pad, key) =
            controller_with_button(&mut dispatcher, "Keys", ControllerType::Device, Some('q'));

        key.set_pressed(true);
        dispatcher.update();
        assert_eq!(dispatcher.controller(pad).unwrap().get_char(), Some('q'));
        assert_eq!(dispatcher.controller_mut(pad).unwrap().take_char(), Some('q'));
        assert_eq!(dispatcher.controller(pad).unwrap().get_char(), None);
    }

    #[test]
    fn test_release_keeps_last_pressed_character() {
        let mut dispatcher = Dispatcher::new();
        let mut builder = dispatcher.controller_builder("Keys", "", ControllerType::Device);
        let q = builder.add_button("Q", "", Some('q')).unwrap();
        let w = builder.add_button("W", "", Some('w')).unwrap();
        let keys = dispatcher.add_controller(builder).unwrap();

        q.set_pressed(true);
        dispatcher.update();
        w.set_pressed(true);
        dispatcher.update();
        assert_eq!(dispatcher.controller(keys).unwrap().get_char(), Some('w'));

        // Q still has its hit latch set, but releasing it is not a new press
        q.set_pressed(false);
        dispatcher.update();
        assert!(q.is_hit());
        assert_eq!(dispatcher.controller(keys).unwrap().get_char(), Some('w'));
    }

    #[test]
    fn test_press_while_inactive_is_not_replayed() {
        let mut dispatcher = Dispatcher::new();
        let (pad, key) =
            controller_with_button(&mut dispatcher, "Keys", ControllerType::Device, Some('q'));
        dispatcher.controller_mut(pad).unwrap().set_active(false);
        key.set_pressed(true);
        dispatcher.update();

        dispatcher.controller_mut(pad).unwrap().set_active(true);
        key.set_pressed(false);
        dispatcher.update();
        assert_eq!(dispatcher.controller(pad).unwrap().get_char(), None);
    }

    #[test]
    fn test_stale_control_is_skipped() {
        let mut dispatcher = Dispatcher::new();
        let (pad, fire) =
            controller_with_button(&mut dispatcher, "Pad", ControllerType::Device, None);
        let id = fire.control().id();
        dispatcher.remove_controller(pad);

        // A polling thread still holding the handle marks it after removal
        dispatcher.update_control(id);
        let stats = dispatcher.update();
        assert_eq!(stats.dirty, 1);
        assert_eq!(stats.informed, 0);
    }

    #[test]
    fn test_on_changed_fires_once_per_frame() {
        let mut dispatcher = Dispatcher::new();
        let mut builder = dispatcher.controller_builder("Pad", "", ControllerType::Device);
        let a = builder.add_button("A", "", None).unwrap();
        let b = builder.add_button("B", "", None).unwrap();
        let pad = dispatcher.add_controller(builder).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher
            .controller_mut(pad)
            .unwrap()
            .on_changed()
            .connect(move |id| sink.lock().unwrap().push(*id));

        a.set_pressed(true);
        b.set_pressed(true);
        dispatcher.update();
        dispatcher.update();

        assert_eq!(*seen.lock().unwrap(), vec![pad]);
    }

    // ==================== Backend Tests ====================

    #[test]
    fn test_backend_serviced_once_per_frame() {
        let mut dispatcher = Dispatcher::new();
        let mut backend = MockDeviceBackend::new();
        backend.expect_update().times(2).return_const(());
        backend.expect_update_output_control().never();

        let mut builder = dispatcher.controller_builder("Pad", "", ControllerType::Device);
        builder.add_button("Fire", "", None).unwrap();
        builder.set_backend(Box::new(backend));
        dispatcher.add_controller(builder).unwrap();

        dispatcher.update();
        dispatcher.update();
    }

    #[test]
    fn test_led_reaches_output_hook() {
        let mut dispatcher = Dispatcher::new();
        let mut backend = MockDeviceBackend::new();
        backend.expect_update().return_const(());
        backend
            .expect_update_output_control()
            .withf(|control| control.name() == "CapsLockLed" && control.led() == Some(true))
            .times(1)
            .return_const(());

        let mut builder = dispatcher.controller_builder("Keyboard", "", ControllerType::Device);
        let led = builder.add_led("CapsLockLed", "").unwrap();
        builder.set_backend(Box::new(backend));
        dispatcher.add_controller(builder).unwrap();

        led.set_led(true);
        dispatcher.update();
    }

    #[test]
    fn test_virtual_controllers_have_no_backend_calls() {
        let mut dispatcher = Dispatcher::new();
        let (_, shoot) =
            controller_with_button(&mut dispatcher, "Game", ControllerType::Virtual, None);
        shoot.set_pressed(true);
        let stats = dispatcher.update();
        assert_eq!(stats.informed, 1);
    }

    #[test]
    fn test_frame_stats_merge() {
        let mut total = FrameStats::default();
        total.merge(FrameStats {
            dirty: 2,
            informed: 3,
            propagated: 1,
        });
        total.merge(FrameStats {
            dirty: 1,
            informed: 1,
            propagated: 0,
        });
        assert_eq!(
            total,
            FrameStats {
                dirty: 3,
                informed: 4,
                propagated: 1
            }
        );
    }
}
