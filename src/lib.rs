//! # Input Router Library
//!
//! Routes physical device controls into application-level virtual
//! controllers.
//!
//! This library provides:
//! - Typed controls (buttons, axes, LEDs, effects) shared across threads
//! - Controllers and validated point-to-point connections between them
//! - Device providers with mark-and-sweep device reconciliation
//! - A dispatcher that drains dirty controls once per frame and fans the
//!   changes out through connections
//! - A standard keyboard/mouse virtual controller vocabulary

pub mod config;
pub mod control;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod routing;
pub mod runner;
pub mod trace;
pub mod virtual_controller;
