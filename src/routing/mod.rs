//! # Routing Module
//!
//! Controllers, the connections between their controls, and the signals
//! they fire.
//!
//! This module handles:
//! - Declaring controllers and their named controls
//! - Validating control-to-control connections
//! - Forward and backward value propagation
//! - Observer notifications for control, activation and change events

pub mod connection;
pub mod controller;
pub mod signal;
