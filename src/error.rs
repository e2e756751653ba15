//! # Error Types
//!
//! Custom error types for Input Router using `thiserror`.

use thiserror::Error;

use crate::routing::connection::ConnectionRejection;
use crate::routing::controller::ControllerId;

/// Main error type for Input Router
#[derive(Debug, Error)]
pub enum RouterError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Control trace serialization errors
    #[error("Trace error: {0}")]
    Trace(#[from] serde_json::Error),

    /// No controller is registered under this id
    #[error("Unknown controller: {0}")]
    UnknownController(ControllerId),

    /// The controller has no control with this name
    #[error("Controller '{controller}' has no control named '{control}'")]
    UnknownControl { controller: String, control: String },

    /// A control with this name was already declared on the controller
    #[error("Controller '{controller}' already has a control named '{control}'")]
    DuplicateControl { controller: String, control: String },

    /// A device with this name is already registered
    #[error("Device already registered: {0}")]
    DuplicateDevice(String),

    /// Both endpoints of a requested connection live on the same controller
    #[error("Cannot connect '{0}' to a control of its own controller")]
    SameController(String),

    /// The connection failed its validity check
    #[error("Invalid connection: {0}")]
    InvalidConnection(ConnectionRejection),
}

/// Result type alias for Input Router
pub type Result<T> = std::result::Result<T, RouterError>;
