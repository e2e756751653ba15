//! # Control Trace Module
//!
//! Records every informed control of one controller as JSON lines.
//!
//! This module handles:
//! - Converting control state into serializable records
//! - Writing one JSON object per line with an RFC 3339 timestamp
//! - Hooking the writer onto a controller's `on_control` signal
//!
//! ## Record Format
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.000+02:00","controller":"Standard","control":"Forward","value":{"type":"button","pressed":true,"hit":true}}
//! {"timestamp":"2024-05-01T12:00:00.016+02:00","controller":"Standard","control":"LookX","value":{"type":"axis","value":2.0,"relative":true}}
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{Local, SecondsFormat};
use serde::Serialize;
use tracing::{info, warn};

use crate::control::{Control, ControlState};
use crate::dispatch::Dispatcher;
use crate::error::{Result, RouterError};
use crate::routing::controller::ControllerId;
use crate::routing::signal::SubscriptionId;

/// Serializable control value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceValue {
    Unknown,
    Button { pressed: bool, hit: bool },
    Axis { value: f32, relative: bool },
    Led { on: bool },
    Effect { level: f32 },
}

impl From<ControlState> for TraceValue {
    fn from(state: ControlState) -> Self {
        match state {
            ControlState::Unknown => TraceValue::Unknown,
            ControlState::Button(button) => TraceValue::Button {
                pressed: button.pressed,
                hit: button.hit,
            },
            ControlState::Axis(axis) => TraceValue::Axis {
                value: axis.value,
                relative: axis.relative,
            },
            ControlState::Led(on) => TraceValue::Led { on },
            ControlState::Effect(level) => TraceValue::Effect { level },
        }
    }
}

/// One line of the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlRecord {
    pub timestamp: String,
    pub controller: String,
    pub control: String,
    pub value: TraceValue,
}

impl ControlRecord {
    #[must_use]
    pub fn new(controller: &str, control: &Control) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            controller: controller.to_string(),
            control: control.name().to_string(),
            value: control.state().into(),
        }
    }
}

/// JSON-lines writer for control records.
#[derive(Debug)]
pub struct ControlTrace<W: Write + Send> {
    writer: W,
    controller: String,
    records: u64,
}

impl ControlTrace<BufWriter<File>> {
    /// Creates (or truncates) a trace file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, controller: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!("Tracing controller '{}' to {}", controller, path.display());
        Ok(Self::new(BufWriter::new(file), controller))
    }
}

impl<W: Write + Send> ControlTrace<W> {
    pub fn new(writer: W, controller: &str) -> Self {
        Self {
            writer,
            controller: controller.to_string(),
            records: 0,
        }
    }

    /// Writes one record and flushes.
    ///
    /// # Errors
    ///
    /// Returns `Trace` on serialization failure or `Io` on write failure.
    pub fn record(&mut self, control: &Control) -> Result<()> {
        let record = ControlRecord::new(&self.controller, control);
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Subscribes `trace` to the `on_control` signal of `controller`.
///
/// Write failures are logged and do not detach the trace.
///
/// # Errors
///
/// Returns `UnknownController` if the controller is not registered.
pub fn attach<W>(
    dispatcher: &mut Dispatcher,
    controller: ControllerId,
    mut trace: ControlTrace<W>,
) -> Result<SubscriptionId>
where
    W: Write + Send + 'static,
{
    let target = dispatcher
        .controller_mut(controller)
        .ok_or(RouterError::UnknownController(controller))?;
    Ok(target.on_control().connect(move |control| {
        if let Err(e) = trace.record(control) {
            warn!("Failed to write control trace: {}", e);
        }
    }))
}
