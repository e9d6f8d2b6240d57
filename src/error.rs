// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Error taxonomy for the automation core.
//!
//! Decode failures are always local to the subscriber loop and never
//! propagate past it. Validation failures propagate to whichever caller
//! issued the setpoint write. Transport failures are retried inside the
//! subscriber loop and never crash the process.

use thiserror::Error;

/// Failure to turn a raw bus message into a typed sensor event.
///
/// All variants are non-fatal: the message is dropped with a log line and
/// the subscriber loop continues with the next one.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Topic has fewer than four `/`-separated segments.
    #[error("malformed topic: {0}")]
    MalformedTopic(String),

    /// Payload is not a valid JSON object of the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Topic names a sensor type the core does not know about.
    #[error("unknown sensor type: {0}")]
    UnknownSensorType(String),
}

/// A setpoint write violated the device-type-specific bounds.
///
/// The write is rejected atomically; the previously stored setpoint is
/// left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable description of the violated bound.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Setpoint bounds violated; the stored state is unchanged.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A setpoint write referenced a device id that does not exist.
    #[error("device {0} not found")]
    UnknownDevice(i64),

    /// Storage-layer failure. Surfaced to API-path callers, logged and
    /// swallowed on the bus path where there is no caller to respond to.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem failure while opening the database.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
