// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! RoomHub - Hotel Room Automation Backend
//!
//! An event-driven backend for hotel room automation:
//! - MQTT ingestion of IAQ and occupancy sensor messages
//! - Idempotent per-room time-series persistence in SQLite
//! - Occupancy derivation and rule-based device automation
//! - Structured command dispatch over the store and the bus
//! - Demo mode with simulated per-room sensor producers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      RoomHub Engine                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────┐   ┌─────────┐   ┌────────────┐   ┌────────┐  │
//! │  │ Bus    │ → │ Event   │ → │ Reading    │ → │ Rule   │  │
//! │  │ Sub    │   │ Decoder │   │ Store      │   │ Engine │  │
//! │  └────────┘   └─────────┘   └────────────┘   └────────┘  │
//! │       ↑                           ↑               ↓      │
//! │  ┌────────┐                 ┌──────────┐   ┌──────────┐  │
//! │  │ Demo   │                 │ Command  │   │ Device   │  │
//! │  │ Rooms  │                 │ Dispatch │   │ State    │  │
//! │  └────────┘                 └──────────┘   └──────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod automation;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod model;
pub mod simulator;
pub mod store;

// Re-exports for convenience
pub use automation::{apply_policy, derive_occupancy, optimize_room};
pub use command::{Command, Dispatcher};
pub use config::Config;
pub use error::{DecodeError, StoreError, ValidationError};
pub use events::{decode, SensorEvent, SensorKind};
pub use ingest::Subscriber;
pub use store::Database;

/// RoomHub version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RoomHub name
pub const NAME: &str = "RoomHub";
