// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Persistent storage for rooms, readings, devices and policies.
//!
//! A single SQLite connection behind a mutex serializes all writes. The
//! read-merge-validate-write cycle of a setpoint update runs inside one
//! critical section, so concurrent partial updates to the same device
//! cannot lose each other's fields. "Latest reading" queries are not
//! transactionally consistent with concurrent writers; a slightly stale
//! latest is an accepted relaxation.

mod devices;
mod energy;
mod readings;
mod rooms;
pub mod validate;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::StoreError;

/// Outcome of a reading write: either a persisted row, or a no-op
/// because the referenced room is not provisioned yet.
///
/// Sensor data may arrive before room provisioning completes; the no-op
/// is success-without-persistence, never an error.
#[derive(Debug, Clone)]
pub enum WriteOutcome<T> {
    /// The reading was persisted.
    Stored(T),
    /// The room id did not resolve; nothing was written.
    UnknownRoom,
}

impl<T> WriteOutcome<T> {
    /// The stored value, if the write persisted anything.
    pub fn stored(self) -> Option<T> {
        match self {
            WriteOutcome::Stored(value) => Some(value),
            WriteOutcome::UnknownRoom => None,
        }
    }
}

/// Handle to the room-automation database.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the configured path.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        "#,
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_tables()?;

        info!("database opened at {:?}", config.path);
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests and suitable for
    /// ephemeral runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number TEXT NOT NULL,
                floor INTEGER NOT NULL,
                occupied INTEGER NOT NULL DEFAULT 0,
                last_cleaned TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(floor, number)
            );

            CREATE TABLE IF NOT EXISTS iaq_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id INTEGER NOT NULL REFERENCES rooms(id),
                timestamp TEXT NOT NULL,
                temperature REAL,
                humidity REAL,
                co2 REAL,
                tvoc REAL,
                pm25 REAL,
                noise REAL,
                illuminance REAL,
                online_status INTEGER NOT NULL DEFAULT 1,
                device_status TEXT NOT NULL DEFAULT 'operational'
            );

            CREATE INDEX IF NOT EXISTS idx_iaq_room_ts
                ON iaq_readings(room_id, timestamp);

            CREATE TABLE IF NOT EXISTS occupancy_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id INTEGER NOT NULL REFERENCES rooms(id),
                timestamp TEXT NOT NULL,
                presence_detected INTEGER NOT NULL DEFAULT 0,
                motion_level INTEGER NOT NULL DEFAULT 0,
                presence_state TEXT NOT NULL DEFAULT 'unoccupied',
                sensitivity REAL NOT NULL DEFAULT 0.5,
                online_status INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_occupancy_room_ts
                ON occupancy_readings(room_id, timestamp);

            CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id INTEGER NOT NULL REFERENCES rooms(id),
                device_type TEXT NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'OFF',
                UNIQUE(room_id, device_type)
            );

            CREATE TABLE IF NOT EXISTS ac_setpoints (
                device_id INTEGER PRIMARY KEY REFERENCES devices(id),
                temperature REAL NOT NULL DEFAULT 24.0,
                mode TEXT NOT NULL DEFAULT 'OFF',
                fan_speed INTEGER NOT NULL DEFAULT 1,
                humidity_control INTEGER NOT NULL DEFAULT 0,
                target_humidity INTEGER NOT NULL DEFAULT 50,
                updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS lighting_setpoints (
                device_id INTEGER PRIMARY KEY REFERENCES devices(id),
                brightness INTEGER NOT NULL DEFAULT 100,
                color_temperature INTEGER NOT NULL DEFAULT 2700,
                updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS automation_policies (
                room_id INTEGER PRIMARY KEY REFERENCES rooms(id),
                ac_auto_adjust INTEGER NOT NULL DEFAULT 1,
                lighting_auto_adjust INTEGER NOT NULL DEFAULT 1,
                presence_timeout INTEGER NOT NULL DEFAULT 15,
                comfort_temperature REAL NOT NULL DEFAULT 24.0,
                energy_saving_temperature REAL NOT NULL DEFAULT 26.0,
                last_presence_time TEXT
            );

            CREATE TABLE IF NOT EXISTS energy_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id INTEGER NOT NULL REFERENCES rooms(id),
                device_id INTEGER NOT NULL REFERENCES devices(id),
                timestamp TEXT NOT NULL,
                power_usage REAL NOT NULL,
                duration INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_energy_room_ts
                ON energy_records(room_id, timestamp);
        "#,
        )?;

        Ok(())
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

/// Parse an RFC 3339 timestamp read from column `idx`.
pub(crate) fn ts_from_sql(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a nullable RFC 3339 timestamp read from column `idx`.
pub(crate) fn opt_ts_from_sql(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| ts_from_sql(idx, s)).transpose()
}
