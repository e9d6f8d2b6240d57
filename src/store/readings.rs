// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! The reading store: append-only IAQ and occupancy time series.
//!
//! Writes assign the timestamp server-side. Raw sensor values are never
//! bounds-checked: an out-of-range reading is a monitoring concern, not a
//! write-time error. Writes for unprovisioned rooms are no-ops logged at
//! debug level; sensors routinely come online before provisioning does.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{ts_from_sql, Database, WriteOutcome};
use crate::error::StoreError;
use crate::events::{IaqPayload, LifeBeingPayload};
use crate::model::{IaqReading, OccupancyReading};

fn iaq_from_row(row: &Row) -> rusqlite::Result<IaqReading> {
    Ok(IaqReading {
        id: row.get(0)?,
        room_id: row.get(1)?,
        timestamp: ts_from_sql(2, row.get(2)?)?,
        temperature: row.get(3)?,
        humidity: row.get(4)?,
        co2: row.get(5)?,
        tvoc: row.get(6)?,
        pm25: row.get(7)?,
        noise: row.get(8)?,
        illuminance: row.get(9)?,
        online_status: row.get(10)?,
        device_status: row.get(11)?,
    })
}

fn occupancy_from_row(row: &Row) -> rusqlite::Result<OccupancyReading> {
    Ok(OccupancyReading {
        id: row.get(0)?,
        room_id: row.get(1)?,
        timestamp: ts_from_sql(2, row.get(2)?)?,
        presence_detected: row.get(3)?,
        motion_level: row.get(4)?,
        presence_state: row.get(5)?,
        sensitivity: row.get(6)?,
        online_status: row.get(7)?,
    })
}

const IAQ_COLUMNS: &str = "id, room_id, timestamp, temperature, humidity, co2, tvoc, pm25, \
                           noise, illuminance, online_status, device_status";

const OCCUPANCY_COLUMNS: &str = "id, room_id, timestamp, presence_detected, motion_level, \
                                 presence_state, sensitivity, online_status";

fn latest_iaq_row(conn: &Connection, room_id: i64) -> rusqlite::Result<Option<IaqReading>> {
    conn.query_row(
        &format!(
            "SELECT {IAQ_COLUMNS} FROM iaq_readings WHERE room_id = ?1
             ORDER BY timestamp DESC, id DESC LIMIT 1"
        ),
        params![room_id],
        iaq_from_row,
    )
    .optional()
}

fn latest_occupancy_row(
    conn: &Connection,
    room_id: i64,
) -> rusqlite::Result<Option<OccupancyReading>> {
    conn.query_row(
        &format!(
            "SELECT {OCCUPANCY_COLUMNS} FROM occupancy_readings WHERE room_id = ?1
             ORDER BY timestamp DESC, id DESC LIMIT 1"
        ),
        params![room_id],
        occupancy_from_row,
    )
    .optional()
}

impl Database {
    /// Persist one IAQ reading with a server-assigned timestamp.
    ///
    /// Missing numeric fields are stored as null; `online_status`
    /// defaults to true and `device_status` to `"operational"`. If the
    /// room does not resolve the write is a no-op.
    pub fn write_iaq(
        &self,
        raw_room_id: &str,
        payload: &IaqPayload,
    ) -> Result<WriteOutcome<IaqReading>, StoreError> {
        let Some(room) = self.resolve_room(raw_room_id)? else {
            debug!(room = raw_room_id, "room not found - skipping iaq write");
            return Ok(WriteOutcome::UnknownRoom);
        };

        let conn = self.lock();
        let now = chrono::Utc::now();
        conn.execute(
            "INSERT INTO iaq_readings
                 (room_id, timestamp, temperature, humidity, co2, tvoc, pm25, noise,
                  illuminance, online_status, device_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                room.id,
                now.to_rfc3339(),
                payload.temperature,
                payload.humidity,
                payload.co2,
                payload.tvoc,
                payload.pm25,
                payload.noise,
                payload.illuminance,
                payload.online_status.unwrap_or(true),
                payload.device_status.as_deref().unwrap_or("operational"),
            ],
        )?;
        let id = conn.last_insert_rowid();

        let reading = conn.query_row(
            &format!("SELECT {IAQ_COLUMNS} FROM iaq_readings WHERE id = ?1"),
            params![id],
            iaq_from_row,
        )?;
        Ok(WriteOutcome::Stored(reading))
    }

    /// Persist one occupancy reading with a server-assigned timestamp.
    ///
    /// Field defaults: `presence_detected` false, `motion_level` 0,
    /// `presence_state` `"unoccupied"`, `sensitivity` 0.5,
    /// `online_status` true. If the room does not resolve the write is a
    /// no-op.
    pub fn write_occupancy(
        &self,
        raw_room_id: &str,
        payload: &LifeBeingPayload,
    ) -> Result<WriteOutcome<OccupancyReading>, StoreError> {
        let Some(room) = self.resolve_room(raw_room_id)? else {
            debug!(room = raw_room_id, "room not found - skipping occupancy write");
            return Ok(WriteOutcome::UnknownRoom);
        };

        let conn = self.lock();
        let now = chrono::Utc::now();
        conn.execute(
            "INSERT INTO occupancy_readings
                 (room_id, timestamp, presence_detected, motion_level, presence_state,
                  sensitivity, online_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                room.id,
                now.to_rfc3339(),
                payload.presence_detected.unwrap_or(false),
                payload.motion_level.unwrap_or(0),
                payload.presence_state.as_deref().unwrap_or("unoccupied"),
                payload.sensitivity.unwrap_or(0.5),
                payload.online_status.unwrap_or(true),
            ],
        )?;
        let id = conn.last_insert_rowid();

        let reading = conn.query_row(
            &format!("SELECT {OCCUPANCY_COLUMNS} FROM occupancy_readings WHERE id = ?1"),
            params![id],
            occupancy_from_row,
        )?;
        Ok(WriteOutcome::Stored(reading))
    }

    /// Most recent IAQ reading for a room, by timestamp descending with
    /// insertion order breaking ties.
    pub fn latest_iaq(&self, room_id: i64) -> Result<Option<IaqReading>, StoreError> {
        Ok(latest_iaq_row(&self.lock(), room_id)?)
    }

    /// Most recent occupancy reading for a room.
    pub fn latest_occupancy(&self, room_id: i64) -> Result<Option<OccupancyReading>, StoreError> {
        Ok(latest_occupancy_row(&self.lock(), room_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Room;

    fn db_with_room() -> (Database, Room) {
        let db = Database::open_in_memory().unwrap();
        let room = db.create_room("101", 1).unwrap();
        (db, room)
    }

    #[test]
    fn iaq_write_then_latest_round_trips() {
        let (db, room) = db_with_room();
        let payload = IaqPayload {
            temperature: Some(23.4),
            co2: Some(550.0),
            ..Default::default()
        };
        let written = db
            .write_iaq(&room.id.to_string(), &payload)
            .unwrap()
            .stored()
            .unwrap();

        let latest = db.latest_iaq(room.id).unwrap().unwrap();
        assert_eq!(latest.id, written.id);
        assert_eq!(latest.temperature, Some(23.4));
        assert_eq!(latest.co2, Some(550.0));
        // Absent fields stay null, flags take their defaults.
        assert_eq!(latest.humidity, None);
        assert_eq!(latest.pm25, None);
        assert!(latest.online_status);
        assert_eq!(latest.device_status, "operational");
    }

    #[test]
    fn occupancy_defaults_applied_at_write_time() {
        let (db, room) = db_with_room();
        let written = db
            .write_occupancy(&room.id.to_string(), &LifeBeingPayload::default())
            .unwrap()
            .stored()
            .unwrap();
        assert!(!written.presence_detected);
        assert_eq!(written.motion_level, 0);
        assert_eq!(written.presence_state, "unoccupied");
        assert_eq!(written.sensitivity, 0.5);
        assert!(written.online_status);
    }

    #[test]
    fn unknown_room_write_is_noop() {
        let db = Database::open_in_memory().unwrap();
        let outcome = db.write_iaq("42", &IaqPayload::default()).unwrap();
        assert!(matches!(outcome, WriteOutcome::UnknownRoom));
        assert!(db.latest_iaq(42).unwrap().is_none());
    }

    #[test]
    fn out_of_range_sensor_values_are_not_rejected() {
        // Raw readings are not bounds-checked, unlike setpoints.
        let (db, room) = db_with_room();
        let payload = IaqPayload {
            temperature: Some(-80.0),
            pm25: Some(1e6),
            ..Default::default()
        };
        let written = db.write_iaq(&room.id.to_string(), &payload).unwrap();
        assert!(matches!(written, WriteOutcome::Stored(_)));
    }

    #[test]
    fn latest_breaks_timestamp_ties_by_insertion_order() {
        let (db, room) = db_with_room();
        // Two writes in the same instant resolve to the later insert.
        let first = db
            .write_occupancy(
                &room.id.to_string(),
                &LifeBeingPayload {
                    motion_level: Some(10),
                    ..Default::default()
                },
            )
            .unwrap()
            .stored()
            .unwrap();
        let second = db
            .write_occupancy(
                &room.id.to_string(),
                &LifeBeingPayload {
                    motion_level: Some(20),
                    ..Default::default()
                },
            )
            .unwrap()
            .stored()
            .unwrap();
        assert!(second.id > first.id);

        let latest = db.latest_occupancy(room.id).unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.motion_level, 20);
    }
}
