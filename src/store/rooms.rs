// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Room rows, the derived occupancy flag and per-room automation policies.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{opt_ts_from_sql, Database};
use crate::error::StoreError;
use crate::model::{AutomationPolicy, Room};

fn room_from_row(row: &Row) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        number: row.get(1)?,
        floor: row.get(2)?,
        occupied: row.get(3)?,
        last_cleaned: opt_ts_from_sql(4, row.get(4)?)?,
    })
}

const ROOM_COLUMNS: &str = "id, number, floor, occupied, last_cleaned";

fn find_room(conn: &Connection, id: i64) -> rusqlite::Result<Option<Room>> {
    conn.query_row(
        &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
        params![id],
        room_from_row,
    )
    .optional()
}

impl Database {
    /// Create a room. Fails if `(floor, number)` already exists.
    pub fn create_room(&self, number: &str, floor: i64) -> Result<Room, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO rooms (number, floor) VALUES (?1, ?2)",
            params![number, floor],
        )?;
        let id = conn.last_insert_rowid();
        Ok(find_room(&conn, id)?.expect("room just inserted"))
    }

    /// Fetch a room by row id.
    pub fn room(&self, id: i64) -> Result<Option<Room>, StoreError> {
        Ok(find_room(&self.lock(), id)?)
    }

    /// Fetch a room by its human-facing number.
    pub fn room_by_number(&self, number: &str) -> Result<Option<Room>, StoreError> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE number = ?1"),
                params![number],
                room_from_row,
            )
            .optional()?)
    }

    /// Resolve the opaque room id carried in a bus topic.
    ///
    /// Non-numeric ids and ids of unprovisioned rooms both resolve to
    /// `None`; the caller treats that as a no-op write.
    pub fn resolve_room(&self, raw_id: &str) -> Result<Option<Room>, StoreError> {
        let Ok(id) = raw_id.parse::<i64>() else {
            debug!(room = raw_id, "room id is not numeric - skipping");
            return Ok(None);
        };
        self.room(id)
    }

    /// All provisioned rooms, ordered by number.
    pub fn all_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY number"))?;
        let rows = stmt.query_map([], room_from_row)?;
        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(row?);
        }
        Ok(rooms)
    }

    /// Set the derived occupancy flag. Only occupancy derivation calls
    /// this.
    pub fn set_room_occupied(&self, room_id: i64, occupied: bool) -> Result<(), StoreError> {
        self.lock().execute(
            "UPDATE rooms SET occupied = ?2 WHERE id = ?1",
            params![room_id, occupied],
        )?;
        Ok(())
    }

    /// Fetch the room's automation policy, creating it with defaults on
    /// first access.
    pub fn get_or_create_policy(&self, room_id: i64) -> Result<AutomationPolicy, StoreError> {
        let conn = self.lock();
        if let Some(policy) = find_policy(&conn, room_id)? {
            return Ok(policy);
        }
        conn.execute(
            "INSERT INTO automation_policies (room_id) VALUES (?1)",
            params![room_id],
        )?;
        Ok(find_policy(&conn, room_id)?.expect("policy just inserted"))
    }

    /// Record the time a transition to occupied was observed, creating
    /// the policy row if the room has none yet.
    pub fn mark_presence(&self, room_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO automation_policies (room_id, last_presence_time) VALUES (?1, ?2)
             ON CONFLICT(room_id) DO UPDATE SET last_presence_time = ?2",
            params![room_id, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

fn find_policy(conn: &Connection, room_id: i64) -> rusqlite::Result<Option<AutomationPolicy>> {
    conn.query_row(
        "SELECT room_id, ac_auto_adjust, lighting_auto_adjust, presence_timeout,
                comfort_temperature, energy_saving_temperature, last_presence_time
         FROM automation_policies WHERE room_id = ?1",
        params![room_id],
        |row| {
            Ok(AutomationPolicy {
                room_id: row.get(0)?,
                ac_auto_adjust: row.get(1)?,
                lighting_auto_adjust: row.get(2)?,
                presence_timeout: row.get(3)?,
                comfort_temperature: row.get(4)?,
                energy_saving_temperature: row.get(5)?,
                last_presence_time: opt_ts_from_sql(6, row.get(6)?)?,
            })
        },
    )
    .optional()
}
