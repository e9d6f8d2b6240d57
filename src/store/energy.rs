// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Append-only energy consumption records and their summaries.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use super::{ts_from_sql, Database};
use crate::error::StoreError;
use crate::model::{DeviceTypeUsage, EnergyRecord, EnergySummary};

impl Database {
    /// Append one energy consumption sample. Records are never mutated.
    pub fn record_energy(
        &self,
        room_id: i64,
        device_id: i64,
        power_usage: f64,
        duration: i64,
        at: DateTime<Utc>,
    ) -> Result<EnergyRecord, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO energy_records (room_id, device_id, timestamp, power_usage, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![room_id, device_id, at.to_rfc3339(), power_usage, duration],
        )?;
        let id = conn.last_insert_rowid();
        let record = conn.query_row(
            "SELECT id, room_id, device_id, timestamp, power_usage, duration
             FROM energy_records WHERE id = ?1",
            params![id],
            |row| {
                Ok(EnergyRecord {
                    id: row.get(0)?,
                    room_id: row.get(1)?,
                    device_id: row.get(2)?,
                    timestamp: ts_from_sql(3, row.get(3)?)?,
                    power_usage: row.get(4)?,
                    duration: row.get(5)?,
                })
            },
        )?;
        Ok(record)
    }

    /// Aggregate energy usage over the last `days` days, per device
    /// type, optionally restricted to one room.
    pub fn energy_summary(
        &self,
        room_id: Option<i64>,
        days: i64,
    ) -> Result<EnergySummary, StoreError> {
        let conn = self.lock();
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

        let sql_all = "SELECT d.device_type, SUM(e.power_usage), AVG(e.power_usage), COUNT(*)
                       FROM energy_records e JOIN devices d ON d.id = e.device_id
                       WHERE e.timestamp >= ?1
                       GROUP BY d.device_type ORDER BY d.device_type";
        let sql_room = "SELECT d.device_type, SUM(e.power_usage), AVG(e.power_usage), COUNT(*)
                        FROM energy_records e JOIN devices d ON d.id = e.device_id
                        WHERE e.timestamp >= ?1 AND e.room_id = ?2
                        GROUP BY d.device_type ORDER BY d.device_type";

        let mut by_device_type = Vec::new();
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<DeviceTypeUsage> {
            Ok(DeviceTypeUsage {
                device_type: row.get(0)?,
                total_usage: row.get(1)?,
                average_usage: row.get(2)?,
                samples: row.get(3)?,
            })
        };

        if let Some(room_id) = room_id {
            let mut stmt = conn.prepare(sql_room)?;
            let rows = stmt.query_map(params![cutoff, room_id], map_row)?;
            for row in rows {
                by_device_type.push(row?);
            }
        } else {
            let mut stmt = conn.prepare(sql_all)?;
            let rows = stmt.query_map(params![cutoff], map_row)?;
            for row in rows {
                by_device_type.push(row?);
            }
        }

        let total_power = by_device_type.iter().map(|usage| usage.total_usage).sum();
        Ok(EnergySummary {
            total_power,
            by_device_type,
        })
    }
}
