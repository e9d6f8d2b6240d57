// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! The device state store: devices and their logical setpoints.
//!
//! `apply_partial_update` is the single write path for setpoints. It
//! holds the connection lock for the whole read-merge-validate-write
//! cycle and commits in one transaction, so concurrent updates to the
//! same device serialize and non-overlapping patches both apply.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{validate, Database};
use crate::error::{StoreError, ValidationError};
use crate::model::{
    AcMode, AcSetpoint, Device, DeviceStatus, DeviceType, LightingSetpoint, Setpoint,
    SetpointPatch,
};

fn device_from_row(row: &Row) -> rusqlite::Result<Device> {
    let type_raw: String = row.get(2)?;
    let status_raw: String = row.get(4)?;
    Ok(Device {
        id: row.get(0)?,
        room_id: row.get(1)?,
        device_type: DeviceType::parse(&type_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("unknown device type {type_raw}").into(),
            )
        })?,
        name: row.get(3)?,
        status: DeviceStatus::parse(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Text,
                format!("unknown device status {status_raw}").into(),
            )
        })?,
    })
}

const DEVICE_COLUMNS: &str = "id, room_id, device_type, name, status";

fn find_device(conn: &Connection, id: i64) -> rusqlite::Result<Option<Device>> {
    conn.query_row(
        &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
        params![id],
        device_from_row,
    )
    .optional()
}

fn ac_setpoint_row(conn: &Connection, device_id: i64) -> rusqlite::Result<Option<AcSetpoint>> {
    conn.query_row(
        "SELECT device_id, temperature, mode, fan_speed, humidity_control, target_humidity
         FROM ac_setpoints WHERE device_id = ?1",
        params![device_id],
        |row| {
            let mode_raw: String = row.get(2)?;
            Ok(AcSetpoint {
                device_id: row.get(0)?,
                temperature: row.get(1)?,
                mode: AcMode::parse(&mode_raw).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        Type::Text,
                        format!("unknown ac mode {mode_raw}").into(),
                    )
                })?,
                fan_speed: row.get(3)?,
                humidity_control: row.get(4)?,
                target_humidity: row.get(5)?,
            })
        },
    )
    .optional()
}

fn lighting_setpoint_row(
    conn: &Connection,
    device_id: i64,
) -> rusqlite::Result<Option<LightingSetpoint>> {
    conn.query_row(
        "SELECT device_id, brightness, color_temperature
         FROM lighting_setpoints WHERE device_id = ?1",
        params![device_id],
        |row| {
            Ok(LightingSetpoint {
                device_id: row.get(0)?,
                brightness: row.get(1)?,
                color_temperature: row.get(2)?,
            })
        },
    )
    .optional()
}

fn upsert_ac(conn: &Connection, setpoint: &AcSetpoint) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO ac_setpoints
             (device_id, temperature, mode, fan_speed, humidity_control, target_humidity,
              updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(device_id) DO UPDATE SET
             temperature = ?2, mode = ?3, fan_speed = ?4, humidity_control = ?5,
             target_humidity = ?6, updated_at = ?7",
        params![
            setpoint.device_id,
            setpoint.temperature,
            setpoint.mode.as_str(),
            setpoint.fan_speed,
            setpoint.humidity_control,
            setpoint.target_humidity,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn upsert_lighting(conn: &Connection, setpoint: &LightingSetpoint) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO lighting_setpoints (device_id, brightness, color_temperature, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(device_id) DO UPDATE SET
             brightness = ?2, color_temperature = ?3, updated_at = ?4",
        params![
            setpoint.device_id,
            setpoint.brightness,
            setpoint.color_temperature,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn set_device_status(
    conn: &Connection,
    device_id: i64,
    status: DeviceStatus,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE devices SET status = ?2 WHERE id = ?1",
        params![device_id, status.as_str()],
    )?;
    Ok(())
}

impl Database {
    /// Fetch a device by row id.
    pub fn device(&self, id: i64) -> Result<Option<Device>, StoreError> {
        Ok(find_device(&self.lock(), id)?)
    }

    /// Fetch the room's device of the given type, if installed.
    pub fn device_for_room(
        &self,
        room_id: i64,
        device_type: DeviceType,
    ) -> Result<Option<Device>, StoreError> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices
                     WHERE room_id = ?1 AND device_type = ?2"
                ),
                params![room_id, device_type.as_str()],
                device_from_row,
            )
            .optional()?)
    }

    /// Fetch the room's device of the given type, creating it (status
    /// OFF) if the room has none. `(room_id, device_type)` stays unique.
    pub fn ensure_device(
        &self,
        room_id: i64,
        device_type: DeviceType,
        name: &str,
    ) -> Result<Device, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO devices (room_id, device_type, name)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(room_id, device_type) DO NOTHING",
            params![room_id, device_type.as_str(), name],
        )?;
        let device = conn
            .query_row(
                &format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices
                     WHERE room_id = ?1 AND device_type = ?2"
                ),
                params![room_id, device_type.as_str()],
                device_from_row,
            )
            .optional()?;
        device.ok_or(StoreError::UnknownDevice(room_id))
    }

    /// Current AC setpoint for a device, if one has been created.
    pub fn ac_setpoint(&self, device_id: i64) -> Result<Option<AcSetpoint>, StoreError> {
        Ok(ac_setpoint_row(&self.lock(), device_id)?)
    }

    /// Current lighting setpoint for a device, if one has been created.
    pub fn lighting_setpoint(
        &self,
        device_id: i64,
    ) -> Result<Option<LightingSetpoint>, StoreError> {
        Ok(lighting_setpoint_row(&self.lock(), device_id)?)
    }

    /// Return the AC setpoint row, creating it with type defaults
    /// (24.0 °C, OFF, fan 1) on first access.
    pub fn get_or_create_ac_setpoint(&self, device_id: i64) -> Result<AcSetpoint, StoreError> {
        let conn = self.lock();
        if let Some(setpoint) = ac_setpoint_row(&conn, device_id)? {
            return Ok(setpoint);
        }
        let defaults = AcSetpoint::defaults(device_id);
        upsert_ac(&conn, &defaults)?;
        Ok(defaults)
    }

    /// Return the lighting setpoint row, creating it with type defaults
    /// (brightness 100, 2700 K) on first access.
    pub fn get_or_create_lighting_setpoint(
        &self,
        device_id: i64,
    ) -> Result<LightingSetpoint, StoreError> {
        let conn = self.lock();
        if let Some(setpoint) = lighting_setpoint_row(&conn, device_id)? {
            return Ok(setpoint);
        }
        let defaults = LightingSetpoint::defaults(device_id);
        upsert_lighting(&conn, &defaults)?;
        Ok(defaults)
    }

    /// Merge a partial setpoint update, validate the merged result and
    /// commit it atomically together with the owning device's coarse
    /// status (ON unless the merged state implies OFF).
    ///
    /// On a validation failure nothing is written and the previously
    /// stored setpoint is preserved. A patch whose variant does not
    /// match the device's type is a validation failure as well.
    pub fn apply_partial_update(
        &self,
        device_id: i64,
        patch: &SetpointPatch,
    ) -> Result<Setpoint, StoreError> {
        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;

        let device = find_device(&tx, device_id)?.ok_or(StoreError::UnknownDevice(device_id))?;

        let applied = match (device.device_type, patch) {
            (DeviceType::Ac, SetpointPatch::Ac(p)) => {
                let current =
                    ac_setpoint_row(&tx, device_id)?.unwrap_or_else(|| AcSetpoint::defaults(device_id));
                let merged = validate::validate_ac(&current, p)?;
                upsert_ac(&tx, &merged)?;
                let status = if merged.mode == AcMode::Off {
                    DeviceStatus::Off
                } else {
                    DeviceStatus::On
                };
                set_device_status(&tx, device_id, status)?;
                Setpoint::Ac(merged)
            }
            (DeviceType::Lighting, SetpointPatch::Lighting(p)) => {
                let current = lighting_setpoint_row(&tx, device_id)?
                    .unwrap_or_else(|| LightingSetpoint::defaults(device_id));
                let merged = validate::validate_lighting(&current, p)?;
                upsert_lighting(&tx, &merged)?;
                let status = if merged.brightness == 0 {
                    DeviceStatus::Off
                } else {
                    DeviceStatus::On
                };
                set_device_status(&tx, device_id, status)?;
                Setpoint::Lighting(merged)
            }
            _ => {
                return Err(ValidationError::new(
                    "device_type",
                    format!(
                        "device {} is not a {} device",
                        device_id,
                        match patch {
                            SetpointPatch::Ac(_) => "AC",
                            SetpointPatch::Lighting(_) => "LIGHTING",
                        }
                    ),
                )
                .into());
            }
        };

        tx.commit()?;
        Ok(applied)
    }
}
