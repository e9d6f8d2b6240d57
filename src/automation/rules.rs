// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! The rule engine: latest readings plus per-room policy in, device
//! setpoints out.
//!
//! Two variants exist side by side. [`optimize_room`] drives the AC from
//! the latest readings against a fixed comfort target and runs after
//! every accepted occupancy write. [`apply_policy`] is the on-demand
//! room-automation apply: it uses the policy's own comfort temperature
//! and additionally adjusts lighting from illuminance. Which comfort
//! target is authoritative is an open stakeholder question; both are
//! kept as-is.
//!
//! Setpoints computed here go through the same bounds validation as any
//! direct write. An out-of-bounds computation is a defect to be caught
//! by validation, never silently clamped.

use tracing::debug;

use crate::error::StoreError;
use crate::model::{
    AcMode, AcSetpoint, AcSetpointPatch, DeviceType, LightingSetpoint, LightingSetpointPatch,
    Setpoint, SetpointPatch,
};
use crate::store::Database;

/// Comfort target used by [`optimize_room`] when no policy-specific
/// target applies to this path.
pub const DEFAULT_COMFORT_TEMPERATURE: f64 = 22.0;

/// Lighting is driven to full brightness below this illuminance (lux).
const DIM_ILLUMINANCE_THRESHOLD: f64 = 300.0;

/// Drive the room's AC from the latest occupancy and IAQ readings.
///
/// Rooms without an AC device are skipped (`None`). With presence
/// detected, the mode follows the measured temperature against
/// [`DEFAULT_COMFORT_TEMPERATURE`]: above it cool, below it heat, equal
/// fan only; with no temperature measured the unit is left in AUTO.
/// Without presence the unit is switched off, temperature untouched.
pub fn optimize_room(db: &Database, room_id: i64) -> Result<Option<AcSetpoint>, StoreError> {
    let Some(device) = db.device_for_room(room_id, DeviceType::Ac)? else {
        debug!(room = room_id, "no ac device - skipping optimization");
        return Ok(None);
    };

    let occupancy = db.latest_occupancy(room_id)?;
    let iaq = db.latest_iaq(room_id)?;

    let mut patch = AcSetpointPatch::default();
    match occupancy {
        Some(reading) if reading.presence_detected => {
            match iaq.and_then(|r| r.temperature) {
                Some(current) if current > DEFAULT_COMFORT_TEMPERATURE => {
                    patch.mode = Some(AcMode::Cool);
                    patch.temperature = Some(DEFAULT_COMFORT_TEMPERATURE);
                }
                Some(current) if current < DEFAULT_COMFORT_TEMPERATURE => {
                    patch.mode = Some(AcMode::Heat);
                    patch.temperature = Some(DEFAULT_COMFORT_TEMPERATURE);
                }
                Some(_) => patch.mode = Some(AcMode::Fan),
                None => patch.mode = Some(AcMode::Auto),
            }
        }
        _ => patch.mode = Some(AcMode::Off),
    }

    match db.apply_partial_update(device.id, &SetpointPatch::Ac(patch))? {
        Setpoint::Ac(setpoint) => Ok(Some(setpoint)),
        Setpoint::Lighting(_) => unreachable!("ac patch applied to ac device"),
    }
}

/// Setpoints written by one [`apply_policy`] run.
#[derive(Debug, Clone, Default)]
pub struct PolicyOutcome {
    /// AC setpoint written, if the AC branch ran.
    pub ac: Option<AcSetpoint>,
    /// Lighting setpoint written, if the lighting branch ran.
    pub lighting: Option<LightingSetpoint>,
}

/// Apply the room's automation policy on demand.
///
/// Runs only while the latest occupancy reading shows presence. The AC
/// branch (gated by `ac_auto_adjust`) drives the temperature to the
/// policy's comfort temperature. The lighting branch (gated by
/// `lighting_auto_adjust`) follows measured illuminance: below 300 lux
/// full brightness, otherwise half. Missing devices or readings
/// short-circuit their branch without raising; only validation and
/// persistence failures reach the caller.
pub fn apply_policy(db: &Database, room_id: i64) -> Result<PolicyOutcome, StoreError> {
    let policy = db.get_or_create_policy(room_id)?;
    let mut outcome = PolicyOutcome::default();

    let Some(occupancy) = db.latest_occupancy(room_id)? else {
        return Ok(outcome);
    };
    if !occupancy.presence_detected {
        return Ok(outcome);
    }

    let iaq = db.latest_iaq(room_id)?;

    if policy.ac_auto_adjust {
        if let Some(device) = db.device_for_room(room_id, DeviceType::Ac)? {
            let patch = AcSetpointPatch {
                temperature: Some(policy.comfort_temperature),
                ..Default::default()
            };
            if let Setpoint::Ac(setpoint) =
                db.apply_partial_update(device.id, &SetpointPatch::Ac(patch))?
            {
                outcome.ac = Some(setpoint);
            }
        }
    }

    if policy.lighting_auto_adjust {
        let illuminance = iaq.and_then(|reading| reading.illuminance);
        if let (Some(device), Some(illuminance)) =
            (db.device_for_room(room_id, DeviceType::Lighting)?, illuminance)
        {
            let brightness = if illuminance < DIM_ILLUMINANCE_THRESHOLD {
                100
            } else {
                50
            };
            let patch = LightingSetpointPatch {
                brightness: Some(brightness),
                ..Default::default()
            };
            if let Setpoint::Lighting(setpoint) =
                db.apply_partial_update(device.id, &SetpointPatch::Lighting(patch))?
            {
                outcome.lighting = Some(setpoint);
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{IaqPayload, LifeBeingPayload};
    use crate::model::{DeviceStatus, Room};

    fn setup() -> (Database, Room, i64) {
        let db = Database::open_in_memory().unwrap();
        let room = db.create_room("101", 1).unwrap();
        let device = db.ensure_device(room.id, DeviceType::Ac, "AC").unwrap();
        db.get_or_create_ac_setpoint(device.id).unwrap();
        (db, room, device.id)
    }

    fn write_presence(db: &Database, room_id: i64, present: bool) {
        db.write_occupancy(
            &room_id.to_string(),
            &LifeBeingPayload {
                presence_detected: Some(present),
                ..Default::default()
            },
        )
        .unwrap();
    }

    fn write_temperature(db: &Database, room_id: i64, temperature: Option<f64>) {
        db.write_iaq(
            &room_id.to_string(),
            &IaqPayload {
                temperature,
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn warm_occupied_room_cools_to_target() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, true);
        write_temperature(&db, room.id, Some(25.0));

        let setpoint = optimize_room(&db, room.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Cool);
        assert_eq!(setpoint.temperature, 22.0);
    }

    #[test]
    fn cold_occupied_room_heats_to_target() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, true);
        write_temperature(&db, room.id, Some(18.5));

        let setpoint = optimize_room(&db, room.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Heat);
        assert_eq!(setpoint.temperature, 22.0);
    }

    #[test]
    fn room_at_target_runs_fan_only() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, true);
        write_temperature(&db, room.id, Some(22.0));

        let setpoint = optimize_room(&db, room.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Fan);
        // Temperature untouched from its default.
        assert_eq!(setpoint.temperature, 24.0);
    }

    #[test]
    fn missing_temperature_falls_back_to_auto() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, true);
        write_temperature(&db, room.id, None);

        let setpoint = optimize_room(&db, room.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Auto);
        assert_eq!(setpoint.temperature, 24.0);
    }

    #[test]
    fn vacant_room_switches_off_regardless_of_iaq() {
        let (db, room, device_id) = setup();
        write_presence(&db, room.id, false);
        write_temperature(&db, room.id, Some(29.0));

        let setpoint = optimize_room(&db, room.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Off);
        assert_eq!(setpoint.temperature, 24.0);
        let device = db.device(device_id).unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Off);
    }

    #[test]
    fn no_readings_at_all_switches_off() {
        let (db, room, _) = setup();
        let setpoint = optimize_room(&db, room.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Off);
    }

    #[test]
    fn room_without_ac_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let room = db.create_room("101", 1).unwrap();
        write_presence(&db, room.id, true);
        assert!(optimize_room(&db, room.id).unwrap().is_none());
    }

    #[test]
    fn policy_apply_uses_policy_comfort_temperature() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, true);
        write_temperature(&db, room.id, Some(28.0));

        let outcome = apply_policy(&db, room.id).unwrap();
        // Policy default comfort temperature, not the fixed 22.0.
        assert_eq!(outcome.ac.unwrap().temperature, 24.0);
    }

    #[test]
    fn policy_apply_adjusts_lighting_from_illuminance() {
        let (db, room, _) = setup();
        let light = db
            .ensure_device(room.id, DeviceType::Lighting, "Lighting")
            .unwrap();
        db.get_or_create_lighting_setpoint(light.id).unwrap();
        write_presence(&db, room.id, true);

        db.write_iaq(
            &room.id.to_string(),
            &IaqPayload {
                illuminance: Some(120.0),
                ..Default::default()
            },
        )
        .unwrap();
        let outcome = apply_policy(&db, room.id).unwrap();
        assert_eq!(outcome.lighting.unwrap().brightness, 100);

        db.write_iaq(
            &room.id.to_string(),
            &IaqPayload {
                illuminance: Some(800.0),
                ..Default::default()
            },
        )
        .unwrap();
        let outcome = apply_policy(&db, room.id).unwrap();
        assert_eq!(outcome.lighting.unwrap().brightness, 50);
    }

    #[test]
    fn policy_apply_is_inert_without_presence() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, false);
        write_temperature(&db, room.id, Some(28.0));

        let outcome = apply_policy(&db, room.id).unwrap();
        assert!(outcome.ac.is_none());
        assert!(outcome.lighting.is_none());
    }

    #[test]
    fn policy_gates_disable_branches() {
        let (db, room, _) = setup();
        write_presence(&db, room.id, true);
        write_temperature(&db, room.id, Some(28.0));

        // Disable the AC branch directly in the policy row.
        db.get_or_create_policy(room.id).unwrap();
        {
            use rusqlite::params;
            db.lock()
                .execute(
                    "UPDATE automation_policies SET ac_auto_adjust = 0 WHERE room_id = ?1",
                    params![room.id],
                )
                .unwrap();
        }

        let outcome = apply_policy(&db, room.id).unwrap();
        assert!(outcome.ac.is_none());
    }
}
