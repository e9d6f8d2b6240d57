// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Pure setpoint validation: `(current, patch) -> Result<merged, error>`.
//!
//! Validation runs on the merged result before every persistence call.
//! The store commits the merged state atomically or not at all; these
//! functions never mutate anything themselves.

use crate::error::ValidationError;
use crate::model::{
    AcSetpoint, AcSetpointPatch, LightingSetpoint, LightingSetpointPatch,
};

/// Merge an AC patch into the current setpoint and check the bounds.
pub fn validate_ac(
    current: &AcSetpoint,
    patch: &AcSetpointPatch,
) -> Result<AcSetpoint, ValidationError> {
    let merged = AcSetpoint {
        device_id: current.device_id,
        temperature: patch.temperature.unwrap_or(current.temperature),
        mode: patch.mode.unwrap_or(current.mode),
        fan_speed: patch.fan_speed.unwrap_or(current.fan_speed),
        humidity_control: patch.humidity_control.unwrap_or(current.humidity_control),
        target_humidity: patch.target_humidity.unwrap_or(current.target_humidity),
    };

    if !(16.0..=30.0).contains(&merged.temperature) {
        return Err(ValidationError::new(
            "temperature",
            "Temperature must be between 16°C and 30°C",
        ));
    }
    if !(1..=5).contains(&merged.fan_speed) {
        return Err(ValidationError::new(
            "fan_speed",
            "Fan speed must be between 1 and 5",
        ));
    }
    if !(30..=70).contains(&merged.target_humidity) {
        return Err(ValidationError::new(
            "target_humidity",
            "Target humidity must be between 30% and 70%",
        ));
    }

    Ok(merged)
}

/// Merge a lighting patch into the current setpoint and check the bounds.
pub fn validate_lighting(
    current: &LightingSetpoint,
    patch: &LightingSetpointPatch,
) -> Result<LightingSetpoint, ValidationError> {
    let merged = LightingSetpoint {
        device_id: current.device_id,
        brightness: patch.brightness.unwrap_or(current.brightness),
        color_temperature: patch.color_temperature.unwrap_or(current.color_temperature),
    };

    if !(0..=100).contains(&merged.brightness) {
        return Err(ValidationError::new(
            "brightness",
            "Brightness must be between 0 and 100",
        ));
    }
    if !(2000..=6500).contains(&merged.color_temperature) {
        return Err(ValidationError::new(
            "color_temperature",
            "Color temperature must be between 2000K and 6500K",
        ));
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AcMode;

    #[test]
    fn ac_patch_merges_only_supplied_fields() {
        let current = AcSetpoint::defaults(1);
        let patch = AcSetpointPatch {
            temperature: Some(21.0),
            ..Default::default()
        };
        let merged = validate_ac(&current, &patch).unwrap();
        assert_eq!(merged.temperature, 21.0);
        assert_eq!(merged.mode, AcMode::Off);
        assert_eq!(merged.fan_speed, 1);
    }

    #[test]
    fn ac_temperature_bounds_enforced() {
        let current = AcSetpoint::defaults(1);
        for bad in [15.9, 30.1, 35.0] {
            let patch = AcSetpointPatch {
                temperature: Some(bad),
                ..Default::default()
            };
            let err = validate_ac(&current, &patch).unwrap_err();
            assert_eq!(err.field, "temperature");
        }
        for ok in [16.0, 30.0] {
            let patch = AcSetpointPatch {
                temperature: Some(ok),
                ..Default::default()
            };
            assert!(validate_ac(&current, &patch).is_ok());
        }
    }

    #[test]
    fn ac_fan_speed_and_humidity_bounds_enforced() {
        let current = AcSetpoint::defaults(1);
        let patch = AcSetpointPatch {
            fan_speed: Some(6),
            ..Default::default()
        };
        assert_eq!(validate_ac(&current, &patch).unwrap_err().field, "fan_speed");

        let patch = AcSetpointPatch {
            target_humidity: Some(25),
            ..Default::default()
        };
        assert_eq!(
            validate_ac(&current, &patch).unwrap_err().field,
            "target_humidity"
        );
    }

    #[test]
    fn merged_state_is_validated_not_the_patch() {
        // A patch can be invalid even when the patched field is in range,
        // if the carried-over current state is already out of bounds. The
        // store never produces such state, so here the inverse: a patch
        // fixing one field while another stays valid passes.
        let current = AcSetpoint {
            temperature: 28.0,
            ..AcSetpoint::defaults(1)
        };
        let patch = AcSetpointPatch {
            fan_speed: Some(5),
            ..Default::default()
        };
        let merged = validate_ac(&current, &patch).unwrap();
        assert_eq!(merged.temperature, 28.0);
        assert_eq!(merged.fan_speed, 5);
    }

    #[test]
    fn lighting_bounds_enforced() {
        let current = LightingSetpoint::defaults(1);
        let patch = LightingSetpointPatch {
            brightness: Some(101),
            ..Default::default()
        };
        assert_eq!(
            validate_lighting(&current, &patch).unwrap_err().field,
            "brightness"
        );

        let patch = LightingSetpointPatch {
            color_temperature: Some(1500),
            ..Default::default()
        };
        assert_eq!(
            validate_lighting(&current, &patch).unwrap_err().field,
            "color_temperature"
        );

        let patch = LightingSetpointPatch {
            brightness: Some(0),
            color_temperature: Some(6500),
        };
        let merged = validate_lighting(&current, &patch).unwrap();
        assert_eq!(merged.brightness, 0);
        assert_eq!(merged.color_temperature, 6500);
    }
}
