// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Domain types: rooms, readings, devices, setpoints and policies.
//!
//! All entities are created on first write from an upstream event or API
//! call; the automation core never deletes them. Readings and energy
//! records are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of device installed in a room. At most one device of a given
/// type exists per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    /// Air conditioning unit.
    Ac,
    /// Room lighting.
    Lighting,
}

impl DeviceType {
    /// Stable string form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Ac => "AC",
            DeviceType::Lighting => "LIGHTING",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AC" => Some(DeviceType::Ac),
            "LIGHTING" => Some(DeviceType::Lighting),
            _ => None,
        }
    }
}

/// Coarse operational status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    /// Device is running.
    On,
    /// Device is switched off.
    Off,
    /// Device reported a fault.
    Error,
    /// Device is under maintenance.
    Maintenance,
}

impl DeviceStatus {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::On => "ON",
            DeviceStatus::Off => "OFF",
            DeviceStatus::Error => "ERROR",
            DeviceStatus::Maintenance => "MAINTENANCE",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ON" => Some(DeviceStatus::On),
            "OFF" => Some(DeviceStatus::Off),
            "ERROR" => Some(DeviceStatus::Error),
            "MAINTENANCE" => Some(DeviceStatus::Maintenance),
            _ => None,
        }
    }
}

/// AC operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AcMode {
    /// Active cooling towards the setpoint.
    Cool,
    /// Active heating towards the setpoint.
    Heat,
    /// Fan only, no temperature control.
    Fan,
    /// Device picks its own mode.
    Auto,
    /// Unit off.
    Off,
}

impl AcMode {
    /// Stable string form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcMode::Cool => "COOL",
            AcMode::Heat => "HEAT",
            AcMode::Fan => "FAN",
            AcMode::Auto => "AUTO",
            AcMode::Off => "OFF",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COOL" => Some(AcMode::Cool),
            "HEAT" => Some(AcMode::Heat),
            "FAN" => Some(AcMode::Fan),
            "AUTO" => Some(AcMode::Auto),
            "OFF" => Some(AcMode::Off),
            _ => None,
        }
    }
}

/// A hotel room. The `occupied` flag is derived state, mutated only by
/// occupancy derivation: it reflects the most recent occupancy reading's
/// `presence_detected`, defaulting to `false` before any reading arrives.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    /// Row id; also the id producers put in bus topics.
    pub id: i64,
    /// Human-facing room number, e.g. "204".
    pub number: String,
    /// Floor the room is on.
    pub floor: i64,
    /// Derived occupancy flag.
    pub occupied: bool,
    /// When housekeeping last cleaned the room, if known.
    pub last_cleaned: Option<DateTime<Utc>>,
}

/// One indoor-air-quality reading. Immutable once written; the timestamp
/// is assigned at write time and is not guaranteed monotonic per room.
#[derive(Debug, Clone, Serialize)]
pub struct IaqReading {
    /// Row id; breaks timestamp ties for "latest" queries.
    pub id: i64,
    /// Owning room.
    pub room_id: i64,
    /// Server-assigned write time.
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<f64>,
    /// CO2 concentration in ppm.
    pub co2: Option<f64>,
    /// Total volatile organic compounds.
    pub tvoc: Option<f64>,
    /// PM2.5 particulate concentration.
    pub pm25: Option<f64>,
    /// Noise level in dB.
    pub noise: Option<f64>,
    /// Illuminance in lux.
    pub illuminance: Option<f64>,
    /// Whether the sensor reported itself online.
    pub online_status: bool,
    /// Sensor self-reported status string.
    pub device_status: String,
}

/// One occupancy ("life-being") reading. Immutable once written.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyReading {
    /// Row id; breaks timestamp ties for "latest" queries.
    pub id: i64,
    /// Owning room.
    pub room_id: i64,
    /// Server-assigned write time.
    pub timestamp: DateTime<Utc>,
    /// Whether a person was detected.
    pub presence_detected: bool,
    /// Motion intensity in [0, 100].
    pub motion_level: i64,
    /// Sensor's own occupied/unoccupied classification.
    pub presence_state: String,
    /// Sensor sensitivity setting.
    pub sensitivity: f64,
    /// Whether the sensor reported itself online.
    pub online_status: bool,
}

/// A controllable device in a room. `(room_id, device_type)` is unique.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    /// Row id.
    pub id: i64,
    /// Owning room.
    pub room_id: i64,
    /// Device kind.
    pub device_type: DeviceType,
    /// Display name, e.g. "AC Unit - Room 204".
    pub name: String,
    /// Coarse status; updated on every setpoint write.
    pub status: DeviceStatus,
}

/// Logical AC setpoint, owned 1:1 by an AC device.
///
/// Bounds enforced on every write: temperature in [16, 30], fan_speed in
/// [1, 5], target_humidity in [30, 70].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcSetpoint {
    /// Owning device.
    pub device_id: i64,
    /// Target temperature in degrees Celsius.
    pub temperature: f64,
    /// Operating mode.
    pub mode: AcMode,
    /// Fan speed step.
    pub fan_speed: i64,
    /// Whether the unit also regulates humidity.
    pub humidity_control: bool,
    /// Target relative humidity in percent.
    pub target_humidity: i64,
}

impl AcSetpoint {
    /// Type defaults used when a setpoint row is first created.
    pub fn defaults(device_id: i64) -> Self {
        Self {
            device_id,
            temperature: 24.0,
            mode: AcMode::Off,
            fan_speed: 1,
            humidity_control: false,
            target_humidity: 50,
        }
    }
}

/// Logical lighting setpoint, owned 1:1 by a lighting device.
///
/// Bounds: brightness in [0, 100], color_temperature in [2000, 6500] K.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightingSetpoint {
    /// Owning device.
    pub device_id: i64,
    /// Brightness in percent.
    pub brightness: i64,
    /// Color temperature in Kelvin.
    pub color_temperature: i64,
}

impl LightingSetpoint {
    /// Type defaults used when a setpoint row is first created.
    pub fn defaults(device_id: i64) -> Self {
        Self {
            device_id,
            brightness: 100,
            color_temperature: 2700,
        }
    }
}

/// Either kind of stored setpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Setpoint {
    /// AC setpoint.
    Ac(AcSetpoint),
    /// Lighting setpoint.
    Lighting(LightingSetpoint),
}

/// Partial update to an AC setpoint. Only supplied fields are merged
/// into the stored state before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AcSetpointPatch {
    /// New target temperature, if supplied.
    pub temperature: Option<f64>,
    /// New operating mode, if supplied.
    pub mode: Option<AcMode>,
    /// New fan speed, if supplied.
    pub fan_speed: Option<i64>,
    /// New humidity-control flag, if supplied.
    pub humidity_control: Option<bool>,
    /// New target humidity, if supplied.
    pub target_humidity: Option<i64>,
}

/// Partial update to a lighting setpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LightingSetpointPatch {
    /// New brightness, if supplied.
    pub brightness: Option<i64>,
    /// New color temperature, if supplied.
    pub color_temperature: Option<i64>,
}

/// Patch for either device type; must match the target device's type.
#[derive(Debug, Clone)]
pub enum SetpointPatch {
    /// Patch for an AC device.
    Ac(AcSetpointPatch),
    /// Patch for a lighting device.
    Lighting(LightingSetpointPatch),
}

/// Per-room automation settings, owned 1:1 by a room.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationPolicy {
    /// Owning room.
    pub room_id: i64,
    /// Whether the rule engine may drive the AC.
    pub ac_auto_adjust: bool,
    /// Whether the rule engine may drive the lighting.
    pub lighting_auto_adjust: bool,
    /// Minutes of vacancy before energy-saving kicks in.
    pub presence_timeout: i64,
    /// Target temperature while the room is occupied.
    pub comfort_temperature: f64,
    /// Target temperature while the room is vacant.
    pub energy_saving_temperature: f64,
    /// Last time a transition to occupied was observed.
    pub last_presence_time: Option<DateTime<Utc>>,
}

/// One energy consumption sample for a device. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyRecord {
    /// Row id.
    pub id: i64,
    /// Owning room.
    pub room_id: i64,
    /// Consuming device.
    pub device_id: i64,
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Average power draw in watts over the sample window.
    pub power_usage: f64,
    /// Sample window length in minutes.
    pub duration: i64,
}

impl EnergyRecord {
    /// Energy consumed over the sample window, in kWh.
    pub fn energy_consumed_kwh(&self) -> f64 {
        self.power_usage * self.duration as f64 / 60_000.0
    }
}

/// Aggregated energy usage for a set of records.
#[derive(Debug, Clone, Serialize)]
pub struct EnergySummary {
    /// Sum of power usage over all matching records, in watts.
    pub total_power: f64,
    /// Per-device-type breakdown.
    pub by_device_type: Vec<DeviceTypeUsage>,
}

/// Energy usage aggregated for one device type.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceTypeUsage {
    /// Device type string, e.g. "AC".
    pub device_type: String,
    /// Sum of power usage in watts.
    pub total_usage: f64,
    /// Mean power usage in watts.
    pub average_usage: f64,
    /// Number of records aggregated.
    pub samples: i64,
}

/// Snapshot of a room combining its flags, latest readings and current
/// device setpoints. Served to the command interface.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    /// Human-facing room number.
    pub room_number: String,
    /// Derived occupancy flag.
    pub occupied: bool,
    /// When housekeeping last cleaned the room.
    pub last_cleaned: Option<DateTime<Utc>>,
    /// Most recent IAQ reading, if any.
    pub environmental_data: Option<IaqReading>,
    /// Most recent occupancy reading, if any.
    pub presence_data: Option<OccupancyReading>,
    /// Current AC setpoint, if the room has an AC device.
    pub ac_status: Option<AcSetpoint>,
    /// Current lighting setpoint, if the room has a lighting device.
    pub lighting_status: Option<LightingSetpoint>,
}
