// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Event decoder: raw bus messages to typed sensor events.
//!
//! Producers publish JSON payloads on `hotel/room/{room_id}/{sensor_type}`
//! where `sensor_type` is `iaq` or `life_being`. Every payload field is
//! optional; defaults are applied at write time by the reading store, not
//! here. The room id is carried through as an opaque string and only
//! resolved against provisioned rooms on write.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// IAQ payload as it appears on the wire. All fields optional; unknown
/// fields (producers include a redundant `room` field) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IaqPayload {
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
    /// Sensor online flag.
    pub online_status: Option<bool>,
    /// Sensor self-reported status string.
    pub device_status: Option<String>,
}

/// Life-being (occupancy) payload as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeBeingPayload {
    /// Whether a person was detected.
    pub presence_detected: Option<bool>,
    /// Motion intensity in [0, 100].
    pub motion_level: Option<i64>,
    /// Sensor's occupied/unoccupied classification.
    pub presence_state: Option<String>,
    /// Sensor sensitivity setting.
    pub sensitivity: Option<f64>,
    /// Sensor online flag.
    pub online_status: Option<bool>,
}

/// Decoded payload, tagged by the sensor type from the topic.
#[derive(Debug, Clone)]
pub enum SensorKind {
    /// Indoor-air-quality reading.
    Iaq(IaqPayload),
    /// Occupancy reading.
    LifeBeing(LifeBeingPayload),
}

/// A typed sensor event decoded from one bus message.
#[derive(Debug, Clone)]
pub struct SensorEvent {
    /// Room id from the topic; opaque until resolved by the store.
    pub room_id: String,
    /// Decoded payload.
    pub kind: SensorKind,
}

/// Decode a raw bus message into a [`SensorEvent`].
///
/// The topic is split on `/`; fewer than four segments is a
/// [`DecodeError::MalformedTopic`]. Segment 2 is the room id, segment 3
/// the sensor type. Unparseable JSON yields
/// [`DecodeError::MalformedPayload`], an unrecognized sensor type
/// [`DecodeError::UnknownSensorType`]. All three are dropped by the
/// caller with a log line, never treated as fatal.
pub fn decode(topic: &str, payload: &[u8]) -> Result<SensorEvent, DecodeError> {
    let segments: Vec<&str> = topic.split('/').collect();
    if segments.len() < 4 {
        return Err(DecodeError::MalformedTopic(topic.to_string()));
    }

    let room_id = segments[2].to_string();
    let kind = match segments[3] {
        "iaq" => SensorKind::Iaq(serde_json::from_slice(payload)?),
        "life_being" => SensorKind::LifeBeing(serde_json::from_slice(payload)?),
        other => return Err(DecodeError::UnknownSensorType(other.to_string())),
    };

    Ok(SensorEvent { room_id, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_iaq_message() {
        let payload = br#"{"temperature": 22.5, "co2": 612.0, "online_status": true}"#;
        let event = decode("hotel/room/7/iaq", payload).unwrap();
        assert_eq!(event.room_id, "7");
        match event.kind {
            SensorKind::Iaq(p) => {
                assert_eq!(p.temperature, Some(22.5));
                assert_eq!(p.co2, Some(612.0));
                assert_eq!(p.humidity, None);
                assert_eq!(p.online_status, Some(true));
            }
            _ => panic!("expected iaq payload"),
        }
    }

    #[test]
    fn decodes_life_being_message() {
        let payload = br#"{"presence_detected": true, "motion_level": 42}"#;
        let event = decode("hotel/room/12/life_being", payload).unwrap();
        match event.kind {
            SensorKind::LifeBeing(p) => {
                assert_eq!(p.presence_detected, Some(true));
                assert_eq!(p.motion_level, Some(42));
                assert_eq!(p.presence_state, None);
            }
            _ => panic!("expected life_being payload"),
        }
    }

    #[test]
    fn ignores_extra_payload_fields() {
        // Producers include a redundant "room" field alongside the data.
        let payload = br#"{"room": "3", "temperature": 20.0}"#;
        let event = decode("hotel/room/3/iaq", payload).unwrap();
        match event.kind {
            SensorKind::Iaq(p) => assert_eq!(p.temperature, Some(20.0)),
            _ => panic!("expected iaq payload"),
        }
    }

    #[test]
    fn short_topic_is_malformed() {
        let err = decode("hotel/room/5", b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTopic(_)));
    }

    #[test]
    fn unknown_sensor_type_is_not_fatal_classification() {
        let err = decode("hotel/room/5/co2", b"{}").unwrap_err();
        match err {
            DecodeError::UnknownSensorType(t) => assert_eq!(t, "co2"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed_payload() {
        let err = decode("hotel/room/5/iaq", b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload(_)));
    }

    #[test]
    fn empty_payload_fields_default_to_none() {
        let event = decode("hotel/room/5/life_being", b"{}").unwrap();
        match event.kind {
            SensorKind::LifeBeing(p) => {
                assert_eq!(p.presence_detected, None);
                assert_eq!(p.motion_level, None);
                assert_eq!(p.sensitivity, None);
            }
            _ => panic!("expected life_being payload"),
        }
    }
}
