// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Command dispatch: a small structured-command surface over the store
//! and the bus.
//!
//! Commands arrive as JSON, tagged by `action`. An `api_call` addresses
//! an internal endpoint by path; a `mqtt_publish` hands a raw message to
//! the bus. The POST data endpoints are an ingestion mirror of the bus
//! path and share its derivation and automation steps, but unlike the
//! bus path they surface failures to the caller.

use std::sync::Arc;

use rumqttc::{AsyncClient, QoS};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::automation::{apply_policy, derive_occupancy, optimize_room};
use crate::error::StoreError;
use crate::events::{IaqPayload, LifeBeingPayload};
use crate::model::{AcSetpointPatch, DeviceType, Room, RoomStatus, SetpointPatch};
use crate::store::Database;

/// A command as received from an operator or integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Invoke an internal endpoint.
    ApiCall {
        /// HTTP-style method, e.g. "GET" or "POST".
        method: String,
        /// Endpoint path, e.g. "/api/rooms/204/status".
        endpoint: String,
        /// Endpoint parameters or request body.
        #[serde(default)]
        params: Value,
    },
    /// Publish a raw message on the bus.
    MqttPublish {
        /// Destination topic.
        topic: String,
        /// Payload, serialized as compact JSON before publishing.
        payload: Value,
    },
}

/// Failures surfaced to the command caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No such method/endpoint combination.
    #[error("unsupported endpoint: {method} {endpoint}")]
    UnsupportedEndpoint {
        /// Requested method.
        method: String,
        /// Requested endpoint path.
        endpoint: String,
    },
    /// The addressed room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(String),
    /// The room has no device of the required type.
    #[error("room {0} has no {1} device")]
    DeviceNotFound(String, &'static str),
    /// Parameters did not match the endpoint's expected shape.
    #[error("bad parameters: {0}")]
    BadParams(#[from] serde_json::Error),
    /// Storage or validation failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The bus rejected the publish.
    #[error("publish failed: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

/// Routes commands to the store and the bus.
pub struct Dispatcher {
    db: Arc<Database>,
    bus: AsyncClient,
}

impl Dispatcher {
    /// Build a dispatcher over the shared store and bus client.
    pub fn new(db: Arc<Database>, bus: AsyncClient) -> Self {
        Self { db, bus }
    }

    /// Execute one command, returning its JSON result.
    pub async fn dispatch(&self, command: Command) -> Result<Value, DispatchError> {
        match command {
            Command::ApiCall {
                method,
                endpoint,
                params,
            } => self.api_call(&method, &endpoint, params),
            Command::MqttPublish { topic, payload } => {
                let body = serde_json::to_vec(&payload)?;
                self.bus
                    .publish(&topic, QoS::AtLeastOnce, false, body)
                    .await?;
                info!(topic, "published command message");
                Ok(json!({ "published": true }))
            }
        }
    }

    fn api_call(&self, method: &str, endpoint: &str, params: Value) -> Result<Value, DispatchError> {
        let mut segments: Vec<&str> = endpoint
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        // Room endpoints exist in both "/api/rooms/{n}/..." and the
        // longer "/api/rooms/by-number/{n}/..." spelling.
        if segments.get(2) == Some(&"by-number") {
            segments.remove(2);
        }
        let method_upper = method.to_uppercase();

        match (method_upper.as_str(), segments.as_slice()) {
            ("GET", ["api", "rooms", number, "status"]) => {
                let room = self.room_by_number(number)?;
                Ok(serde_json::to_value(self.room_status(&room)?)?)
            }
            ("GET", ["api", "rooms", number, "energy-report"]) => {
                let room = self.room_by_number(number)?;
                let days = days_param(&params);
                let summary = self.db.energy_summary(Some(room.id), days)?;
                Ok(json!({
                    "room_number": room.number,
                    "period_days": days,
                    "summary": summary,
                }))
            }
            ("GET", ["api", "energy", "summary"]) => {
                let days = days_param(&params);
                let summary = self.db.energy_summary(None, days)?;
                Ok(json!({ "period_days": days, "summary": summary }))
            }
            ("POST", ["api", "rooms", number, "ac", "control"]) => {
                let room = self.room_by_number(number)?;
                let device = self
                    .db
                    .device_for_room(room.id, DeviceType::Ac)?
                    .ok_or_else(|| DispatchError::DeviceNotFound(number.to_string(), "AC"))?;
                let patch: AcSetpointPatch = serde_json::from_value(params)?;
                let setpoint = self
                    .db
                    .apply_partial_update(device.id, &SetpointPatch::Ac(patch))?;
                Ok(serde_json::to_value(setpoint)?)
            }
            ("POST", ["api", "rooms", number, "automation", "apply"]) => {
                let room = self.room_by_number(number)?;
                let outcome = apply_policy(&self.db, room.id)?;
                Ok(json!({
                    "ac": outcome.ac,
                    "lighting": outcome.lighting,
                }))
            }
            ("GET", ["api", "rooms", number, "data", "iaq"]) => {
                let room = self.room_by_number(number)?;
                Ok(serde_json::to_value(self.db.latest_iaq(room.id)?)?)
            }
            ("GET", ["api", "rooms", number, "data", "life-being"]) => {
                let room = self.room_by_number(number)?;
                Ok(serde_json::to_value(self.db.latest_occupancy(room.id)?)?)
            }
            ("POST", ["api", "rooms", number, "data", "iaq"]) => {
                let room = self.room_by_number(number)?;
                let payload: IaqPayload = serde_json::from_value(params)?;
                let reading = self
                    .db
                    .write_iaq(&room.id.to_string(), &payload)?
                    .stored()
                    .ok_or_else(|| DispatchError::RoomNotFound(number.to_string()))?;
                Ok(serde_json::to_value(reading)?)
            }
            ("POST", ["api", "rooms", number, "data", "life-being"]) => {
                let room = self.room_by_number(number)?;
                let payload: LifeBeingPayload = serde_json::from_value(params)?;
                let reading = self
                    .db
                    .write_occupancy(&room.id.to_string(), &payload)?
                    .stored()
                    .ok_or_else(|| DispatchError::RoomNotFound(number.to_string()))?;
                // Same pipeline as the bus path, but failures here are
                // the caller's to see.
                derive_occupancy(&self.db, &reading)?;
                optimize_room(&self.db, reading.room_id)?;
                Ok(serde_json::to_value(reading)?)
            }
            _ => {
                warn!(method = %method_upper, endpoint, "unsupported endpoint");
                Err(DispatchError::UnsupportedEndpoint {
                    method: method_upper,
                    endpoint: endpoint.to_string(),
                })
            }
        }
    }

    fn room_by_number(&self, number: &str) -> Result<Room, DispatchError> {
        self.db
            .room_by_number(number)?
            .ok_or_else(|| DispatchError::RoomNotFound(number.to_string()))
    }

    fn room_status(&self, room: &Room) -> Result<RoomStatus, StoreError> {
        let ac_status = match self.db.device_for_room(room.id, DeviceType::Ac)? {
            Some(device) => self.db.ac_setpoint(device.id)?,
            None => None,
        };
        let lighting_status = match self.db.device_for_room(room.id, DeviceType::Lighting)? {
            Some(device) => self.db.lighting_setpoint(device.id)?,
            None => None,
        };
        Ok(RoomStatus {
            room_number: room.number.clone(),
            occupied: room.occupied,
            last_cleaned: room.last_cleaned,
            environmental_data: self.db.latest_iaq(room.id)?,
            presence_data: self.db.latest_occupancy(room.id)?,
            ac_status,
            lighting_status,
        })
    }
}

fn days_param(params: &Value) -> i64 {
    params.get("days").and_then(Value::as_i64).unwrap_or(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AcMode;
    use rumqttc::MqttOptions;

    fn dispatcher() -> (Dispatcher, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        // A client whose eventloop is never polled; requests queue up
        // in its channel, which is all these tests need.
        let (bus, _eventloop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 10);
        (Dispatcher::new(db.clone(), bus), db)
    }

    #[test]
    fn commands_parse_from_tagged_json() {
        let command: Command = serde_json::from_str(
            r#"{"action": "api_call", "method": "GET",
                "endpoint": "/api/rooms/204/status"}"#,
        )
        .unwrap();
        match command {
            Command::ApiCall {
                method,
                endpoint,
                params,
            } => {
                assert_eq!(method, "GET");
                assert_eq!(endpoint, "/api/rooms/204/status");
                assert!(params.is_null());
            }
            _ => panic!("expected api_call"),
        }

        let command: Command = serde_json::from_str(
            r#"{"action": "mqtt_publish", "topic": "hotel/room/1/iaq",
                "payload": {"temperature": 21.0}}"#,
        )
        .unwrap();
        assert!(matches!(command, Command::MqttPublish { .. }));
    }

    #[tokio::test]
    async fn ac_control_applies_a_partial_update() {
        let (dispatcher, db) = dispatcher();
        let room = db.create_room("204", 2).unwrap();
        let device = db.ensure_device(room.id, DeviceType::Ac, "AC").unwrap();
        db.get_or_create_ac_setpoint(device.id).unwrap();

        let result = dispatcher
            .dispatch(Command::ApiCall {
                method: "POST".into(),
                endpoint: "/api/rooms/204/ac/control".into(),
                params: json!({ "temperature": 21.0, "mode": "COOL" }),
            })
            .await
            .unwrap();

        assert_eq!(result["temperature"], 21.0);
        assert_eq!(result["mode"], "COOL");
        let setpoint = db.ac_setpoint(device.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Cool);
        // Unpatched fields keep their stored values.
        assert_eq!(setpoint.fan_speed, 1);
    }

    #[tokio::test]
    async fn ac_control_rejects_out_of_bounds() {
        let (dispatcher, db) = dispatcher();
        let room = db.create_room("204", 2).unwrap();
        let device = db.ensure_device(room.id, DeviceType::Ac, "AC").unwrap();
        db.get_or_create_ac_setpoint(device.id).unwrap();

        let err = dispatcher
            .dispatch(Command::ApiCall {
                method: "POST".into(),
                endpoint: "/api/rooms/204/ac/control".into(),
                params: json!({ "temperature": 45.0 }),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Store(StoreError::Validation(_))
        ));
        // The stored setpoint is untouched.
        let setpoint = db.ac_setpoint(device.id).unwrap().unwrap();
        assert_eq!(setpoint.temperature, 24.0);
    }

    #[tokio::test]
    async fn room_status_combines_latest_state() {
        let (dispatcher, db) = dispatcher();
        let room = db.create_room("204", 2).unwrap();
        let device = db.ensure_device(room.id, DeviceType::Ac, "AC").unwrap();
        db.get_or_create_ac_setpoint(device.id).unwrap();
        db.write_iaq(
            &room.id.to_string(),
            &IaqPayload {
                temperature: Some(22.5),
                ..Default::default()
            },
        )
        .unwrap();

        let result = dispatcher
            .dispatch(Command::ApiCall {
                method: "GET".into(),
                endpoint: "/api/rooms/by-number/204/status/".into(),
                params: Value::Null,
            })
            .await
            .unwrap();

        assert_eq!(result["room_number"], "204");
        assert_eq!(result["occupied"], false);
        assert_eq!(result["environmental_data"]["temperature"], 22.5);
        assert_eq!(result["presence_data"], Value::Null);
        assert_eq!(result["ac_status"]["temperature"], 24.0);
        assert_eq!(result["lighting_status"], Value::Null);
    }

    #[tokio::test]
    async fn posting_life_being_data_runs_the_full_pipeline() {
        let (dispatcher, db) = dispatcher();
        let room = db.create_room("204", 2).unwrap();
        let device = db.ensure_device(room.id, DeviceType::Ac, "AC").unwrap();
        db.get_or_create_ac_setpoint(device.id).unwrap();

        dispatcher
            .dispatch(Command::ApiCall {
                method: "POST".into(),
                endpoint: "/api/rooms/204/data/iaq".into(),
                params: json!({ "temperature": 27.0 }),
            })
            .await
            .unwrap();
        dispatcher
            .dispatch(Command::ApiCall {
                method: "POST".into(),
                endpoint: "/api/rooms/204/data/life-being".into(),
                params: json!({ "presence_detected": true }),
            })
            .await
            .unwrap();

        assert!(db.room(room.id).unwrap().unwrap().occupied);
        let setpoint = db.ac_setpoint(device.id).unwrap().unwrap();
        assert_eq!(setpoint.mode, AcMode::Cool);
    }

    #[tokio::test]
    async fn energy_report_scopes_to_the_room() {
        let (dispatcher, db) = dispatcher();
        let room = db.create_room("204", 2).unwrap();
        let other = db.create_room("205", 2).unwrap();
        let ac = db.ensure_device(room.id, DeviceType::Ac, "AC").unwrap();
        let other_ac = db.ensure_device(other.id, DeviceType::Ac, "AC").unwrap();
        let now = chrono::Utc::now();
        db.record_energy(room.id, ac.id, 300.0, 60, now).unwrap();
        db.record_energy(other.id, other_ac.id, 999.0, 60, now).unwrap();

        let result = dispatcher
            .dispatch(Command::ApiCall {
                method: "GET".into(),
                endpoint: "/api/rooms/204/energy-report".into(),
                params: json!({ "days": 1 }),
            })
            .await
            .unwrap();
        assert_eq!(result["room_number"], "204");
        assert_eq!(result["summary"]["total_power"], 300.0);

        let result = dispatcher
            .dispatch(Command::ApiCall {
                method: "GET".into(),
                endpoint: "/api/energy/summary".into(),
                params: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(result["summary"]["total_power"], 1299.0);
    }

    #[tokio::test]
    async fn unknown_endpoint_and_room_are_distinct_errors() {
        let (dispatcher, db) = dispatcher();
        db.create_room("204", 2).unwrap();

        let err = dispatcher
            .dispatch(Command::ApiCall {
                method: "GET".into(),
                endpoint: "/api/rooms/999/status".into(),
                params: Value::Null,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::RoomNotFound(_)));

        let err = dispatcher
            .dispatch(Command::ApiCall {
                method: "DELETE".into(),
                endpoint: "/api/rooms/204/status".into(),
                params: Value::Null,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedEndpoint { .. }));
    }
}
