// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Demo mode: provisions sample rooms and runs per-room producer tasks
//! that publish randomized sensor messages on the bus.
//!
//! Producers exercise the real ingestion path end to end; nothing in
//! here writes readings directly.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rumqttc::{AsyncClient, QoS};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DemoConfig;
use crate::error::StoreError;
use crate::model::{DeviceType, Room};
use crate::store::Database;

/// Provision `count` sample rooms with an AC and a lighting device each,
/// default setpoints, a default policy and a week of sample energy
/// records. Rooms that already exist are left untouched.
pub fn provision_rooms(db: &Database, count: u32) -> Result<Vec<Room>, StoreError> {
    let mut rng = StdRng::from_entropy();
    let mut rooms = Vec::new();

    for n in 0..count {
        let floor = i64::from(n / 10) + 1;
        let number = (floor * 100 + i64::from(n % 10) + 1).to_string();

        if let Some(existing) = db.room_by_number(&number)? {
            debug!(room = %number, "room already provisioned");
            rooms.push(existing);
            continue;
        }

        let room = db.create_room(&number, floor)?;
        let ac = db.ensure_device(room.id, DeviceType::Ac, &format!("AC Unit - Room {number}"))?;
        let light = db.ensure_device(
            room.id,
            DeviceType::Lighting,
            &format!("Lighting - Room {number}"),
        )?;
        db.get_or_create_ac_setpoint(ac.id)?;
        db.get_or_create_lighting_setpoint(light.id)?;
        db.get_or_create_policy(room.id)?;

        // A week of hourly-ish history so energy reports have something
        // to aggregate from the first run.
        let now = chrono::Utc::now();
        for day in 0..7 {
            for hour in [2, 8, 14, 20] {
                let at = now - chrono::Duration::days(day) - chrono::Duration::hours(hour);
                db.record_energy(room.id, ac.id, rng.gen_range(100.0..500.0), 60, at)?;
                db.record_energy(room.id, light.id, rng.gen_range(10.0..60.0), 60, at)?;
            }
        }

        info!(room = %number, id = room.id, "provisioned demo room");
        rooms.push(room);
    }

    Ok(rooms)
}

/// Spawn one producer task per room. Each publishes an IAQ and a
/// life-being message every interval until the shutdown channel fires.
pub fn spawn_producers(
    bus: &AsyncClient,
    rooms: &[Room],
    config: &DemoConfig,
    shutdown: &broadcast::Sender<()>,
) -> Vec<JoinHandle<()>> {
    let interval = Duration::from_secs(config.publish_interval_secs);
    rooms
        .iter()
        .map(|room| {
            let bus = bus.clone();
            let room_id = room.id;
            let mut shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                // ThreadRng is not Send across awaits; seed a StdRng per
                // task instead.
                let mut rng = StdRng::from_entropy();
                loop {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            debug!(room = room_id, "producer stopping");
                            return;
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }
                    if let Err(err) = publish_samples(&bus, room_id, &mut rng).await {
                        warn!(room = room_id, "producer publish failed: {err}");
                    }
                }
            })
        })
        .collect()
}

async fn publish_samples(
    bus: &AsyncClient,
    room_id: i64,
    rng: &mut StdRng,
) -> Result<(), rumqttc::ClientError> {
    let iaq = json!({
        "room": room_id.to_string(),
        "temperature": round1(rng.gen_range(18.0..26.0)),
        "humidity": round1(rng.gen_range(30.0..70.0)),
        "co2": round1(rng.gen_range(400.0..1000.0)),
        "tvoc": round1(rng.gen_range(0.0..1.0)),
        "pm25": round1(rng.gen_range(0.0..100.0)),
        "noise": round1(rng.gen_range(30.0..60.0)),
        "illuminance": round1(rng.gen_range(100.0..1000.0)),
        "online_status": true,
        "device_status": "operational",
    });
    bus.publish(
        format!("hotel/room/{room_id}/iaq"),
        QoS::AtLeastOnce,
        false,
        iaq.to_string(),
    )
    .await?;

    let present = rng.gen_bool(0.6);
    let life_being = json!({
        "room": room_id.to_string(),
        "presence_detected": present,
        "motion_level": if present { rng.gen_range(1..=100) } else { 0 },
        "presence_state": if present { "occupied" } else { "unoccupied" },
        "sensitivity": round1(rng.gen_range(0.5..1.0)),
        "online_status": true,
    });
    bus.publish(
        format!("hotel/room/{room_id}/life_being"),
        QoS::AtLeastOnce,
        false,
        life_being.to_string(),
    )
    .await?;

    Ok(())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_creates_rooms_devices_and_history() {
        let db = Database::open_in_memory().unwrap();
        let rooms = provision_rooms(&db, 4).unwrap();
        assert_eq!(rooms.len(), 4);
        assert_eq!(rooms[0].number, "101");
        assert_eq!(rooms[3].number, "104");

        for room in &rooms {
            let ac = db.device_for_room(room.id, DeviceType::Ac).unwrap().unwrap();
            assert!(db.ac_setpoint(ac.id).unwrap().is_some());
            let light = db
                .device_for_room(room.id, DeviceType::Lighting)
                .unwrap()
                .unwrap();
            assert!(db.lighting_setpoint(light.id).unwrap().is_some());
        }

        let summary = db.energy_summary(Some(rooms[0].id), 30).unwrap();
        assert_eq!(summary.by_device_type.len(), 2);
        assert!(summary.total_power > 0.0);
    }

    #[test]
    fn provisioning_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = provision_rooms(&db, 2).unwrap();
        let second = provision_rooms(&db, 2).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(db.all_rooms().unwrap().len(), 2);
    }

    #[test]
    fn rooms_spill_onto_higher_floors() {
        let db = Database::open_in_memory().unwrap();
        let rooms = provision_rooms(&db, 12).unwrap();
        assert_eq!(rooms[9].number, "110");
        assert_eq!(rooms[10].number, "201");
        assert_eq!(rooms[10].floor, 2);
    }
}
