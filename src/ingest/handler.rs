// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Per-message pipeline: decode, persist, derive occupancy, automate.

use tracing::{debug, warn};

use crate::automation::{derive_occupancy, optimize_room};
use crate::error::StoreError;
use crate::events::{decode, SensorKind};
use crate::store::{Database, WriteOutcome};

/// Process one inbound bus message end to end.
///
/// Decode failures are logged and dropped here; they never reach the
/// caller. Persistence failures do reach the caller so the loop can log
/// them, but nothing in this path terminates the loop. Automation
/// failures after a successful write are swallowed with a log line -
/// on the bus path there is no caller to respond to.
pub fn handle_message(db: &Database, topic: &str, payload: &[u8]) -> Result<(), StoreError> {
    let event = match decode(topic, payload) {
        Ok(event) => event,
        Err(err) => {
            warn!(topic, "dropping message: {err}");
            return Ok(());
        }
    };

    match event.kind {
        SensorKind::Iaq(payload) => {
            if let WriteOutcome::Stored(reading) = db.write_iaq(&event.room_id, &payload)? {
                debug!(room = reading.room_id, id = reading.id, "iaq reading stored");
            }
        }
        SensorKind::LifeBeing(payload) => {
            if let WriteOutcome::Stored(reading) = db.write_occupancy(&event.room_id, &payload)? {
                debug!(
                    room = reading.room_id,
                    id = reading.id,
                    "occupancy reading stored"
                );
                // Derivation must complete before automation so the rule
                // engine never sees a stale occupancy flag.
                derive_occupancy(db, &reading)?;
                if let Err(err) = optimize_room(db, reading.room_id) {
                    warn!(room = reading.room_id, "automation failed: {err}");
                }
            }
        }
    }

    Ok(())
}
