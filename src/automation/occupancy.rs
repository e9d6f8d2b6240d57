// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Occupancy derivation: the room's `occupied` flag follows the most
//! recent occupancy reading.
//!
//! Runs exactly once per accepted occupancy write, synchronously, before
//! the rule engine - automation must never see a stale occupancy flag
//! for the event that triggered it.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::StoreError;
use crate::model::OccupancyReading;
use crate::store::Database;

/// A state-change notification emitted on an actual occupancy
/// transition, and only then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyChange {
    /// Room whose flag changed.
    pub room_id: i64,
    /// New occupancy value.
    pub occupied: bool,
    /// Timestamp of the reading that caused the transition.
    pub at: DateTime<Utc>,
}

/// Update the room's derived occupancy flag from a just-written reading.
///
/// Idempotent: a reading that matches the current flag writes nothing
/// and returns `None`. On a transition to occupied the transition time
/// is recorded into the room's automation policy.
pub fn derive_occupancy(
    db: &Database,
    reading: &OccupancyReading,
) -> Result<Option<OccupancyChange>, StoreError> {
    let Some(room) = db.room(reading.room_id)? else {
        return Ok(None);
    };

    if room.occupied == reading.presence_detected {
        return Ok(None);
    }

    db.set_room_occupied(room.id, reading.presence_detected)?;
    if reading.presence_detected {
        db.mark_presence(room.id, reading.timestamp)?;
    }

    info!(
        room = room.id,
        occupied = reading.presence_detected,
        "room occupancy changed"
    );
    Ok(Some(OccupancyChange {
        room_id: room.id,
        occupied: reading.presence_detected,
        at: reading.timestamp,
    }))
}
