// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Derived state: room occupancy and rule-based device setpoints.

mod occupancy;
mod rules;

pub use occupancy::{derive_occupancy, OccupancyChange};
pub use rules::{apply_policy, optimize_room, PolicyOutcome, DEFAULT_COMFORT_TEMPERATURE};
