//! Dining table and seat models

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Seat number `0` is the group sentinel: the whole table billed as one unit.
pub const GROUP_SEAT: u32 = 0;

/// Table occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Free,
    Occupied,
    Reserved,
}

/// Dining table entity
///
/// Created and destroyed server-side; the client only reads snapshots and
/// mutates indirectly through server-confirmed order/transfer operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub name: String,
    pub status: TableStatus,
    #[serde(default = "default_chairs")]
    pub chairs: u32,
    /// Occupied seat numbers. Contains `0` alone when the table is in group
    /// mode; group and per-seat occupancy never mix.
    #[serde(default)]
    pub occupied_seats: Vec<u32>,
    /// Amount owed, present while occupied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

fn default_chairs() -> u32 {
    4
}

impl Table {
    /// Whole table billed as one group (seat `0` occupied).
    pub fn is_group(&self) -> bool {
        self.occupied_seats.contains(&GROUP_SEAT)
    }

    pub fn has_occupied_seats(&self) -> bool {
        !self.occupied_seats.is_empty()
    }

    /// Occupied individual seats, sorted. Empty in group mode.
    pub fn occupied_individuals(&self) -> Vec<u32> {
        let mut seats: Vec<u32> = self
            .occupied_seats
            .iter()
            .copied()
            .filter(|&s| s != GROUP_SEAT)
            .collect();
        seats.sort_unstable();
        seats
    }
}

/// Per-seat status inside a [`SeatMap`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeatStatus {
    #[serde(default)]
    pub amount: f64,
}

/// Seat occupancy map for one table: seat-number-string → status.
/// The `"0"` key carries the group entry. Absent seats are free.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatMap(pub HashMap<String, SeatStatus>);

impl SeatMap {
    pub fn group(&self) -> Option<&SeatStatus> {
        self.0.get("0")
    }

    pub fn seat(&self, number: u32) -> Option<&SeatStatus> {
        self.0.get(&number.to_string())
    }

    /// Occupied individual seat numbers (excluding the group entry), sorted.
    pub fn occupied_individuals(&self) -> Vec<u32> {
        let mut seats: Vec<u32> = self
            .0
            .keys()
            .filter_map(|k| k.parse::<u32>().ok())
            .filter(|&s| s != GROUP_SEAT)
            .collect();
        seats.sort_unstable();
        seats
    }
}
