//! Lanes, lane-change intents and per-wave lane occupancy
//!
//! Z intervals are half-open `[start, end)`: two obstacles that merely touch
//! do not occupy the same stretch of a lane.

use serde::{Deserialize, Serialize};

/// One of the three lateral lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Position in `[left, center, right]` tables
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Center => 1,
            Lane::Right => 2,
        }
    }

    /// Lane center x from a `[left, center, right]` table
    #[inline]
    pub fn x(self, centers: &[f32; 3]) -> f32 {
        centers[self.index()]
    }

    /// Neighbouring lane in `direction`. Left and right are only reachable
    /// from center, and center only from left or right.
    pub fn shifted(self, direction: LaneDirection) -> Option<Lane> {
        match (self, direction) {
            (Lane::Center, LaneDirection::Left) => Some(Lane::Left),
            (Lane::Center, LaneDirection::Right) => Some(Lane::Right),
            (Lane::Left, LaneDirection::Right) => Some(Lane::Center),
            (Lane::Right, LaneDirection::Left) => Some(Lane::Center),
            _ => None,
        }
    }
}

/// Lane-change intent produced by the input collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneDirection {
    Left,
    Right,
}

/// Half-open stretch of track along z
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZInterval {
    pub start: f32,
    pub end: f32,
}

impl ZInterval {
    pub fn new(start: f32, end: f32) -> Self {
        debug_assert!(start <= end, "interval start {start} past end {end}");
        Self { start, end }
    }

    #[inline]
    pub fn overlaps(&self, other: &ZInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Intervals committed to each lane during one wave's planning pass
#[derive(Debug, Clone, Default)]
pub struct LaneOccupancy {
    lanes: [Vec<ZInterval>; 3],
}

impl LaneOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `interval` as blocked in `lane`
    pub fn occupy(&mut self, lane: Lane, interval: ZInterval) {
        self.lanes[lane.index()].push(interval);
    }

    /// True if nothing recorded in `lane` overlaps `interval`
    pub fn is_free(&self, lane: Lane, interval: &ZInterval) -> bool {
        !self.lanes[lane.index()]
            .iter()
            .any(|occupied| occupied.overlaps(interval))
    }

    /// Lanes with nothing overlapping `interval`, in left-to-right order
    pub fn free_lanes(&self, interval: &ZInterval) -> Vec<Lane> {
        Lane::ALL
            .into_iter()
            .filter(|&lane| self.is_free(lane, interval))
            .collect()
    }

    pub fn intervals(&self, lane: Lane) -> &[ZInterval] {
        &self.lanes[lane.index()]
    }
}
