//! Snapshot of the simulated agent, as reported by a simulator after each step.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{ElevationTier, ViewIndex};

/// A 3‑D position `(x, y, z)` in the scan's world frame (m).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// World‑frame x position (m).
    pub x: f64,
    /// World‑frame y position (m).
    pub y: f64,
    /// World‑frame z position (m).
    pub z: f64,
}

impl Position {
    /// Construct a new position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, z: {:.2})", self.x, self.y, self.z)
    }
}

/// A viewpoint the agent can reach in one move from its current pose.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NavigableLocation {
    /// Identifier of the viewpoint reached by moving to this location.
    pub viewpoint: String,
    /// Heading of the location relative to the camera heading (rad, `[-π, π)`).
    /// Positive values lie to the right.
    pub rel_heading: f64,
    /// Elevation of the location relative to the camera elevation (rad).
    /// Positive values lie above.
    pub rel_elevation: f64,
}

/// The agent state reported by a simulator.
///
/// Planners only ever read these snapshots; the state changes solely through
/// commands issued back to the simulator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    /// Scan (building) the agent is in.
    pub scan: String,
    /// Viewpoint the agent stands at.
    pub viewpoint: String,
    /// Camera heading (rad), in `[0, 2π)`, clockwise from the +y axis.
    pub heading: f64,
    /// Camera elevation (rad), positive looking up.
    pub elevation: f64,
    /// Discrete view the camera currently shows.
    pub view_index: ViewIndex,
    /// Number of actions taken since the episode started.
    pub step: usize,
    /// World position of the current viewpoint.
    pub position: Position,
    /// Locations reachable in one move. By simulator convention entry `0` is
    /// the current viewpoint itself.
    pub navigable_locations: Vec<NavigableLocation>,
}

impl AgentState {
    /// The elevation tier of the current view.
    pub fn tier(&self) -> ElevationTier {
        self.view_index.tier()
    }

    /// Index of `viewpoint` among the navigable locations, if it is reachable.
    pub fn location_index(&self, viewpoint: &str) -> Option<usize> {
        self.navigable_locations
            .iter()
            .position(|loc| loc.viewpoint == viewpoint)
    }
}
