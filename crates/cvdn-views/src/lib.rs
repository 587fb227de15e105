#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for discretized panorama views."]
#![doc = ""]
#![doc = "This crate maps continuous camera orientations onto the 36 discrete views of a"]
#![doc = "panorama viewpoint (12 headings × 3 elevation tiers) and defines the agent state"]
#![doc = "and action vocabulary shared by the planner and the simulator."]

extern crate alloc;

use core::f64::consts::PI;
use core::fmt;
use libm::round;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod action;
pub mod error;
pub mod state;

pub use action::{ActionCommand, ActionRecord, Command};
pub use error::ViewError;
pub use state::{AgentState, NavigableLocation, Position};

/// Number of discrete headings around a viewpoint.
pub const HEADING_COUNT: u8 = 12;

/// Number of discrete views at a viewpoint.
pub const VIEW_COUNT: u8 = 36;

/// Angular width of one heading bucket (30°).
pub const HEADING_INCREMENT: f64 = PI * 2.0 / HEADING_COUNT as f64;

/// Angular height of one elevation tier (30°).
pub const ELEVATION_INCREMENT: f64 = PI / 6.0;

/// Vertical band of the camera, from looking down to looking up.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElevationTier {
    /// Camera pitched down by one increment.
    Low = 0,
    /// Camera level with the horizon.
    Level = 1,
    /// Camera pitched up by one increment.
    High = 2,
}

impl ElevationTier {
    /// Returns the tier with the given index (0, 1 or 2), if any.
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ElevationTier::Low),
            1 => Some(ElevationTier::Level),
            2 => Some(ElevationTier::High),
            _ => None,
        }
    }

    /// Returns the tier index, `0` for [`ElevationTier::Low`] up to `2` for [`ElevationTier::High`].
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Classifies a continuous elevation (rad) into a tier.
    ///
    /// Elevations exactly at `±ELEVATION_INCREMENT / 2` belong to the level tier.
    pub fn from_elevation(elevation: f64) -> Self {
        if elevation < -ELEVATION_INCREMENT / 2.0 {
            ElevationTier::Low
        } else if elevation > ELEVATION_INCREMENT / 2.0 {
            ElevationTier::High
        } else {
            ElevationTier::Level
        }
    }

    /// The elevation (rad) at the center of this tier.
    pub fn elevation(self) -> f64 {
        (self.index() as f64 - 1.0) * ELEVATION_INCREMENT
    }
}

/// One of the 36 discrete views at a viewpoint.
///
/// Encoded as `tier * 12 + heading_bucket`, so indices `0..12` look down,
/// `12..24` look level and `24..36` look up.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ViewIndex(u8);

impl ViewIndex {
    /// Construct a view index, checking that it lies in `[0, 36)`.
    ///
    /// # Errors
    ///
    /// Returns `Err(ViewError::InvalidViewIndex)` for indices of 36 and above.
    pub const fn new(index: u8) -> Result<Self, ViewError> {
        if index >= VIEW_COUNT {
            return Err(ViewError::InvalidViewIndex(index as u32));
        }
        Ok(ViewIndex(index))
    }

    /// Construct a view index from its heading bucket and elevation tier.
    ///
    /// `heading_bucket` is taken modulo 12.
    pub const fn from_parts(heading_bucket: u8, tier: ElevationTier) -> Self {
        ViewIndex(tier.index() * HEADING_COUNT + heading_bucket % HEADING_COUNT)
    }

    /// The raw index in `[0, 36)`.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The heading bucket in `[0, 12)`.
    pub const fn heading_bucket(self) -> u8 {
        self.0 % HEADING_COUNT
    }

    /// The elevation tier of this view.
    pub const fn tier(self) -> ElevationTier {
        match self.0 / HEADING_COUNT {
            0 => ElevationTier::Low,
            1 => ElevationTier::Level,
            _ => ElevationTier::High,
        }
    }

    /// The heading (rad) at the center of this view, in `[0, 2π)`.
    pub fn heading(self) -> f64 {
        self.heading_bucket() as f64 * HEADING_INCREMENT
    }

    /// The elevation (rad) at the center of this view.
    pub fn elevation(self) -> f64 {
        self.tier().elevation()
    }
}

impl TryFrom<u8> for ViewIndex {
    type Error = ViewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ViewIndex::new(value)
    }
}

impl From<ViewIndex> for u8 {
    fn from(view: ViewIndex) -> Self {
        view.0
    }
}

impl fmt::Display for ViewIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a continuous camera orientation onto its discrete view.
///
/// The heading bucket is `round(heading / 30°) mod 12`, rounding half away
/// from zero, so a heading of exactly 15° lands in bucket 1 and -15° in bucket
/// 11. The elevation tier splits at ±15°, with the boundaries themselves
/// belonging to the level tier.
///
/// # Arguments
///
/// * `heading`: Camera heading in radians, any range.
/// * `elevation`: Camera elevation in radians.
pub fn discretize(heading: f64, elevation: f64) -> ViewIndex {
    let step = round(heading / HEADING_INCREMENT) as i64;
    let bucket = step.rem_euclid(HEADING_COUNT as i64) as u8;
    ViewIndex::from_parts(bucket, ElevationTier::from_elevation(elevation))
}

/// Normalize a heading to be within `[0, 2π)`.
pub fn normalize_heading(angle: f64) -> f64 {
    let a = angle % (2.0 * PI);
    if a < 0.0 {
        // Tiny negative remainders round up to exactly 2π.
        let wrapped = a + 2.0 * PI;
        if wrapped >= 2.0 * PI { 0.0 } else { wrapped }
    } else {
        a
    }
}

/// Offset from the camera heading to a target's bearing, wrapped to `[-π, π)`.
///
/// Negative offsets put the target left of the view center and positive ones
/// to its right. A target directly behind the camera reports `-π`.
/// Offsets already inside the range come back bit-for-bit unchanged.
pub fn normalize_relative(offset: f64) -> f64 {
    let wrapped = offset % (2.0 * PI);
    if wrapped >= PI {
        wrapped - 2.0 * PI
    } else if wrapped < -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}
