//! The simulator interface driven by the replanner and the frame extractor.

use cvdn_views::{AgentState, Command};

/// A rendered RGB image of the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGB bytes, `width * height * 3` long.
    pub rgb: Vec<u8>,
}

/// Core trait defining the interface to a discretized panorama simulator.
///
/// Headings are in radians clockwise from the +y axis, elevations in radians
/// with positive values looking up. A command's heading and elevation deltas
/// are counted in discrete 30° increments.
pub trait Simulator {
    /// Error reported by the simulator.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Place the agent at `viewpoint` of `scan`, looking along the given orientation.
    fn new_episode(&mut self, scan: &str, viewpoint: &str, heading: f64, elevation: f64) -> Result<(), Self::Error>;

    /// Apply one discrete command to the agent.
    fn make_action(&mut self, command: Command) -> Result<(), Self::Error>;

    /// Get the current state of the agent
    fn state(&mut self) -> Result<AgentState, Self::Error>;

    /// The image of the current view, if the simulator renders.
    fn frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        Ok(None)
    }

    /// Release the episode started by `new_episode`.
    fn end_episode(&mut self) {}
}
