//! Errors reported by the bundled simulator.

use cvdn_navigation::NavigationError;
use thiserror::Error;

/// Error type for [`crate::GraphSimulator`].
#[derive(Debug, Error, PartialEq)]
pub enum SimulatorError {
    /// An action or state query arrived before `new_episode`.
    #[error("No episode in progress")]
    NoEpisode,
    /// A move named a navigable location that does not exist.
    #[error("Invalid location index {index}; {available} navigable locations")]
    InvalidLocation {
        /// Requested location index.
        index: usize,
        /// Number of navigable locations, the current viewpoint included.
        available: usize,
    },
    /// The scan or viewpoint is not in the navigation graph.
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}
