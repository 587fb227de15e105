//! Simulator interface used to replay navigation episodes, and a graph-backed
//! implementation of it.
//!
//! [`traits::simulator::Simulator`] is what the replanner and the frame
//! extractor drive. [`devices::graph_sim::GraphSimulator`] implements it from
//! the navigation graph alone, without rendering.

#![warn(missing_docs)]

pub mod devices;
pub mod error;
pub mod traits;

pub use devices::graph_sim::{CameraConfig, GraphSimulator};
pub use error::SimulatorError;
pub use traits::simulator::{Frame, Simulator};
