//! Navigation graphs and the shortest-path action policy for panorama scans.
//!
//! - [`graph`] -- per-scan viewpoint graphs with precomputed all-pairs shortest paths.
//! - [`connectivity`] -- loading graphs from Matterport connectivity files.
//! - [`policy`] -- choosing the next discrete action toward a goal viewpoint.

pub mod connectivity;
pub mod error;
pub mod graph;
pub mod policy;

pub use connectivity::{ConnectivityDir, ConnectivityLoader, PanoConnectivity};
pub use error::NavigationError;
pub use graph::{NavGraph, ScanGraph};
pub use policy::next_action;
