//! This module defines the error types used by the `cvdn-navigation` crate.

#![warn(missing_docs)]

use thiserror::Error;

/// Error type for navigation graph and planning operations.
///
/// Every variant is fatal for the split being processed: the inputs are
/// deterministic, so retrying would reproduce the same failure.
#[derive(Debug, Error, PartialEq)]
pub enum NavigationError {
    /// Connectivity data for a scan is missing or malformed.
    #[error("Failed to load navigation graph for scan {scan}: {reason}")]
    GraphLoad {
        /// Scan whose connectivity could not be loaded.
        scan: String,
        /// What went wrong.
        reason: String,
    },
    /// The graph service was queried for a scan it never loaded.
    #[error("Unknown scan: {0}")]
    UnknownScan(String),
    /// A viewpoint is not part of the scan's graph.
    #[error("Unknown viewpoint {viewpoint} in scan {scan}")]
    UnknownViewpoint {
        /// Scan that was searched.
        scan: String,
        /// Viewpoint that was not found.
        viewpoint: String,
    },
    /// Source and goal are disconnected. Indicates a data-integrity problem.
    #[error("No path from {start} to {goal} in scan {scan}")]
    NoPath {
        /// Scan that was searched.
        scan: String,
        /// Start of the requested path.
        start: String,
        /// End of the requested path.
        goal: String,
    },
}

impl NavigationError {
    pub(crate) fn graph_load(scan: &str, reason: impl Into<String>) -> Self {
        NavigationError::GraphLoad {
            scan: scan.to_string(),
            reason: reason.into(),
        }
    }
}
