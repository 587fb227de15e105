//! Loading scan graphs from Matterport connectivity files.
//!
//! A connectivity file `<scan>_connectivity.json` is a JSON array with one
//! entry per panorama. Entry `i` lists in `unobstructed[j]` whether panorama
//! `j` can be reached directly from panorama `i`. Only panoramas flagged as
//! `included` take part in the graph.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use serde::Deserialize;
use tracing::debug;

use crate::error::NavigationError;
use crate::graph::ScanGraph;

/// Source of per-scan navigation graphs.
pub trait ConnectivityLoader {
    /// Loads the viewpoint graph of `scan`.
    ///
    /// # Errors
    /// Returns `NavigationError::GraphLoad` if the scan has no usable connectivity data.
    fn load(&self, scan: &str) -> Result<ScanGraph, NavigationError>;
}

/// Graphs that were built elsewhere can be served directly.
impl ConnectivityLoader for HashMap<String, ScanGraph> {
    fn load(&self, scan: &str) -> Result<ScanGraph, NavigationError> {
        self.get(scan)
            .cloned()
            .ok_or_else(|| NavigationError::graph_load(scan, "no graph registered for scan"))
    }
}

/// One panorama entry of a connectivity file.
#[derive(Debug, Clone, Deserialize)]
pub struct PanoConnectivity {
    /// Viewpoint identifier.
    pub image_id: String,
    /// Row-major 4x4 camera pose; the translation sits at indices 3, 7 and 11.
    pub pose: Vec<f64>,
    /// Whether the panorama is part of the navigation graph.
    pub included: bool,
    /// Direct reachability of every other panorama in the file.
    pub unobstructed: Vec<bool>,
}

impl PanoConnectivity {
    fn position(&self) -> Option<Vector3<f64>> {
        match self.pose.as_slice() {
            [_, _, _, x, _, _, _, y, _, _, _, z, ..] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }
}

impl ScanGraph {
    /// Builds a scan graph from parsed connectivity entries.
    ///
    /// # Errors
    /// Returns `NavigationError::GraphLoad` if a pose is truncated, a link points
    /// outside the file, a link is not mirrored, or no panorama is connected.
    pub fn from_connectivity(scan: &str, entries: &[PanoConnectivity]) -> Result<Self, NavigationError> {
        let mut graph = ScanGraph::new(scan);
        let position = |entry: &PanoConnectivity| {
            entry.position().ok_or_else(|| {
                NavigationError::graph_load(scan, format!("pose of {} has fewer than 12 values", entry.image_id))
            })
        };

        for (i, item) in entries.iter().enumerate() {
            if !item.included {
                continue;
            }
            for (j, &linked) in item.unobstructed.iter().enumerate() {
                if !linked {
                    continue;
                }
                let other = entries.get(j).ok_or_else(|| {
                    NavigationError::graph_load(scan, format!("{} links to missing entry {}", item.image_id, j))
                })?;
                if !other.included {
                    continue;
                }
                if !other.unobstructed.get(i).copied().unwrap_or(false) {
                    return Err(NavigationError::graph_load(
                        scan,
                        format!(
                            "graph should be undirected: {} reaches {} but not back",
                            item.image_id, other.image_id
                        ),
                    ));
                }
                graph.add_node(&item.image_id, position(item)?);
                graph.add_node(&other.image_id, position(other)?);
                graph.add_edge(&item.image_id, &other.image_id)?;
            }
        }

        if graph.node_count() == 0 {
            return Err(NavigationError::graph_load(scan, "no connected panoramas"));
        }
        Ok(graph)
    }
}

/// Reads `<root>/<scan>_connectivity.json` files.
#[derive(Debug, Clone)]
pub struct ConnectivityDir {
    root: PathBuf,
}

impl ConnectivityDir {
    /// Serves connectivity files from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory files are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the connectivity file of `scan`.
    pub fn path_for(&self, scan: &str) -> PathBuf {
        self.root.join(format!("{scan}_connectivity.json"))
    }
}

impl ConnectivityLoader for ConnectivityDir {
    fn load(&self, scan: &str) -> Result<ScanGraph, NavigationError> {
        let path = self.path_for(scan);
        let raw = fs::read_to_string(&path)
            .map_err(|e| NavigationError::graph_load(scan, format!("{}: {}", path.display(), e)))?;
        let entries: Vec<PanoConnectivity> = serde_json::from_str(&raw)
            .map_err(|e| NavigationError::graph_load(scan, format!("{}: {}", path.display(), e)))?;
        let graph = ScanGraph::from_connectivity(scan, &entries)?;
        debug!(%graph, path = %path.display(), "Loaded connectivity");
        Ok(graph)
    }
}
