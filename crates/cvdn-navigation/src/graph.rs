/*

Navigation graph service.

Every scan is an undirected graph of panorama viewpoints. Edge weights are
the Euclidean distance between viewpoint positions, so Dijkstra applies.

All-pairs shortest paths are precomputed once per scan by running Dijkstra
from every node:

Initialize:
    - heap of (distance, push sequence, node), min-ordered
    - start node, d(start) = 0

Loop:
    - pop node with lowest (d, sequence)
    - if already settled, skip
    - settle it
    - for each neighbor, in edge insertion order:
        - if not settled and d(n) + w strictly improves its tentative distance:
            - make the popped node its parent, push it

Only strict improvements replace a parent, so equal-length alternatives keep
the first path discovered.

*/

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fmt;

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::connectivity::ConnectivityLoader;
use crate::error::NavigationError;

/// The viewpoint graph of a single scan.
#[derive(Debug, Clone, Default)]
pub struct ScanGraph {
    scan: String,
    ids: Vec<String>,
    index: HashMap<String, usize>,
    positions: Vec<Vector3<f64>>,
    adjacency: Vec<Vec<(usize, f64)>>,
    edge_count: usize,
}

impl ScanGraph {
    /// Creates an empty graph for `scan`.
    pub fn new(scan: &str) -> Self {
        Self {
            scan: scan.to_string(),
            ..Self::default()
        }
    }

    /// The scan this graph belongs to.
    pub fn scan(&self) -> &str {
        &self.scan
    }

    /// Adds a viewpoint, or moves it if it already exists. Returns its node index.
    pub fn add_node(&mut self, viewpoint: &str, position: Vector3<f64>) -> usize {
        if let Some(&idx) = self.index.get(viewpoint) {
            self.positions[idx] = position;
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(viewpoint.to_string());
        self.index.insert(viewpoint.to_string(), idx);
        self.positions.push(position);
        self.adjacency.push(Vec::new());
        idx
    }

    /// Connects two viewpoints, weighting the edge by their Euclidean distance.
    ///
    /// # Errors
    /// Returns `NavigationError::UnknownViewpoint` if either endpoint was never added.
    pub fn add_edge(&mut self, a: &str, b: &str) -> Result<(), NavigationError> {
        let (ia, ib) = (self.node(a)?, self.node(b)?);
        let weight = (self.positions[ia] - self.positions[ib]).norm();
        self.connect(ia, ib, weight);
        Ok(())
    }

    /// Connects two viewpoints with an explicit, non-negative weight.
    ///
    /// # Errors
    /// Returns `NavigationError::UnknownViewpoint` if either endpoint was never added.
    pub fn add_edge_weighted(&mut self, a: &str, b: &str, weight: f64) -> Result<(), NavigationError> {
        let (ia, ib) = (self.node(a)?, self.node(b)?);
        self.connect(ia, ib, weight.max(0.0));
        Ok(())
    }

    fn connect(&mut self, a: usize, b: usize, weight: f64) {
        // Re-adding an edge only updates its weight; neighbor order is kept.
        if let Some(entry) = self.adjacency[a].iter_mut().find(|(n, _)| *n == b) {
            entry.1 = weight;
            if let Some(back) = self.adjacency[b].iter_mut().find(|(n, _)| *n == a) {
                back.1 = weight;
            }
            return;
        }
        self.adjacency[a].push((b, weight));
        if a != b {
            self.adjacency[b].push((a, weight));
        }
        self.edge_count += 1;
    }

    fn node(&self, viewpoint: &str) -> Result<usize, NavigationError> {
        self.index
            .get(viewpoint)
            .copied()
            .ok_or_else(|| NavigationError::UnknownViewpoint {
                scan: self.scan.clone(),
                viewpoint: viewpoint.to_string(),
            })
    }

    /// Whether the viewpoint is part of this graph.
    pub fn contains(&self, viewpoint: &str) -> bool {
        self.index.contains_key(viewpoint)
    }

    /// World position of a viewpoint.
    pub fn position(&self, viewpoint: &str) -> Option<&Vector3<f64>> {
        self.index.get(viewpoint).map(|&idx| &self.positions[idx])
    }

    /// Neighbors of a viewpoint with edge weights, in insertion order.
    pub fn neighbors(&self, viewpoint: &str) -> Vec<(&str, f64)> {
        match self.index.get(viewpoint) {
            Some(&idx) => self.adjacency[idx]
                .iter()
                .map(|&(n, w)| (self.ids[n].as_str(), w))
                .collect(),
            None => Vec::new(),
        }
    }

    /// All viewpoints, in insertion order.
    pub fn viewpoints(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Number of viewpoints.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Single-source Dijkstra from node `source`.
    fn dijkstra(&self, source: usize) -> ShortestPaths {
        let n = self.ids.len();
        let mut settled = vec![false; n];
        let mut tentative = vec![f64::INFINITY; n];
        let mut distances = vec![f64::INFINITY; n];
        let mut parents = vec![None; n];
        let mut heap = BinaryHeap::new();
        let mut seq = 0;

        tentative[source] = 0.0;
        heap.push(State { cost: 0.0, seq, node: source });

        while let Some(State { cost, node, .. }) = heap.pop() {
            if settled[node] {
                continue;
            }
            settled[node] = true;
            distances[node] = cost;

            for &(neighbor, weight) in &self.adjacency[node] {
                if settled[neighbor] {
                    continue;
                }
                let candidate = cost + weight;
                if candidate < tentative[neighbor] {
                    tentative[neighbor] = candidate;
                    parents[neighbor] = Some(node);
                    seq += 1;
                    heap.push(State { cost: candidate, seq, node: neighbor });
                }
            }
        }

        ShortestPaths { distances, parents }
    }
}

impl fmt::Display for ScanGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScanGraph {{ scan: {}, nodes: {}, edges: {} }}",
            self.scan,
            self.node_count(),
            self.edge_count
        )
    }
}

#[derive(Copy, Clone, Debug)]
struct State {
    cost: f64,
    seq: usize,
    node: usize,
}

// The heap is a max-heap; flip both keys so the cheapest, earliest push pops first.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

struct ShortestPaths {
    distances: Vec<f64>,
    parents: Vec<Option<usize>>,
}

/// Shortest paths between every pair of viewpoints in a scan, stored as one
/// predecessor row per source.
#[derive(Debug, Clone)]
struct PathTable {
    parents: Vec<Vec<Option<usize>>>,
}

impl PathTable {
    /// Reconstructs the node sequence from `source` to `goal`, both included.
    fn path(&self, source: usize, goal: usize) -> Option<Vec<usize>> {
        let row = &self.parents[source];
        if source != goal && row[goal].is_none() {
            return None;
        }
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(previous) = row[current] {
            path.push(previous);
            current = previous;
        }
        path.reverse();
        Some(path)
    }
}

/// Shortest-path lengths between every pair of viewpoints in a scan.
#[derive(Debug, Clone)]
struct DistanceTable {
    distances: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
struct ScanPlan {
    graph: ScanGraph,
    paths: PathTable,
    distances: DistanceTable,
}

impl ScanPlan {
    fn new(graph: ScanGraph) -> Self {
        let (parents, distances): (Vec<_>, Vec<_>) = (0..graph.node_count())
            .map(|source| {
                let sp = graph.dijkstra(source);
                (sp.parents, sp.distances)
            })
            .unzip();
        Self {
            graph,
            paths: PathTable { parents },
            distances: DistanceTable { distances },
        }
    }

    fn endpoints(&self, source: &str, goal: &str) -> Result<(usize, usize), NavigationError> {
        Ok((self.graph.node(source)?, self.graph.node(goal)?))
    }
}

/// Navigation graphs for a batch of scans, with all-pairs shortest paths
/// precomputed. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct NavGraph {
    scans: HashMap<String, ScanPlan>,
}

impl NavGraph {
    /// Loads every distinct scan through `loader` and precomputes its shortest paths.
    ///
    /// # Errors
    /// Returns `NavigationError::GraphLoad` if any scan has no usable connectivity data.
    pub fn build<'a, I, L>(scans: I, loader: &L) -> Result<Self, NavigationError>
    where
        I: IntoIterator<Item = &'a str>,
        L: ConnectivityLoader + ?Sized,
    {
        let distinct: BTreeSet<&str> = scans.into_iter().collect();
        info!(scans = distinct.len(), "Loading navigation graphs");
        let graphs = distinct
            .into_iter()
            .map(|scan| loader.load(scan))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_graphs(graphs))
    }

    /// Precomputes shortest paths for already constructed graphs.
    pub fn from_graphs(graphs: impl IntoIterator<Item = ScanGraph>) -> Self {
        let scans = graphs
            .into_iter()
            .map(|graph| {
                debug!(%graph, "Precomputing all-pairs shortest paths");
                (graph.scan().to_string(), ScanPlan::new(graph))
            })
            .collect();
        Self { scans }
    }

    fn plan(&self, scan: &str) -> Result<&ScanPlan, NavigationError> {
        self.scans
            .get(scan)
            .ok_or_else(|| NavigationError::UnknownScan(scan.to_string()))
    }

    /// The graph of one scan, if it was loaded.
    pub fn scan(&self, scan: &str) -> Option<&ScanGraph> {
        self.scans.get(scan).map(|plan| &plan.graph)
    }

    /// Identifiers of all loaded scans.
    pub fn scans(&self) -> impl Iterator<Item = &str> {
        self.scans.keys().map(String::as_str)
    }

    /// The shortest path from `source` to `goal`, both included.
    ///
    /// # Errors
    /// Returns `NavigationError::NoPath` if the two viewpoints are disconnected,
    /// and `UnknownScan` / `UnknownViewpoint` for identifiers outside the graph.
    pub fn shortest_path(&self, scan: &str, source: &str, goal: &str) -> Result<Vec<&str>, NavigationError> {
        let plan = self.plan(scan)?;
        let (s, g) = plan.endpoints(source, goal)?;
        let path = plan.paths.path(s, g).ok_or_else(|| NavigationError::NoPath {
            scan: scan.to_string(),
            start: source.to_string(),
            goal: goal.to_string(),
        })?;
        Ok(path.into_iter().map(|idx| plan.graph.ids[idx].as_str()).collect())
    }

    /// The length of the shortest path from `source` to `goal`.
    ///
    /// # Errors
    /// Same as [`NavGraph::shortest_path`].
    pub fn shortest_distance(&self, scan: &str, source: &str, goal: &str) -> Result<f64, NavigationError> {
        let plan = self.plan(scan)?;
        let (s, g) = plan.endpoints(source, goal)?;
        let distance = plan.distances.distances[s][g];
        if distance.is_finite() {
            Ok(distance)
        } else {
            Err(NavigationError::NoPath {
                scan: scan.to_string(),
                start: source.to_string(),
                goal: goal.to_string(),
            })
        }
    }

    /// World position of a viewpoint.
    ///
    /// # Errors
    /// Returns `UnknownScan` / `UnknownViewpoint` for identifiers outside the graph.
    pub fn position(&self, scan: &str, viewpoint: &str) -> Result<&Vector3<f64>, NavigationError> {
        let plan = self.plan(scan)?;
        let idx = plan.graph.node(viewpoint)?;
        Ok(&plan.graph.positions[idx])
    }
}
