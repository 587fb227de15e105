//! A discretized simulator backed by the navigation graph alone.
//!
//! The agent stands on graph viewpoints and looks along one of the 36 discrete
//! views. A neighboring viewpoint is navigable when its bearing falls inside
//! the camera's horizontal field of view, whatever its elevation; entry `0` of
//! the navigable locations is always the current viewpoint. Nothing is rendered.

use std::f64::consts::FRAC_PI_3;
use std::sync::Arc;

use cvdn_navigation::policy::bearing;
use cvdn_navigation::{NavGraph, NavigationError};
use cvdn_views::{
    AgentState, Command, ElevationTier, HEADING_COUNT, NavigableLocation, Position, ViewIndex, discretize,
    normalize_relative,
};
use nalgebra::Vector3;
use tracing::{debug, trace};

use crate::error::SimulatorError;
use crate::traits::simulator::Simulator;

// Slack on the field-of-view test so bearings exactly on its edge count as visible.
const FOV_EPSILON: f64 = 1e-9;

/// Camera intrinsics that decide which neighbors are navigable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Vertical field of view (rad).
    pub vfov: f64,
}

impl CameraConfig {
    /// Horizontal field of view (rad) implied by the aspect ratio.
    pub fn hfov(&self) -> f64 {
        let aspect = self.width as f64 / self.height as f64;
        2.0 * ((self.vfov / 2.0).tan() * aspect).atan()
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            vfov: FRAC_PI_3,
        }
    }
}

#[derive(Debug, Clone)]
struct Pose {
    scan: String,
    viewpoint: String,
    view: ViewIndex,
    step: usize,
}

/// Simulator that walks the navigation graph.
pub struct GraphSimulator {
    graph: Arc<NavGraph>,
    camera: CameraConfig,
    pose: Option<Pose>,
}

impl GraphSimulator {
    /// Creates a simulator over `graph` with no episode in progress.
    pub fn new(graph: Arc<NavGraph>, camera: CameraConfig) -> Self {
        Self {
            graph,
            camera,
            pose: None,
        }
    }

    /// The camera navigability is computed for.
    pub fn camera(&self) -> &CameraConfig {
        &self.camera
    }

    fn pose(&self) -> Result<&Pose, SimulatorError> {
        self.pose.as_ref().ok_or(SimulatorError::NoEpisode)
    }

    fn navigable_locations(&self, pose: &Pose) -> Result<Vec<NavigableLocation>, SimulatorError> {
        let scan = self
            .graph
            .scan(&pose.scan)
            .ok_or_else(|| NavigationError::UnknownScan(pose.scan.clone()))?;
        let here = self.graph.position(&pose.scan, &pose.viewpoint)?;
        let (heading, elevation) = (pose.view.heading(), pose.view.elevation());
        let half_hfov = self.camera.hfov() / 2.0 + FOV_EPSILON;

        let mut visible: Vec<NavigableLocation> = scan
            .neighbors(&pose.viewpoint)
            .into_iter()
            .filter_map(|(id, _)| {
                let target = scan.position(id)?;
                let (rel_heading, rel_elevation) = relative_angles(here, target, heading, elevation);
                // Stairs stay navigable; the policy tilts toward them once aligned.
                (rel_heading.abs() <= half_hfov).then(|| NavigableLocation {
                    viewpoint: id.to_string(),
                    rel_heading,
                    rel_elevation,
                })
            })
            .collect();
        // Closest to the view center first; stable for equal offsets.
        visible.sort_by(|a, b| angular_offset(a).total_cmp(&angular_offset(b)));

        let mut locations = Vec::with_capacity(visible.len() + 1);
        locations.push(NavigableLocation {
            viewpoint: pose.viewpoint.clone(),
            rel_heading: 0.0,
            rel_elevation: 0.0,
        });
        locations.extend(visible);
        Ok(locations)
    }
}

/// Heading and elevation of `target` as seen from `here`, relative to the camera.
fn relative_angles(here: &Vector3<f64>, target: &Vector3<f64>, heading: f64, elevation: f64) -> (f64, f64) {
    let d = target - here;
    let rel_heading = normalize_relative(bearing(d.x, d.y) - heading);
    let rel_elevation = d.z.atan2(d.x.hypot(d.y)) - elevation;
    (rel_heading, rel_elevation)
}

fn angular_offset(location: &NavigableLocation) -> f64 {
    location.rel_heading.hypot(location.rel_elevation)
}

impl Simulator for GraphSimulator {
    type Error = SimulatorError;

    fn new_episode(&mut self, scan: &str, viewpoint: &str, heading: f64, elevation: f64) -> Result<(), Self::Error> {
        self.graph.position(scan, viewpoint)?;
        let view = discretize(heading, elevation);
        debug!(scan, viewpoint, %view, "New episode");
        self.pose = Some(Pose {
            scan: scan.to_string(),
            viewpoint: viewpoint.to_string(),
            view,
            step: 0,
        });
        Ok(())
    }

    fn make_action(&mut self, command: Command) -> Result<(), Self::Error> {
        let pose = self.pose()?;
        let mut next = pose.clone();

        if command.location > 0 {
            let locations = self.navigable_locations(pose)?;
            let target = locations.get(command.location).ok_or(SimulatorError::InvalidLocation {
                index: command.location,
                available: locations.len(),
            })?;
            next.viewpoint = target.viewpoint.clone();
        }

        let bucket = (next.view.heading_bucket() as i64 + command.heading as i64).rem_euclid(HEADING_COUNT as i64);
        let tier_index = (next.view.tier().index() as i64 + command.elevation as i64).clamp(0, 2);
        let tier = ElevationTier::from_index(tier_index as u8).unwrap_or(next.view.tier());
        next.view = ViewIndex::from_parts(bucket as u8, tier);
        next.step += 1;

        trace!(?command, viewpoint = %next.viewpoint, view = %next.view, step = next.step, "Action applied");
        self.pose = Some(next);
        Ok(())
    }

    fn state(&mut self) -> Result<AgentState, Self::Error> {
        let pose = self.pose()?;
        let position = self.graph.position(&pose.scan, &pose.viewpoint)?;
        Ok(AgentState {
            scan: pose.scan.clone(),
            viewpoint: pose.viewpoint.clone(),
            heading: pose.view.heading(),
            elevation: pose.view.elevation(),
            view_index: pose.view,
            step: pose.step,
            position: Position::new(position.x, position.y, position.z),
            navigable_locations: self.navigable_locations(pose)?,
        })
    }

    fn end_episode(&mut self) {
        if let Some(pose) = self.pose.take() {
            debug!(scan = %pose.scan, viewpoint = %pose.viewpoint, steps = pose.step, "Episode ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvdn_navigation::{ScanGraph, next_action};
    use cvdn_views::ActionCommand;
    use rstest::rstest;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_6, PI};

    // B lies north of A (heading 0), D east of A (heading π/2), C east of B.
    fn simulator() -> GraphSimulator {
        let mut scan = ScanGraph::new("scan");
        scan.add_node("A", Vector3::new(0.0, 0.0, 0.0));
        scan.add_node("B", Vector3::new(0.0, 1.0, 0.0));
        scan.add_node("C", Vector3::new(1.0, 1.0, 0.0));
        scan.add_node("D", Vector3::new(1.0, 0.0, 0.0));
        scan.add_edge("A", "B").unwrap();
        scan.add_edge("B", "C").unwrap();
        scan.add_edge("A", "D").unwrap();
        GraphSimulator::new(Arc::new(NavGraph::from_graphs([scan])), CameraConfig::default())
    }

    fn visible(state: &AgentState) -> Vec<&str> {
        state.navigable_locations.iter().map(|loc| loc.viewpoint.as_str()).collect()
    }

    #[test]
    fn test_default_camera_fov() {
        let camera = CameraConfig::default();
        assert!((camera.hfov().to_degrees() - 75.18).abs() < 0.01);
    }

    #[test]
    fn test_new_episode_snaps_orientation() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", 0.2, -0.4).unwrap();
        let state = sim.state().unwrap();
        assert_eq!(state.view_index.get(), 0);
        assert_eq!(state.heading, 0.0);
        assert_eq!(state.tier(), ElevationTier::Low);
        assert_eq!(state.step, 0);
        assert_eq!(state.position, Position::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_unknown_viewpoint_and_missing_episode() {
        let mut sim = simulator();
        assert!(matches!(
            sim.new_episode("scan", "Z", 0.0, 0.0),
            Err(SimulatorError::Navigation(NavigationError::UnknownViewpoint { .. }))
        ));
        assert_eq!(sim.make_action(Command::new(0, 1, 0)), Err(SimulatorError::NoEpisode));
        assert!(matches!(sim.state(), Err(SimulatorError::NoEpisode)));
    }

    #[test]
    fn test_heading_wraps_after_full_turn() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", 0.0, 0.0).unwrap();
        sim.make_action(Command::new(0, -1, 0)).unwrap();
        assert_eq!(sim.state().unwrap().view_index.get(), 23);
        for _ in 0..12 {
            sim.make_action(Command::new(0, 1, 0)).unwrap();
        }
        let state = sim.state().unwrap();
        assert_eq!(state.view_index.get(), 23);
        assert_eq!(state.step, 13);
    }

    #[test]
    fn test_elevation_clamps_at_tiers() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", 0.0, 0.0).unwrap();
        sim.make_action(Command::new(0, 0, 1)).unwrap();
        sim.make_action(Command::new(0, 0, 1)).unwrap();
        assert_eq!(sim.state().unwrap().tier(), ElevationTier::High);
        for _ in 0..3 {
            sim.make_action(Command::new(0, 0, -1)).unwrap();
        }
        assert_eq!(sim.state().unwrap().tier(), ElevationTier::Low);
    }

    #[rstest]
    #[case(0.0, 0.0, vec!["A", "B"])]
    #[case(FRAC_PI_2, 0.0, vec!["A", "D"])]
    #[case(PI, 0.0, vec!["A"])]
    #[case(0.0, -FRAC_PI_6, vec!["A", "B"])]
    #[case(FRAC_PI_6, 0.0, vec!["A", "B"])]
    fn test_navigable_locations_follow_camera(#[case] heading: f64, #[case] elevation: f64, #[case] expected: Vec<&str>) {
        let mut sim = simulator();
        sim.new_episode("scan", "A", heading, elevation).unwrap();
        let state = sim.state().unwrap();
        assert_eq!(visible(&state), expected);
    }

    #[test]
    fn test_both_neighbors_sorted_by_offset() {
        // At 60° B is 60° left and D 30° right; widen the camera to see both.
        let camera = CameraConfig {
            width: 1920,
            height: 480,
            vfov: FRAC_PI_3,
        };
        let mut sim = GraphSimulator::new(simulator().graph.clone(), camera);
        sim.new_episode("scan", "A", 2.0 * FRAC_PI_6, 0.0).unwrap();
        let state = sim.state().unwrap();
        assert_eq!(visible(&state), vec!["A", "D", "B"]);
        assert!(state.navigable_locations[2].rel_heading < 0.0);
    }

    #[test]
    fn test_move_keeps_orientation() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", 0.0, 0.0).unwrap();
        sim.make_action(Command::new(1, 0, 0)).unwrap();
        let state = sim.state().unwrap();
        assert_eq!(state.viewpoint, "B");
        assert_eq!(state.view_index.get(), 12);
        assert_eq!(state.step, 1);
        assert_eq!(state.position, Position::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_invalid_location() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", PI, 0.0).unwrap();
        assert_eq!(
            sim.make_action(Command::new(1, 0, 0)),
            Err(SimulatorError::InvalidLocation { index: 1, available: 1 })
        );
    }

    #[test]
    fn test_end_episode_clears_state() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", 0.0, 0.0).unwrap();
        sim.end_episode();
        assert!(matches!(sim.state(), Err(SimulatorError::NoEpisode)));
        assert_eq!(sim.frame(), Ok(None));
    }

    #[test]
    fn test_steep_neighbor_is_navigable_at_level() {
        let mut scan = ScanGraph::new("stairs");
        scan.add_node("A", Vector3::new(0.0, 0.0, 0.0));
        scan.add_node("B", Vector3::new(0.0, 1.0, 1.0));
        scan.add_edge("A", "B").unwrap();
        let mut sim = GraphSimulator::new(Arc::new(NavGraph::from_graphs([scan])), CameraConfig::default());

        sim.new_episode("stairs", "A", 0.0, 0.0).unwrap();
        let state = sim.state().unwrap();
        assert_eq!(visible(&state), vec!["A", "B"]);
        assert!((state.navigable_locations[1].rel_elevation - PI / 4.0).abs() < 1e-12);
    }

    #[rstest]
    #[case(0.0, vec![ActionCommand::Up, ActionCommand::Forward(1)])]
    #[case(FRAC_PI_2, vec![ActionCommand::Left, ActionCommand::Left, ActionCommand::Up, ActionCommand::Forward(1)])]
    fn test_policy_climbs_stairs(#[case] heading: f64, #[case] expected: Vec<ActionCommand>) {
        let mut scan = ScanGraph::new("stairs");
        scan.add_node("A", Vector3::new(0.0, 0.0, 0.0));
        scan.add_node("B", Vector3::new(0.0, 1.0, 1.0));
        scan.add_edge("A", "B").unwrap();
        let graph = Arc::new(NavGraph::from_graphs([scan]));
        let mut sim = GraphSimulator::new(graph.clone(), CameraConfig::default());

        sim.new_episode("stairs", "A", heading, 0.0).unwrap();
        let mut actions = Vec::new();
        for _ in 0..10 {
            let action = next_action(&sim.state().unwrap(), "B", &graph).unwrap();
            if action == ActionCommand::Ignore {
                break;
            }
            sim.make_action(action.command()).unwrap();
            actions.push(action);
        }
        assert_eq!(actions, expected);
        assert_eq!(sim.state().unwrap().viewpoint, "B");
    }

    #[test]
    fn test_policy_converges_from_quarter_turn() {
        let mut sim = simulator();
        sim.new_episode("scan", "A", FRAC_PI_2, 0.0).unwrap();
        let graph = sim.graph.clone();
        let mut actions = Vec::new();
        for _ in 0..5 {
            let state = sim.state().unwrap();
            let action = next_action(&state, "B", &graph).unwrap();
            if action == ActionCommand::Ignore {
                break;
            }
            sim.make_action(action.command()).unwrap();
            actions.push(action);
        }
        assert_eq!(
            actions,
            vec![ActionCommand::Left, ActionCommand::Left, ActionCommand::Forward(1)]
        );
        assert_eq!(sim.state().unwrap().viewpoint, "B");
    }
}
