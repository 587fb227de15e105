//! Shortest-path action policy.
//!
//! Given a snapshot of the agent and a goal viewpoint, [`next_action`] picks
//! the discrete command that brings the agent one step closer along the
//! shortest path. The policy keeps no memory between calls: every decision is
//! derived from the snapshot alone, so an unexpected simulator response is
//! corrected on the next call.

use std::f64::consts::{FRAC_PI_2, PI};

use cvdn_views::{ActionCommand, AgentState, ElevationTier, normalize_heading};
use tracing::trace;

use crate::error::NavigationError;
use crate::graph::NavGraph;

/// Half-width of the cone (±30°) the next viewpoint must sit in before moving.
pub const ALIGNMENT_TOLERANCE: f64 = PI / 6.0;

/// Decides the next action toward `goal`.
///
/// Heading misalignment is resolved before elevation misalignment, and the
/// agent only moves once the next viewpoint on the path lies within
/// [`ALIGNMENT_TOLERANCE`] both horizontally and vertically. When that
/// viewpoint is not navigable from the current view, the camera is first
/// levelled and then turned toward its bearing.
///
/// # Errors
/// Returns `NavigationError::NoPath` if the goal cannot be reached from the
/// agent's viewpoint, or `UnknownScan` / `UnknownViewpoint` for identifiers
/// missing from the graph.
pub fn next_action(state: &AgentState, goal: &str, graph: &NavGraph) -> Result<ActionCommand, NavigationError> {
    if state.viewpoint == goal {
        return Ok(ActionCommand::Ignore);
    }

    let path = graph.shortest_path(&state.scan, &state.viewpoint, goal)?;
    let next_viewpoint = path[1];
    let tier = state.tier();

    if let Some(index) = state.location_index(next_viewpoint) {
        let location = &state.navigable_locations[index];
        let action = if location.rel_heading > ALIGNMENT_TOLERANCE {
            ActionCommand::Right
        } else if location.rel_heading < -ALIGNMENT_TOLERANCE {
            ActionCommand::Left
        } else if location.rel_elevation > ALIGNMENT_TOLERANCE && tier < ElevationTier::High {
            ActionCommand::Up
        } else if location.rel_elevation < -ALIGNMENT_TOLERANCE && tier > ElevationTier::Low {
            ActionCommand::Down
        } else {
            ActionCommand::Forward(index)
        };
        trace!(%action, next = next_viewpoint, rel_heading = location.rel_heading, "Next viewpoint in view");
        return Ok(action);
    }

    // Not navigable from this view: level the camera, then turn toward it.
    let action = match tier {
        ElevationTier::Low => ActionCommand::Up,
        ElevationTier::High => ActionCommand::Down,
        ElevationTier::Level => {
            let target = graph.position(&state.scan, next_viewpoint)?;
            let (dx, dy) = (target.x - state.position.x, target.y - state.position.y);
            turn_toward(state.heading, bearing(dx, dy))
        }
    };
    trace!(%action, next = next_viewpoint, "Next viewpoint out of view");
    Ok(action)
}

/// Heading (rad, `[0, 2π)`, clockwise from +y) of a displacement in the x/y plane.
pub fn bearing(dx: f64, dy: f64) -> f64 {
    normalize_heading(FRAC_PI_2 - dy.atan2(dx))
}

/// The turn that shrinks the angular gap from `heading` to `target`.
///
/// A target exactly behind the agent turns left; a target dead ahead turns
/// right.
pub fn turn_toward(heading: f64, target: f64) -> ActionCommand {
    // Clockwise gap in [0, 2π); the lower half is reached faster turning right.
    let gap = normalize_heading(target - heading);
    if gap >= PI {
        ActionCommand::Left
    } else {
        ActionCommand::Right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ScanGraph;
    use cvdn_views::{NavigableLocation, Position, discretize};
    use nalgebra::Vector3;
    use rstest::rstest;
    use std::f64::consts::FRAC_PI_6;

    // A sits at the origin, B one meter north (+y, heading 0), C one meter east of B.
    fn graph() -> NavGraph {
        let mut scan = ScanGraph::new("scan");
        scan.add_node("A", Vector3::new(0.0, 0.0, 0.0));
        scan.add_node("B", Vector3::new(0.0, 1.0, 0.0));
        scan.add_node("C", Vector3::new(1.0, 1.0, 0.0));
        scan.add_edge("A", "B").unwrap();
        scan.add_edge("B", "C").unwrap();
        NavGraph::from_graphs([scan])
    }

    fn state_at_a(heading: f64, elevation: f64, visible: &[(&str, f64, f64)]) -> AgentState {
        let mut navigable_locations = vec![NavigableLocation {
            viewpoint: "A".to_string(),
            rel_heading: 0.0,
            rel_elevation: 0.0,
        }];
        navigable_locations.extend(visible.iter().map(|&(id, h, e)| NavigableLocation {
            viewpoint: id.to_string(),
            rel_heading: h,
            rel_elevation: e,
        }));
        AgentState {
            scan: "scan".to_string(),
            viewpoint: "A".to_string(),
            heading,
            elevation,
            view_index: discretize(heading, elevation),
            step: 0,
            position: Position::new(0.0, 0.0, 0.0),
            navigable_locations,
        }
    }

    #[test]
    fn test_at_goal_is_ignore() {
        let state = state_at_a(0.0, 0.0, &[]);
        assert_eq!(next_action(&state, "A", &graph()).unwrap(), ActionCommand::Ignore);
    }

    #[test]
    fn test_facing_next_viewpoint_moves() {
        let state = state_at_a(0.0, 0.0, &[("B", 0.05, -0.1)]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), ActionCommand::Forward(1));
        // Moving targets the first hop, not the goal.
        assert_eq!(next_action(&state, "C", &graph()).unwrap(), ActionCommand::Forward(1));
    }

    #[rstest]
    #[case(0.6, 0.0, ActionCommand::Right)]
    #[case(-0.6, 0.0, ActionCommand::Left)]
    #[case(0.6, 0.9, ActionCommand::Right)]
    #[case(0.0, 0.9, ActionCommand::Up)]
    #[case(0.0, -0.9, ActionCommand::Down)]
    #[case(ALIGNMENT_TOLERANCE, ALIGNMENT_TOLERANCE, ActionCommand::Forward(1))]
    fn test_alignment_order(#[case] rel_heading: f64, #[case] rel_elevation: f64, #[case] expected: ActionCommand) {
        let state = state_at_a(0.0, 0.0, &[("B", rel_heading, rel_elevation)]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), expected);
    }

    #[test]
    fn test_tilt_limited_by_tier() {
        // Already looking up: cannot tilt further, so move.
        let state = state_at_a(0.0, FRAC_PI_6, &[("B", 0.0, 0.9)]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), ActionCommand::Forward(1));
        let state = state_at_a(0.0, -FRAC_PI_6, &[("B", 0.0, -0.9)]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), ActionCommand::Forward(1));
    }

    #[test]
    fn test_out_of_view_levels_camera_first() {
        let state = state_at_a(PI, -FRAC_PI_6, &[]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), ActionCommand::Up);
        let state = state_at_a(PI, FRAC_PI_6, &[]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), ActionCommand::Down);
    }

    #[rstest]
    #[case(FRAC_PI_2, ActionCommand::Left)]
    #[case(3.0 * FRAC_PI_2, ActionCommand::Right)]
    #[case(5.0 * FRAC_PI_6, ActionCommand::Left)]
    #[case(7.0 * FRAC_PI_6, ActionCommand::Right)]
    fn test_out_of_view_turns_toward_bearing(#[case] heading: f64, #[case] expected: ActionCommand) {
        // B lies at bearing 0 from A.
        let state = state_at_a(heading, 0.0, &[]);
        assert_eq!(next_action(&state, "B", &graph()).unwrap(), expected);
    }

    #[test]
    fn test_bearing_convention() {
        assert!((bearing(0.0, 1.0) - 0.0).abs() < 1e-12);
        assert!((bearing(1.0, 0.0) - FRAC_PI_2).abs() < 1e-12);
        assert!((bearing(0.0, -1.0) - PI).abs() < 1e-12);
        assert!((bearing(-1.0, 0.0) - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_turn_tie_breaks() {
        assert_eq!(turn_toward(0.0, PI), ActionCommand::Left);
        assert_eq!(turn_toward(PI, 0.0), ActionCommand::Left);
        assert_eq!(turn_toward(1.0, 1.0), ActionCommand::Right);
    }

    #[test]
    fn test_disconnected_goal_is_no_path() {
        let mut scan = ScanGraph::new("scan");
        scan.add_node("A", Vector3::zeros());
        scan.add_node("B", Vector3::new(0.0, 1.0, 0.0));
        scan.add_node("Z", Vector3::new(5.0, 5.0, 0.0));
        scan.add_edge("A", "B").unwrap();
        let graph = NavGraph::from_graphs([scan]);
        let state = state_at_a(0.0, 0.0, &[]);
        assert!(matches!(
            next_action(&state, "Z", &graph),
            Err(NavigationError::NoPath { .. })
        ));
    }
}
