use std::sync::Arc;

use cvdn_navigation::{NavGraph, ScanGraph, next_action};
use cvdn_sim::{CameraConfig, GraphSimulator, Simulator};
use cvdn_views::ActionCommand;
use nalgebra::Vector3;

const MAX_STEPS: usize = 20;

fn main() {
    // An L-shaped hallway: start at A facing east, goal at C around the corner.
    //
    //   C
    //   |
    //   B
    //   |
    //   A ---- D
    let mut scan = ScanGraph::new("hall");
    scan.add_node("A", Vector3::new(0.0, 0.0, 1.5));
    scan.add_node("B", Vector3::new(0.0, 2.0, 1.5));
    scan.add_node("C", Vector3::new(0.0, 4.0, 1.5));
    scan.add_node("D", Vector3::new(3.0, 0.0, 1.5));
    for (a, b) in [("A", "B"), ("B", "C"), ("A", "D")] {
        if let Err(e) = scan.add_edge(a, b) {
            eprintln!("Failed to add edge {a}-{b}: {e}");
            return;
        }
    }

    let graph = Arc::new(NavGraph::from_graphs([scan]));
    let mut sim = GraphSimulator::new(graph.clone(), CameraConfig::default());
    if let Err(e) = sim.new_episode("hall", "A", std::f64::consts::FRAC_PI_2, 0.0) {
        eprintln!("Failed to start episode: {e}");
        return;
    }

    for _ in 0..MAX_STEPS {
        let state = match sim.state() {
            Ok(state) => state,
            Err(e) => {
                eprintln!("Simulator error: {e}");
                return;
            }
        };
        let action = match next_action(&state, "C", &graph) {
            Ok(action) => action,
            Err(e) => {
                eprintln!("Planning error: {e}");
                return;
            }
        };
        println!(
            "step {:>2}  at {}  view {:>2}  -> {}",
            state.step, state.viewpoint, state.view_index, action
        );
        if action == ActionCommand::Ignore {
            break;
        }
        if let Err(e) = sim.make_action(action.command()) {
            eprintln!("Simulator error: {e}");
            return;
        }
    }
    sim.end_episode();
}
