//! Walking the simulator to a given discrete view and retrieving its frame.
//!
//! Views are reached by a fixed sequence rather than by planning: the episode
//! starts at view 0 (heading 0, looking down) and every step turns right once,
//! also tilting up whenever the heading wraps around. After step `ix` the
//! simulator must therefore report view `ix`.

use std::collections::HashSet;
use std::error::Error as StdError;

use cvdn_sim::{Frame, Simulator};
use cvdn_views::{AgentState, Command, HEADING_COUNT, ViewIndex, discretize};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::dataset::DialogRecord;
use crate::driver::Episode;

const START_ELEVATION_DEG: f64 = -30.0;

#[derive(Debug, Error)]
pub enum FrameError {
    /// The simulator discretizes views differently from [`cvdn_views::discretize`].
    #[error("Simulator reports view {actual} where view {expected} was expected")]
    StateMismatch { expected: u8, actual: u8 },
    #[error("Simulator failure: {0}")]
    Simulator(#[source] Box<dyn StdError + Send + Sync>),
}

impl FrameError {
    fn simulator(err: impl StdError + Send + Sync + 'static) -> Self {
        FrameError::Simulator(Box::new(err))
    }
}

#[derive(Debug)]
pub struct ExtractedView {
    pub state: AgentState,
    pub frame: Option<Frame>,
}

/// Brings the camera at `viewpoint` to view `target`.
///
/// # Errors
/// Returns `FrameError::StateMismatch` as soon as the simulator's view index
/// departs from the expected sequence.
pub fn extract_view<S: Simulator>(
    sim: &mut S,
    scan: &str,
    viewpoint: &str,
    target: ViewIndex,
) -> Result<ExtractedView, FrameError> {
    let mut episode = Episode::start(sim, scan, viewpoint, 0.0, START_ELEVATION_DEG.to_radians())
        .map_err(FrameError::simulator)?;

    let mut state = episode.state().map_err(FrameError::simulator)?;
    expect_view(0, &state)?;
    for ix in 1..=target.get() {
        let command = if ix % HEADING_COUNT == 0 {
            Command::new(0, 1, 1)
        } else {
            Command::new(0, 1, 0)
        };
        episode.act(command).map_err(FrameError::simulator)?;
        state = episode.state().map_err(FrameError::simulator)?;
        expect_view(ix, &state)?;
    }

    let frame = episode.frame().map_err(FrameError::simulator)?;
    Ok(ExtractedView { state, frame })
}

fn expect_view(expected: u8, state: &AgentState) -> Result<(), FrameError> {
    let actual = state.view_index.get();
    if actual != expected {
        return Err(FrameError::StateMismatch { expected, actual });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// A view the navigator looked at when sending a message.
    Navigation,
    /// A view recorded in the record's action trajectories.
    Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewTarget {
    pub viewpoint: String,
    pub view_index: ViewIndex,
    pub source: TargetSource,
}

/// Every view a record refers to: the pose of each navigator message, then
/// each entry of the record's action trajectories.
pub fn record_view_targets(record: &DialogRecord) -> Vec<ViewTarget> {
    let navigation = record
        .nav_camera
        .iter()
        .flat_map(|turn| turn.messages())
        .map(|message| ViewTarget {
            viewpoint: message.pano.clone(),
            view_index: discretize(message.heading, message.elevation),
            source: TargetSource::Navigation,
        });
    let actions = record
        .actions
        .iter()
        .flatten()
        .flatten()
        .map(|step| ViewTarget {
            viewpoint: step.viewpoint.clone(),
            view_index: step.view_index,
            source: TargetSource::Action,
        });
    navigation.chain(actions).collect()
}

/// Image file name of a view.
pub fn image_name(scan: &str, viewpoint: &str, view: ViewIndex) -> String {
    format!("{scan}-{viewpoint}-{view}.png")
}

/// One line of the view manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub scan: String,
    pub viewpoint: String,
    #[serde(rename = "viewIndex")]
    pub view_index: ViewIndex,
    pub source: TargetSource,
    pub image: String,
    /// Whether the simulator produced pixels for this view.
    pub rendered: bool,
}

/// Visits every distinct view referenced by `records`.
pub fn extract_split<S: Simulator>(records: &[DialogRecord], sim: &mut S) -> Result<Vec<ManifestEntry>, FrameError> {
    let mut seen = HashSet::new();
    let mut manifest = Vec::new();
    for record in records {
        for target in record_view_targets(record) {
            if !seen.insert((record.scan.clone(), target.clone())) {
                continue;
            }
            let view = extract_view(sim, &record.scan, &target.viewpoint, target.view_index)?;
            debug!(scan = %record.scan, viewpoint = %target.viewpoint, view = %target.view_index, "Extracted view");
            manifest.push(ManifestEntry {
                image: image_name(&record.scan, &target.viewpoint, target.view_index),
                scan: record.scan.clone(),
                viewpoint: target.viewpoint,
                view_index: target.view_index,
                source: target.source,
                rendered: view.frame.is_some(),
            });
        }
    }
    info!(views = manifest.len(), "Views extracted");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{NavMessage, NavTurn, StartPano, TrajectoryStep};
    use cvdn_navigation::{NavGraph, ScanGraph};
    use cvdn_sim::{CameraConfig, GraphSimulator, SimulatorError};
    use cvdn_views::{ActionCommand, ElevationTier, VIEW_COUNT};
    use nalgebra::Vector3;
    use rstest::rstest;
    use serde_json::Map;
    use std::sync::Arc;

    fn simulator() -> GraphSimulator {
        let mut scan = ScanGraph::new("scan");
        scan.add_node("A", Vector3::new(0.0, 0.0, 0.0));
        scan.add_node("B", Vector3::new(0.0, 2.0, 0.0));
        scan.add_edge("A", "B").unwrap();
        GraphSimulator::new(Arc::new(NavGraph::from_graphs([scan])), CameraConfig::default())
    }

    #[test]
    fn test_reaches_every_view() {
        let mut sim = simulator();
        for raw in 0..VIEW_COUNT {
            let target = ViewIndex::new(raw).unwrap();
            let view = extract_view(&mut sim, "scan", "A", target).unwrap();
            assert_eq!(view.state.view_index, target);
            assert_eq!(view.state.step, raw as usize);
            assert!(view.frame.is_none());
        }
        assert!(matches!(sim.state(), Err(SimulatorError::NoEpisode)));
    }

    /// Reports views one heading step off, as a simulator with another
    /// discretization convention would.
    struct ShiftedSimulator(GraphSimulator);

    impl Simulator for ShiftedSimulator {
        type Error = SimulatorError;

        fn new_episode(&mut self, scan: &str, viewpoint: &str, heading: f64, elevation: f64) -> Result<(), Self::Error> {
            self.0.new_episode(scan, viewpoint, heading, elevation)
        }

        fn make_action(&mut self, command: Command) -> Result<(), Self::Error> {
            self.0.make_action(command)
        }

        fn state(&mut self) -> Result<AgentState, Self::Error> {
            let mut state = self.0.state()?;
            state.view_index = ViewIndex::from_parts(state.view_index.heading_bucket() + 1, state.tier());
            Ok(state)
        }
    }

    #[test]
    fn test_shifted_discretization_is_a_mismatch() {
        let mut sim = ShiftedSimulator(simulator());
        let err = extract_view(&mut sim, "scan", "A", ViewIndex::new(5).unwrap()).unwrap_err();
        assert!(matches!(err, FrameError::StateMismatch { expected: 0, actual: 1 }));
    }

    /// Ignores tilt commands.
    struct NoTiltSimulator(GraphSimulator);

    impl Simulator for NoTiltSimulator {
        type Error = SimulatorError;

        fn new_episode(&mut self, scan: &str, viewpoint: &str, heading: f64, elevation: f64) -> Result<(), Self::Error> {
            self.0.new_episode(scan, viewpoint, heading, elevation)
        }

        fn make_action(&mut self, command: Command) -> Result<(), Self::Error> {
            self.0.make_action(Command::new(command.location, command.heading, 0))
        }

        fn state(&mut self) -> Result<AgentState, Self::Error> {
            self.0.state()
        }
    }

    #[test]
    fn test_missed_tilt_is_caught_at_wrap() {
        let mut sim = NoTiltSimulator(simulator());
        assert_eq!(
            extract_view(&mut sim, "scan", "A", ViewIndex::new(11).unwrap()).unwrap().state.tier(),
            ElevationTier::Low
        );
        let err = extract_view(&mut sim, "scan", "A", ViewIndex::new(20).unwrap()).unwrap_err();
        assert!(matches!(err, FrameError::StateMismatch { expected: 12, actual: 0 }));
    }

    fn record() -> DialogRecord {
        let message = |pano: &str, heading: f64, elevation: f64| NavMessage {
            pano: pano.to_string(),
            heading,
            elevation,
            extra: Map::new(),
        };
        DialogRecord {
            scan: "scan".to_string(),
            nav_camera: vec![NavTurn::Bare(vec![message("A", 0.0, 0.0), message("B", 3.2, 0.6)])],
            planner_path: vec!["A".to_string(), "B".to_string()],
            start_pano: StartPano {
                heading: 0.0,
                extra: Map::new(),
            },
            actions: Some(vec![vec![
                TrajectoryStep {
                    viewpoint: "A".to_string(),
                    view_index: ViewIndex::new(12).unwrap(),
                    heading: 0.0,
                    elevation: 0.0,
                    step: 0,
                    action: Some(ActionCommand::Forward(1)),
                },
                TrajectoryStep {
                    viewpoint: "B".to_string(),
                    view_index: ViewIndex::new(12).unwrap(),
                    heading: 0.0,
                    elevation: 0.0,
                    step: 1,
                    action: Some(ActionCommand::Ignore),
                },
            ]]),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_record_view_targets() {
        let targets = record_view_targets(&record());
        let summary: Vec<(&str, u8, TargetSource)> = targets
            .iter()
            .map(|t| (t.viewpoint.as_str(), t.view_index.get(), t.source))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A", 12, TargetSource::Navigation),
                ("B", 30, TargetSource::Navigation),
                ("A", 12, TargetSource::Action),
                ("B", 12, TargetSource::Action),
            ]
        );
    }

    #[rstest]
    #[case(0.0, 0.0, 12, "scan-A-12.png")]
    #[case(3.2, 0.6, 30, "scan-A-30.png")]
    #[case(-0.3, -0.6, 11, "scan-A-11.png")]
    #[case(6.2, 0.0, 12, "scan-A-12.png")]
    fn test_message_pose_target(
        #[case] heading: f64,
        #[case] elevation: f64,
        #[case] expected: u8,
        #[case] image: &str,
    ) {
        let mut record = record();
        record.nav_camera = vec![NavTurn::Bare(vec![NavMessage {
            pano: "A".to_string(),
            heading,
            elevation,
            extra: Map::new(),
        }])];
        record.actions = None;

        let targets = record_view_targets(&record);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].view_index.get(), expected);
        assert_eq!(targets[0].source, TargetSource::Navigation);
        assert_eq!(image_name(&record.scan, &targets[0].viewpoint, targets[0].view_index), image);
    }

    #[test]
    fn test_extract_split_manifest() {
        let mut sim = simulator();
        let records = vec![record(), record()];
        let manifest = extract_split(&records, &mut sim).unwrap();
        assert_eq!(manifest.len(), 4);
        assert_eq!(manifest[1].image, "scan-B-30.png");
        assert!(manifest.iter().all(|entry| !entry.rendered));

        let line = serde_json::to_value(&manifest[2]).unwrap();
        assert_eq!(line["viewIndex"], 12);
        assert_eq!(line["source"], "action");
    }
}
