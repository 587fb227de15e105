//! Replays dataset dialogs in the simulator and records shortest-path action
//! trajectories for every conversation turn.

use std::error::Error as StdError;
use std::path::Path;

use cvdn_navigation::{NavGraph, NavigationError, next_action};
use cvdn_sim::{Frame, Simulator};
use cvdn_views::{ActionCommand, AgentState, Command};
use thiserror::Error;
use tracing::{debug, info};

use crate::dataset::{DatasetError, DialogRecord, TrajectoryStep, write_jsonl};

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum ReplanError {
    /// The policy kept acting without reaching the message's goal.
    #[error("No convergence toward {goal} in scan {scan} within {budget} steps")]
    StepBudgetExceeded { scan: String, goal: String, budget: usize },
    #[error("Record in scan {0} has an empty planner path")]
    EmptyPlannerPath(String),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Simulator failure: {0}")]
    Simulator(#[source] BoxError),
}

impl ReplanError {
    fn simulator(err: impl StdError + Send + Sync + 'static) -> Self {
        ReplanError::Simulator(Box::new(err))
    }
}

/// A simulator episode that is ended when the guard goes out of scope.
pub struct Episode<'a, S: Simulator> {
    sim: &'a mut S,
}

impl<'a, S: Simulator> Episode<'a, S> {
    pub fn start(sim: &'a mut S, scan: &str, viewpoint: &str, heading: f64, elevation: f64) -> Result<Self, S::Error> {
        sim.new_episode(scan, viewpoint, heading, elevation)?;
        Ok(Self { sim })
    }

    pub fn state(&mut self) -> Result<AgentState, S::Error> {
        self.sim.state()
    }

    pub fn act(&mut self, command: Command) -> Result<(), S::Error> {
        self.sim.make_action(command)
    }

    pub fn frame(&mut self) -> Result<Option<Frame>, S::Error> {
        self.sim.frame()
    }
}

impl<S: Simulator> Drop for Episode<'_, S> {
    fn drop(&mut self) {
        self.sim.end_episode();
    }
}

/// Computes the action trajectories of one record, one list per `nav_camera` turn.
///
/// The episode starts at the first planner-path viewpoint, looking along the
/// start panorama's heading with a level camera. For every message the policy
/// is queried until it returns [`ActionCommand::Ignore`]; each query adds one
/// entry holding the state the decision was made from. The agent's pose
/// carries over from one message and turn to the next.
///
/// # Errors
/// Returns `StepBudgetExceeded` when a message needs more than `max_steps`
/// commands, `Navigation(NoPath)` when the planner path's endpoints are
/// disconnected, and propagates other planning and simulator failures.
pub fn replan_record<S: Simulator>(
    record: &DialogRecord,
    sim: &mut S,
    graph: &NavGraph,
    max_steps: usize,
) -> Result<Vec<Vec<TrajectoryStep>>, ReplanError> {
    let start = record
        .planner_path
        .first()
        .ok_or_else(|| ReplanError::EmptyPlannerPath(record.scan.clone()))?;
    if let Some(end) = record.planner_path.last() {
        let distance = graph.shortest_distance(&record.scan, start, end)?;
        debug!(scan = %record.scan, start, end, distance, "Planner path");
    }

    let mut episode = Episode::start(sim, &record.scan, start, record.start_pano.heading, 0.0)
        .map_err(ReplanError::simulator)?;

    let mut turns = Vec::with_capacity(record.nav_camera.len());
    for turn in &record.nav_camera {
        let mut steps = Vec::new();
        for message in turn.messages() {
            let mut issued = 0;
            loop {
                let state = episode.state().map_err(ReplanError::simulator)?;
                let action = next_action(&state, &message.pano, graph)?;
                steps.push(TrajectoryStep::new(&state, action));
                if action == ActionCommand::Ignore {
                    break;
                }
                if issued == max_steps {
                    return Err(ReplanError::StepBudgetExceeded {
                        scan: record.scan.clone(),
                        goal: message.pano.clone(),
                        budget: max_steps,
                    });
                }
                episode.act(action.command()).map_err(ReplanError::simulator)?;
                issued += 1;
            }
        }
        turns.push(steps);
    }
    Ok(turns)
}

/// Replaces the `actions` of every record with freshly planned trajectories.
///
/// Nothing is modified unless every record succeeds.
pub fn replan_split<S: Simulator>(
    records: &mut [DialogRecord],
    sim: &mut S,
    graph: &NavGraph,
    max_steps: usize,
) -> Result<(), ReplanError> {
    let planned = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            if idx > 0 && idx % 500 == 0 {
                info!("Replanned {}/{} records", idx, records.len());
            }
            replan_record(record, sim, graph, max_steps)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut steps = 0;
    for (record, actions) in records.iter_mut().zip(planned) {
        steps += actions.iter().map(Vec::len).sum::<usize>();
        record.actions = Some(actions);
    }
    info!(records = records.len(), steps, "Split replanned");
    Ok(())
}

/// Replans a split and writes it to `output`.
///
/// `output` is only created once every record was replanned and written.
pub fn replan_to_file<S: Simulator>(
    mut records: Vec<DialogRecord>,
    sim: &mut S,
    graph: &NavGraph,
    max_steps: usize,
    output: &Path,
) -> Result<(), ReplanError> {
    replan_split(&mut records, sim, graph, max_steps)?;
    write_jsonl(output, &records)?;
    Ok(())
}

/// Distinct-or-not scan identifiers of a split, for building its navigation graph.
pub fn split_scans(records: &[DialogRecord]) -> impl Iterator<Item = &str> {
    records.iter().map(|record| record.scan.as_str())
}
