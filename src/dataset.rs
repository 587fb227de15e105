//! CVDN / NDH dataset records and JSON Lines split files.
//!
//! Records are typed at the JSON boundary. Fields this tool does not use are
//! kept in flattened maps so that rewritten files carry them through unchanged.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use cvdn_views::{ActionCommand, AgentState, ViewIndex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DatasetError {
    /// A line is not valid JSON or lacks a required field.
    #[error("Malformed record at {}:{line}: {source}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One utterance of the navigator, with the panorama and camera pose it was sent from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavMessage {
    pub pano: String,
    pub heading: f64,
    pub elevation: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A conversation turn wrapped as `{"message": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTurn {
    pub message: Vec<NavMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A conversation turn of `nav_camera`, in either of the shapes found in the wild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavTurn {
    Wrapped(MessageTurn),
    Bare(Vec<NavMessage>),
}

impl NavTurn {
    pub fn messages(&self) -> &[NavMessage] {
        match self {
            NavTurn::Wrapped(turn) => &turn.message,
            NavTurn::Bare(messages) => messages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPano {
    pub heading: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a turn's action trajectory: the agent state a decision was
/// made from and the action chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    #[serde(alias = "viewpointId")]
    pub viewpoint: String,
    #[serde(rename = "viewIndex")]
    pub view_index: ViewIndex,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionCommand>,
}

impl TrajectoryStep {
    pub fn new(state: &AgentState, action: ActionCommand) -> Self {
        Self {
            viewpoint: state.viewpoint.clone(),
            view_index: state.view_index,
            heading: state.heading,
            elevation: state.elevation,
            step: state.step,
            action: Some(action),
        }
    }
}

/// One navigation dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogRecord {
    pub scan: String,
    pub nav_camera: Vec<NavTurn>,
    /// Viewpoints of the planner's route; the first is where the episode starts.
    pub planner_path: Vec<String>,
    pub start_pano: StartPano,
    /// Per-turn action trajectories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Vec<TrajectoryStep>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Location of a split file inside a dataset directory.
pub fn split_path(dir: &Path, split: &str) -> PathBuf {
    dir.join(format!("{split}.jsonl"))
}

/// Reads every record of a JSON Lines file. Blank lines are skipped.
pub fn read_split(path: &Path) -> Result<Vec<DialogRecord>, DatasetError> {
    let io_error = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_error)?);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| DatasetError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    debug!(path = %path.display(), records = records.len(), "Read split");
    Ok(records)
}

/// Writes `items` as JSON Lines, replacing `path` only once every item was written.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<(), DatasetError> {
    let tmp = path.with_extension("jsonl.tmp");
    let result = write_lines(&tmp, items).and_then(|()| fs::rename(&tmp, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(DatasetError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!(path = %path.display(), records = items.len(), "Wrote split");
    Ok(())
}

fn write_lines<T: Serialize>(path: &Path, items: &[T]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
    }
    out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()
}
