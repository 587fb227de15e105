//! The discrete action vocabulary of the panorama simulator.

use alloc::string::String;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ViewError;

/// A raw simulator command: `(location index, heading delta, elevation delta)`.
///
/// Deltas are in units of one view step (30°). A location index of `0` keeps
/// the agent at its current viewpoint.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "(usize, i8, i8)", into = "(usize, i8, i8)"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Command {
    /// Navigable location to move to (`0` = stay).
    pub location: usize,
    /// Heading change in view steps, positive turns right.
    pub heading: i8,
    /// Elevation change in view steps, positive looks up.
    pub elevation: i8,
}

impl Command {
    /// Construct a new command.
    pub const fn new(location: usize, heading: i8, elevation: i8) -> Self {
        Command { location, heading, elevation }
    }
}

impl From<(usize, i8, i8)> for Command {
    fn from((location, heading, elevation): (usize, i8, i8)) -> Self {
        Command::new(location, heading, elevation)
    }
}

impl From<Command> for (usize, i8, i8) {
    fn from(command: Command) -> Self {
        (command.location, command.heading, command.elevation)
    }
}

/// One decision of the navigation policy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ActionRecord", into = "ActionRecord"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCommand {
    /// Turn the camera one step left.
    Left,
    /// Turn the camera one step right.
    Right,
    /// Tilt the camera one step up.
    Up,
    /// Tilt the camera one step down.
    Down,
    /// Move to the navigable location with the given index.
    Forward(usize),
    /// End the episode.
    Stop,
    /// Do nothing; the agent already stands at its goal.
    Ignore,
}

impl ActionCommand {
    /// The simulator command that carries out this action.
    pub const fn command(self) -> Command {
        match self {
            ActionCommand::Left => Command::new(0, -1, 0),
            ActionCommand::Right => Command::new(0, 1, 0),
            ActionCommand::Up => Command::new(0, 0, 1),
            ActionCommand::Down => Command::new(0, 0, -1),
            ActionCommand::Forward(location) => Command::new(location, 0, 0),
            ActionCommand::Stop | ActionCommand::Ignore => Command::new(0, 0, 0),
        }
    }

    /// The label this action carries in dataset files.
    pub const fn label(self) -> &'static str {
        match self {
            ActionCommand::Left => "left",
            ActionCommand::Right => "right",
            ActionCommand::Up => "up",
            ActionCommand::Down => "down",
            ActionCommand::Forward(_) => "forward",
            ActionCommand::Stop => "<end>",
            ActionCommand::Ignore => "<ignore>",
        }
    }

    /// Whether issuing this action leaves the simulator untouched.
    pub const fn is_noop(self) -> bool {
        matches!(self, ActionCommand::Stop | ActionCommand::Ignore)
    }
}

impl fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCommand::Forward(location) => write!(f, "forward({})", location),
            other => f.write_str(other.label()),
        }
    }
}

/// The serialized form of an action: `{"command": [i, h, e], "action": label}`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Raw simulator command.
    pub command: Command,
    /// Vocabulary label.
    pub action: String,
}

impl From<ActionCommand> for ActionRecord {
    fn from(action: ActionCommand) -> Self {
        ActionRecord {
            command: action.command(),
            action: String::from(action.label()),
        }
    }
}

impl TryFrom<ActionRecord> for ActionCommand {
    type Error = ViewError;

    fn try_from(record: ActionRecord) -> Result<Self, Self::Error> {
        match record.action.as_str() {
            "left" => Ok(ActionCommand::Left),
            "right" => Ok(ActionCommand::Right),
            "up" => Ok(ActionCommand::Up),
            "down" => Ok(ActionCommand::Down),
            "forward" => Ok(ActionCommand::Forward(record.command.location)),
            "<end>" => Ok(ActionCommand::Stop),
            "<ignore>" => Ok(ActionCommand::Ignore),
            _ => Err(ViewError::UnknownActionLabel(
                "expected left, right, up, down, forward, <end> or <ignore>",
            )),
        }
    }
}
