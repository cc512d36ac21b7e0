#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the evacuation planner.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative wizard session, and pure systems. Adapters and systems
//! submit [`Command`] values describing desired mutations, the session
//! executes those commands via its `apply` entry point, and then broadcasts
//! [`Event`] values for systems to react to deterministically. The grid model,
//! the coordinate spaces and the wire payloads of the external simulation
//! engine live here so every crate agrees on them.

mod coords;
mod grid;
mod stage;
mod wire;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use coords::{CellCoord, CoordinateError, DisplayTransform, GridSpace};
pub use grid::{CellCode, Grid, GridCorrection, GridError, GridStats};
pub use stage::{Stage, StageError, StageTrigger};
pub use wire::{
    AgentFrame, AgentMood, AgentOutcome, AgentStatus, AnimationData, FireMode, Frame, JobStatusKind,
    JobStatusResponse, JobTicket, LimitViolation, ModelVersion, SimulationRequest,
    SimulationResult, UnknownModelVersion,
};

/// Minimum Euclidean distance, in grid cells, between two exits.
pub const DEFAULT_EXIT_MIN_DISTANCE: f32 = 3.0;

/// Unique identifier assigned to a placed exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExitId(u32);

impl ExitId {
    /// Creates a new exit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Exit placed by the user on the processed grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exit {
    /// Identifier that stays unique for the whole session.
    pub id: ExitId,
    /// Cell the exit occupies.
    pub cell: CellCoord,
}

/// Reasons a placement was refused. State is never mutated on rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum PlacementError {
    /// No grid has been loaded yet.
    #[error("no floor plan is loaded")]
    NoGrid,
    /// The cell lies outside the grid.
    #[error("cell is outside the floor plan")]
    OutOfBounds,
    /// The cell is a wall.
    #[error("cannot place on a wall")]
    OnWall,
    /// The cell is in the exterior padding zone.
    #[error("cannot place outside the building")]
    OnExterior,
    /// Assembly points must lie in the exterior zone.
    #[error("assembly point must be outside the building")]
    NotExterior,
    /// The exit would be closer than the minimum spacing to another exit.
    #[error("too close to exit {}", nearest.get())]
    TooCloseToExit {
        /// Nearest conflicting exit.
        nearest: ExitId,
    },
    /// A setup exit already occupies the cell.
    #[error("an exit already occupies this cell")]
    DuplicateExit,
    /// The configured number of agents has already been placed.
    #[error("all {max} agents are already placed")]
    AgentLimitReached {
        /// Configured agent count.
        max: usize,
    },
    /// The model cannot accept more exits.
    #[error("the model supports at most {max} exits")]
    ExitLimitReached {
        /// Model maximum.
        max: usize,
    },
}

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Installs a freshly processed grid and enters exit placement.
    LoadGrid {
        /// Processed occupancy grid.
        grid: Grid,
        /// PNG of the original floor plan, scaled to the grid.
        background: Option<Vec<u8>>,
    },
    /// Requests a new exit at the provided cell.
    PlaceExit {
        /// Target cell.
        cell: CellCoord,
    },
    /// Removes a placed exit.
    RemoveExit {
        /// Identifier of the exit to remove.
        exit: ExitId,
    },
    /// Removes the most recently placed exit.
    UndoExit,
    /// Removes every placed exit, leaving the assembly point untouched.
    ClearExits,
    /// Places or replaces the assembly point.
    PlaceAssemblyPoint {
        /// Target cell.
        cell: CellCoord,
    },
    /// Removes the assembly point.
    RemoveAssemblyPoint,
    /// Accepts the placed exits and moves on to setup.
    ConfirmExits,
    /// Returns from setup to exit placement.
    BackToExits,
    /// Returns from exit placement to upload.
    BackToUpload,
    /// Sets the number of agents to simulate.
    SetAgentCount {
        /// Requested count; clamped to the model's range.
        count: usize,
    },
    /// Places or replaces the fire origin.
    SetFireOrigin {
        /// Target cell.
        cell: CellCoord,
    },
    /// Adds an agent starting cell.
    AddAgentStart {
        /// Target cell.
        cell: CellCoord,
    },
    /// Adds a simulation exit.
    AddSetupExit {
        /// Target cell.
        cell: CellCoord,
    },
    /// Replaces the whole setup with an automatically generated one.
    ApplyAutoConfiguration {
        /// Fire origin.
        fire: CellCoord,
        /// Agent starting cells.
        agents: Vec<CellCoord>,
        /// Simulation exits.
        exits: Vec<CellCoord>,
    },
    /// Clears fire, agents and simulation exits.
    ClearConfiguration,
    /// Marks a job as submitted.
    BeginRun,
    /// Records the engine result.
    CompleteRun {
        /// Completed result payload.
        result: Box<SimulationResult>,
    },
    /// Records a failed, timed out or abandoned run.
    FailRun {
        /// User-facing description.
        message: String,
    },
    /// Returns from results to setup with configuration intact.
    Reconfigure,
    /// Discards everything and starts over.
    Reset,
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The wizard moved between stages.
    StageChanged {
        /// Previous stage.
        from: Stage,
        /// New stage.
        to: Stage,
    },
    /// A command was not valid in the current stage.
    StageRejected {
        /// Transition failure or a stage mismatch.
        error: StageError,
    },
    /// A grid was installed.
    GridLoaded {
        /// Grid width in cells.
        columns: u32,
        /// Grid height in cells.
        rows: u32,
    },
    /// An exit was placed.
    ExitPlaced {
        /// Assigned identifier.
        exit: ExitId,
        /// Occupied cell.
        cell: CellCoord,
    },
    /// An exit was removed.
    ExitRemoved {
        /// Identifier of the removed exit.
        exit: ExitId,
        /// Cell it occupied.
        cell: CellCoord,
    },
    /// All exits were removed.
    ExitsCleared {
        /// Number of exits removed.
        count: usize,
    },
    /// An exit placement was refused.
    ExitRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason for the refusal.
        reason: PlacementError,
    },
    /// The assembly point was placed or replaced.
    AssemblyPointSet {
        /// Occupied cell.
        cell: CellCoord,
    },
    /// The assembly point was removed.
    AssemblyPointRemoved {
        /// Cell it occupied.
        cell: CellCoord,
    },
    /// An assembly point placement was refused.
    AssemblyPointRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason for the refusal.
        reason: PlacementError,
    },
    /// The agent count changed.
    AgentCountChanged {
        /// Effective count after clamping.
        count: usize,
    },
    /// The fire origin was set.
    FireOriginSet {
        /// Fire cell.
        cell: CellCoord,
    },
    /// A fire placement was refused.
    FireOriginRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason for the refusal.
        reason: PlacementError,
    },
    /// An agent starting cell was added.
    AgentStartAdded {
        /// Agent cell.
        cell: CellCoord,
        /// Agents placed so far.
        total: usize,
    },
    /// An agent placement was refused.
    AgentStartRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason for the refusal.
        reason: PlacementError,
    },
    /// A simulation exit was added.
    SetupExitAdded {
        /// Exit cell.
        cell: CellCoord,
        /// Simulation exits placed so far.
        total: usize,
    },
    /// A simulation exit placement was refused.
    SetupExitRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason for the refusal.
        reason: PlacementError,
    },
    /// An automatic configuration replaced the setup.
    ConfigurationApplied {
        /// Agents placed.
        agents: usize,
        /// Simulation exits placed.
        exits: usize,
    },
    /// An automatic configuration was refused; the setup is unchanged.
    ConfigurationRejected {
        /// Reason for the refusal.
        reason: PlacementError,
    },
    /// Fire, agents and simulation exits were cleared.
    ConfigurationCleared,
    /// The engine returned a result.
    RunCompleted {
        /// Agents that escaped.
        escaped: u32,
        /// Agents caught by the fire.
        burned: u32,
    },
    /// The run failed and the wizard returned to setup.
    RunFailed {
        /// User-facing description.
        message: String,
    },
    /// The session was discarded.
    SessionReset,
}
