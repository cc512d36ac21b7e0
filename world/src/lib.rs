#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative wizard session for the evacuation planner.
//!
//! The session owns the processed grid, the exits and assembly point placed
//! on it, the simulation setup and the last engine result. Every mutation
//! flows through [`apply`]; placement rules are enforced here so systems and
//! adapters can only ever propose changes.

mod snapshot;

use evacsim_core::{
    CellCode, CellCoord, Command, Event, Exit, ExitId, Grid, ModelVersion, PlacementError,
    SimulationResult, Stage, StageError, StageTrigger, DEFAULT_EXIT_MIN_DISTANCE,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use snapshot::WizardSnapshot;

/// Placement limits enforced by the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRules {
    /// Minimum Euclidean distance between two placed exits, in cells.
    pub min_exit_distance: f32,
    /// Model whose limits cap agents and simulation exits.
    pub model: ModelVersion,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            min_exit_distance: DEFAULT_EXIT_MIN_DISTANCE,
            model: ModelVersion::default(),
        }
    }
}

/// Fire, agents and simulation exits configured for the next run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Number of agents the user wants to simulate.
    pub agent_count: usize,
    /// Cell where the fire starts.
    pub fire: Option<CellCoord>,
    /// Agent starting cells; duplicates allowed.
    pub agents: Vec<CellCoord>,
    /// Exits submitted to the engine.
    pub exits: Vec<CellCoord>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            agent_count: 1,
            fire: None,
            agents: Vec::new(),
            exits: Vec::new(),
        }
    }
}

/// Represents the authoritative wizard state.
#[derive(Debug)]
pub struct Session {
    rules: PlacementRules,
    stage: Stage,
    grid: Option<Grid>,
    background: Option<Vec<u8>>,
    exits: Vec<Exit>,
    next_exit_id: u32,
    assembly_point: Option<CellCoord>,
    setup: SetupConfig,
    result: Option<SimulationResult>,
}

impl Session {
    /// Creates an empty session waiting for a floor plan.
    #[must_use]
    pub fn new(rules: PlacementRules) -> Self {
        Self {
            rules,
            stage: Stage::Upload,
            grid: None,
            background: None,
            exits: Vec::new(),
            next_exit_id: 0,
            assembly_point: None,
            setup: SetupConfig::default(),
            result: None,
        }
    }

    /// Rebuilds a session from a persisted snapshot.
    ///
    /// Inconsistent snapshots fall back to the closest valid stage: a missing
    /// grid restarts at upload and a missing result reopens setup.
    #[must_use]
    pub fn restore(rules: PlacementRules, snapshot: WizardSnapshot) -> Self {
        let WizardSnapshot {
            stage,
            grid,
            background,
            exits,
            next_exit_id,
            assembly_point,
            setup,
            result,
        } = snapshot;

        let mut stage = stage.persisted();
        if grid.is_none() {
            stage = Stage::Upload;
        } else if stage == Stage::Results && result.is_none() {
            stage = Stage::Setup;
        }
        let next_exit_id = exits
            .iter()
            .map(|exit| exit.id.get().saturating_add(1))
            .max()
            .map_or(next_exit_id, |floor| floor.max(next_exit_id));

        Self {
            rules,
            stage,
            grid,
            background,
            exits,
            next_exit_id,
            assembly_point,
            setup,
            result,
        }
    }

    /// Captures the persistable portion of the session.
    #[must_use]
    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            stage: self.stage.persisted(),
            grid: self.grid.clone(),
            background: self.background.clone(),
            exits: self.exits.clone(),
            next_exit_id: self.next_exit_id,
            assembly_point: self.assembly_point,
            setup: self.setup.clone(),
            result: self.result.clone(),
        }
    }

    /// Reports whether the setup is complete enough to submit a run.
    #[must_use]
    pub fn can_run(&self) -> bool {
        self.setup.fire.is_some() && !self.setup.agents.is_empty()
    }

    fn transition(&mut self, trigger: StageTrigger, out_events: &mut Vec<Event>) -> bool {
        match self.stage.transition(trigger) {
            Ok(to) => {
                let from = self.stage;
                self.stage = to;
                out_events.push(Event::StageChanged { from, to });
                true
            }
            Err(error) => {
                debug!(%error, "stage transition rejected");
                out_events.push(Event::StageRejected { error });
                false
            }
        }
    }

    fn require_stage(&self, expected: Stage, out_events: &mut Vec<Event>) -> bool {
        if self.stage == expected {
            return true;
        }
        out_events.push(Event::StageRejected {
            error: StageError::WrongStage {
                expected,
                actual: self.stage,
            },
        });
        false
    }

    fn validate_exit(&self, cell: CellCoord) -> Result<(), PlacementError> {
        let grid = self.grid.as_ref().ok_or(PlacementError::NoGrid)?;
        if !grid.contains(cell) {
            return Err(PlacementError::OutOfBounds);
        }
        let nearest = self
            .exits
            .iter()
            .map(|exit| (exit.id, exit.cell.distance(cell)))
            .filter(|(_, distance)| *distance < self.rules.min_exit_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((nearest, _)) = nearest {
            return Err(PlacementError::TooCloseToExit { nearest });
        }
        match grid.code(cell) {
            Some(CellCode::Wall) => Err(PlacementError::OnWall),
            Some(CellCode::Exterior) => Err(PlacementError::OnExterior),
            Some(_) => Ok(()),
            None => Err(PlacementError::OutOfBounds),
        }
    }

    fn validate_assembly(&self, cell: CellCoord) -> Result<(), PlacementError> {
        let grid = self.grid.as_ref().ok_or(PlacementError::NoGrid)?;
        match grid.code(cell) {
            None => Err(PlacementError::OutOfBounds),
            Some(CellCode::Exterior) => Ok(()),
            Some(_) => Err(PlacementError::NotExterior),
        }
    }

    fn validate_free(&self, cell: CellCoord) -> Result<(), PlacementError> {
        let grid = self.grid.as_ref().ok_or(PlacementError::NoGrid)?;
        match grid.code(cell) {
            None => Err(PlacementError::OutOfBounds),
            Some(CellCode::Wall) => Err(PlacementError::OnWall),
            Some(CellCode::Exterior) => Err(PlacementError::OnExterior),
            Some(_) => Ok(()),
        }
    }

    fn validate_auto_configuration(
        &self,
        fire: CellCoord,
        agents: &[CellCoord],
        exits: &[CellCoord],
    ) -> Result<(), PlacementError> {
        if agents.len() > self.rules.model.max_agents() {
            return Err(PlacementError::AgentLimitReached {
                max: self.rules.model.max_agents(),
            });
        }
        if exits.len() > self.rules.model.max_exits() {
            return Err(PlacementError::ExitLimitReached {
                max: self.rules.model.max_exits(),
            });
        }
        std::iter::once(&fire)
            .chain(agents)
            .chain(exits)
            .try_for_each(|cell| self.validate_free(*cell))
    }

    fn allocate_exit_id(&mut self) -> ExitId {
        let id = ExitId::new(self.next_exit_id);
        self.next_exit_id = self.next_exit_id.saturating_add(1);
        id
    }

    fn clear_setup(&mut self) {
        self.setup.fire = None;
        self.setup.agents.clear();
        self.setup.exits.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PlacementRules::default())
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply(session: &mut Session, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadGrid { grid, background } => {
            if !session.require_stage(Stage::Upload, out_events) {
                return;
            }
            let (columns, rows) = (grid.columns(), grid.rows());
            session.grid = Some(grid);
            session.background = background;
            session.exits.clear();
            session.assembly_point = None;
            session.clear_setup();
            session.result = None;
            out_events.push(Event::GridLoaded { columns, rows });
            let _ = session.transition(StageTrigger::GridLoaded, out_events);
        }
        Command::PlaceExit { cell } => {
            if !session.require_stage(Stage::Exits, out_events) {
                return;
            }
            match session.validate_exit(cell) {
                Ok(()) => {
                    let exit = session.allocate_exit_id();
                    session.exits.push(Exit { id: exit, cell });
                    out_events.push(Event::ExitPlaced { exit, cell });
                }
                Err(reason) => {
                    debug!(?cell, %reason, "exit rejected");
                    out_events.push(Event::ExitRejected { cell, reason });
                }
            }
        }
        Command::RemoveExit { exit } => {
            if !session.require_stage(Stage::Exits, out_events) {
                return;
            }
            if let Some(index) = session.exits.iter().position(|placed| placed.id == exit) {
                let removed = session.exits.remove(index);
                out_events.push(Event::ExitRemoved {
                    exit,
                    cell: removed.cell,
                });
            }
        }
        Command::UndoExit => {
            if !session.require_stage(Stage::Exits, out_events) {
                return;
            }
            if let Some(removed) = session.exits.pop() {
                out_events.push(Event::ExitRemoved {
                    exit: removed.id,
                    cell: removed.cell,
                });
            }
        }
        Command::ClearExits => {
            if !session.require_stage(Stage::Exits, out_events) {
                return;
            }
            let count = session.exits.len();
            session.exits.clear();
            out_events.push(Event::ExitsCleared { count });
        }
        Command::PlaceAssemblyPoint { cell } => {
            if !session.require_stage(Stage::Exits, out_events) {
                return;
            }
            match session.validate_assembly(cell) {
                Ok(()) => {
                    session.assembly_point = Some(cell);
                    out_events.push(Event::AssemblyPointSet { cell });
                }
                Err(reason) => {
                    debug!(?cell, %reason, "assembly point rejected");
                    out_events.push(Event::AssemblyPointRejected { cell, reason });
                }
            }
        }
        Command::RemoveAssemblyPoint => {
            if !session.require_stage(Stage::Exits, out_events) {
                return;
            }
            if let Some(cell) = session.assembly_point.take() {
                out_events.push(Event::AssemblyPointRemoved { cell });
            }
        }
        Command::ConfirmExits => {
            if session.transition(StageTrigger::ExitsConfirmed, out_events)
                && session.setup.exits.is_empty()
            {
                let max = session.rules.model.max_exits();
                session.setup.exits = session
                    .exits
                    .iter()
                    .map(|exit| exit.cell)
                    .take(max)
                    .collect();
            }
        }
        Command::BackToExits => {
            let _ = session.transition(StageTrigger::BackToExits, out_events);
        }
        Command::BackToUpload => {
            let _ = session.transition(StageTrigger::BackToUpload, out_events);
        }
        Command::SetAgentCount { count } => {
            if !session.require_stage(Stage::Setup, out_events) {
                return;
            }
            let count = count.clamp(1, session.rules.model.max_agents());
            session.setup.agent_count = count;
            session.setup.agents.truncate(count);
            out_events.push(Event::AgentCountChanged { count });
        }
        Command::SetFireOrigin { cell } => {
            if !session.require_stage(Stage::Setup, out_events) {
                return;
            }
            match session.validate_free(cell) {
                Ok(()) => {
                    session.setup.fire = Some(cell);
                    out_events.push(Event::FireOriginSet { cell });
                }
                Err(reason) => out_events.push(Event::FireOriginRejected { cell, reason }),
            }
        }
        Command::AddAgentStart { cell } => {
            if !session.require_stage(Stage::Setup, out_events) {
                return;
            }
            let max = session.setup.agent_count;
            let outcome = if session.setup.agents.len() >= max {
                Err(PlacementError::AgentLimitReached { max })
            } else {
                session.validate_free(cell)
            };
            match outcome {
                Ok(()) => {
                    session.setup.agents.push(cell);
                    out_events.push(Event::AgentStartAdded {
                        cell,
                        total: session.setup.agents.len(),
                    });
                }
                Err(reason) => out_events.push(Event::AgentStartRejected { cell, reason }),
            }
        }
        Command::AddSetupExit { cell } => {
            if !session.require_stage(Stage::Setup, out_events) {
                return;
            }
            let max = session.rules.model.max_exits();
            let outcome = if session.setup.exits.len() >= max {
                Err(PlacementError::ExitLimitReached { max })
            } else if session.setup.exits.contains(&cell) {
                Err(PlacementError::DuplicateExit)
            } else {
                session.validate_free(cell)
            };
            match outcome {
                Ok(()) => {
                    session.setup.exits.push(cell);
                    out_events.push(Event::SetupExitAdded {
                        cell,
                        total: session.setup.exits.len(),
                    });
                }
                Err(reason) => out_events.push(Event::SetupExitRejected { cell, reason }),
            }
        }
        Command::ApplyAutoConfiguration {
            fire,
            agents,
            exits,
        } => {
            if !session.require_stage(Stage::Setup, out_events) {
                return;
            }
            if let Err(reason) = session.validate_auto_configuration(fire, &agents, &exits) {
                out_events.push(Event::ConfigurationRejected { reason });
                return;
            }
            out_events.push(Event::ConfigurationApplied {
                agents: agents.len(),
                exits: exits.len(),
            });
            if !agents.is_empty() {
                session.setup.agent_count = agents.len();
            }
            session.setup.fire = Some(fire);
            session.setup.agents = agents;
            session.setup.exits = exits;
        }
        Command::ClearConfiguration => {
            if !session.require_stage(Stage::Setup, out_events) {
                return;
            }
            session.clear_setup();
            out_events.push(Event::ConfigurationCleared);
        }
        Command::BeginRun => {
            if session.stage == Stage::Setup && !session.can_run() {
                out_events.push(Event::StageRejected {
                    error: StageError::RunNotReady,
                });
                return;
            }
            let _ = session.transition(StageTrigger::RunStarted, out_events);
        }
        Command::CompleteRun { result } => {
            if session.transition(StageTrigger::RunCompleted, out_events) {
                out_events.push(Event::RunCompleted {
                    escaped: result.escaped_count,
                    burned: result.burned_count,
                });
                session.result = Some(*result);
            }
        }
        Command::FailRun { message } => {
            if session.transition(StageTrigger::RunFailed, out_events) {
                out_events.push(Event::RunFailed { message });
            }
        }
        Command::Reconfigure => {
            if session.transition(StageTrigger::Reconfigure, out_events) {
                session.result = None;
            }
        }
        Command::Reset => {
            let _ = session.transition(StageTrigger::Reset, out_events);
            session.grid = None;
            session.background = None;
            session.exits.clear();
            session.assembly_point = None;
            session.setup = SetupConfig::default();
            session.result = None;
            out_events.push(Event::SessionReset);
        }
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use evacsim_core::{CellCoord, Exit, FireMode, Grid, SimulationRequest, SimulationResult, Stage};

    use super::{PlacementRules, Session, SetupConfig};

    /// Current wizard stage.
    #[must_use]
    pub fn stage(session: &Session) -> Stage {
        session.stage
    }

    /// Placement rules the session enforces.
    #[must_use]
    pub fn rules(session: &Session) -> PlacementRules {
        session.rules
    }

    /// Loaded grid, if any.
    #[must_use]
    pub fn grid(session: &Session) -> Option<&Grid> {
        session.grid.as_ref()
    }

    /// PNG bytes of the original floor plan, if any.
    #[must_use]
    pub fn background(session: &Session) -> Option<&[u8]> {
        session.background.as_deref()
    }

    /// Placed exits in placement order.
    #[must_use]
    pub fn exits(session: &Session) -> &[Exit] {
        &session.exits
    }

    /// Current assembly point.
    #[must_use]
    pub fn assembly_point(session: &Session) -> Option<CellCoord> {
        session.assembly_point
    }

    /// Simulation setup.
    #[must_use]
    pub fn setup(session: &Session) -> &SetupConfig {
        &session.setup
    }

    /// Last engine result, available in the results stage.
    #[must_use]
    pub fn result(session: &Session) -> Option<&SimulationResult> {
        session.result.as_ref()
    }

    /// Builds the engine submission, or `None` when the setup is incomplete.
    #[must_use]
    pub fn run_request(session: &Session, fire_mode: FireMode) -> Option<SimulationRequest> {
        let grid = session.grid.as_ref()?;
        let fire_position = session.setup.fire?;
        if session.setup.agents.is_empty() {
            return None;
        }
        let exits = if session.setup.exits.is_empty() {
            None
        } else {
            Some(session.setup.exits.clone())
        };
        Some(SimulationRequest {
            grid: grid.clone(),
            exits,
            fire_position,
            agent_positions: session.setup.agents.clone(),
            extended_fire_steps: fire_mode.extended_fire_steps(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bordered_grid() -> Grid {
        let mut rows = vec![vec![0; 10]; 10];
        for index in 0..10 {
            rows[0][index] = 1;
            rows[9][index] = 1;
            rows[index][0] = 1;
            rows[index][9] = 1;
        }
        rows[0][5] = 0;
        Grid::from_rows(rows).expect("valid grid")
    }

    fn session_in_exits() -> Session {
        let mut session = Session::default();
        let mut events = Vec::new();
        apply(
            &mut session,
            Command::LoadGrid {
                grid: bordered_grid(),
                background: None,
            },
            &mut events,
        );
        session
    }

    #[test]
    fn load_grid_enters_exit_placement() {
        let mut session = Session::default();
        let mut events = Vec::new();
        apply(
            &mut session,
            Command::LoadGrid {
                grid: bordered_grid(),
                background: None,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::GridLoaded {
                    columns: 10,
                    rows: 10
                },
                Event::StageChanged {
                    from: Stage::Upload,
                    to: Stage::Exits
                },
            ]
        );
        assert_eq!(query::stage(&session), Stage::Exits);
    }

    #[test]
    fn exit_ids_are_never_reused_after_undo() {
        let mut session = session_in_exits();
        let mut events = Vec::new();
        apply(
            &mut session,
            Command::PlaceExit {
                cell: CellCoord::new(5, 0),
            },
            &mut events,
        );
        apply(&mut session, Command::UndoExit, &mut events);
        events.clear();
        apply(
            &mut session,
            Command::PlaceExit {
                cell: CellCoord::new(5, 0),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::ExitPlaced {
                exit: ExitId::new(1),
                cell: CellCoord::new(5, 0)
            }],
            "second placement must receive a fresh identifier",
        );
    }

    #[test]
    fn placement_commands_outside_their_stage_are_rejected() {
        let mut session = Session::default();
        let mut events = Vec::new();
        apply(
            &mut session,
            Command::PlaceExit {
                cell: CellCoord::new(1, 1),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::StageRejected {
                error: StageError::WrongStage {
                    expected: Stage::Exits,
                    actual: Stage::Upload
                }
            }]
        );
        assert!(query::exits(&session).is_empty());
    }
}
