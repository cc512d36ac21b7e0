//! Wizard session persisted between invocations of the tool.

use evacsim_core::{CellCoord, Command, Event, Stage};
use evacsim_local_store::LocalStore;
use evacsim_world::{self as world, PlacementRules, Session, WizardSnapshot};
use tracing::{debug, warn};

/// Storage key of the persisted wizard session.
pub(crate) const WIZARD_STATE_KEY: &str = "wizard-state";

/// Session loaded from the local store.
#[derive(Debug)]
pub(crate) struct Wizard {
    store: LocalStore,
    session: Session,
}

impl Wizard {
    /// Restores the stored session, or starts a fresh one.
    pub(crate) fn open(store: LocalStore, rules: PlacementRules) -> Self {
        let session = match store.get::<WizardSnapshot>(WIZARD_STATE_KEY) {
            Some(snapshot) => {
                debug!(stage = ?snapshot.stage, "wizard state restored");
                Session::restore(rules, snapshot)
            }
            None => Session::new(rules),
        };
        Self { store, session }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn stage(&self) -> Stage {
        world::query::stage(&self.session)
    }

    /// Applies commands in order and returns every event they produced.
    pub(crate) fn dispatch<I>(&mut self, commands: I) -> Vec<Event>
    where
        I: IntoIterator<Item = Command>,
    {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.session, command, &mut events);
        }
        events
    }

    /// Writes the session back. Failures are logged and otherwise ignored.
    pub(crate) fn save(&self) {
        if let Err(error) = self.store.set(WIZARD_STATE_KEY, &self.session.snapshot()) {
            warn!(%error, "wizard state not saved");
        }
    }
}

/// User-facing line for an event.
pub(crate) fn describe(event: &Event) -> String {
    match event {
        Event::StageChanged { from, to } => format!("stage: {from:?} -> {to:?}"),
        Event::StageRejected { error } => format!("rejected: {error}"),
        Event::GridLoaded { columns, rows } => format!("grid loaded: {columns}x{rows}"),
        Event::ExitPlaced { exit, cell } => {
            format!("exit {} placed at {}", exit.get(), cell_label(*cell))
        }
        Event::ExitRemoved { exit, cell } => {
            format!("exit {} removed from {}", exit.get(), cell_label(*cell))
        }
        Event::ExitsCleared { count } => format!("{count} exit(s) cleared"),
        Event::ExitRejected { cell, reason } => {
            format!("exit at {} rejected: {reason}", cell_label(*cell))
        }
        Event::AssemblyPointSet { cell } => format!("assembly point at {}", cell_label(*cell)),
        Event::AssemblyPointRemoved { .. } => "assembly point removed".to_owned(),
        Event::AssemblyPointRejected { cell, reason } => {
            format!("assembly point at {} rejected: {reason}", cell_label(*cell))
        }
        Event::AgentCountChanged { count } => format!("agent count: {count}"),
        Event::FireOriginSet { cell } => format!("fire origin at {}", cell_label(*cell)),
        Event::FireOriginRejected { cell, reason } => {
            format!("fire at {} rejected: {reason}", cell_label(*cell))
        }
        Event::AgentStartAdded { cell, total } => {
            format!("agent {total} starts at {}", cell_label(*cell))
        }
        Event::AgentStartRejected { cell, reason } => {
            format!("agent at {} rejected: {reason}", cell_label(*cell))
        }
        Event::SetupExitAdded { cell, total } => {
            format!("simulation exit {total} at {}", cell_label(*cell))
        }
        Event::SetupExitRejected { cell, reason } => {
            format!("simulation exit at {} rejected: {reason}", cell_label(*cell))
        }
        Event::ConfigurationApplied { agents, exits } => {
            format!("configuration generated: {agents} agent(s), {exits} exit(s)")
        }
        Event::ConfigurationRejected { reason } => format!("configuration rejected: {reason}"),
        Event::ConfigurationCleared => "configuration cleared".to_owned(),
        Event::RunCompleted { escaped, burned } => {
            format!("run completed: {escaped} escaped, {burned} burned")
        }
        Event::RunFailed { message } => format!("run failed: {message}"),
        Event::SessionReset => "session reset".to_owned(),
    }
}

/// `row,col`, the order used on the command line.
pub(crate) fn cell_label(cell: CellCoord) -> String {
    format!("{},{}", cell.row(), cell.column())
}

#[cfg(test)]
mod tests {
    use evacsim_core::{Grid, PlacementError};

    use super::*;

    fn grid() -> Grid {
        let mut rows = vec![vec![0; 8]; 8];
        for row in &mut rows {
            row[0] = 4;
        }
        Grid::from_rows(rows).expect("valid grid")
    }

    #[test]
    fn state_survives_reopening() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = LocalStore::open(dir.path()).expect("store");
        let mut wizard = Wizard::open(store.clone(), PlacementRules::default());
        let events = wizard.dispatch([
            Command::LoadGrid {
                grid: grid(),
                background: None,
            },
            Command::PlaceExit {
                cell: CellCoord::from_row_col(0, 4),
            },
        ]);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::ExitPlaced { .. })));
        wizard.save();

        let reopened = Wizard::open(store, PlacementRules::default());
        assert_eq!(reopened.stage(), Stage::Exits);
        assert_eq!(world::query::exits(reopened.session()).len(), 1);
    }

    #[test]
    fn rejections_read_naturally() {
        let line = describe(&Event::ExitRejected {
            cell: CellCoord::from_row_col(2, 0),
            reason: PlacementError::OnExterior,
        });
        assert_eq!(line, "exit at 2,0 rejected: cannot place outside the building");
    }
}
