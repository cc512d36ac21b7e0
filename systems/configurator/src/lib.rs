#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Simulation configurator responsible for fire, agent and exit setup.
//!
//! Two strategies are supported. The automatic strategy samples a complete
//! configuration from the grid's free cells with a seeded random number
//! generator, so the same seed always yields the same setup. The manual
//! strategy turns clicks into placement commands according to the active
//! placement mode and drops back to no mode once the relevant limit is met.

use evacsim_core::{CellCoord, Command, Event, Grid, ModelVersion};
use rand::{seq::index, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Configuration approach chosen for the next run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Sample everything from the grid.
    #[default]
    Automatic,
    /// Place everything by hand.
    Manual,
}

/// What a manual click places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlacementMode {
    /// Clicks are ignored.
    #[default]
    None,
    /// Clicks set the fire origin.
    Fire,
    /// Clicks add agent starting cells.
    Agent,
    /// Clicks add simulation exits.
    Exit,
}

/// Errors raised while generating an automatic configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfiguratorError {
    /// The grid has no cell that accepts fire or agents.
    #[error("no free cells available")]
    NoFreeCells,
}

/// Complete configuration sampled from a grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoConfiguration {
    /// Fire origin.
    pub fire: CellCoord,
    /// Agent starting cells, sampled with replacement.
    pub agents: Vec<CellCoord>,
    /// Perimeter exits, sampled without replacement.
    pub exits: Vec<CellCoord>,
}

/// Samples fire, agents and perimeter exits from the grid.
///
/// The exit count is `min(free perimeter cells, model maximum)`.
pub fn generate<R: Rng + ?Sized>(
    grid: &Grid,
    agent_count: usize,
    model: ModelVersion,
    rng: &mut R,
) -> Result<AutoConfiguration, ConfiguratorError> {
    let free = grid.free_cells();
    if free.is_empty() {
        return Err(ConfiguratorError::NoFreeCells);
    }

    let fire = free[rng.gen_range(0..free.len())];
    let agents = (0..agent_count)
        .map(|_| free[rng.gen_range(0..free.len())])
        .collect();

    let perimeter = grid.perimeter_free_cells();
    let count = perimeter.len().min(model.max_exits());
    let exits = index::sample(rng, perimeter.len(), count)
        .into_iter()
        .map(|position| perimeter[position])
        .collect();

    Ok(AutoConfiguration { fire, agents, exits })
}

/// Input snapshot distilled from adapter-provided interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfiguratorInput {
    /// Grid cell clicked on this frame.
    pub clicked_cell: Option<CellCoord>,
    /// Indicates whether the user requested an automatic configuration.
    pub auto_generate: bool,
    /// Indicates whether the user requested clearing the configuration.
    pub clear: bool,
}

/// Read-only view of the session required by the configurator.
#[derive(Clone, Copy, Debug)]
pub struct SetupView<'a> {
    /// Loaded grid.
    pub grid: &'a Grid,
    /// Configured agent count.
    pub agent_count: usize,
}

/// Configurator system.
#[derive(Debug, Clone)]
pub struct Configurator {
    model: ModelVersion,
    strategy: Strategy,
    mode: PlacementMode,
    rng: ChaCha8Rng,
    feedback: Option<String>,
}

impl Configurator {
    /// Creates a configurator for the provided model with a deterministic seed.
    #[must_use]
    pub fn new(model: ModelVersion, seed: u64) -> Self {
        Self {
            model,
            strategy: Strategy::Automatic,
            mode: PlacementMode::None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            feedback: None,
        }
    }

    /// Active strategy.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Switches strategy; leaving manual mode clears the placement mode.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
        if strategy == Strategy::Automatic {
            self.mode = PlacementMode::None;
        }
    }

    /// Active placement mode.
    #[must_use]
    pub const fn mode(&self) -> PlacementMode {
        self.mode
    }

    /// Toggles a placement mode; selecting the active mode turns it off.
    pub fn toggle_mode(&mut self, mode: PlacementMode) {
        self.mode = if self.mode == mode {
            PlacementMode::None
        } else {
            mode
        };
    }

    /// User-readable message explaining the last rejection.
    #[must_use]
    pub fn last_feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Consumes session events and input to emit configuration commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        input: ConfiguratorInput,
        view: SetupView<'_>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::GridLoaded { .. } | Event::SessionReset | Event::ConfigurationCleared => {
                    self.mode = PlacementMode::None;
                    self.feedback = None;
                }
                Event::FireOriginSet { .. } => {
                    self.feedback = None;
                    if self.mode == PlacementMode::Fire {
                        self.mode = PlacementMode::None;
                    }
                }
                Event::AgentStartAdded { total, .. } => {
                    self.feedback = None;
                    if self.mode == PlacementMode::Agent && *total >= view.agent_count {
                        self.mode = PlacementMode::None;
                    }
                }
                Event::SetupExitAdded { total, .. } => {
                    self.feedback = None;
                    if self.mode == PlacementMode::Exit && *total >= self.model.max_exits() {
                        self.mode = PlacementMode::None;
                    }
                }
                Event::FireOriginRejected { reason, .. }
                | Event::AgentStartRejected { reason, .. }
                | Event::SetupExitRejected { reason, .. }
                | Event::ConfigurationRejected { reason } => {
                    self.feedback = Some(reason.to_string());
                }
                _ => {}
            }
        }

        if input.clear {
            out.push(Command::ClearConfiguration);
        }

        match self.strategy {
            Strategy::Automatic => {
                if !input.auto_generate {
                    return;
                }
                match generate(view.grid, view.agent_count, self.model, &mut self.rng) {
                    Ok(configuration) => out.push(Command::ApplyAutoConfiguration {
                        fire: configuration.fire,
                        agents: configuration.agents,
                        exits: configuration.exits,
                    }),
                    Err(error) => self.feedback = Some(error.to_string()),
                }
            }
            Strategy::Manual => {
                let Some(cell) = input.clicked_cell else {
                    return;
                };
                match self.mode {
                    PlacementMode::None => {}
                    PlacementMode::Fire => out.push(Command::SetFireOrigin { cell }),
                    PlacementMode::Agent => out.push(Command::AddAgentStart { cell }),
                    PlacementMode::Exit => out.push(Command::AddSetupExit { cell }),
                }
            }
        }
    }
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new(ModelVersion::default(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_same_configuration() {
        let grid = Grid::from_rows(vec![vec![0; 12]; 12]).expect("valid grid");
        let mut first = ChaCha8Rng::seed_from_u64(7);
        let mut second = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(
            generate(&grid, 3, ModelVersion::PpoV15, &mut first),
            generate(&grid, 3, ModelVersion::PpoV15, &mut second)
        );
    }

    #[test]
    fn grid_without_free_cells_is_an_error() {
        let grid = Grid::from_rows(vec![vec![1, 4], vec![4, 1]]).expect("valid grid");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(
            generate(&grid, 1, ModelVersion::PpoV15, &mut rng),
            Err(ConfiguratorError::NoFreeCells)
        );
    }
}
