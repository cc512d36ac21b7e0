use std::collections::HashSet;

use evacsim_core::{CellCode, CellCoord, Command, Event, Grid, ModelVersion, Stage};
use evacsim_system_configurator::{
    generate, Configurator, ConfiguratorInput, PlacementMode, SetupView, Strategy,
};
use evacsim_world::{apply, query, Session};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn open_grid(columns: usize, rows: usize) -> Grid {
    Grid::from_rows(vec![vec![0; columns]; rows]).expect("valid grid")
}

fn session_in_setup(grid: Grid) -> Session {
    let mut session = Session::default();
    let mut events = Vec::new();
    apply(
        &mut session,
        Command::LoadGrid {
            grid,
            background: None,
        },
        &mut events,
    );
    apply(&mut session, Command::ConfirmExits, &mut events);
    assert_eq!(query::stage(&session), Stage::Setup);
    session
}

#[test]
fn auto_exits_never_exceed_perimeter_or_model_limit() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let small = open_grid(4, 4);
    let config = generate(&small, 2, ModelVersion::PpoV15, &mut rng).expect("free cells");
    assert_eq!(config.exits.len(), 12, "every perimeter cell of a 4×4 grid");

    let large = open_grid(40, 40);
    let config = generate(&large, 2, ModelVersion::PpoV15, &mut rng).expect("free cells");
    assert_eq!(config.exits.len(), 40);
    let config = generate(&large, 2, ModelVersion::MaskablePpo, &mut rng).expect("free cells");
    assert_eq!(config.exits.len(), 156);
}

#[test]
fn auto_exits_are_distinct_free_perimeter_cells() {
    let grid = open_grid(30, 30).with_code(CellCoord::new(0, 0), CellCode::Wall);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let config = generate(&grid, 5, ModelVersion::PpoV15, &mut rng).expect("free cells");

    let unique: HashSet<_> = config.exits.iter().copied().collect();
    assert_eq!(unique.len(), config.exits.len(), "sampling is without replacement");
    for exit in &config.exits {
        assert_eq!(grid.code(*exit), Some(CellCode::Free));
        assert!(exit.row() == 0 || exit.row() == 29 || exit.column() == 0 || exit.column() == 29);
    }
    assert_eq!(config.agents.len(), 5);
}

#[test]
fn auto_generation_produces_a_runnable_session() {
    let mut session = session_in_setup(open_grid(10, 10));
    let mut configurator = Configurator::new(ModelVersion::PpoV15, 42);
    let mut commands = Vec::new();

    configurator.handle(
        &[],
        ConfiguratorInput {
            auto_generate: true,
            ..ConfiguratorInput::default()
        },
        SetupView {
            grid: query::grid(&session).expect("grid loaded"),
            agent_count: 3,
        },
        &mut commands,
    );

    let mut events = Vec::new();
    for command in commands {
        apply(&mut session, command, &mut events);
    }
    assert_eq!(
        events,
        vec![Event::ConfigurationApplied {
            agents: 3,
            exits: 36
        }]
    );
    assert!(session.can_run());
}

#[test]
fn manual_fire_mode_returns_to_none_after_placement() {
    let grid = open_grid(5, 5);
    let mut configurator = Configurator::default();
    configurator.set_strategy(Strategy::Manual);
    configurator.toggle_mode(PlacementMode::Fire);
    let mut commands = Vec::new();

    configurator.handle(
        &[],
        ConfiguratorInput {
            clicked_cell: Some(CellCoord::new(2, 2)),
            ..ConfiguratorInput::default()
        },
        SetupView {
            grid: &grid,
            agent_count: 1,
        },
        &mut commands,
    );
    assert_eq!(
        commands,
        vec![Command::SetFireOrigin {
            cell: CellCoord::new(2, 2)
        }]
    );

    commands.clear();
    configurator.handle(
        &[Event::FireOriginSet {
            cell: CellCoord::new(2, 2),
        }],
        ConfiguratorInput::default(),
        SetupView {
            grid: &grid,
            agent_count: 1,
        },
        &mut commands,
    );
    assert_eq!(configurator.mode(), PlacementMode::None);
}

#[test]
fn manual_agent_mode_exits_once_count_is_reached() {
    let mut session = session_in_setup(open_grid(6, 6));
    let mut events = Vec::new();
    apply(&mut session, Command::SetAgentCount { count: 2 }, &mut events);

    let mut configurator = Configurator::default();
    configurator.set_strategy(Strategy::Manual);
    configurator.toggle_mode(PlacementMode::Agent);

    for cell in [CellCoord::new(1, 1), CellCoord::new(2, 2)] {
        let mut commands = Vec::new();
        configurator.handle(
            &events,
            ConfiguratorInput {
                clicked_cell: Some(cell),
                ..ConfiguratorInput::default()
            },
            SetupView {
                grid: query::grid(&session).expect("grid loaded"),
                agent_count: query::setup(&session).agent_count,
            },
            &mut commands,
        );
        events.clear();
        for command in commands {
            apply(&mut session, command, &mut events);
        }
    }
    assert_eq!(configurator.mode(), PlacementMode::Agent);

    let mut commands = Vec::new();
    configurator.handle(
        &events,
        ConfiguratorInput::default(),
        SetupView {
            grid: query::grid(&session).expect("grid loaded"),
            agent_count: query::setup(&session).agent_count,
        },
        &mut commands,
    );
    assert_eq!(
        configurator.mode(),
        PlacementMode::None,
        "placing the last agent should leave agent mode"
    );
    assert_eq!(query::setup(&session).agents.len(), 2);
}

#[test]
fn wall_click_surfaces_feedback() {
    let grid = open_grid(4, 4).with_code(CellCoord::new(1, 1), CellCode::Wall);
    let mut session = session_in_setup(grid);
    let mut configurator = Configurator::default();
    configurator.set_strategy(Strategy::Manual);
    configurator.toggle_mode(PlacementMode::Exit);

    let mut commands = Vec::new();
    configurator.handle(
        &[],
        ConfiguratorInput {
            clicked_cell: Some(CellCoord::new(1, 1)),
            ..ConfiguratorInput::default()
        },
        SetupView {
            grid: query::grid(&session).expect("grid loaded"),
            agent_count: 1,
        },
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands.drain(..) {
        apply(&mut session, command, &mut events);
    }
    configurator.handle(
        &events,
        ConfiguratorInput::default(),
        SetupView {
            grid: query::grid(&session).expect("grid loaded"),
            agent_count: 1,
        },
        &mut commands,
    );

    assert_eq!(configurator.last_feedback(), Some("cannot place on a wall"));
    assert!(query::setup(&session).exits.is_empty());
}

#[test]
fn clicks_are_ignored_in_automatic_strategy() {
    let grid = open_grid(4, 4);
    let mut configurator = Configurator::default();
    configurator.toggle_mode(PlacementMode::Fire);
    let mut commands = Vec::new();
    configurator.handle(
        &[],
        ConfiguratorInput {
            clicked_cell: Some(CellCoord::new(1, 1)),
            ..ConfiguratorInput::default()
        },
        SetupView {
            grid: &grid,
            agent_count: 1,
        },
        &mut commands,
    );
    assert!(commands.is_empty());
}
