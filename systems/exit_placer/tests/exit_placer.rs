use evacsim_core::{
    CellCoord, Command, DisplayTransform, Event, Exit, ExitId, Grid, GridSpace, PlacementError,
};
use evacsim_system_exit_placer::{ExitPlacer, PlacementView, PlacerInput, PlacerMode};
use evacsim_world::{apply, query, Session};
use glam::Vec2;

const CELL: f32 = 3.0;

fn identity() -> DisplayTransform {
    DisplayTransform::identity(Vec2::splat(30.0))
}

fn click_at(cell: CellCoord) -> PlacerInput {
    PlacerInput {
        pointer: Some(Vec2::new(
            cell.column() as f32 * CELL + 1.0,
            cell.row() as f32 * CELL + 1.0,
        )),
        click: true,
        ..PlacerInput::default()
    }
}

fn empty_view() -> PlacementView<'static> {
    PlacementView {
        exits: &[],
        assembly_point: None,
    }
}

fn placer() -> ExitPlacer {
    ExitPlacer::new(GridSpace::new(3).expect("positive cell size"), 2.0)
}

#[test]
fn add_exit_mode_emits_place_command_for_clicked_cell() {
    let mut placer = placer();
    placer.toggle_add_exit();
    let mut commands = Vec::new();

    placer.handle(
        &[],
        identity(),
        click_at(CellCoord::new(4, 7)),
        empty_view(),
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![Command::PlaceExit {
            cell: CellCoord::new(4, 7)
        }],
        "clicks in add-exit mode should request an exit at the clicked cell",
    );
}

#[test]
fn scaled_display_is_corrected_before_grid_conversion() {
    let mut placer = placer();
    placer.set_mode(PlacerMode::AddExit);
    let mut commands = Vec::new();
    let half_size = DisplayTransform::new(Vec2::splat(15.0), Vec2::splat(30.0));

    placer.handle(
        &[],
        half_size,
        PlacerInput {
            pointer: Some(Vec2::new(5.0, 2.0)),
            click: true,
            ..PlacerInput::default()
        },
        empty_view(),
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![Command::PlaceExit {
            cell: CellCoord::new(3, 1)
        }]
    );
}

#[test]
fn view_mode_click_near_exit_removes_it() {
    let mut placer = placer();
    let exits = [Exit {
        id: ExitId::new(3),
        cell: CellCoord::new(5, 5),
    }];
    let mut commands = Vec::new();

    placer.handle(
        &[],
        identity(),
        click_at(CellCoord::new(6, 6)),
        PlacementView {
            exits: &exits,
            assembly_point: None,
        },
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![Command::RemoveExit {
            exit: ExitId::new(3)
        }],
        "proximity hit test should find the exit one diagonal cell away",
    );
    assert_eq!(placer.hovered_exit(), Some(ExitId::new(3)));
}

#[test]
fn view_mode_click_far_from_exits_does_nothing() {
    let mut placer = placer();
    let exits = [Exit {
        id: ExitId::new(0),
        cell: CellCoord::new(0, 0),
    }];
    let mut commands = Vec::new();

    placer.handle(
        &[],
        identity(),
        click_at(CellCoord::new(5, 5)),
        PlacementView {
            exits: &exits,
            assembly_point: None,
        },
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn view_mode_click_on_assembly_point_removes_it() {
    let mut placer = placer();
    let mut commands = Vec::new();
    placer.handle(
        &[],
        identity(),
        click_at(CellCoord::new(9, 9)),
        PlacementView {
            exits: &[],
            assembly_point: Some(CellCoord::new(9, 9)),
        },
        &mut commands,
    );
    assert_eq!(commands, vec![Command::RemoveAssemblyPoint]);
}

#[test]
fn assembly_placement_returns_to_view_mode() {
    let mut placer = placer();
    placer.set_mode(PlacerMode::AddAssembly);
    let mut commands = Vec::new();

    placer.handle(
        &[Event::AssemblyPointSet {
            cell: CellCoord::new(9, 9),
        }],
        identity(),
        PlacerInput::default(),
        empty_view(),
        &mut commands,
    );

    assert_eq!(placer.mode(), PlacerMode::View);
    assert!(commands.is_empty());
}

#[test]
fn undo_and_clear_are_forwarded() {
    let mut placer = placer();
    let mut commands = Vec::new();
    placer.handle(
        &[],
        identity(),
        PlacerInput {
            undo: true,
            clear: true,
            ..PlacerInput::default()
        },
        empty_view(),
        &mut commands,
    );
    assert_eq!(commands, vec![Command::UndoExit, Command::ClearExits]);
}

#[test]
fn rejection_feedback_is_surfaced_from_session() {
    let mut session = Session::default();
    let mut events = Vec::new();
    let mut rows = vec![vec![0; 10]; 10];
    rows[2][2] = 1;
    apply(
        &mut session,
        Command::LoadGrid {
            grid: Grid::from_rows(rows).expect("valid grid"),
            background: None,
        },
        &mut events,
    );

    let mut placer = placer();
    placer.toggle_add_exit();
    let mut commands = Vec::new();
    placer.handle(
        &events,
        identity(),
        click_at(CellCoord::new(2, 2)),
        PlacementView {
            exits: query::exits(&session),
            assembly_point: query::assembly_point(&session),
        },
        &mut commands,
    );

    events.clear();
    for command in commands.drain(..) {
        apply(&mut session, command, &mut events);
    }
    placer.handle(
        &events,
        identity(),
        PlacerInput::default(),
        PlacementView {
            exits: query::exits(&session),
            assembly_point: query::assembly_point(&session),
        },
        &mut commands,
    );

    assert_eq!(
        placer.last_feedback(),
        Some(PlacementError::OnWall.to_string().as_str())
    );
    assert!(query::exits(&session).is_empty());
    assert_eq!(placer.mode(), PlacerMode::AddExit);
}
