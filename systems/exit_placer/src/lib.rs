#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure exit-placement system translating pointer input over the processed
//! floor plan into exit and assembly-point commands.

use evacsim_core::{CellCoord, Command, DisplayTransform, Event, Exit, ExitId, GridSpace, PlacementError};
use glam::Vec2;

/// Default hit radius, in grid cells, used when clicking an exit to remove it.
pub const DEFAULT_HIT_RADIUS: f32 = 2.0;

/// Interaction mode of the placement canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlacerMode {
    /// Clicking an exit or the assembly point removes it.
    #[default]
    View,
    /// Clicking places a new exit.
    AddExit,
    /// Clicking places or moves the assembly point.
    AddAssembly,
}

/// Input snapshot distilled from adapter-provided pointer and button state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlacerInput {
    /// Pointer position in display pixels, if the pointer is over the canvas.
    pub pointer: Option<Vec2>,
    /// Indicates whether the pointer was clicked on this frame.
    pub click: bool,
    /// Indicates whether the user requested undo on this frame.
    pub undo: bool,
    /// Indicates whether the user requested clearing all exits on this frame.
    pub clear: bool,
}

/// Read-only view of the placed exits and assembly point.
#[derive(Clone, Copy, Debug)]
pub struct PlacementView<'a> {
    /// Exits in placement order.
    pub exits: &'a [Exit],
    /// Current assembly point.
    pub assembly_point: Option<CellCoord>,
}

/// Exit-placement system.
#[derive(Debug, Clone)]
pub struct ExitPlacer {
    space: GridSpace,
    hit_radius: f32,
    mode: PlacerMode,
    show_overlay: bool,
    hover_cell: Option<CellCoord>,
    hovered_exit: Option<ExitId>,
    feedback: Option<String>,
}

impl ExitPlacer {
    /// Creates a placer sharing the grid space used by the renderer.
    #[must_use]
    pub fn new(space: GridSpace, hit_radius: f32) -> Self {
        Self {
            space,
            hit_radius,
            mode: PlacerMode::View,
            show_overlay: true,
            hover_cell: None,
            hovered_exit: None,
            feedback: None,
        }
    }

    /// Current interaction mode.
    #[must_use]
    pub const fn mode(&self) -> PlacerMode {
        self.mode
    }

    /// Switches to the provided mode.
    pub fn set_mode(&mut self, mode: PlacerMode) {
        self.mode = mode;
    }

    /// Flips between viewing and adding exits.
    pub fn toggle_add_exit(&mut self) {
        self.mode = match self.mode {
            PlacerMode::AddExit => PlacerMode::View,
            _ => PlacerMode::AddExit,
        };
    }

    /// Whether the wall overlay should be drawn.
    #[must_use]
    pub const fn show_overlay(&self) -> bool {
        self.show_overlay
    }

    /// Shows or hides the wall overlay.
    pub fn toggle_overlay(&mut self) {
        self.show_overlay = !self.show_overlay;
    }

    /// Cell under the pointer, for the hover highlight.
    #[must_use]
    pub const fn hover_cell(&self) -> Option<CellCoord> {
        self.hover_cell
    }

    /// Exit under the pointer, for emphasis while viewing.
    #[must_use]
    pub const fn hovered_exit(&self) -> Option<ExitId> {
        self.hovered_exit
    }

    /// User-readable message explaining the last rejected placement.
    #[must_use]
    pub fn last_feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Consumes session events and pointer input to emit placement commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        transform: DisplayTransform,
        input: PlacerInput,
        view: PlacementView<'_>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::GridLoaded { .. } => {
                    self.mode = PlacerMode::View;
                    self.feedback = None;
                }
                Event::AssemblyPointSet { .. } => {
                    self.mode = PlacerMode::View;
                    self.feedback = None;
                }
                Event::ExitPlaced { .. } => self.feedback = None,
                Event::ExitRejected { reason, .. } | Event::AssemblyPointRejected { reason, .. } => {
                    self.feedback = Some(reason.to_string());
                }
                _ => {}
            }
        }

        if input.undo {
            out.push(Command::UndoExit);
        }
        if input.clear {
            out.push(Command::ClearExits);
        }

        let cell = input
            .pointer
            .and_then(|pointer| transform.to_canvas(pointer))
            .and_then(|canvas| self.space.pixel_to_cell(canvas));
        self.hover_cell = cell;
        self.hovered_exit = cell.and_then(|cell| self.exit_at(cell, view.exits));

        if !input.click || input.pointer.is_none() {
            return;
        }
        let Some(cell) = cell else {
            if self.mode != PlacerMode::View {
                self.feedback = Some(PlacementError::OutOfBounds.to_string());
            }
            return;
        };

        match self.mode {
            PlacerMode::AddExit => out.push(Command::PlaceExit { cell }),
            PlacerMode::AddAssembly => out.push(Command::PlaceAssemblyPoint { cell }),
            PlacerMode::View => {
                if let Some(exit) = self.hovered_exit {
                    out.push(Command::RemoveExit { exit });
                } else if view.assembly_point == Some(cell) {
                    out.push(Command::RemoveAssemblyPoint);
                }
            }
        }
    }

    fn exit_at(&self, cell: CellCoord, exits: &[Exit]) -> Option<ExitId> {
        exits
            .iter()
            .map(|exit| (exit.id, exit.cell.distance(cell)))
            .filter(|(_, distance)| *distance <= self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

impl Default for ExitPlacer {
    fn default() -> Self {
        Self::new(GridSpace::default(), DEFAULT_HIT_RADIUS)
    }
}
