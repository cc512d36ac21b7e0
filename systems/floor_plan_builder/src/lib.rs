#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Interactive wall and door drawing tool.
//!
//! The builder works in its own pixel space: a square editing canvas divided
//! into a fixed number of cells. Objects are axis-aligned rectangles whose
//! position and size always sit on cell boundaries. Nothing here is tied to
//! the simulation grid; the exported raster goes back through the
//! image-to-grid service like any uploaded floor plan.

mod export;
mod storage;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use export::{export_png, DOOR_COLOR, WALL_COLOR};
pub use storage::{DrawingLibrary, DrawingStore, MemoryDrawingStore, SavedDrawing, SavedObject, DRAWINGS_KEY};

/// Default editing canvas side length in pixels.
pub const DEFAULT_CANVAS_SIZE: u32 = 512;

/// Default number of cells along each canvas edge.
pub const DEFAULT_CELLS: u32 = 32;

/// Default side length of the exported raster.
pub const DEFAULT_EXPORT_SIZE: u32 = 256;

/// Errors raised by builder operations.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// Canvas size and cell count do not produce whole, positive cells.
    #[error("canvas of {canvas_size}px cannot be split into {cells} cells")]
    InvalidSpace {
        /// Requested canvas size.
        canvas_size: u32,
        /// Requested cell count.
        cells: u32,
    },
    /// No object carries the identifier.
    #[error("no object with id {0}")]
    UnknownObject(u32),
    /// An operation required a selection.
    #[error("nothing is selected")]
    NothingSelected,
    /// No saved drawing carries the name.
    #[error("no saved drawing named `{0}`")]
    UnknownDrawing(String),
    /// The drawing store failed.
    #[error("drawing store failed: {0}")]
    Storage(String),
    /// Raster encoding failed.
    #[error("failed to encode export: {0}")]
    Export(#[from] image::ImageError),
}

/// Editing canvas geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuilderSpace {
    canvas_size: u32,
    cells: u32,
}

impl BuilderSpace {
    /// Creates a space, requiring the canvas to divide evenly into cells.
    pub fn new(canvas_size: u32, cells: u32) -> Result<Self, BuilderError> {
        if cells == 0 || canvas_size == 0 || canvas_size % cells != 0 {
            return Err(BuilderError::InvalidSpace { canvas_size, cells });
        }
        Ok(Self { canvas_size, cells })
    }

    /// Canvas side length in pixels.
    #[must_use]
    pub const fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Cells along each edge.
    #[must_use]
    pub const fn cells(&self) -> u32 {
        self.cells
    }

    /// Side length of one cell in pixels.
    #[must_use]
    pub const fn cell_size(&self) -> u32 {
        self.canvas_size / self.cells
    }

    /// Rounds a pixel value to the nearest cell boundary inside the canvas.
    #[must_use]
    pub fn snap(&self, value: f32) -> u32 {
        let cell = self.cell_size() as f32;
        let snapped = (value.max(0.0) / cell).round() * cell;
        (snapped as u32).min(self.canvas_size)
    }

    /// Snaps a length, never returning less than one cell.
    #[must_use]
    pub fn snap_length(&self, value: f32) -> u32 {
        self.snap(value).max(self.cell_size())
    }
}

impl Default for BuilderSpace {
    fn default() -> Self {
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            cells: DEFAULT_CELLS,
        }
    }
}

/// Axis-aligned rectangle in builder pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl PixelRect {
    /// Right edge, exclusive.
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge, exclusive.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the point lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x as f32
            && point.y >= self.y as f32
            && point.x < self.right() as f32
            && point.y < self.bottom() as f32
    }
}

/// Kind of drawn object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Solid wall segment.
    Wall,
    /// Door opening.
    Door,
}

/// Unique identifier of a drawn object within one builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Drawn object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuilderObject {
    /// Identifier.
    pub id: ObjectId,
    /// Wall or door.
    pub kind: ObjectKind,
    /// Snapped bounds.
    pub rect: PixelRect,
}

/// Active drawing tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Clicks select objects.
    #[default]
    Select,
    /// Clicks place walls.
    Wall,
    /// Clicks place doors.
    Door,
}

/// Rectangle edge exposed as a resize handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Left edge.
    Left,
    /// Right edge.
    Right,
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
}

/// Result of a canvas click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A new object was placed and selected.
    Placed(ObjectId),
    /// An existing object was selected.
    Selected(ObjectId),
    /// Empty canvas was clicked with the select tool.
    Deselected,
}

/// Number of objects per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectCounts {
    /// Walls drawn.
    pub walls: usize,
    /// Doors drawn.
    pub doors: usize,
}

/// Wall and door drawing state.
#[derive(Clone, Debug)]
pub struct FloorPlanBuilder {
    space: BuilderSpace,
    tool: Tool,
    wall_thickness: u32,
    objects: Vec<BuilderObject>,
    selected: Option<ObjectId>,
    next_id: u32,
}

impl FloorPlanBuilder {
    /// Creates an empty builder over the provided space.
    #[must_use]
    pub fn new(space: BuilderSpace) -> Self {
        Self {
            space,
            tool: Tool::Select,
            wall_thickness: space.cell_size(),
            objects: Vec::new(),
            selected: None,
            next_id: 0,
        }
    }

    /// Editing space.
    #[must_use]
    pub const fn space(&self) -> BuilderSpace {
        self.space
    }

    /// Active tool.
    #[must_use]
    pub const fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Thickness of new walls in pixels.
    #[must_use]
    pub const fn wall_thickness(&self) -> u32 {
        self.wall_thickness
    }

    /// Sets the thickness of new walls, snapped to at least one cell.
    pub fn set_wall_thickness(&mut self, pixels: f32) {
        self.wall_thickness = self.space.snap_length(pixels);
    }

    /// Objects in drawing order; later objects are on top.
    #[must_use]
    pub fn objects(&self) -> &[BuilderObject] {
        &self.objects
    }

    /// Currently selected object.
    #[must_use]
    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    /// Counts objects per kind.
    #[must_use]
    pub fn counts(&self) -> ObjectCounts {
        self.objects
            .iter()
            .fold(ObjectCounts::default(), |mut counts, object| {
                match object.kind {
                    ObjectKind::Wall => counts.walls += 1,
                    ObjectKind::Door => counts.doors += 1,
                }
                counts
            })
    }

    /// Topmost object under the point.
    #[must_use]
    pub fn object_at(&self, point: Vec2) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|object| object.rect.contains(point))
            .map(|object| object.id)
    }

    /// Handles a click on the canvas with the active tool.
    ///
    /// Clicking an existing object always selects it, whatever the tool.
    pub fn click(&mut self, point: Vec2) -> ClickOutcome {
        if let Some(id) = self.object_at(point) {
            self.selected = Some(id);
            return ClickOutcome::Selected(id);
        }
        let cell = self.space.cell_size();
        let (kind, width, height) = match self.tool {
            Tool::Select => {
                self.selected = None;
                return ClickOutcome::Deselected;
            }
            Tool::Wall => (ObjectKind::Wall, cell * 4, self.wall_thickness),
            Tool::Door => (ObjectKind::Door, cell * 2, cell),
        };
        let rect = PixelRect {
            x: self.space.snap(point.x),
            y: self.space.snap(point.y),
            width,
            height,
        };
        let id = self.insert(kind, rect);
        self.selected = Some(id);
        ClickOutcome::Placed(id)
    }

    /// Moves an object so its top-left corner snaps near the target.
    pub fn move_object(&mut self, id: ObjectId, top_left: Vec2) -> Result<PixelRect, BuilderError> {
        let space = self.space;
        let object = self.object_mut(id)?;
        object.rect.x = space.snap(top_left.x);
        object.rect.y = space.snap(top_left.y);
        Ok(object.rect)
    }

    /// Drags one edge of an object to a pixel position.
    ///
    /// The dragged edge snaps to a cell boundary; the opposite edge stays put
    /// and the object never shrinks below one cell.
    pub fn resize(&mut self, id: ObjectId, edge: Edge, position: f32) -> Result<PixelRect, BuilderError> {
        let space = self.space;
        let cell = space.cell_size();
        let object = self.object_mut(id)?;
        let rect = &mut object.rect;
        let target = space.snap(position);
        match edge {
            Edge::Right => rect.width = target.saturating_sub(rect.x).max(cell),
            Edge::Bottom => rect.height = target.saturating_sub(rect.y).max(cell),
            Edge::Left => {
                let right = rect.right();
                let left = target.min(right.saturating_sub(cell));
                rect.x = left;
                rect.width = right - left;
            }
            Edge::Top => {
                let bottom = rect.bottom();
                let top = target.min(bottom.saturating_sub(cell));
                rect.y = top;
                rect.height = bottom - top;
            }
        }
        Ok(*rect)
    }

    /// Selects an object.
    pub fn select(&mut self, id: ObjectId) -> Result<(), BuilderError> {
        let _ = self.object_mut(id)?;
        self.selected = Some(id);
        Ok(())
    }

    /// Deletes the selected object.
    pub fn delete_selected(&mut self) -> Result<BuilderObject, BuilderError> {
        let id = self.selected.take().ok_or(BuilderError::NothingSelected)?;
        let index = self
            .objects
            .iter()
            .position(|object| object.id == id)
            .ok_or(BuilderError::UnknownObject(id.get()))?;
        Ok(self.objects.remove(index))
    }

    /// Removes every object, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        self.selected = None;
        let count = self.objects.len();
        self.objects.clear();
        count
    }

    /// Replaces all objects with the provided ones, assigning fresh ids.
    pub fn replace_objects(&mut self, objects: impl IntoIterator<Item = (ObjectKind, PixelRect)>) {
        let _ = self.clear();
        for (kind, rect) in objects {
            let _ = self.insert(kind, rect);
        }
    }

    fn insert(&mut self, kind: ObjectKind, rect: PixelRect) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.objects.push(BuilderObject { id, kind, rect });
        id
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut BuilderObject, BuilderError> {
        self.objects
            .iter_mut()
            .find(|object| object.id == id)
            .ok_or(BuilderError::UnknownObject(id.get()))
    }
}

impl Default for FloorPlanBuilder {
    fn default() -> Self {
        Self::new(BuilderSpace::default())
    }
}
