//! Grid and pixel coordinate spaces shared by every component that reads a grid.
//!
//! Two spaces are in play: integer grid cells and canvas pixels. A single
//! [`GridSpace`] value carries the pixels-per-cell factor so that the exit
//! placer, the configurator and the renderer can never disagree on it.

use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// On the wire a cell is encoded as a `[row, col]` pair, matching the
/// row-major `grid[row][col]` layout used by the external services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Creates a coordinate from a `(row, column)` pair as used on the wire.
    #[must_use]
    pub const fn from_row_col(row: u32, column: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Euclidean distance between two cells in grid units.
    #[must_use]
    pub fn distance(self, other: CellCoord) -> f32 {
        let dx = self.column.abs_diff(other.column) as f32;
        let dy = self.row.abs_diff(other.row) as f32;
        dx.hypot(dy)
    }
}

impl Serialize for CellCoord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.row, self.column).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellCoord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (row, column) = <(u32, u32)>::deserialize(deserializer)?;
        Ok(Self { column, row })
    }
}

/// Errors raised when constructing coordinate transforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// Cell size must be positive to avoid a zero-sized cell.
    #[error("cell_size must be positive (received {cell_size})")]
    ZeroCellSize {
        /// Provided cell size that failed validation.
        cell_size: u32,
    },
}

/// Conversion between grid cells and canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSpace {
    cell_size: u32,
}

impl GridSpace {
    /// Default number of canvas pixels per grid cell.
    pub const DEFAULT_CELL_SIZE: u32 = 3;

    /// Creates a new grid space, rejecting a zero cell size.
    pub fn new(cell_size: u32) -> Result<Self, CoordinateError> {
        if cell_size == 0 {
            return Err(CoordinateError::ZeroCellSize { cell_size });
        }
        Ok(Self { cell_size })
    }

    /// Number of canvas pixels along one edge of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Pixel position of the cell's upper-left corner.
    #[must_use]
    pub fn cell_origin(&self, cell: CellCoord) -> Vec2 {
        let size = self.cell_size as f32;
        Vec2::new(cell.column() as f32 * size, cell.row() as f32 * size)
    }

    /// Pixel position of the cell's center.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        self.cell_origin(cell) + Vec2::splat(self.cell_size as f32 * 0.5)
    }

    /// Converts a canvas pixel position into the containing cell.
    ///
    /// Returns `None` for negative or non-finite positions. Upper bounds are
    /// not checked here; that is the grid's responsibility.
    #[must_use]
    pub fn pixel_to_cell(&self, pixel: Vec2) -> Option<CellCoord> {
        let column = axis_to_cell(pixel.x, self.cell_size)?;
        let row = axis_to_cell(pixel.y, self.cell_size)?;
        Some(CellCoord::new(column, row))
    }

    /// Canvas dimensions in pixels for a grid of the provided size.
    #[must_use]
    pub const fn canvas_size(&self, columns: u32, rows: u32) -> (u32, u32) {
        (
            columns.saturating_mul(self.cell_size),
            rows.saturating_mul(self.cell_size),
        )
    }
}

impl Default for GridSpace {
    fn default() -> Self {
        Self {
            cell_size: Self::DEFAULT_CELL_SIZE,
        }
    }
}

fn axis_to_cell(value: f32, cell_size: u32) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let cell = (value / cell_size as f32).floor();
    if cell > u32::MAX as f32 {
        return None;
    }
    Some(cell as u32)
}

/// Maps pointer positions measured on the displayed (possibly scaled) canvas
/// back onto the canvas' own pixel grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayTransform {
    display_size: Vec2,
    canvas_size: Vec2,
}

impl DisplayTransform {
    /// Creates a transform between the displayed size and the backing canvas size.
    #[must_use]
    pub const fn new(display_size: Vec2, canvas_size: Vec2) -> Self {
        Self {
            display_size,
            canvas_size,
        }
    }

    /// Transform for a canvas displayed at its natural size.
    #[must_use]
    pub const fn identity(canvas_size: Vec2) -> Self {
        Self::new(canvas_size, canvas_size)
    }

    /// Converts a display-space point into canvas pixels.
    ///
    /// Returns `None` when the displayed size is degenerate.
    #[must_use]
    pub fn to_canvas(&self, display_point: Vec2) -> Option<Vec2> {
        if self.display_size.x <= f32::EPSILON || self.display_size.y <= f32::EPSILON {
            return None;
        }
        let scale = self.canvas_size / self.display_size;
        Some(display_point * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_pixel_grid_round_trip_is_identity() {
        for cell_size in [1, 3, 7, 16] {
            let space = GridSpace::new(cell_size).expect("positive cell size");
            for row in 0..40 {
                for column in 0..40 {
                    let cell = CellCoord::new(column, row);
                    assert_eq!(space.pixel_to_cell(space.cell_origin(cell)), Some(cell));
                    assert_eq!(space.pixel_to_cell(space.cell_center(cell)), Some(cell));
                }
            }
        }
    }

    #[test]
    fn pixel_to_cell_floors_fractional_positions() {
        let space = GridSpace::new(3).expect("positive cell size");
        assert_eq!(
            space.pixel_to_cell(Vec2::new(8.99, 3.0)),
            Some(CellCoord::new(2, 1))
        );
    }

    #[test]
    fn pixel_to_cell_rejects_negative_and_nan() {
        let space = GridSpace::default();
        assert_eq!(space.pixel_to_cell(Vec2::new(-0.5, 2.0)), None);
        assert_eq!(space.pixel_to_cell(Vec2::new(f32::NAN, 2.0)), None);
    }

    #[test]
    fn zero_cell_size_is_rejected() {
        assert_eq!(
            GridSpace::new(0),
            Err(CoordinateError::ZeroCellSize { cell_size: 0 })
        );
    }

    #[test]
    fn display_transform_corrects_css_scaling() {
        let transform = DisplayTransform::new(Vec2::new(384.0, 384.0), Vec2::new(768.0, 768.0));
        assert_eq!(
            transform.to_canvas(Vec2::new(10.0, 20.0)),
            Some(Vec2::new(20.0, 40.0))
        );
        let degenerate = DisplayTransform::new(Vec2::ZERO, Vec2::splat(10.0));
        assert_eq!(degenerate.to_canvas(Vec2::ONE), None);
    }

    #[test]
    fn euclidean_distance_matches_expectation() {
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(3, 4);
        assert!((a.distance(b) - 5.0).abs() < f32::EPSILON);
        assert_eq!(a.manhattan_distance(b), 7);
    }

    #[test]
    fn cell_coord_serializes_as_row_col_pair() {
        let cell = CellCoord::new(7, 2);
        let json = serde_json::to_string(&cell).expect("serialize");
        assert_eq!(json, "[2,7]");
        let restored: CellCoord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, cell);
    }
}
