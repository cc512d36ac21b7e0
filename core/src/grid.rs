//! Occupancy grid returned by the image-to-grid service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CellCoord;

/// Integer code stored in every grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellCode {
    /// Walkable interior floor.
    Free,
    /// Solid wall.
    Wall,
    /// Door opening.
    Door,
    /// Window opening.
    Window,
    /// Padding ring surrounding the building footprint.
    Exterior,
    /// Any other code produced by the detector; treated as non-blocking.
    Other(i64),
}

impl CellCode {
    /// Decodes a raw wire value.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Self::Free,
            1 => Self::Wall,
            2 => Self::Door,
            3 => Self::Window,
            4 => Self::Exterior,
            other => Self::Other(other),
        }
    }

    /// Encodes the code back into its wire value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        match self {
            Self::Free => 0,
            Self::Wall => 1,
            Self::Door => 2,
            Self::Window => 3,
            Self::Exterior => 4,
            Self::Other(value) => value,
        }
    }

    /// Reports whether fire, agents and exits may occupy the cell.
    #[must_use]
    pub const fn is_free(self) -> bool {
        !matches!(self, Self::Wall | Self::Exterior)
    }
}

/// Errors raised while constructing a grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// Grid contained no rows or no columns.
    #[error("grid must contain at least one row and one column")]
    Empty,
    /// A row had a different length than the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
}

/// Immutable W×H matrix of cell codes stored row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i64>>", into = "Vec<Vec<i64>>")]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<CellCode>,
}

impl Grid {
    /// Builds a grid from row-major raw codes, `rows[row][col]`.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, GridError> {
        let expected = rows.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(expected * rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(GridError::Ragged {
                    row: index,
                    expected,
                    found: row.len(),
                });
            }
            cells.extend(row.iter().map(|raw| CellCode::from_raw(*raw)));
        }
        Ok(Self {
            columns: expected as u32,
            rows: rows.len() as u32,
            cells,
        })
    }

    /// Number of columns (W).
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows (H).
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the coordinate lies inside `[0,W)×[0,H)`.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Code stored at the cell, or `None` when out of bounds.
    #[must_use]
    pub fn code(&self, cell: CellCoord) -> Option<CellCode> {
        self.index(cell).map(|index| self.cells[index])
    }

    /// Returns a copy of the grid with a single cell replaced.
    ///
    /// Out-of-bounds coordinates leave the grid unchanged.
    #[must_use]
    pub fn with_code(mut self, cell: CellCoord, code: CellCode) -> Self {
        if let Some(index) = self.index(cell) {
            self.cells[index] = code;
        }
        self
    }

    /// Iterates over every cell with its coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, CellCode)> + '_ {
        let columns = self.columns;
        self.cells.iter().enumerate().map(move |(index, code)| {
            let index = index as u32;
            (CellCoord::new(index % columns, index / columns), *code)
        })
    }

    /// All cells that accept fire, agents and exits.
    #[must_use]
    pub fn free_cells(&self) -> Vec<CellCoord> {
        self.iter()
            .filter(|(_, code)| code.is_free())
            .map(|(cell, _)| cell)
            .collect()
    }

    /// Free cells on the outer row/column ring.
    #[must_use]
    pub fn perimeter_free_cells(&self) -> Vec<CellCoord> {
        let last_column = self.columns.saturating_sub(1);
        let last_row = self.rows.saturating_sub(1);
        self.iter()
            .filter(|(cell, code)| {
                code.is_free()
                    && (cell.row() == 0
                        || cell.row() == last_row
                        || cell.column() == 0
                        || cell.column() == last_column)
            })
            .map(|(cell, _)| cell)
            .collect()
    }

    /// Counts cells per load-bearing category.
    #[must_use]
    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats::default();
        for code in &self.cells {
            match code {
                CellCode::Wall => stats.wall += 1,
                CellCode::Exterior => stats.exterior += 1,
                _ => stats.free += 1,
            }
        }
        stats
    }

    /// Fraction of cells that are walls.
    #[must_use]
    pub fn wall_fraction(&self) -> f32 {
        self.stats().wall as f32 / self.cells.len() as f32
    }

    /// Row-major raw codes suitable for the wire.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<i64>> {
        self.cells
            .chunks(self.columns as usize)
            .map(|row| row.iter().map(|code| code.raw()).collect())
            .collect()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.row() as usize * self.columns as usize + cell.column() as usize)
    }
}

impl TryFrom<Vec<Vec<i64>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<i64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<i64>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

/// Cell counts per category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    /// Cells that accept placements, including doors and windows.
    pub free: usize,
    /// Wall cells.
    pub wall: usize,
    /// Exterior padding cells.
    pub exterior: usize,
}

/// Detector-bias correction applied to freshly processed grids.
///
/// The detector sometimes reports walls as floor and floor as walls. When the
/// wall fraction exceeds the threshold, free and wall codes are swapped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridCorrection {
    invert_threshold: Option<f32>,
}

impl GridCorrection {
    /// Default wall fraction above which the grid is inverted.
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Creates a correction; `None` disables inversion entirely.
    #[must_use]
    pub const fn new(invert_threshold: Option<f32>) -> Self {
        Self { invert_threshold }
    }

    /// Correction that never inverts.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(None)
    }

    /// Threshold in effect, if any.
    #[must_use]
    pub const fn invert_threshold(&self) -> Option<f32> {
        self.invert_threshold
    }

    /// Applies the heuristic, returning the grid and whether it was inverted.
    #[must_use]
    pub fn apply(&self, grid: Grid) -> (Grid, bool) {
        let Some(threshold) = self.invert_threshold else {
            return (grid, false);
        };
        if grid.wall_fraction() <= threshold {
            return (grid, false);
        }
        let Grid {
            columns,
            rows,
            cells,
        } = grid;
        let cells = cells
            .into_iter()
            .map(|code| match code {
                CellCode::Free => CellCode::Wall,
                CellCode::Wall => CellCode::Free,
                other => other,
            })
            .collect();
        (
            Grid {
                columns,
                rows,
                cells,
            },
            true,
        )
    }
}

impl Default for GridCorrection {
    fn default() -> Self {
        Self::new(Some(Self::DEFAULT_THRESHOLD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_are_rejected() {
        assert_eq!(
            Grid::from_rows(vec![vec![0, 0], vec![0]]),
            Err(GridError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(Grid::from_rows(Vec::new()), Err(GridError::Empty));
        assert_eq!(Grid::from_rows(vec![Vec::new()]), Err(GridError::Empty));
    }

    #[test]
    fn empty_wire_grids_are_rejected() {
        assert!(serde_json::from_str::<Grid>("[]").is_err());
        assert!(serde_json::from_str::<Grid>("[[]]").is_err());

        let single = Grid::from_rows(vec![vec![0]]).expect("valid grid");
        assert_eq!(
            single.perimeter_free_cells(),
            vec![CellCoord::from_row_col(0, 0)]
        );
    }

    #[test]
    fn codes_are_addressed_row_major() {
        let grid = Grid::from_rows(vec![vec![0, 1, 4], vec![2, 3, 9]]).expect("valid grid");
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.code(CellCoord::new(1, 0)), Some(CellCode::Wall));
        assert_eq!(grid.code(CellCoord::new(2, 0)), Some(CellCode::Exterior));
        assert_eq!(grid.code(CellCoord::new(2, 1)), Some(CellCode::Other(9)));
        assert_eq!(grid.code(CellCoord::new(3, 0)), None);
        assert_eq!(grid.to_rows(), vec![vec![0, 1, 4], vec![2, 3, 9]]);
    }

    #[test]
    fn perimeter_only_includes_free_edge_cells() {
        let grid = Grid::from_rows(vec![
            vec![1, 0, 1],
            vec![0, 0, 4],
            vec![1, 1, 1],
        ])
        .expect("valid grid");
        assert_eq!(
            grid.perimeter_free_cells(),
            vec![CellCoord::new(1, 0), CellCoord::new(0, 1)]
        );
        assert_eq!(grid.free_cells().len(), 3);
    }

    #[test]
    fn inversion_triggers_only_above_threshold() {
        let mostly_walls =
            Grid::from_rows(vec![vec![1, 1], vec![1, 0]]).expect("valid grid");
        let (inverted, flipped) = GridCorrection::default().apply(mostly_walls.clone());
        assert!(flipped, "75% walls should be inverted");
        assert_eq!(inverted.to_rows(), vec![vec![0, 0], vec![0, 1]]);

        let half = Grid::from_rows(vec![vec![1, 0]]).expect("valid grid");
        let (unchanged, flipped) = GridCorrection::default().apply(half.clone());
        assert!(!flipped, "exactly half walls stays as-is");
        assert_eq!(unchanged, half);

        let (unchanged, flipped) = GridCorrection::disabled().apply(mostly_walls.clone());
        assert!(!flipped);
        assert_eq!(unchanged, mostly_walls);
    }

    #[test]
    fn grid_deserializes_from_nested_arrays() {
        let grid: Grid = serde_json::from_str("[[0,1],[4,0]]").expect("valid json grid");
        assert_eq!(grid.stats(), GridStats { free: 2, wall: 1, exterior: 1 });
        assert!(serde_json::from_str::<Grid>("[[0,1],[4]]").is_err());
    }
}
