use serde::{Deserialize, Serialize};

/// A cell address as `(row, col)`.
pub type Cell = (usize, usize);

/// The four cardinal directions a toppling cell sheds grains into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Row/column offset of the neighbor in this direction.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Maps a cell and a direction to the neighboring cell on a `rows x cols` grid.
///
/// `None` means the neighbor lies outside the grid and anything sent there is lost.
pub trait BoundaryMap {
    fn neighbor(&self, cell: Cell, dir: Direction, rows: usize, cols: usize) -> Option<Cell>;
}

/// Open edges: sand flowing past the border is discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedBoundary;

/// Opposite edges are adjacent.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeriodicBoundary;

impl BoundaryMap for FixedBoundary {
    fn neighbor(&self, (row, col): Cell, dir: Direction, rows: usize, cols: usize) -> Option<Cell> {
        let (dr, dc) = dir.offset();
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        if r >= rows || c >= cols {
            return None;
        }
        Some((r, c))
    }
}

impl BoundaryMap for PeriodicBoundary {
    fn neighbor(&self, (row, col): Cell, dir: Direction, rows: usize, cols: usize) -> Option<Cell> {
        let (dr, dc) = dir.offset();
        let r = (row + rows).wrapping_add_signed(dr) % rows;
        let c = (col + cols).wrapping_add_signed(dc) % cols;
        Some((r, c))
    }
}

/// Boundary condition of a lattice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    #[default]
    Fixed,
    Periodic,
}

impl BoundaryMap for Boundary {
    fn neighbor(&self, cell: Cell, dir: Direction, rows: usize, cols: usize) -> Option<Cell> {
        match self {
            Boundary::Fixed => FixedBoundary.neighbor(cell, dir, rows, cols),
            Boundary::Periodic => PeriodicBoundary.neighbor(cell, dir, rows, cols),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_drops_neighbors_past_the_edge() {
        let b = FixedBoundary;
        assert_eq!(b.neighbor((0, 0), Direction::Up, 3, 4), None);
        assert_eq!(b.neighbor((0, 0), Direction::Left, 3, 4), None);
        assert_eq!(b.neighbor((2, 3), Direction::Down, 3, 4), None);
        assert_eq!(b.neighbor((2, 3), Direction::Right, 3, 4), None);
        assert_eq!(b.neighbor((1, 1), Direction::Up, 3, 4), Some((0, 1)));
        assert_eq!(b.neighbor((1, 1), Direction::Right, 3, 4), Some((1, 2)));
    }

    #[test]
    fn periodic_wraps_both_axes() {
        let b = PeriodicBoundary;
        assert_eq!(b.neighbor((0, 0), Direction::Up, 3, 4), Some((2, 0)));
        assert_eq!(b.neighbor((0, 0), Direction::Left, 3, 4), Some((0, 3)));
        assert_eq!(b.neighbor((2, 3), Direction::Down, 3, 4), Some((0, 3)));
        assert_eq!(b.neighbor((2, 3), Direction::Right, 3, 4), Some((2, 0)));
    }

    #[test]
    fn periodic_single_row_points_back_at_itself() {
        let b = PeriodicBoundary;
        assert_eq!(b.neighbor((0, 2), Direction::Up, 1, 5), Some((0, 2)));
        assert_eq!(b.neighbor((0, 2), Direction::Down, 1, 5), Some((0, 2)));
    }

    #[test]
    fn enum_dispatches_to_mode() {
        assert_eq!(Boundary::Fixed.neighbor((0, 0), Direction::Up, 2, 2), None);
        assert_eq!(
            Boundary::Periodic.neighbor((0, 0), Direction::Up, 2, 2),
            Some((1, 0))
        );
    }
}
