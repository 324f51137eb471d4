use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatticeError {
    #[error("lattice dimensions must be positive, got {rows}x{cols}")]
    EmptyDimension { rows: usize, cols: usize },

    #[error("threshold must be positive, got {0}")]
    NonPositiveThreshold(i64),

    #[error("cell ({row}, {col}) is outside a {rows}x{cols} lattice")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("expected {expected} heights, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}
