use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, BoundaryMap, Cell, Direction};
use crate::error::LatticeError;

pub const DEFAULT_THRESHOLD: i64 = 4;

/// Shape, boundary condition and toppling threshold of a lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub boundary: Boundary,
    #[serde(default = "default_threshold")]
    pub threshold: i64,
}

fn default_threshold() -> i64 {
    DEFAULT_THRESHOLD
}

impl LatticeConfig {
    pub fn new(rows: usize, cols: usize) -> Self {
        LatticeConfig {
            rows,
            cols,
            boundary: Boundary::Fixed,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), LatticeError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(LatticeError::EmptyDimension {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.threshold <= 0 {
            return Err(LatticeError::NonPositiveThreshold(self.threshold));
        }
        Ok(())
    }

    pub fn build(self) -> Result<Lattice, LatticeError> {
        Lattice::from_config(self)
    }
}

/// A frozen copy of the heights of a lattice, restorable with [`Lattice::restore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    heights: Vec<i64>,
}

impl Snapshot {
    pub fn heights(&self) -> &[i64] {
        &self.heights
    }
}

/// Height grid of a sandpile, stored row-major.
///
/// Besides the heights the lattice keeps the scratch buffers of the last
/// topple step (critical mask and per-cell delta) so observers can inspect
/// what the step did.
#[derive(Clone, Debug)]
pub struct Lattice {
    config: LatticeConfig,
    pub(crate) heights: Vec<i64>,
    pub(crate) delta: Vec<i64>,
    pub(crate) collapse: Vec<bool>,
    pub(crate) topples: usize,
}

impl Lattice {
    pub fn new(
        rows: usize,
        cols: usize,
        boundary: Boundary,
        threshold: i64,
    ) -> Result<Lattice, LatticeError> {
        LatticeConfig::new(rows, cols)
            .with_boundary(boundary)
            .with_threshold(threshold)
            .build()
    }

    pub fn from_config(config: LatticeConfig) -> Result<Lattice, LatticeError> {
        config.validate()?;
        let size = config.rows * config.cols;
        Ok(Lattice {
            config,
            heights: vec![0; size],
            delta: vec![0; size],
            collapse: vec![false; size],
            topples: 0,
        })
    }

    // ---- Accessors ----

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn rows(&self) -> usize {
        self.config.rows
    }

    pub fn cols(&self) -> usize {
        self.config.cols
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn threshold(&self) -> i64 {
        self.config.threshold
    }

    pub fn boundary(&self) -> Boundary {
        self.config.boundary
    }

    pub fn heights(&self) -> &[i64] {
        &self.heights
    }

    /// Per-cell change applied by the last step.
    pub fn last_delta(&self) -> &[i64] {
        &self.delta
    }

    /// Cells that were critical at the start of the last step.
    pub fn collapse_mask(&self) -> &[bool] {
        &self.collapse
    }

    /// Number of cells that toppled in the last step.
    pub fn last_topples(&self) -> usize {
        self.topples
    }

    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows() && col < self.cols() {
            Some(row * self.cols() + col)
        } else {
            None
        }
    }

    pub fn cell(&self, idx: usize) -> Cell {
        (idx / self.cols(), idx % self.cols())
    }

    pub fn neighbor(&self, cell: Cell, dir: Direction) -> Option<Cell> {
        self.config
            .boundary
            .neighbor(cell, dir, self.rows(), self.cols())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        self.index(row, col).map(|i| self.heights[i])
    }

    // ---- Mutation by callers (fills, perturbations) ----

    pub fn set(&mut self, row: usize, col: usize, value: i64) -> Result<(), LatticeError> {
        let idx = self.checked_index(row, col)?;
        self.heights[idx] = value;
        Ok(())
    }

    /// Drops `amount` grains on a single cell.
    pub fn add(&mut self, row: usize, col: usize, amount: i64) -> Result<(), LatticeError> {
        let idx = self.checked_index(row, col)?;
        self.heights[idx] += amount;
        Ok(())
    }

    pub fn set_heights(&mut self, heights: Vec<i64>) -> Result<(), LatticeError> {
        if heights.len() != self.len() {
            return Err(LatticeError::ShapeMismatch {
                expected: self.len(),
                found: heights.len(),
            });
        }
        self.heights = heights;
        Ok(())
    }

    pub fn fill(&mut self, value: i64) {
        self.heights.fill(value);
    }

    pub fn clear(&mut self) {
        self.heights.fill(0);
        self.delta.fill(0);
        self.collapse.fill(false);
        self.topples = 0;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            heights: self.heights.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), LatticeError> {
        if snapshot.heights.len() != self.len() {
            return Err(LatticeError::ShapeMismatch {
                expected: self.len(),
                found: snapshot.heights.len(),
            });
        }
        self.heights.copy_from_slice(&snapshot.heights);
        Ok(())
    }

    // ---- Derived quantities ----

    /// Total number of grains on the lattice.
    pub fn mass(&self) -> i64 {
        self.heights.iter().sum()
    }

    pub fn is_critical(&self, idx: usize) -> bool {
        self.heights[idx] > self.config.threshold
    }

    pub fn critical_count(&self) -> usize {
        let t = self.config.threshold;
        self.heights.iter().filter(|&&h| h > t).count()
    }

    pub fn is_stable(&self) -> bool {
        let t = self.config.threshold;
        self.heights.iter().all(|&h| h <= t)
    }

    fn checked_index(&self, row: usize, col: usize) -> Result<usize, LatticeError> {
        self.index(row, col).ok_or(LatticeError::OutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        })
    }
}
