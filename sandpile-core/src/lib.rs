//! Abelian (Bak-Tang-Wiesenfeld) sandpile on a 2D lattice.
//!
//! Cells hold integer heights; any cell above the threshold topples, losing
//! `threshold` grains and giving one to each cardinal neighbor. Steps are
//! synchronous waves, so repeated steps model avalanche time.
//!
//! A topple always hands out exactly 4 grains, so mass is conserved on a
//! periodic lattice only when `threshold == 4`.

mod boundary;
mod cascade;
mod cycle;
mod engine;
mod error;
mod lattice;
mod relax;

pub use boundary::{Boundary, BoundaryMap, Cell, Direction, FixedBoundary, PeriodicBoundary};
pub use cascade::{CascadeRecord, CascadeTracker};
pub use cycle::LimitCycle;
pub use error::LatticeError;
pub use lattice::{DEFAULT_THRESHOLD, Lattice, LatticeConfig, Snapshot};
pub use relax::Relaxation;
