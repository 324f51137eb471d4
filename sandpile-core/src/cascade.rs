use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;

/// Result of following one avalanche to its end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeRecord {
    /// Number of toppling waves, or [`CascadeRecord::UNRELAXED`] if the
    /// lattice was still active when the budget ran out.
    pub duration: i64,
    /// Number of distinct cells that changed at least once.
    pub size: usize,
    pub rows: usize,
    pub cols: usize,
    /// Row-major, `true` for every cell that changed at least once.
    pub affected: Vec<bool>,
    /// Row-major, the wave (1-based) in which each cell first changed.
    pub arrival: Vec<Option<u64>>,
}

impl CascadeRecord {
    pub const UNRELAXED: i64 = -1;

    pub fn is_relaxed(&self) -> bool {
        self.duration != Self::UNRELAXED
    }

    pub fn affected_at(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.affected[row * self.cols + col]
    }
}

/// Accumulates what a sequence of steps did to a lattice.
///
/// Feed it the lattice after each [`Lattice::step`] together with the step's
/// activity flag. Useful on its own for animation drivers that advance one
/// wave per frame.
#[derive(Clone, Debug)]
pub struct CascadeTracker {
    rows: usize,
    cols: usize,
    affected: Vec<bool>,
    arrival: Vec<Option<u64>>,
    waves: u64,
    observed: u64,
    active: bool,
}

impl CascadeTracker {
    pub fn new(lattice: &Lattice) -> Self {
        let size = lattice.len();
        CascadeTracker {
            rows: lattice.rows(),
            cols: lattice.cols(),
            affected: vec![false; size],
            arrival: vec![None; size],
            waves: 0,
            observed: 0,
            active: true,
        }
    }

    /// Folds the last step of `lattice` into the record.
    pub fn observe(&mut self, lattice: &Lattice, active: bool) {
        debug_assert_eq!(lattice.len(), self.affected.len());
        self.observed += 1;
        let stamp = self.observed;
        for ((hit, first), &d) in self
            .affected
            .iter_mut()
            .zip(self.arrival.iter_mut())
            .zip(lattice.last_delta())
        {
            if d != 0 {
                *hit = true;
                first.get_or_insert(stamp);
            }
        }
        self.waves += active as u64;
        self.active = active;
    }

    pub fn waves(&self) -> u64 {
        self.waves
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn affected(&self) -> &[bool] {
        &self.affected
    }

    pub fn size(&self) -> usize {
        self.affected.iter().filter(|&&a| a).count()
    }

    pub fn finish(self) -> CascadeRecord {
        let size = self.size();
        let duration = if self.active {
            CascadeRecord::UNRELAXED
        } else {
            self.waves as i64
        };
        CascadeRecord {
            duration,
            size,
            rows: self.rows,
            cols: self.cols,
            affected: self.affected,
            arrival: self.arrival,
        }
    }
}

impl Lattice {
    /// Follows the avalanche started by a prior perturbation.
    ///
    /// Runs the same loop as [`Lattice::relax`] while tracking every cell
    /// whose height changed. If the lattice is still active after
    /// `max_steps` waves the duration is [`CascadeRecord::UNRELAXED`] and the
    /// partial mask is kept.
    pub fn measure_cascade(&mut self, max_steps: u64) -> CascadeRecord {
        let mut tracker = CascadeTracker::new(self);
        while tracker.is_active() && tracker.waves() < max_steps {
            let active = self.step();
            tracker.observe(self, active);
        }
        let record = tracker.finish();
        if record.is_relaxed() {
            debug!(
                "cascade ended: duration={} size={}",
                record.duration, record.size
            );
        } else {
            warn!(
                "cascade did not relax within {max_steps} steps (size so far {})",
                record.size
            );
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Boundary;

    fn center_pile() -> Lattice {
        let mut latt = Lattice::new(3, 3, Boundary::Fixed, 3).unwrap();
        latt.set(1, 1, 4).unwrap();
        latt
    }

    #[test]
    fn center_topple_cascade() {
        let mut latt = center_pile();
        let rec = latt.measure_cascade(10);
        assert_eq!(rec.duration, 1);
        assert_eq!(rec.size, 5);
        assert!(rec.is_relaxed());
        assert!(rec.affected_at(1, 1));
        assert!(rec.affected_at(0, 1));
        assert!(!rec.affected_at(0, 0));
        assert!(!rec.affected_at(5, 5));
        assert_eq!(rec.arrival[4], Some(1));
        assert_eq!(rec.arrival[0], None);
    }

    #[test]
    fn budget_spent_on_active_wave_is_unrelaxed() {
        let mut latt = center_pile();
        let rec = latt.measure_cascade(1);
        assert_eq!(rec.duration, CascadeRecord::UNRELAXED);
        assert_eq!(rec.size, 5);
    }

    #[test]
    fn zero_budget_records_nothing() {
        let mut latt = center_pile();
        let rec = latt.measure_cascade(0);
        assert_eq!(rec.duration, CascadeRecord::UNRELAXED);
        assert_eq!(rec.size, 0);
        assert_eq!(latt.get(1, 1), Some(4));
    }

    #[test]
    fn stable_lattice_has_empty_cascade() {
        let mut latt = Lattice::new(4, 4, Boundary::Periodic, 4).unwrap();
        latt.fill(2);
        let rec = latt.measure_cascade(100);
        assert_eq!(rec.duration, 0);
        assert_eq!(rec.size, 0);
    }

    #[test]
    fn cell_back_at_start_value_still_counts() {
        let mut latt = Lattice::new(3, 3, Boundary::Fixed, 4).unwrap();
        latt.fill(4);
        latt.add(1, 1, 1).unwrap();

        let rec = latt.measure_cascade(10_000);

        // Center drops to 1 in wave 1 and is back at 5 after wave 2.
        assert!(rec.is_relaxed());
        assert_eq!(rec.size, 9);
        assert_eq!(rec.arrival[4], Some(1));
        assert_eq!(rec.arrival[1], Some(1));
        assert_eq!(rec.arrival[3], Some(1));
        assert_eq!(rec.arrival[0], Some(2));
        assert_eq!(rec.arrival[8], Some(2));
        assert!(latt.is_stable());
    }

    #[test]
    fn unrelaxed_cascade_keeps_partial_mask() {
        let mut latt = Lattice::new(5, 5, Boundary::Periodic, 4).unwrap();
        latt.fill(4);
        latt.add(2, 2, 1).unwrap();
        let rec = latt.measure_cascade(3);
        assert_eq!(rec.duration, CascadeRecord::UNRELAXED);
        assert!(rec.size > 0);
        assert!(rec.affected_at(2, 2));
    }

    #[test]
    fn tracker_drives_animation_frames() {
        let mut latt = center_pile();
        let mut tracker = CascadeTracker::new(&latt);
        let active = latt.step();
        tracker.observe(&latt, active);
        assert_eq!(tracker.waves(), 1);
        assert_eq!(tracker.size(), 5);
        let active = latt.step();
        tracker.observe(&latt, active);
        assert!(!tracker.is_active());
        assert_eq!(tracker.finish().duration, 1);
    }
}
