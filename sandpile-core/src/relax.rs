use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;

/// Outcome of driving a lattice towards stability under a step budget.
///
/// `steps` counts toppling waves, i.e. steps in which at least one cell was
/// critical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Relaxation {
    Stable { steps: u64 },
    Exhausted { steps: u64 },
}

impl Relaxation {
    pub fn steps(&self) -> u64 {
        match *self {
            Relaxation::Stable { steps } | Relaxation::Exhausted { steps } => steps,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Relaxation::Stable { .. })
    }
}

impl Lattice {
    /// Steps until no cell is critical or `max_steps` toppling waves have run.
    ///
    /// With `max_steps == 0` nothing is touched and the result is
    /// `Exhausted { steps: 0 }`. A run whose last budgeted wave was still
    /// active is reported as exhausted even if that wave left the lattice
    /// stable.
    pub fn relax(&mut self, max_steps: u64) -> Relaxation {
        let mut steps = 0;
        while steps < max_steps {
            if !self.step() {
                debug!("lattice relaxed after {steps} steps");
                return Relaxation::Stable { steps };
            }
            steps += 1;
        }
        warn!("lattice still active after {max_steps} steps");
        Relaxation::Exhausted { steps }
    }

    /// Like [`Lattice::relax`], but evolves in blocks of `chunk` raw steps and
    /// only checks for stability between blocks.
    ///
    /// The final configuration matches `relax` whenever it stabilizes, since
    /// steps on a stable lattice are no-ops. At most `max_steps` raw steps are
    /// run; the reported count is the number of active steps seen.
    pub fn relax_in_chunks(&mut self, max_steps: u64, chunk: u64) -> Relaxation {
        let chunk = chunk.max(1);
        let mut executed = 0;
        let mut active_steps = 0;
        while executed < max_steps {
            let n = chunk.min(max_steps - executed);
            let mut last_active = false;
            for _ in 0..n {
                last_active = self.step();
                active_steps += last_active as u64;
            }
            executed += n;
            if !last_active {
                debug!("lattice relaxed after {active_steps} steps ({executed} executed)");
                return Relaxation::Stable {
                    steps: active_steps,
                };
            }
        }
        warn!("lattice still active after {max_steps} steps");
        Relaxation::Exhausted {
            steps: active_steps,
        }
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
    fn zero_budget_leaves_lattice_untouched() {
        let mut latt = center_pile();
        let before = latt.snapshot();
        assert_eq!(latt.relax(0), Relaxation::Exhausted { steps: 0 });
        assert_eq!(latt.heights(), before.heights());
    }

    #[test]
    fn single_wave_relaxes() {
        let mut latt = center_pile();
        let r = latt.relax(10);
        assert_eq!(r, Relaxation::Stable { steps: 1 });
        assert!(r.is_stable());
        assert!(latt.is_stable());
    }

    #[test]
    fn stable_input_takes_no_steps() {
        let mut latt = Lattice::new(4, 4, Boundary::Fixed, 4).unwrap();
        latt.fill(4);
        assert_eq!(latt.relax(5), Relaxation::Stable { steps: 0 });
    }

    #[test]
    fn budget_hit_on_last_active_wave_is_exhausted() {
        let mut latt = center_pile();
        assert_eq!(latt.relax(1), Relaxation::Exhausted { steps: 1 });
        assert!(latt.is_stable());
    }

    #[test]
    fn chunked_relax_matches_plain_relax() {
        let mut a = Lattice::new(6, 6, Boundary::Fixed, 4).unwrap();
        a.set(2, 3, 200).unwrap();
        let mut b = a.clone();

        let plain = a.relax(10_000);
        let chunked = b.relax_in_chunks(10_000, 7);

        assert!(plain.is_stable());
        assert_eq!(chunked, plain);
        assert_eq!(a.heights(), b.heights());
    }

    #[test]
    fn periodic_overfull_lattice_never_relaxes() {
        let mut latt = Lattice::new(3, 3, Boundary::Periodic, 4).unwrap();
        latt.fill(5);
        let r = latt.relax(50);
        assert_eq!(r, Relaxation::Exhausted { steps: 50 });
        assert_eq!(latt.mass(), 45);
    }
}
