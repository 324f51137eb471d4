use crate::boundary::Direction;
use crate::lattice::Lattice;

impl Lattice {
    /// Advances the lattice by one synchronous toppling wave.
    ///
    /// Every cell above the threshold at the start of the step loses
    /// `threshold` grains and each of its four neighbors gains one. Grains
    /// sent past a fixed edge are lost. Cells pushed over the threshold by
    /// this wave only topple on the next call.
    ///
    /// Returns whether any cell toppled.
    pub fn step(&mut self) -> bool {
        let threshold = self.threshold();
        let cols = self.cols();

        self.topples = 0;
        for (c, &h) in self.collapse.iter_mut().zip(self.heights.iter()) {
            *c = h > threshold;
            self.topples += *c as usize;
        }

        self.delta.fill(0);
        if self.topples == 0 {
            return false;
        }

        for (d, &c) in self.delta.iter_mut().zip(self.collapse.iter()) {
            if c {
                *d -= threshold;
            }
        }

        // One shifted pass of the mask per direction.
        for dir in Direction::ALL {
            for idx in 0..self.collapse.len() {
                if !self.collapse[idx] {
                    continue;
                }
                if let Some((r, c)) = self.neighbor((idx / cols, idx % cols), dir) {
                    self.delta[r * cols + c] += 1;
                }
            }
        }

        for (h, &d) in self.heights.iter_mut().zip(self.delta.iter()) {
            *h += d;
        }

        true
    }

    /// Advances exactly `nsteps` raw steps and returns the last activity flag.
    pub fn evolve(&mut self, nsteps: u64) -> bool {
        let mut active = false;
        for _ in 0..nsteps {
            active = self.step();
        }
        active
    }
}
