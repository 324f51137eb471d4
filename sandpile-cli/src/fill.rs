use rand::Rng;
use sandpile_core::{Lattice, LatticeError};

#[derive(Clone, Copy, Debug)]
pub enum FillKind {
    Uniform,
    Mass,
    CenterBlock,
}

impl FillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillKind::Uniform => "uniform",
            FillKind::Mass => "mass",
            FillKind::CenterBlock => "center_block",
        }
    }
}

/// Every cell gets an independent height drawn from `min..max`.
pub fn random_fill<R: Rng>(
    rng: &mut R,
    latt: &mut Lattice,
    min: i64,
    max: i64,
) -> Result<(), LatticeError> {
    let heights = (0..latt.len()).map(|_| rng.gen_range(min..max)).collect();
    latt.set_heights(heights)
}

/// Clears the lattice and drops `mass` grains one by one on uniformly random cells.
pub fn random_fill_mass<R: Rng>(
    rng: &mut R,
    latt: &mut Lattice,
    mass: u64,
) -> Result<(), LatticeError> {
    latt.clear();
    let (rows, cols) = (latt.rows(), latt.cols());
    for _ in 0..mass {
        let row = rng.gen_range(0..rows);
        let col = rng.gen_range(0..cols);
        latt.add(row, col, 1)?;
    }
    Ok(())
}

/// Clears the lattice and sets a centered `block x block` square to `height`.
///
/// The block is clipped to the lattice.
pub fn fill_center_block(
    latt: &mut Lattice,
    block: usize,
    height: i64,
) -> Result<(), LatticeError> {
    latt.clear();
    let (rows, cols) = (latt.rows(), latt.cols());
    let r0 = (rows / 2).saturating_sub(block / 2);
    let c0 = (cols / 2).saturating_sub(block / 2);
    for row in r0..(r0 + block).min(rows) {
        for col in c0..(c0 + block).min(cols) {
            latt.set(row, col, height)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sandpile_core::Boundary;

    #[test]
    fn uniform_fill_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut latt = Lattice::new(8, 8, Boundary::Fixed, 4).unwrap();
        random_fill(&mut rng, &mut latt, 4, 20).unwrap();
        assert!(latt.heights().iter().all(|&h| (4..20).contains(&h)));
    }

    #[test]
    fn uniform_fill_is_seeded() {
        let mut a = Lattice::new(5, 5, Boundary::Fixed, 4).unwrap();
        let mut b = a.clone();
        random_fill(&mut ChaCha8Rng::seed_from_u64(3), &mut a, 0, 10).unwrap();
        random_fill(&mut ChaCha8Rng::seed_from_u64(3), &mut b, 0, 10).unwrap();
        assert_eq!(a.heights(), b.heights());
    }

    #[test]
    fn mass_fill_hits_target_mass() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut latt = Lattice::new(6, 6, Boundary::Periodic, 4).unwrap();
        latt.fill(9);
        random_fill_mass(&mut rng, &mut latt, 70).unwrap();
        assert_eq!(latt.mass(), 70);
    }

    #[test]
    fn center_block_is_centered_and_clipped() {
        let mut latt = Lattice::new(4, 4, Boundary::Fixed, 4).unwrap();
        fill_center_block(&mut latt, 2, 9).unwrap();
        assert_eq!(latt.get(1, 1), Some(9));
        assert_eq!(latt.get(2, 2), Some(9));
        assert_eq!(latt.get(0, 0), Some(0));
        assert_eq!(latt.mass(), 36);

        fill_center_block(&mut latt, 10, 1).unwrap();
        assert_eq!(latt.mass(), 16);
    }
}
