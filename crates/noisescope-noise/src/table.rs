//! Seeded lattice of random values.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::interp::{lerp, Interp};

/// Number of distinct lattice values.
pub const TABLE_SIZE: usize = 256;
const TABLE_MASK: usize = TABLE_SIZE - 1;

/// Random values in `[0, 1)` looked up through a shuffled permutation.
///
/// The permutation is stored twice over so that `perm[perm[x] + y]` never
/// needs wrapping.
#[derive(Debug, Clone)]
pub struct NoiseTable {
    values: [f32; TABLE_SIZE],
    permutation: [u8; TABLE_SIZE * 2],
    seed: u64,
}

impl NoiseTable {
    /// Build the table from `seed`. Equal seeds give equal tables.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut values = [0.0; TABLE_SIZE];
        for value in &mut values {
            *value = rng.gen_range(0.0..1.0);
        }

        let mut shuffled: [u8; TABLE_SIZE] = std::array::from_fn(|i| i as u8);
        shuffled.shuffle(&mut rng);

        let mut permutation = [0; TABLE_SIZE * 2];
        permutation[..TABLE_SIZE].copy_from_slice(&shuffled);
        permutation[TABLE_SIZE..].copy_from_slice(&shuffled);

        tracing::debug!("Generated noise table (seed {seed:#x})");

        Self {
            values,
            permutation,
            seed,
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    fn perm(&self, i: usize) -> usize {
        usize::from(self.permutation[i])
    }

    /// Lattice value at `x` (wrapped to the table).
    #[must_use]
    pub fn value(&self, x: usize) -> f32 {
        self.values[self.perm(x & TABLE_MASK)]
    }

    /// Lattice value at `(x, y)` (each wrapped to the table).
    #[must_use]
    pub fn value_2d(&self, x: usize, y: usize) -> f32 {
        self.values[self.perm(self.perm(x & TABLE_MASK) + (y & TABLE_MASK))]
    }

    /// Value noise at non-negative `x`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn sample(&self, x: f32, interp: Interp) -> f32 {
        let floor = x.max(0.0) as usize;
        let t = interp.apply(x - floor as f32);
        lerp(self.value(floor), self.value(floor + 1), t)
    }

    /// Value noise at non-negative `(x, y)`: blend along x on the lower and
    /// upper lattice rows, then between the rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn sample_2d(&self, x: f32, y: f32, interp: Interp) -> f32 {
        let x0 = x.max(0.0) as usize;
        let y0 = y.max(0.0) as usize;
        let tx = interp.apply(x - x0 as f32);
        let ty = interp.apply(y - y0 as f32);

        let lower = lerp(self.value_2d(x0, y0), self.value_2d(x0 + 1, y0), tx);
        let upper = lerp(self.value_2d(x0, y0 + 1), self.value_2d(x0 + 1, y0 + 1), tx);
        lerp(lower, upper, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn same_seed_same_table() {
        let a = NoiseTable::new(0xDEAD_BEEF);
        let b = NoiseTable::new(0xDEAD_BEEF);
        for x in 0..TABLE_SIZE {
            assert_eq!(a.value(x).to_bits(), b.value(x).to_bits());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = NoiseTable::new(1);
        let b = NoiseTable::new(2);
        let differences = (0..TABLE_SIZE)
            .filter(|&x| a.value(x).to_bits() != b.value(x).to_bits())
            .count();
        assert!(differences > TABLE_SIZE / 2);
    }

    #[test]
    fn permutation_covers_every_index_twice() {
        let table = NoiseTable::new(7);
        let mut seen = [0_u32; TABLE_SIZE];
        for &p in &table.permutation {
            seen[usize::from(p)] += 1;
        }
        assert!(seen.iter().all(|&count| count == 2));
    }

    #[test]
    fn values_are_unit_range() {
        let table = NoiseTable::new(99);
        assert!(table.values.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn samples_hit_lattice_and_wrap() {
        let table = NoiseTable::new(42);
        assert_relative_eq!(table.sample(3.0, Interp::Linear), table.value(3));
        assert_relative_eq!(table.sample(3.0 + 256.0, Interp::Linear), table.value(3));
        assert_relative_eq!(table.sample_2d(5.0, 9.0, Interp::Smoothstep), table.value_2d(5, 9));
        assert_eq!(table.value_2d(300, 2).to_bits(), table.value_2d(44, 2).to_bits());
    }

    #[test]
    fn samples_stay_between_neighbours() {
        let table = NoiseTable::new(5);
        for i in 0..100 {
            let x = i as f32 * 0.37;
            let v = table.sample(x, Interp::Smootherstep);
            let a = table.value(x as usize);
            let b = table.value(x as usize + 1);
            assert!(v >= a.min(b) - 1e-6 && v <= a.max(b) + 1e-6);
        }
    }
}
