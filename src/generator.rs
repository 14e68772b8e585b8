use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bounds::BoundingBox;

/// A site of the tessellation: a caller-chosen id and a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Generator<const D: usize> {
    pub id: usize,
    pub position: [f64; D],
}

impl<const D: usize> Generator<D> {
    pub fn new(id: usize, position: [f64; D]) -> Self {
        Self { id, position }
    }

    /// Builds generators from a flat coordinate array `[x0, y0, x1, y1, ...]`, using the
    /// point index as id.
    pub fn from_flat(coords: &[f64]) -> Vec<Self> {
        coords
            .chunks_exact(D)
            .enumerate()
            .map(|(id, chunk)| {
                let mut position = [0.0; D];
                position.copy_from_slice(chunk);
                Self { id, position }
            })
            .collect()
    }

    pub fn flatten(generators: &[Self]) -> Vec<f64> {
        generators.iter().flat_map(|g| g.position).collect()
    }

    /// Bounding box of the generator positions, `None` when empty.
    pub fn bounds(generators: &[Self]) -> Option<BoundingBox<D>> {
        BoundingBox::around(generators.iter().map(|g| &g.position))
    }

    /// Regular lattice with `counts[k]` generators along axis `k`, each at the center of
    /// its lattice cell. Ids run with axis 0 fastest.
    pub fn lattice(bounds: &BoundingBox<D>, counts: [usize; D]) -> Vec<Self> {
        let total: usize = counts.iter().product();
        (0..total)
            .map(|id| {
                let mut rest = id;
                let mut position = [0.0; D];
                for k in 0..D {
                    let index = rest % counts[k];
                    rest /= counts[k];
                    let step = bounds.extent(k) / counts[k] as f64;
                    position[k] = bounds.min[k] + (index as f64 + 0.5) * step;
                }
                Self { id, position }
            })
            .collect()
    }

    /// `count` uniformly distributed generators inside `bounds`, reproducible from `seed`.
    pub fn random(bounds: &BoundingBox<D>, count: usize, seed: u64) -> Vec<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|id| {
                let mut position = [0.0; D];
                for k in 0..D {
                    position[k] = bounds.min[k] + rng.r#gen::<f64>() * bounds.extent(k);
                }
                Self { id, position }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_positions() {
        let bounds = BoundingBox::new([0.0, 0.0], [1.0, 2.0]);
        let generators = Generator::lattice(&bounds, [2, 2]);
        assert_eq!(generators.len(), 4);
        assert_eq!(generators[0].position, [0.25, 0.5]);
        assert_eq!(generators[1].position, [0.75, 0.5]);
        assert_eq!(generators[2].position, [0.25, 1.5]);
        assert_eq!(generators[3].id, 3);
    }

    #[test]
    fn test_random_is_seeded() {
        let bounds = BoundingBox::<3>::unit();
        let a = Generator::random(&bounds, 50, 7);
        let b = Generator::random(&bounds, 50, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|g| bounds.contains(&g.position, 0.0)));
    }

    #[test]
    fn test_flat_conversion() {
        let coords = vec![0.1, 0.2, 0.3, 0.4];
        let generators = Generator::<2>::from_flat(&coords);
        assert_eq!(generators[1], Generator::new(1, [0.3, 0.4]));
        assert_eq!(Generator::flatten(&generators), coords);
    }
}
