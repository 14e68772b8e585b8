use crate::bounds::BoundingBox;

mod grid;

pub use grid::{AlgorithmGrid2D, AlgorithmGrid3D, UniformGrid};

/// Trait defining a spatial acceleration structure.
/// This allows swapping the neighbor search used by the clipping kernel.
pub trait SpatialAlgorithm<const D: usize>: Send + Sync {
    /// Creates an index sized for `count` generators inside `bounds`.
    fn for_generators(bounds: &BoundingBox<D>, count: usize) -> Self
    where
        Self: Sized;

    /// Rebuilds the index from flat generator coordinates.
    fn set_generators(&mut self, generators: &[f64]);

    /// Visit potential neighbors for a given generator.
    ///
    /// # Arguments
    /// * `generators` - The full list of generators (needed to retrieve neighbor positions).
    /// * `index` - The index of the generator we are processing.
    /// * `pos` - The position of the generator (array of size D).
    /// * `max_dist_sq` - A mutable reference to the current maximum search radius squared.
    ///                   The visitor can update this if the cell shrinks.
    /// * `visitor` - A closure called for each candidate neighbor. It receives the neighbor's index,
    ///               its position and the current search radius squared, and returns the new radius.
    fn visit_neighbors<F>(&self, generators: &[f64], index: usize, pos: [f64; D], max_dist_sq: &mut f64, visitor: F)
    where
        F: FnMut(usize, [f64; D], f64) -> f64;
}

/// Bins per axis for `count` generators in `bounds`, aiming at roughly one generator per
/// bin with bins as close to cubic as the extents allow.
pub(crate) fn grid_shape<const D: usize>(bounds: &BoundingBox<D>, count: usize, max: usize) -> [usize; D] {
    let bin_size = (bounds.measure() / count.max(1) as f64).powf(1.0 / D as f64);
    let mut shape = [1; D];
    for k in 0..D {
        let n = (bounds.extent(k) / bin_size).round();
        shape[k] = if n.is_finite() { (n as usize).clamp(1, max) } else { 1 };
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape() {
        let square = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);
        assert_eq!(grid_shape(&square, 0, 512), [1, 1]);
        assert_eq!(grid_shape(&square, 100, 512), [10, 10]);

        let slab = BoundingBox::new([0.0, 0.0], [2.0, 1.0]);
        assert_eq!(grid_shape(&slab, 50, 512), [10, 5]);

        let cube = BoundingBox::<3>::unit();
        assert_eq!(grid_shape(&cube, 1000, 64), [10, 10, 10]);
        assert_eq!(grid_shape(&cube, 10_000_000, 64), [64, 64, 64]);
    }
}
