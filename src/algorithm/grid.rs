use std::array;

use crate::algorithm::{SpatialAlgorithm, grid_shape};
use crate::bounds::BoundingBox;

/// Upper bound on bins per axis in 2D.
const MAX_RESOLUTION_2D: usize = 512;
/// Upper bound on bins per axis in 3D; the search order grows with its cube.
const MAX_RESOLUTION_3D: usize = 48;

/// A spatial index based on a uniform grid.
///
/// Space is divided into `shape[k]` bins along axis `k`. Neighbor searches walk bins in
/// order of their smallest possible distance to the query bin and stop once that distance
/// exceeds twice the current cell radius. Well suited for roughly uniform distributions.
pub struct UniformGrid<const D: usize> {
    shape: [usize; D],
    min: [f64; D],
    /// Bins per unit length along each axis.
    scale: [f64; D],
    bins: Vec<Vec<usize>>,
    generator_bins: Vec<[usize; D]>,
    search_order: Vec<SearchStep<D>>,
}

pub type AlgorithmGrid2D = UniformGrid<2>;
pub type AlgorithmGrid3D = UniformGrid<3>;

#[derive(Clone, Copy, Debug)]
struct SearchStep<const D: usize> {
    offset: [isize; D],
    /// Smallest squared distance between a point in the origin bin and the offset bin.
    min_dist_sq: f64,
}

impl<const D: usize> UniformGrid<D> {
    pub fn new(shape: [usize; D], bounds: &BoundingBox<D>) -> Self {
        let shape = shape.map(|n| n.max(1));
        let scale: [f64; D] = array::from_fn(|k| shape[k] as f64 / bounds.extent(k));
        let bin_size = scale.map(|s| 1.0 / s);
        UniformGrid {
            shape,
            min: bounds.min,
            scale,
            bins: vec![Vec::new(); shape.iter().product()],
            generator_bins: Vec::new(),
            search_order: search_order(&shape, &bin_size),
        }
    }

    /// Grid coordinates of the bin containing `p`, clamped to the grid.
    pub fn bin_of(&self, p: &[f64; D]) -> [usize; D] {
        array::from_fn(|k| {
            let i = ((p[k] - self.min[k]) * self.scale[k]).floor();
            if i > 0.0 { (i as usize).min(self.shape[k] - 1) } else { 0 }
        })
    }

    /// Linear index of a bin, axis 0 fastest.
    pub fn linear_index(&self, bin: &[usize; D]) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for k in 0..D {
            index += bin[k] * stride;
            stride *= self.shape[k];
        }
        index
    }
}

/// Every bin offset that can hold a neighbor, nearest first.
fn search_order<const D: usize>(shape: &[usize; D], bin_size: &[f64; D]) -> Vec<SearchStep<D>> {
    let spans: [usize; D] = array::from_fn(|k| 2 * shape[k] - 1);
    let total: usize = spans.iter().product();
    let mut order: Vec<SearchStep<D>> = (0..total)
        .map(|mut linear| {
            let offset: [isize; D] = array::from_fn(|k| {
                let i = linear % spans[k];
                linear /= spans[k];
                i as isize - (shape[k] as isize - 1)
            });
            let min_dist_sq = (0..D)
                .map(|k| {
                    let gap = (offset[k].unsigned_abs().saturating_sub(1)) as f64 * bin_size[k];
                    gap * gap
                })
                .sum();
            SearchStep { offset, min_dist_sq }
        })
        .collect();
    order.sort_unstable_by(|a, b| a.min_dist_sq.total_cmp(&b.min_dist_sq));
    order
}

impl<const D: usize> SpatialAlgorithm<D> for UniformGrid<D> {
    fn for_generators(bounds: &BoundingBox<D>, count: usize) -> Self {
        let max = if D <= 2 { MAX_RESOLUTION_2D } else { MAX_RESOLUTION_3D };
        UniformGrid::new(grid_shape(bounds, count, max), bounds)
    }

    fn set_generators(&mut self, generators: &[f64]) {
        self.bins.iter_mut().for_each(Vec::clear);
        let mut generator_bins = Vec::with_capacity(generators.len() / D);
        for (i, coords) in generators.chunks_exact(D).enumerate() {
            let bin = self.bin_of(&array::from_fn(|k| coords[k]));
            let index = self.linear_index(&bin);
            self.bins[index].push(i);
            generator_bins.push(bin);
        }
        self.generator_bins = generator_bins;
    }

    fn visit_neighbors<F>(&self, generators: &[f64], index: usize, pos: [f64; D], max_dist_sq: &mut f64, mut visitor: F)
    where
        F: FnMut(usize, [f64; D], f64) -> f64,
    {
        let origin = self.generator_bins[index];
        // Position inside the origin bin, in bin units.
        let rel: [f64; D] = array::from_fn(|k| (pos[k] - self.min[k]) * self.scale[k] - origin[k] as f64);

        'steps: for step in &self.search_order {
            if step.min_dist_sq > 4.0 * *max_dist_sq {
                break;
            }

            let mut bin = [0; D];
            let mut gap_sq = 0.0;
            for k in 0..D {
                let b = origin[k] as isize + step.offset[k];
                if b < 0 || b >= self.shape[k] as isize {
                    continue 'steps;
                }
                bin[k] = b as usize;
                let o = step.offset[k];
                let gap = match o.signum() {
                    1 => o as f64 - rel[k],
                    -1 => rel[k] - (o + 1) as f64,
                    _ => 0.0,
                };
                let gap = gap.max(0.0) / self.scale[k];
                gap_sq += gap * gap;
            }
            if gap_sq > 4.0 * *max_dist_sq {
                continue;
            }

            for &j in &self.bins[self.linear_index(&bin)] {
                if j == index {
                    continue;
                }
                let other: [f64; D] = array::from_fn(|k| generators[j * D + k]);
                *max_dist_sq = visitor(j, other, *max_dist_sq);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;

    #[test]
    fn test_grid_indexing_2d() {
        let bounds = BoundingBox::new([0.0, 0.0], [10.0, 10.0]);
        let grid = AlgorithmGrid2D::new([10, 10], &bounds); // 1x1 bins

        assert_eq!(grid.linear_index(&grid.bin_of(&[0.5, 0.5])), 0);
        assert_eq!(grid.linear_index(&grid.bin_of(&[1.5, 0.5])), 1);
        assert_eq!(grid.linear_index(&grid.bin_of(&[0.5, 1.5])), 10);
        // Points on or past the upper edge land in the last bin.
        assert_eq!(grid.bin_of(&[10.0, 12.0]), [9, 9]);
        assert_eq!(grid.bin_of(&[-1.0, 0.0]), [0, 0]);
    }

    #[test]
    fn test_grid_indexing_3d() {
        let bounds = BoundingBox::new([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let grid = AlgorithmGrid3D::new([10, 10, 10], &bounds);
        assert_eq!(grid.linear_index(&grid.bin_of(&[0.5, 0.5, 0.5])), 0);
        assert_eq!(grid.linear_index(&grid.bin_of(&[1.5, 1.5, 1.5])), 1 + 10 + 100);
        assert_eq!(grid.bins.len(), 1000);
    }

    #[test]
    fn test_grid_neighbors_2d() {
        let bounds = BoundingBox::new([0.0, 0.0], [3.0, 3.0]);
        let mut grid = AlgorithmGrid2D::new([3, 3], &bounds);
        let generators = vec![0.5, 0.5, 1.5, 0.5, 2.5, 2.5];
        grid.set_generators(&generators);

        let mut neighbors = Vec::new();
        let mut max_dist_sq = 2.0;
        grid.visit_neighbors(&generators, 0, [0.5, 0.5], &mut max_dist_sq, |idx, _, d| {
            neighbors.push(idx);
            d
        });
        assert!(neighbors.contains(&1));
        assert!(!neighbors.contains(&0));
    }

    #[test]
    fn test_search_stops_at_radius() {
        let bounds = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);
        let mut grid = AlgorithmGrid2D::new([10, 10], &bounds);
        let generators = vec![0.05, 0.05, 0.15, 0.05, 0.95, 0.95];
        grid.set_generators(&generators);

        let mut visited = Vec::new();
        let mut max_dist_sq = 0.01;
        grid.visit_neighbors(&generators, 0, [0.05, 0.05], &mut max_dist_sq, |idx, _, d| {
            visited.push(idx);
            d
        });
        assert_eq!(visited, vec![1]);
    }

    #[test]
    fn test_visits_everything_within_twice_the_radius_3d() {
        let bounds = BoundingBox::<3>::unit();
        let generators = Generator::random(&bounds, 500, 5);
        let coords = Generator::flatten(&generators);
        let mut grid = AlgorithmGrid3D::for_generators(&bounds, generators.len());
        grid.set_generators(&coords);

        let radius_sq = 0.01;
        for (i, g) in generators.iter().enumerate().take(50) {
            let mut visited = Vec::new();
            let mut max_dist_sq = radius_sq;
            grid.visit_neighbors(&coords, i, g.position, &mut max_dist_sq, |j, _, d| {
                visited.push(j);
                d
            });
            for (j, other) in generators.iter().enumerate() {
                let dist_sq: f64 = (0..3).map(|k| (other.position[k] - g.position[k]).powi(2)).sum();
                if j != i && dist_sq <= 4.0 * radius_sq {
                    assert!(visited.contains(&j), "generator {i} missed {j} at distance {}", dist_sq.sqrt());
                }
            }
        }
    }

    #[test]
    fn test_for_generators_covers_bounds() {
        let bounds = BoundingBox::new([0.0, 0.0], [2.0, 1.0]);
        let grid = AlgorithmGrid2D::for_generators(&bounds, 50);
        assert_eq!(grid.shape, [10, 5]);
        assert_eq!(grid.linear_index(&grid.bin_of(&[1.999, 0.999])), grid.bins.len() - 1);
    }
}
