//! Geometric kernels: the component that turns generators and a region into cells.

use std::marker::PhantomData;

use rayon::prelude::*;

use crate::algorithm::{AlgorithmGrid2D, AlgorithmGrid3D, SpatialAlgorithm};
use crate::bounds::BoundingBox;
use crate::cell::{Cell, Cell2D, Cell3D};
use crate::degeneracy::normalization;
use crate::error::{Result, TessellationError};
use crate::generator::Generator;
use crate::plc::Plc;
use crate::wall::Wall;

/// Default degeneracy, as a fraction of the largest region extent.
pub const DEFAULT_DEGENERACY: f64 = 1.0e-8;

/// Computes one Voronoi cell per generator inside a region, optionally clipped to a PLC.
pub trait GeometricKernel<const D: usize>: Send + Sync {
    type Cell: Cell<D>;

    fn name(&self) -> String;

    /// Relative distance below which two generators are treated as coincident.
    fn precision(&self) -> f64;

    /// Whether [`compute`](Self::compute) accepts a PLC boundary.
    fn accepts_plc(&self) -> bool;

    /// Cells in generator order. Every generator must lie inside `region` and, when given,
    /// inside `plc`. Neighbor ids of the cells are generator ids.
    fn compute(
        &self,
        generators: &[Generator<D>],
        region: &BoundingBox<D>,
        plc: Option<&Plc<D>>,
    ) -> Result<Vec<Self::Cell>>;
}

/// Half-space clipping kernel: every cell starts as the region box and is clipped by the
/// bisector of each candidate neighbor returned by the spatial algorithm `A`, in order of
/// increasing distance, until no closer neighbor can affect it.
///
/// Convex PLCs become walls. Cells that support it start from the region enclosed by a
/// non-convex PLC instead, holes included.
pub struct ClipKernel<const D: usize, C, A> {
    degeneracy: f64,
    _marker: PhantomData<fn() -> (C, A)>,
}

pub type VoronoiKernel2d = ClipKernel<2, Cell2D, AlgorithmGrid2D>;
pub type VoronoiKernel3d = ClipKernel<3, Cell3D, AlgorithmGrid3D>;

impl<const D: usize, C, A> ClipKernel<D, C, A> {
    pub fn new() -> Self {
        Self { degeneracy: DEFAULT_DEGENERACY, _marker: PhantomData }
    }

    pub fn with_degeneracy(mut self, degeneracy: f64) -> Self {
        self.degeneracy = degeneracy;
        self
    }
}

impl<const D: usize, C, A> Default for ClipKernel<D, C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize, C, A> Clone for ClipKernel<D, C, A> {
    fn clone(&self) -> Self {
        Self { degeneracy: self.degeneracy, _marker: PhantomData }
    }
}

impl<const D: usize, C, A> std::fmt::Debug for ClipKernel<D, C, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipKernel").field("dimension", &D).field("degeneracy", &self.degeneracy).finish()
    }
}

impl<const D: usize, C, A> GeometricKernel<D> for ClipKernel<D, C, A>
where
    C: Cell<D>,
    A: SpatialAlgorithm<D>,
{
    type Cell = C;

    fn name(&self) -> String {
        format!("ClipKernel{D}d")
    }

    fn precision(&self) -> f64 {
        self.degeneracy
    }

    fn accepts_plc(&self) -> bool {
        true
    }

    fn compute(&self, generators: &[Generator<D>], region: &BoundingBox<D>, plc: Option<&Plc<D>>) -> Result<Vec<C>> {
        if !region.is_valid() {
            return Err(TessellationError::InvalidBounds(format!("{region:?} has no interior")));
        }

        // Work in a unit-sized frame so the clipping epsilon is relative to the region.
        let (origin, scale) = normalization(region);
        let factor = 1.0 / scale;
        let bounds = BoundingBox::new([0.0; D], std::array::from_fn(|k| region.extent(k) * factor));
        let scaled = plc.map(|plc| plc.scaled(&origin, factor));
        let mut walls: Vec<Wall<D>> = Vec::new();
        let mut enclosing = None;
        if let Some(plc) = &scaled {
            if plc.is_convex(self.degeneracy)? {
                walls = plc.walls(self.degeneracy)?;
            } else if C::from_plc(0, plc).is_some() {
                enclosing = Some(plc);
            } else {
                return Err(TessellationError::InvalidPlc(format!(
                    "{} clips {D}D cells to convex boundaries without holes only",
                    self.name()
                )));
            }
        }

        let mut coords = Vec::with_capacity(generators.len() * D);
        for g in generators {
            let p: [f64; D] = std::array::from_fn(|k| (g.position[k] - origin[k]) * factor);
            if !bounds.contains(&p, self.degeneracy)
                || walls.iter().any(|w| !w.contains(&p))
                || enclosing.is_some_and(|plc| !plc.encloses(&p))
            {
                return Err(TessellationError::GeneratorOutsideRegion { id: g.id });
            }
            coords.extend_from_slice(&p);
        }

        let count = generators.len();
        let mut algorithm = A::for_generators(&bounds, count);
        algorithm.set_generators(&coords);
        tracing::trace!(kernel = %self.name(), count, walls = walls.len(), convex = enclosing.is_none(), "computing cells");

        let coords = &coords;
        let walls = &walls;
        let algorithm = &algorithm;
        let cells = (0..count)
            .into_par_iter()
            .map_init(
                || C::Scratch::default(),
                |scratch, i| {
                    let g_pos: [f64; D] = std::array::from_fn(|k| coords[i * D + k]);
                    let id = generators[i].id;
                    let mut cell = enclosing.and_then(|plc| C::from_plc(id, plc)).unwrap_or_else(|| C::new(id, bounds));

                    // 1. Clip against walls
                    for wall in walls {
                        wall.cut(&g_pos, &mut |point, normal| {
                            cell.clip(&point, &normal, wall.id(), scratch, None);
                        });
                    }

                    let mut current_max_dist_sq = cell.max_radius_sq(&g_pos);

                    // 2. Clip against neighbors found by the SpatialAlgorithm
                    algorithm.visit_neighbors(coords, i, g_pos, &mut current_max_dist_sq, |j, n_pos, cur_dist| {
                        let delta: [f64; D] = std::array::from_fn(|k| n_pos[k] - g_pos[k]);
                        let dist_sq: f64 = delta.iter().map(|d| d * d).sum();
                        // Some indices might not filter exact distance, so we check here
                        if dist_sq > 4.0 * cur_dist || dist_sq == 0.0 {
                            return cur_dist;
                        }

                        let dist = dist_sq.sqrt();
                        let midpoint: [f64; D] = std::array::from_fn(|k| g_pos[k] + 0.5 * delta[k]);
                        let normal: [f64; D] = delta.map(|d| d / dist);
                        match cell.clip(&midpoint, &normal, generators[j].id as i64, scratch, Some(&g_pos)) {
                            (true, new_radius) => new_radius,
                            (false, _) => cur_dist,
                        }
                    });

                    cell.transform(&origin, scale);
                    cell
                },
            )
            .collect();
        Ok(cells)
    }
}

/// Restricts a kernel to box regions. PLC requests fail with
/// [`TessellationError::UnsupportedPlc`].
#[derive(Clone, Debug, Default)]
pub struct BoxKernel<K> {
    inner: K,
}

impl<K> BoxKernel<K> {
    pub fn new(inner: K) -> Self {
        Self { inner }
    }
}

impl<const D: usize, K: GeometricKernel<D>> GeometricKernel<D> for BoxKernel<K> {
    type Cell = K::Cell;

    fn name(&self) -> String {
        format!("Box{}", self.inner.name())
    }

    fn precision(&self) -> f64 {
        self.inner.precision()
    }

    fn accepts_plc(&self) -> bool {
        false
    }

    fn compute(&self, generators: &[Generator<D>], region: &BoundingBox<D>, plc: Option<&Plc<D>>) -> Result<Vec<K::Cell>> {
        if plc.is_some() {
            return Err(TessellationError::UnsupportedPlc { tessellator: self.name() });
        }
        self.inner.compute(generators, region, None)
    }
}
