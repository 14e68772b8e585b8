//! Lloyd relaxation: move every generator to the centroid of its cell.
//!
//! Works with any [`Tessellator`]. A distributed tessellator returns the cells of the owned
//! generators only, so each domain relaxes exactly the generators it owns.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::bounds::BoundingBox;
use crate::cell::Cell;
use crate::error::Result;
use crate::generator::Generator;
use crate::plc::Plc;
use crate::tessellator::Tessellator;

/// One Lloyd step in the default region.
pub fn relax<const D: usize, T>(tessellator: &T, generators: &[Generator<D>]) -> Result<Vec<Generator<D>>>
where
    T: Tessellator<D> + ?Sized,
{
    let cells = tessellator.tessellate(generators)?;
    Ok(move_to_centroids(generators, &cells))
}

pub fn relax_in_box<const D: usize, T>(
    tessellator: &T,
    generators: &[Generator<D>],
    bounds: &BoundingBox<D>,
) -> Result<Vec<Generator<D>>>
where
    T: Tessellator<D> + ?Sized,
{
    let cells = tessellator.tessellate_in_box(generators, bounds)?;
    Ok(move_to_centroids(generators, &cells))
}

pub fn relax_with_plc<const D: usize, T>(tessellator: &T, generators: &[Generator<D>], plc: &Plc<D>) -> Result<Vec<Generator<D>>>
where
    T: Tessellator<D> + ?Sized,
{
    let cells = tessellator.tessellate_with_plc(generators, plc)?;
    Ok(move_to_centroids(generators, &cells))
}

/// Generators without a (non-empty) cell keep their position.
fn move_to_centroids<const D: usize, C: Cell<D>>(generators: &[Generator<D>], cells: &[C]) -> Vec<Generator<D>> {
    let centroids: HashMap<usize, [f64; D]> =
        cells.par_iter().filter(|cell| !cell.is_empty()).map(|cell| (cell.id(), cell.centroid())).collect();
    tracing::trace!(generators = generators.len(), cells = centroids.len(), "relaxing generators");
    generators
        .par_iter()
        .map(|g| Generator::new(g.id, centroids.get(&g.id).copied().unwrap_or(g.position)))
        .collect()
}
