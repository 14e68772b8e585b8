//! Detection of generators that coincide within a tessellator's degeneracy.
//!
//! Coordinates are normalized by the largest extent of the tessellation region, so the
//! degeneracy is a fraction of the region size. Two generators coincide when their
//! normalized distance is below the degeneracy.

use std::collections::HashMap;

use crate::bounds::BoundingBox;
use crate::generator::Generator;

/// Origin and scale mapping `region` into the unit box without distorting it.
pub fn normalization<const D: usize>(region: &BoundingBox<D>) -> ([f64; D], f64) {
    let extent = region.max_extent();
    let scale = if extent > 0.0 && extent.is_finite() { extent } else { 1.0 };
    (region.min, scale)
}

pub fn coincident<const D: usize>(a: &[f64; D], b: &[f64; D], scale: f64, degeneracy: f64) -> bool {
    let dist_sq: f64 = (0..D).map(|k| ((a[k] - b[k]) / scale).powi(2)).sum();
    dist_sq < degeneracy * degeneracy
}

/// Lattice of buckets of width `degeneracy` over normalized coordinates. Coincident
/// generators always fall in the same or adjacent buckets.
struct Buckets<const D: usize> {
    origin: [f64; D],
    scale: f64,
    degeneracy: f64,
    offsets: Vec<[i64; D]>,
    buckets: HashMap<[i64; D], Vec<usize>>,
}

impl<const D: usize> Buckets<D> {
    fn new(region: &BoundingBox<D>, degeneracy: f64) -> Self {
        let (origin, scale) = normalization(region);
        let mut offsets = vec![[0i64; D]];
        for axis in 0..D {
            offsets = offsets
                .into_iter()
                .flat_map(|o| {
                    (-1..=1).map(move |d| {
                        let mut shifted = o;
                        shifted[axis] = d;
                        shifted
                    })
                })
                .collect();
        }
        Self { origin, scale, degeneracy, offsets, buckets: HashMap::new() }
    }

    fn key(&self, p: &[f64; D]) -> [i64; D] {
        std::array::from_fn(|k| ((p[k] - self.origin[k]) / self.scale / self.degeneracy).floor() as i64)
    }

    /// Index of a stored generator coinciding with `p`, if any.
    fn find(&self, generators: &[Generator<D>], p: &[f64; D]) -> Option<usize> {
        let key = self.key(p);
        self.offsets.iter().find_map(|offset| {
            let neighbor: [i64; D] = std::array::from_fn(|k| key[k].saturating_add(offset[k]));
            self.buckets.get(&neighbor).and_then(|indices| {
                indices
                    .iter()
                    .copied()
                    .find(|&i| coincident(&generators[i].position, p, self.scale, self.degeneracy))
            })
        })
    }

    fn insert(&mut self, p: &[f64; D], index: usize) {
        let key = self.key(p);
        self.buckets.entry(key).or_default().push(index);
    }
}

/// Ids of the first pair of coincident generators, in input order.
pub fn find_degenerate_pair<const D: usize>(
    generators: &[Generator<D>],
    region: &BoundingBox<D>,
    degeneracy: f64,
) -> Option<(usize, usize)> {
    if degeneracy <= 0.0 {
        return None;
    }
    let mut buckets = Buckets::new(region, degeneracy);
    for (i, g) in generators.iter().enumerate() {
        if let Some(j) = buckets.find(generators, &g.position) {
            return Some((generators[j].id, g.id));
        }
        buckets.insert(&g.position, i);
    }
    None
}

/// Drops every generator coinciding with an earlier one. Returns the kept generators
/// and the ids of the removed ones.
pub fn remove_degenerate<const D: usize>(
    generators: &[Generator<D>],
    region: &BoundingBox<D>,
    degeneracy: f64,
) -> (Vec<Generator<D>>, Vec<usize>) {
    if degeneracy <= 0.0 {
        return (generators.to_vec(), Vec::new());
    }
    let mut buckets = Buckets::new(region, degeneracy);
    let mut kept: Vec<Generator<D>> = Vec::with_capacity(generators.len());
    let mut removed = Vec::new();
    for g in generators {
        if buckets.find(&kept, &g.position).is_some() {
            removed.push(g.id);
        } else {
            buckets.insert(&g.position, kept.len());
            kept.push(*g);
        }
    }
    (kept, removed)
}
