//! Piecewise linear complexes: the boundary description a tessellation can be clipped to.
//!
//! A [`Plc`] is a list of points plus facets indexing into it, segments in 2D and planar
//! polygons in 3D, and optional holes, each a closed ring of facets cut out of the
//! enclosed region. Convex boundaries without holes become one [`HalfSpace`] wall per
//! facet. 2D cells can also be restricted to arbitrary non-convex regions with holes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::bounds::BoundingBox;
use crate::cell::d2::ray_crossings;
use crate::error::{Result, TessellationError};
use crate::wall::{HalfSpace, Wall, plc_facet_id};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plc<const D: usize> {
    pub points: Vec<[f64; D]>,
    pub facets: Vec<Vec<usize>>,
    /// Interior holes, each a closed ring of facets indexing into `points`.
    pub holes: Vec<Vec<Vec<usize>>>,
}

impl<const D: usize> Plc<D> {
    pub fn new(points: Vec<[f64; D]>, facets: Vec<Vec<usize>>) -> Self {
        Self { points, facets, holes: Vec::new() }
    }

    pub fn with_holes(mut self, holes: Vec<Vec<Vec<usize>>>) -> Self {
        self.holes = holes;
        self
    }

    /// Every facet with the neighbor id cells report for it: outer facet `k` is
    /// [`plc_facet_id`]`(k)`, hole facets continue the numbering in order.
    pub fn boundary_facets(&self) -> impl Iterator<Item = (i64, &Vec<usize>)> + '_ {
        self.facets.iter().chain(self.holes.iter().flatten()).enumerate().map(|(k, facet)| (plc_facet_id(k), facet))
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Bounding box of the points referenced by facets.
    pub fn bounds(&self) -> Option<BoundingBox<D>> {
        BoundingBox::around(self.facets.iter().flatten().filter_map(|&i| self.points.get(i)))
    }

    /// Checks the structure of the complex: non-empty, finite points, facet indices in
    /// range, and facets of the right arity for the dimension.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(TessellationError::InvalidPlc("the PLC has no facets".into()));
        }
        if let Some(i) = self.points.iter().position(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(TessellationError::InvalidPlc(format!("point {i} has a non-finite coordinate")));
        }
        let min_arity = if D == 2 { 2 } else { D };
        for (k, facet) in self.facets.iter().chain(self.holes.iter().flatten()).enumerate() {
            if facet.len() < min_arity || (D == 2 && facet.len() != 2) {
                return Err(TessellationError::InvalidPlc(format!(
                    "facet {k} has {} points, expected {}{}",
                    facet.len(),
                    min_arity,
                    if D == 2 { "" } else { " or more" }
                )));
            }
            if let Some(&i) = facet.iter().find(|&&i| i >= self.points.len()) {
                return Err(TessellationError::InvalidPlc(format!("facet {k} refers to missing point {i}")));
            }
        }
        match self.bounds() {
            Some(bounds) if bounds.is_valid() => Ok(()),
            _ => Err(TessellationError::InvalidPlc("the PLC does not enclose a region".into())),
        }
    }

    /// One half-space per facet with the valid side facing the interior.
    ///
    /// Fails with [`TessellationError::InvalidPlc`] for degenerate facets, for holes and
    /// for boundaries that are not convex within `tolerance` (relative to the PLC extent).
    pub fn half_spaces(&self, tolerance: f64) -> Result<Vec<HalfSpace<D>>> {
        if !self.holes.is_empty() {
            return Err(TessellationError::InvalidPlc("a boundary with holes is not convex".into()));
        }
        match self.facet_planes(tolerance)? {
            (planes, None) => Ok(planes),
            (_, Some(k)) => Err(TessellationError::InvalidPlc(format!("the boundary is not convex at facet {k}"))),
        }
    }

    /// Whether the complex bounds a convex region without holes. Structural problems and
    /// degenerate facets are errors.
    pub fn is_convex(&self, tolerance: f64) -> Result<bool> {
        let (_, concave) = self.facet_planes(tolerance)?;
        Ok(concave.is_none() && self.holes.is_empty())
    }

    /// Inward facing planes of the outer facets and the first facet some point lies
    /// behind. Hole facets are only checked for degeneracy.
    fn facet_planes(&self, tolerance: f64) -> Result<(Vec<HalfSpace<D>>, Option<usize>)> {
        self.validate()?;
        let extent = self.bounds().map_or(1.0, |b| b.max_extent());
        let slack = tolerance * extent;

        let used: Vec<&[f64; D]> = self.facets.iter().flatten().map(|&i| &self.points[i]).collect();
        let mut interior = [0.0; D];
        for p in &used {
            for k in 0..D {
                interior[k] += p[k] / used.len() as f64;
            }
        }

        let corners_of = |facet: &Vec<usize>| -> Vec<[f64; D]> { facet.iter().map(|&i| self.points[i]).collect() };
        for (k, facet) in self.holes.iter().flatten().enumerate() {
            if facet_normal(&corners_of(facet)).is_none() {
                let k = self.facets.len() + k;
                return Err(TessellationError::InvalidPlc(format!("facet {k} is degenerate")));
            }
        }

        let mut planes = Vec::with_capacity(self.facets.len());
        let mut concave = None;
        for (k, facet) in self.facets.iter().enumerate() {
            let corners = corners_of(facet);
            let normal = facet_normal(&corners)
                .ok_or_else(|| TessellationError::InvalidPlc(format!("facet {k} is degenerate")))?;
            let mut plane = HalfSpace::new(corners[0], normal);
            if plane.signed_distance(&interior) < 0.0 {
                plane = HalfSpace::new(corners[0], normal.map(|n| -n));
            }
            if concave.is_none() && used.iter().any(|p| plane.signed_distance(p) < -slack) {
                concave = Some(k);
            }
            planes.push(plane.with_tolerance(slack));
        }
        Ok((planes, concave))
    }

    /// Even-odd containment in a 2D complex, holes excluded. Complexes of other
    /// dimensions enclose nothing here.
    pub fn encloses(&self, point: &[f64; D]) -> bool {
        if D != 2 {
            return false;
        }
        let flat = |p: &[f64; D]| [p[0], p[1]];
        let segments = self
            .boundary_facets()
            .filter_map(|(_, facet)| Some((flat(self.points.get(*facet.first()?)?), flat(self.points.get(*facet.get(1)?)?))));
        ray_crossings(segments, &flat(point), &[1.0, 0.0]) % 2 == 1
    }

    /// Clipping walls for every facet. Facet `k` is reported by cells as
    /// [`plc_facet_id`]`(k)`.
    pub fn walls(&self, tolerance: f64) -> Result<Vec<Wall<D>>> {
        Ok(self
            .half_spaces(tolerance)?
            .into_iter()
            .enumerate()
            .map(|(k, plane)| Wall::new(plc_facet_id(k), Box::new(plane)))
            .collect())
    }

    /// The same complex with every point mapped to `(p - origin) * factor`.
    pub fn scaled(&self, origin: &[f64; D], factor: f64) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| std::array::from_fn(|k| (p[k] - origin[k]) * factor))
            .collect();
        Self { points, facets: self.facets.clone(), holes: self.holes.clone() }
    }

    /// Hash of the exact point coordinates and facet structure, used to check that
    /// every domain of a distributed run sees the same boundary.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        D.hash(&mut hasher);
        for p in &self.points {
            p.iter().for_each(|c| c.to_bits().hash(&mut hasher));
        }
        self.facets.hash(&mut hasher);
        self.holes.hash(&mut hasher);
        hasher.finish()
    }
}

impl Plc<2> {
    /// Closed axis-aligned rectangle.
    pub fn rectangle(bounds: &BoundingBox<2>) -> Self {
        let [x0, y0] = bounds.min;
        let [x1, y1] = bounds.max;
        Self::polygon(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]])
    }

    /// Closed polygon through `points` in order.
    pub fn polygon(points: Vec<[f64; 2]>) -> Self {
        let n = points.len();
        let facets = (0..n).map(|i| vec![i, (i + 1) % n]).collect();
        Self::new(points, facets)
    }

    /// Closed polygon through `outer` with every ring of `holes` cut out of it.
    pub fn polygon_with_holes(outer: Vec<[f64; 2]>, holes: Vec<Vec<[f64; 2]>>) -> Self {
        let mut plc = Self::polygon(outer);
        for ring in holes {
            let (first, n) = (plc.points.len(), ring.len());
            plc.points.extend(ring);
            plc.holes.push((0..n).map(|i| vec![first + i, first + (i + 1) % n]).collect());
        }
        plc
    }
}

impl Plc<3> {
    /// Closed axis-aligned box.
    pub fn cuboid(bounds: &BoundingBox<3>) -> Self {
        let [x0, y0, z0] = bounds.min;
        let [x1, y1, z1] = bounds.max;
        let points = vec![
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ];
        let facets = vec![
            vec![3, 2, 1, 0],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ];
        Self::new(points, facets)
    }
}

/// Unnormalized normal of a facet: the segment perpendicular in 2D, Newell's method in 3D.
fn facet_normal<const D: usize>(corners: &[[f64; D]]) -> Option<[f64; D]> {
    let at = |p: &[f64; D], k: usize| p.get(k).copied().unwrap_or(0.0);
    let mut n = [0.0; 3];
    match D {
        2 => {
            let (a, b) = (&corners[0], &corners[1]);
            n[0] = at(b, 1) - at(a, 1);
            n[1] = at(a, 0) - at(b, 0);
        }
        3 => {
            for (i, a) in corners.iter().enumerate() {
                let b = &corners[(i + 1) % corners.len()];
                n[0] += (at(a, 1) - at(b, 1)) * (at(a, 2) + at(b, 2));
                n[1] += (at(a, 2) - at(b, 2)) * (at(a, 0) + at(b, 0));
                n[2] += (at(a, 0) - at(b, 0)) * (at(a, 1) + at(b, 1));
            }
        }
        _ => return None,
    }
    let len = n.iter().map(|c| c * c).sum::<f64>().sqrt();
    (len > 0.0 && len.is_finite()).then(|| std::array::from_fn(|k| n[k]))
}
