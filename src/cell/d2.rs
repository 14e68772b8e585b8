use crate::bounds::{BoundingBox, box_side};
use crate::cell::{CLIP_EPSILON, Cell, Facet};
use crate::plc::Plc;

/// Buffers reused between clips of 2D cells.
#[derive(Default, Clone)]
pub struct Cell2DScratch {
    edges: Vec<Edge>,
    // Points on the clipping line, with their position along it.
    cuts: Vec<(f64, [f64; 2])>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Edge {
    start: [f64; 2],
    end: [f64; 2],
    neighbor: i64,
}

/// A 2D Voronoi cell: a polygonal region bounded by directed edges with the interior on
/// their left.
///
/// Cells clipped only by lines are a single convex loop. Cells restricted to a non-convex
/// PLC can have holes or fall apart into several loops.
#[derive(Clone, Debug)]
pub struct Cell2D {
    id: usize,
    edges: Vec<Edge>,
}

fn lerp(a: &[f64; 2], b: &[f64; 2], t: f64) -> [f64; 2] {
    [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])]
}

fn dist_sq(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn offset_dot(p: &[f64; 2], origin: &[f64; 2], dir: &[f64; 2]) -> f64 {
    (p[0] - origin[0]) * dir[0] + (p[1] - origin[1]) * dir[1]
}

/// Number of segments crossing the ray from `origin` along the unit vector `dir`, not
/// counting crossings within `CLIP_EPSILON` of the origin. A ray through a shared endpoint
/// counts it once.
pub(crate) fn ray_crossings(
    segments: impl Iterator<Item = ([f64; 2], [f64; 2])>,
    origin: &[f64; 2],
    dir: &[f64; 2],
) -> usize {
    let across = [-dir[1], dir[0]];
    segments
        .filter(|(a, b)| {
            let (wa, wb) = (offset_dot(a, origin, &across), offset_dot(b, origin, &across));
            if (wa > 0.0) == (wb > 0.0) {
                return false;
            }
            let (sa, sb) = (offset_dot(a, origin, dir), offset_dot(b, origin, dir));
            sa + (sb - sa) * wa / (wa - wb) > CLIP_EPSILON
        })
        .count()
}

impl Cell2D {
    pub fn new(id: usize, bounds: BoundingBox<2>) -> Cell2D {
        let ([x0, y0], [x1, y1]) = (bounds.min, bounds.max);
        let corners = [[x0, y0], [x1, y0], [x1, y1], [x0, y1]];
        let sides = [box_side(1, false), box_side(0, true), box_side(1, true), box_side(0, false)];
        let edges = (0..4).map(|i| Edge { start: corners[i], end: corners[(i + 1) % 4], neighbor: sides[i] }).collect();
        Cell2D { id, edges }
    }

    /// The region enclosed by a 2D PLC, holes excluded. Segments are oriented so the
    /// enclosed side is on their left.
    pub fn from_plc(id: usize, plc: &Plc<2>) -> Cell2D {
        let segments: Vec<Edge> = plc
            .boundary_facets()
            .filter_map(|(neighbor, facet)| {
                let start = *plc.points.get(*facet.first()?)?;
                let end = *plc.points.get(*facet.get(1)?)?;
                (start != end).then_some(Edge { start, end, neighbor })
            })
            .collect();
        let edges = segments
            .iter()
            .map(|e| {
                let len = dist_sq(&e.start, &e.end).sqrt();
                let left = [(e.start[1] - e.end[1]) / len, (e.end[0] - e.start[0]) / len];
                let mid = lerp(&e.start, &e.end, 0.5);
                if ray_crossings(segments.iter().map(|s| (s.start, s.end)), &mid, &left) % 2 == 1 {
                    *e
                } else {
                    Edge { start: e.end, end: e.start, neighbor: e.neighbor }
                }
            })
            .collect();
        Cell2D { id, edges }
    }

    pub fn area(&self) -> f64 {
        let Some(origin) = self.edges.first().map(|e| e.start) else {
            return 0.0;
        };
        let twice: f64 = self
            .edges
            .iter()
            .map(|e| {
                let (ax, ay) = (e.start[0] - origin[0], e.start[1] - origin[1]);
                let (bx, by) = (e.end[0] - origin[0], e.end[1] - origin[1]);
                ax * by - bx * ay
            })
            .sum();
        (0.5 * twice).max(0.0)
    }

    pub fn centroid(&self) -> [f64; 2] {
        let Some(origin) = self.edges.first().map(|e| e.start) else {
            return [0.0, 0.0];
        };
        // Relative to the first vertex to keep the cross products well conditioned.
        let (mut area, mut cx, mut cy) = (0.0, 0.0, 0.0);
        for e in &self.edges {
            let (ax, ay) = (e.start[0] - origin[0], e.start[1] - origin[1]);
            let (bx, by) = (e.end[0] - origin[0], e.end[1] - origin[1]);
            let cross = ax * by - bx * ay;
            area += cross;
            cx += (ax + bx) * cross;
            cy += (ay + by) * cross;
        }
        if area.abs() < 1e-300 {
            return origin;
        }
        let factor = 1.0 / (3.0 * area);
        [origin[0] + cx * factor, origin[1] + cy * factor]
    }

    /// Whether `point` lies inside the cell.
    pub fn encloses(&self, point: &[f64; 2]) -> bool {
        ray_crossings(self.edges.iter().map(|e| (e.start, e.end)), point, &[1.0, 0.0]) % 2 == 1
    }

    /// Keeps the part of the cell on the negative side of the line through `point` with
    /// unit `normal`. Returns whether the cell changed and, when `generator` is given, the
    /// largest squared distance from it to the new vertices.
    ///
    /// Edges are cut one by one. The new edges along the line cover the stretches between
    /// consecutive cut points where the cell lies on both sides of the line, which also
    /// handles cells made of several loops.
    fn clip_with_scratch(
        &mut self,
        point: &[f64; 2],
        normal: &[f64; 2],
        neighbor_id: i64,
        scratch: &mut Cell2DScratch,
        generator: Option<&[f64; 2]>,
    ) -> (bool, f64) {
        if self.edges.is_empty() {
            return (false, 0.0);
        }
        let dist = |p: &[f64; 2]| offset_dot(p, point, normal);
        if self.edges.iter().all(|e| dist(&e.start) <= CLIP_EPSILON) {
            return (false, 0.0);
        }
        if self.edges.iter().all(|e| dist(&e.start) >= -CLIP_EPSILON) {
            self.edges.clear();
            return (true, 0.0);
        }

        let along = [-normal[1], normal[0]];
        let position = |p: &[f64; 2]| offset_dot(p, point, &along);
        scratch.edges.clear();
        scratch.cuts.clear();
        for e in &self.edges {
            let (d_a, d_b) = (dist(&e.start), dist(&e.end));
            let (on_a, on_b) = (d_a.abs() <= CLIP_EPSILON, d_b.abs() <= CLIP_EPSILON);
            if on_a {
                scratch.cuts.push((position(&e.start), e.start));
            }
            if on_b {
                scratch.cuts.push((position(&e.end), e.end));
            }
            match (d_a <= CLIP_EPSILON, d_b <= CLIP_EPSILON) {
                // An edge along the line stays when the cell lies on its kept side.
                _ if on_a && on_b => {
                    if position(&e.end) > position(&e.start) {
                        scratch.edges.push(*e);
                    }
                }
                (true, true) => scratch.edges.push(*e),
                (true, false) if !on_a => {
                    let p = lerp(&e.start, &e.end, d_a / (d_a - d_b));
                    scratch.cuts.push((position(&p), p));
                    scratch.edges.push(Edge { end: p, ..*e });
                }
                (false, true) if !on_b => {
                    let p = lerp(&e.start, &e.end, d_a / (d_a - d_b));
                    scratch.cuts.push((position(&p), p));
                    scratch.edges.push(Edge { start: p, ..*e });
                }
                _ => {}
            }
        }

        scratch.cuts.sort_by(|a, b| a.0.total_cmp(&b.0));
        let inward = [-normal[0], -normal[1]];
        let inside = |origin: &[f64; 2], dir: &[f64; 2]| {
            ray_crossings(self.edges.iter().map(|e| (e.start, e.end)), origin, dir) % 2 == 1
        };
        for pair in scratch.cuts.windows(2) {
            let ((t0, p0), (t1, p1)) = (pair[0], pair[1]);
            if t1 - t0 <= CLIP_EPSILON {
                continue;
            }
            let t = 0.5 * (t0 + t1);
            let mid = [point[0] + t * along[0], point[1] + t * along[1]];
            // Stretches with the cell on one side only are already bounded by an edge.
            if inside(&mid, &inward) && inside(&mid, normal) {
                scratch.edges.push(Edge { start: p0, end: p1, neighbor: neighbor_id });
            }
        }

        std::mem::swap(&mut self.edges, &mut scratch.edges);
        let radius_sq = generator.map_or(0.0, |g| self.max_radius_sq(g));
        (true, radius_sq)
    }
}

impl Cell<2> for Cell2D {
    type Scratch = Cell2DScratch;

    fn new(id: usize, bounds: BoundingBox<2>) -> Self {
        Cell2D::new(id, bounds)
    }

    fn from_plc(id: usize, plc: &Plc<2>) -> Option<Self> {
        Some(Cell2D::from_plc(id, plc))
    }

    fn id(&self) -> usize {
        self.id
    }

    fn clip(
        &mut self,
        point: &[f64; 2],
        normal: &[f64; 2],
        neighbor_id: i64,
        scratch: &mut Self::Scratch,
        generator: Option<&[f64; 2]>,
    ) -> (bool, f64) {
        self.clip_with_scratch(point, normal, neighbor_id, scratch, generator)
    }

    fn max_radius_sq(&self, center: &[f64; 2]) -> f64 {
        self.edges.iter().map(|e| dist_sq(&e.start, center).max(dist_sq(&e.end, center))).fold(0.0, f64::max)
    }

    fn centroid(&self) -> [f64; 2] {
        Cell2D::centroid(self)
    }

    fn measure(&self) -> f64 {
        self.area()
    }

    fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn vertices(&self) -> Vec<[f64; 2]> {
        self.edges.iter().map(|e| e.start).collect()
    }

    fn neighbors(&self) -> Vec<i64> {
        self.edges.iter().map(|e| e.neighbor).collect()
    }

    fn facets(&self) -> Vec<Facet<2>> {
        self.edges
            .iter()
            .map(|e| Facet { neighbor: e.neighbor, measure: dist_sq(&e.start, &e.end).sqrt(), centroid: lerp(&e.start, &e.end, 0.5) })
            .collect()
    }

    fn transform(&mut self, origin: &[f64; 2], scale: f64) {
        let map = |v: [f64; 2]| [origin[0] + scale * v[0], origin[1] + scale * v[1]];
        for e in &mut self.edges {
            e.start = map(e.start);
            e.end = map(e.end);
        }
    }
}
