use crate::bounds::{BoundingBox, box_side};
use crate::cell::{CLIP_EPSILON, Cell, Facet};

const UNUSED: u32 = u32::MAX;

/// Buffers reused between clips of 3D cells.
#[derive(Default, Clone)]
pub struct Cell3DScratch {
    vertices: Vec<[f64; 3]>,
    offsets: Vec<u32>,
    corners: Vec<u32>,
    neighbors: Vec<i64>,
    dists: Vec<f64>,
    // Whether each new vertex lies on the clipping plane.
    on_plane: Vec<bool>,
    // Old index to new index, UNUSED for dropped vertices.
    remap: Vec<u32>,
    // Cut points created so far, keyed by the old edge.
    cuts: Vec<((u32, u32), u32)>,
    ring: Vec<u32>,
    lid_next: Vec<u32>,
    lid_start: Option<u32>,
}

/// A 3D Voronoi cell: a convex polyhedron whose faces list vertex indices counter-clockwise
/// seen from outside.
#[derive(Clone, Debug)]
pub struct Cell3D {
    id: usize,
    vertices: Vec<[f64; 3]>,
    // Face f uses corners[offsets[f]..offsets[f + 1]].
    offsets: Vec<u32>,
    corners: Vec<u32>,
    face_neighbors: Vec<i64>,
}

impl Cell3D {
    pub fn new(id: usize, bounds: BoundingBox<3>) -> Cell3D {
        let ([x0, y0, z0], [x1, y1, z1]) = (bounds.min, bounds.max);
        let vertices = vec![
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ];
        let sides: [(i64, [u32; 4]); 6] = [
            (box_side(2, false), [3, 2, 1, 0]),
            (box_side(2, true), [4, 5, 6, 7]),
            (box_side(1, false), [0, 1, 5, 4]),
            (box_side(1, true), [2, 3, 7, 6]),
            (box_side(0, false), [0, 4, 7, 3]),
            (box_side(0, true), [1, 2, 6, 5]),
        ];
        Cell3D {
            id,
            vertices,
            offsets: (0..=6).map(|f| 4 * f).collect(),
            corners: sides.iter().flat_map(|(_, face)| *face).collect(),
            face_neighbors: sides.iter().map(|(neighbor, _)| *neighbor).collect(),
        }
    }

    /// Neighbor id for each face, negative for boundary faces.
    pub fn face_neighbors(&self) -> &[i64] {
        &self.face_neighbors
    }

    pub fn face_count(&self) -> usize {
        self.face_neighbors.len()
    }

    fn face(&self, index: usize) -> &[u32] {
        &self.corners[self.offsets[index] as usize..self.offsets[index + 1] as usize]
    }

    /// Vertex indices of every face, counter-clockwise seen from outside.
    pub fn faces(&self) -> Vec<Vec<usize>> {
        (0..self.face_count()).map(|f| self.face(f).iter().map(|&i| i as usize).collect()).collect()
    }

    /// Fan triangulation of a face around its first corner.
    fn fan(&self, index: usize) -> impl Iterator<Item = [&[f64; 3]; 3]> + '_ {
        let face = self.face(index);
        let pivot = &self.vertices[face[0] as usize];
        face[1..]
            .windows(2)
            .map(move |pair| [pivot, &self.vertices[pair[0] as usize], &self.vertices[pair[1] as usize]])
    }

    pub fn volume(&self) -> f64 {
        let Some(apex) = self.vertices.first() else {
            return 0.0;
        };
        let six_volume: f64 = (0..self.face_count())
            .flat_map(|f| self.fan(f))
            .map(|[a, b, c]| triple(&sub(a, apex), &sub(b, apex), &sub(c, apex)))
            .sum();
        six_volume.abs() / 6.0
    }

    pub fn centroid(&self) -> [f64; 3] {
        let Some(&apex) = self.vertices.first() else {
            return [0.0; 3];
        };
        // Tetrahedra are spanned from a vertex so the determinants stay well conditioned
        // far from the origin.
        let mut six_volume = 0.0;
        let mut moment = [0.0; 3];
        for [a, b, c] in (0..self.face_count()).flat_map(|f| self.fan(f)) {
            let (a, b, c) = (sub(a, &apex), sub(b, &apex), sub(c, &apex));
            let det = triple(&a, &b, &c);
            six_volume += det;
            for k in 0..3 {
                moment[k] += det * (a[k] + b[k] + c[k]);
            }
        }
        if six_volume.abs() < 1e-300 {
            return apex;
        }
        let factor = 1.0 / (4.0 * six_volume);
        [apex[0] + moment[0] * factor, apex[1] + moment[1] * factor, apex[2] + moment[2] * factor]
    }

    /// Area and centroid of the face at `index`, the vertex mean for faces without area.
    pub fn face_area_centroid(&self, index: usize) -> (f64, [f64; 3]) {
        if index >= self.face_count() {
            return (0.0, [0.0; 3]);
        }
        let mut area = 0.0;
        let mut weighted = [0.0; 3];
        for [a, b, c] in self.fan(index) {
            let normal = cross(&sub(b, a), &sub(c, a));
            let piece = 0.5 * dot(&normal, &normal).sqrt();
            area += piece;
            for k in 0..3 {
                weighted[k] += piece * (a[k] + b[k] + c[k]) / 3.0;
            }
        }
        if area > 0.0 {
            return (area, weighted.map(|w| w / area));
        }
        let face = self.face(index);
        let mut mean = [0.0; 3];
        for &corner in face {
            for k in 0..3 {
                mean[k] += self.vertices[corner as usize][k] / face.len() as f64;
            }
        }
        (0.0, mean)
    }

    pub fn face_area(&self, index: usize) -> f64 {
        self.face_area_centroid(index).0
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.corners.clear();
        self.face_neighbors.clear();
        self.offsets.clear();
        self.offsets.push(0);
    }

    /// New index of the point where the old edge `(from, to)` crosses the plane.
    fn cut_point(&self, scratch: &mut Cell3DScratch, from: u32, to: u32) -> u32 {
        let key = (from.min(to), from.max(to));
        if let Some(&(_, index)) = scratch.cuts.iter().find(|(edge, _)| *edge == key) {
            return index;
        }
        let (d_from, d_to) = (scratch.dists[from as usize], scratch.dists[to as usize]);
        let t = d_from / (d_from - d_to);
        let (a, b) = (&self.vertices[from as usize], &self.vertices[to as usize]);
        let index = scratch.vertices.len() as u32;
        scratch.vertices.push([a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1]), a[2] + t * (b[2] - a[2])]);
        scratch.on_plane.push(true);
        scratch.cuts.push((key, index));
        index
    }

    /// Keeps the part of the cell on the negative side of the plane through `point` with
    /// `normal`. Vertices within `CLIP_EPSILON` of the plane stay and serve as the cut
    /// points of their edges, so no sliver faces appear.
    fn clip_with_scratch(
        &mut self,
        point: &[f64; 3],
        normal: &[f64; 3],
        neighbor_id: i64,
        scratch: &mut Cell3DScratch,
        generator: Option<&[f64; 3]>,
    ) -> (bool, f64) {
        if self.vertices.is_empty() {
            return (false, 0.0);
        }
        scratch.dists.clear();
        scratch.dists.extend(self.vertices.iter().map(|v| dot(&sub(v, point), normal)));
        if scratch.dists.iter().all(|&d| d <= CLIP_EPSILON) {
            return (false, 0.0);
        }
        if scratch.dists.iter().all(|&d| d >= -CLIP_EPSILON) {
            self.clear();
            return (true, 0.0);
        }

        scratch.vertices.clear();
        scratch.on_plane.clear();
        scratch.remap.clear();
        scratch.cuts.clear();
        for (vertex, &d) in self.vertices.iter().zip(&scratch.dists) {
            if d <= CLIP_EPSILON {
                scratch.remap.push(scratch.vertices.len() as u32);
                scratch.vertices.push(*vertex);
                scratch.on_plane.push(d >= -CLIP_EPSILON);
            } else {
                scratch.remap.push(UNUSED);
            }
        }

        scratch.offsets.clear();
        scratch.offsets.push(0);
        scratch.corners.clear();
        scratch.neighbors.clear();
        scratch.lid_next.clear();
        scratch.lid_start = None;
        for f in 0..self.face_count() {
            scratch.ring.clear();
            let face = self.face(f);
            for (i, &from) in face.iter().enumerate() {
                let to = face[(i + 1) % face.len()];
                let (d_from, d_to) = (scratch.dists[from as usize], scratch.dists[to as usize]);
                let (from_in, to_in) = (d_from <= CLIP_EPSILON, d_to <= CLIP_EPSILON);
                if from_in && to_in {
                    scratch.ring.push(scratch.remap[to as usize]);
                } else if from_in && d_from < -CLIP_EPSILON {
                    let cut = self.cut_point(scratch, from, to);
                    scratch.ring.push(cut);
                } else if to_in {
                    if d_to < -CLIP_EPSILON {
                        let cut = self.cut_point(scratch, from, to);
                        scratch.ring.push(cut);
                    }
                    scratch.ring.push(scratch.remap[to as usize]);
                }
            }
            if scratch.ring.len() < 3 {
                continue;
            }

            scratch.lid_next.resize(scratch.vertices.len(), UNUSED);
            for (i, &u) in scratch.ring.iter().enumerate() {
                let v = scratch.ring[(i + 1) % scratch.ring.len()];
                if scratch.on_plane[u as usize] && scratch.on_plane[v as usize] {
                    // The lid runs along this edge in the opposite direction.
                    scratch.lid_next[v as usize] = u;
                    scratch.lid_start.get_or_insert(v);
                }
            }
            scratch.corners.extend_from_slice(&scratch.ring);
            scratch.offsets.push(scratch.corners.len() as u32);
            scratch.neighbors.push(self.face_neighbors[f]);
        }

        if let Some(start) = scratch.lid_start {
            scratch.ring.clear();
            let mut current = start;
            loop {
                scratch.ring.push(current);
                current = scratch.lid_next.get(current as usize).copied().unwrap_or(UNUSED);
                if current == start || current == UNUSED || scratch.ring.len() > scratch.vertices.len() {
                    break;
                }
            }
            if scratch.ring.len() >= 3 {
                scratch.corners.extend_from_slice(&scratch.ring);
                scratch.offsets.push(scratch.corners.len() as u32);
                scratch.neighbors.push(neighbor_id);
            }
        }

        std::mem::swap(&mut self.vertices, &mut scratch.vertices);
        std::mem::swap(&mut self.offsets, &mut scratch.offsets);
        std::mem::swap(&mut self.corners, &mut scratch.corners);
        std::mem::swap(&mut self.face_neighbors, &mut scratch.neighbors);
        let radius_sq = generator.map_or(0.0, |g| self.max_radius_sq(g));
        (true, radius_sq)
    }
}

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

fn triple(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> f64 {
    dot(a, &cross(b, c))
}

impl Cell<3> for Cell3D {
    type Scratch = Cell3DScratch;

    fn new(id: usize, bounds: BoundingBox<3>) -> Self {
        Cell3D::new(id, bounds)
    }

    fn id(&self) -> usize {
        self.id
    }

    #[inline]
    fn clip(
        &mut self,
        point: &[f64; 3],
        normal: &[f64; 3],
        neighbor_id: i64,
        scratch: &mut Self::Scratch,
        generator: Option<&[f64; 3]>,
    ) -> (bool, f64) {
        self.clip_with_scratch(point, normal, neighbor_id, scratch, generator)
    }

    fn max_radius_sq(&self, center: &[f64; 3]) -> f64 {
        self.vertices
            .iter()
            .map(|v| {
                let d = sub(v, center);
                dot(&d, &d)
            })
            .fold(0.0, f64::max)
    }

    fn centroid(&self) -> [f64; 3] {
        Cell3D::centroid(self)
    }

    fn measure(&self) -> f64 {
        self.volume()
    }

    fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn vertices(&self) -> Vec<[f64; 3]> {
        self.vertices.clone()
    }

    fn neighbors(&self) -> Vec<i64> {
        self.face_neighbors.clone()
    }

    fn facets(&self) -> Vec<Facet<3>> {
        self.face_neighbors
            .iter()
            .enumerate()
            .map(|(f, &neighbor)| {
                let (measure, centroid) = self.face_area_centroid(f);
                Facet { neighbor, measure, centroid }
            })
            .collect()
    }

    fn transform(&mut self, origin: &[f64; 3], scale: f64) {
        for v in &mut self.vertices {
            *v = [origin[0] + scale * v[0], origin[1] + scale * v[1], origin[2] + scale * v[2]];
        }
    }
}
