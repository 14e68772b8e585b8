use crate::bounds::BoundingBox;
use crate::plc::Plc;

pub mod d2;
pub mod d3;

pub use d2::Cell2D;
pub use d3::Cell3D;

/// Vertices closer than this to a clipping plane count as lying on it.
pub(crate) const CLIP_EPSILON: f64 = 1e-9;

/// A (D-1)-dimensional face of a cell: an edge in 2D, a polygon in 3D.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Facet<const D: usize> {
    /// Generator id for faces between two cells, a negative id for bounding box sides and
    /// PLC facets.
    pub neighbor: i64,
    /// Length in 2D, area in 3D.
    pub measure: f64,
    pub centroid: [f64; D],
}

impl<const D: usize> Facet<D> {
    /// Id of the neighboring generator, `None` for boundary faces.
    pub fn neighbor_generator(&self) -> Option<usize> {
        usize::try_from(self.neighbor).ok()
    }
}

/// Trait defining the behavior of a Voronoi cell.
/// This allows swapping between polygon cells (`Cell2D`) and polyhedron cells (`Cell3D`).
pub trait Cell<const D: usize>: Send + Sync + Sized + Clone + std::fmt::Debug {
    /// Scratch buffer used to avoid allocations during clipping.
    type Scratch: Default + Clone + Send;

    /// Initialize a new cell for the given generator id and bounds.
    fn new(id: usize, bounds: BoundingBox<D>) -> Self;

    /// Initialize a cell covering the region enclosed by `plc`, for cell types that can
    /// represent non-convex regions with holes. `None` otherwise.
    fn from_plc(id: usize, plc: &Plc<D>) -> Option<Self> {
        let _ = (id, plc);
        None
    }

    /// Id of the generator this cell belongs to.
    fn id(&self) -> usize;

    /// Clip the cell by a plane defined by `point` and `normal`.
    /// Returns `(true, new_max_radius_sq)` if the cell was modified, or `(false, 0.0)` if not.
    fn clip(
        &mut self,
        point: &[f64; D],
        normal: &[f64; D],
        neighbor_id: i64,
        scratch: &mut Self::Scratch,
        generator: Option<&[f64; D]>,
    ) -> (bool, f64);

    /// Calculate the squared distance from the center to the furthest vertex.
    fn max_radius_sq(&self, center: &[f64; D]) -> f64;

    /// Calculate the centroid of the cell.
    fn centroid(&self) -> [f64; D];

    /// Area in 2D, volume in 3D.
    fn measure(&self) -> f64;

    /// Check if the cell is empty (collapsed).
    fn is_empty(&self) -> bool;

    fn vertices(&self) -> Vec<[f64; D]>;

    /// Neighbor id of every face, in face order.
    fn neighbors(&self) -> Vec<i64>;

    fn facets(&self) -> Vec<Facet<D>>;

    /// Maps every vertex `x` to `origin + scale * x`.
    fn transform(&mut self, origin: &[f64; D], scale: f64);
}
