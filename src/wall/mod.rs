pub mod geometries;

pub use geometries::HalfSpace;

/// The maximum ID for walls. Wall IDs must be less than or equal to this value
/// to avoid conflicts with non-negative generator IDs and the bounding box IDs.
/// The number of D-1 dimensional faces of a hypercube is 2*D so with walls
/// starting at -1000 we allow for D < 500, which should be plenty.
pub const WALL_ID_MAX: i64 = -1000;

/// Neighbor id reported by cells for faces produced by PLC facet `facet`.
pub fn plc_facet_id(facet: usize) -> i64 {
    WALL_ID_MAX - facet as i64
}

/// Inverse of [`plc_facet_id`], `None` for generator and bounding box ids.
pub fn plc_facet_index(id: i64) -> Option<usize> {
    (id <= WALL_ID_MAX).then(|| (WALL_ID_MAX - id) as usize)
}

/// A clipping boundary for the Voronoi tessellation.
///
/// A `Wall` is a container for a `WallGeometry` implementation, giving it a unique
/// integer ID. This ID will be reported as the neighbor of every cell facet that has
/// been clipped by this wall.
pub struct Wall<const D: usize> {
    id: i64,
    inner: Box<dyn WallGeometry<D>>,
}

impl<const D: usize> Wall<D> {
    /// Creates a new `Wall` from a Rust struct that implements the `WallGeometry` trait.
    pub fn new(id: i64, geometry: Box<dyn WallGeometry<D>>) -> Self {
        if id > WALL_ID_MAX {
            panic!("Wall ID must be <= {}", WALL_ID_MAX);
        }
        Self { id, inner: geometry }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn contains(&self, point: &[f64; D]) -> bool {
        self.inner.contains(point)
    }

    pub fn cut(&self, generator: &[f64; D], callback: &mut dyn FnMut([f64; D], [f64; D])) {
        self.inner.cut(generator, callback)
    }
}

impl<const D: usize> std::fmt::Debug for Wall<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wall").field("id", &self.id).field("geometry", &self.inner).finish()
    }
}

/// Trait defining the geometry and logic of a wall.
/// Must be Send + Sync to support parallel execution in the clipping kernel.
pub trait WallGeometry<const D: usize>: Send + Sync + std::fmt::Debug {
    /// Checks if a point is inside the valid region defined by the wall.
    fn contains(&self, point: &[f64; D]) -> bool;

    /// Calculates the clipping plane for a given generator.
    /// Passes (point_on_plane, plane_normal) to the callback.
    /// The normal should point OUT of the valid region (towards the region to be clipped).
    fn cut(&self, generator: &[f64; D], callback: &mut dyn FnMut([f64; D], [f64; D]));
}
