/// Fraction of the largest extent added on every side of the generator bounds to form the
/// default tessellation region.
pub const REGION_PADDING: f64 = 0.25;

/// Generic bounding box for N-dimensional space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox<const D: usize> {
    pub min: [f64; D],
    pub max: [f64; D],
}

impl<const D: usize> BoundingBox<D> {
    pub fn new(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// The unit box `[0, 1]^D`.
    pub fn unit() -> Self {
        Self { min: [0.0; D], max: [1.0; D] }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn around<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; D]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(*first, *first);
        for p in iter {
            for k in 0..D {
                bounds.min[k] = bounds.min[k].min(p[k]);
                bounds.max[k] = bounds.max[k].max(p[k]);
            }
        }
        Some(bounds)
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut result = *self;
        for k in 0..D {
            result.min[k] = result.min[k].min(other.min[k]);
            result.max[k] = result.max[k].max(other.max[k]);
        }
        result
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        let mut result = *self;
        for k in 0..D {
            result.min[k] -= margin;
            result.max[k] += margin;
        }
        result
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn max_extent(&self) -> f64 {
        (0..D).map(|k| self.extent(k)).fold(0.0, f64::max)
    }

    /// Area in 2D, volume in 3D.
    pub fn measure(&self) -> f64 {
        (0..D).map(|k| self.extent(k)).product()
    }

    pub fn center(&self) -> [f64; D] {
        let mut c = [0.0; D];
        for k in 0..D {
            c[k] = 0.5 * (self.min[k] + self.max[k]);
        }
        c
    }

    pub fn contains(&self, point: &[f64; D], tolerance: f64) -> bool {
        (0..D).all(|k| point[k] >= self.min[k] - tolerance && point[k] <= self.max[k] + tolerance)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|k| self.min[k] <= other.max[k] && other.min[k] <= self.max[k])
    }

    /// A box is usable as a tessellation region when it is finite and has positive extent on every axis.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|k| self.min[k].is_finite() && self.max[k].is_finite() && self.min[k] < self.max[k])
    }

    /// The default tessellation region around these bounds.
    ///
    /// Every axis is padded by [`REGION_PADDING`] times the largest extent, so flat or
    /// collinear generator sets still produce a region with positive volume. A single
    /// point is padded by one unit.
    pub fn padded_region(&self) -> Self {
        let extent = self.max_extent();
        let margin = if extent > 0.0 { REGION_PADDING * extent } else { 1.0 };
        self.expanded(margin)
    }
}

/// Calculates the ID for a bounding box wall based on the axis and direction.
///
/// The IDs start at -1 and decrease, they are negative to prevent conflicts with generator IDs.
/// - Axis 0 (X) Min: -1
/// - Axis 0 (X) Max: -2
/// - Axis 1 (Y) Min: -3
/// - Axis 1 (Y) Max: -4
pub fn box_side(axis: usize, is_max: bool) -> i64 {
    -1 - (axis * 2 + if is_max { 1 } else { 0 }) as i64
}
