use super::WallGeometry;

/// A wall defined by a hyperplane: a line in 2D, a plane in 3D.
///
/// The hyperplane partitions space into two regions: valid (inside) and invalid (outside).
/// The normal vector points towards the valid region.
#[derive(Clone, Debug, PartialEq)]
pub struct HalfSpace<const D: usize> {
    /// A point on the hyperplane.
    pub point: [f64; D],
    /// The unit normal of the hyperplane, pointing towards the valid region.
    pub normal: [f64; D],
    /// Distance outside the hyperplane still reported as contained.
    pub tolerance: f64,
}

impl<const D: usize> HalfSpace<D> {
    /// Creates a new `HalfSpace`, normalizing `normal`.
    pub fn new(point: [f64; D], normal: [f64; D]) -> Self {
        let len = normal.iter().map(|n| n * n).sum::<f64>().sqrt();
        let mut n = [0.0; D];
        if len == 0.0 {
            n[D - 1] = 1.0;
        } else {
            for k in 0..D {
                n[k] = normal[k] / len;
            }
        }
        Self { point, normal: n, tolerance: 0.0 }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Signed distance of `point` to the hyperplane, positive on the valid side.
    pub fn signed_distance(&self, point: &[f64; D]) -> f64 {
        (0..D).map(|k| (point[k] - self.point[k]) * self.normal[k]).sum()
    }
}

impl<const D: usize> WallGeometry<D> for HalfSpace<D> {
    fn contains(&self, point: &[f64; D]) -> bool {
        self.signed_distance(point) >= -self.tolerance
    }

    fn cut(&self, _generator: &[f64; D], callback: &mut dyn FnMut([f64; D], [f64; D])) {
        // Normal points IN, clip expects normal pointing OUT.
        callback(self.point, self.normal.map(|n| -n));
    }
}
