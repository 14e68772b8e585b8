//! Cross-domain check that both sides of every shared face agree.

use std::collections::HashMap;

use crate::distributed::packet::SharedFace;
use crate::error::{Result, TessellationError};

/// Accumulated measure and measure-weighted centroid of all faces between a cell pair.
#[derive(Clone, Copy)]
struct Aggregate<const D: usize> {
    measure: f64,
    weighted: [f64; D],
    // Mean of the pieces, used when the measure vanishes.
    sum: [f64; D],
    pieces: usize,
}

impl<const D: usize> Aggregate<D> {
    fn centroid(&self) -> [f64; D] {
        if self.measure > 0.0 {
            self.weighted.map(|w| w / self.measure)
        } else {
            self.sum.map(|s| s / self.pieces as f64)
        }
    }
}

/// Faces keyed by (owned cell, foreign neighbor).
fn aggregate<const D: usize>(faces: &[SharedFace<D>], flip: bool) -> HashMap<(usize, usize), Aggregate<D>> {
    let mut map: HashMap<(usize, usize), Aggregate<D>> = HashMap::new();
    for face in faces {
        let key = if flip { (face.neighbor, face.cell) } else { (face.cell, face.neighbor) };
        let entry = map.entry(key).or_insert(Aggregate { measure: 0.0, weighted: [0.0; D], sum: [0.0; D], pieces: 0 });
        entry.measure += face.measure;
        entry.pieces += 1;
        for k in 0..D {
            entry.weighted[k] += face.measure * face.centroid[k];
            entry.sum[k] += face.centroid[k];
        }
    }
    map
}

/// Matches the faces this domain shares with one neighbor against the neighbor's view.
///
/// `local` faces run from owned cells to the neighbor's generators, `remote` faces the
/// other way. Faces must agree in measure within `measure_tolerance` and in centroid
/// within `length_tolerance`; faces no larger than `measure_tolerance` may appear on one
/// side only.
pub(crate) fn reconcile<const D: usize>(
    domain: usize,
    local: &[SharedFace<D>],
    remote: &[SharedFace<D>],
    length_tolerance: f64,
    measure_tolerance: f64,
) -> Result<()> {
    let ours = aggregate(local, false);
    let theirs = aggregate(remote, true);
    let mismatch = |(cell, neighbor): (usize, usize), reason: String| TessellationError::InconsistentTopology {
        domain,
        cell,
        neighbor,
        reason,
    };

    for (&key, face) in &ours {
        match theirs.get(&key) {
            Some(other) => {
                if (face.measure - other.measure).abs() > measure_tolerance {
                    return Err(mismatch(key, format!("measure {} against {} on the neighbor", face.measure, other.measure)));
                }
                let (a, b) = (face.centroid(), other.centroid());
                let distance = (0..D).map(|k| (a[k] - b[k]).powi(2)).sum::<f64>().sqrt();
                if distance > length_tolerance {
                    return Err(mismatch(key, format!("centroids are {distance} apart")));
                }
            }
            None if face.measure <= measure_tolerance => {}
            None => return Err(mismatch(key, format!("face of measure {} is missing on the neighbor", face.measure))),
        }
    }
    for (&key, face) in &theirs {
        if !ours.contains_key(&key) && face.measure > measure_tolerance {
            return Err(mismatch(key, format!("neighbor reports a face of measure {} missing here", face.measure)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(cell: usize, neighbor: usize, measure: f64, centroid: [f64; 2]) -> SharedFace<2> {
        SharedFace { cell, neighbor, measure, centroid }
    }

    #[test]
    fn test_matching_faces() {
        let local = vec![face(0, 5, 0.5, [0.5, 0.25]), face(1, 5, 1e-12, [0.5, 0.5])];
        let remote = vec![face(5, 0, 0.5 + 1e-14, [0.5, 0.25])];
        assert!(reconcile(0, &local, &remote, 1e-8, 1e-8).is_ok());
    }

    #[test]
    fn test_split_faces_are_aggregated() {
        let local = vec![face(0, 5, 0.25, [0.5, 0.125]), face(0, 5, 0.25, [0.5, 0.375])];
        let remote = vec![face(5, 0, 0.5, [0.5, 0.25])];
        assert!(reconcile(0, &local, &remote, 1e-8, 1e-8).is_ok());
    }

    #[test]
    fn test_mismatches() {
        let local = vec![face(0, 5, 0.5, [0.5, 0.25])];
        let shorter = vec![face(5, 0, 0.4, [0.5, 0.25])];
        let shifted = vec![face(5, 0, 0.5, [0.5, 0.3])];
        let extra = vec![face(5, 0, 0.5, [0.5, 0.25]), face(6, 0, 0.1, [0.1, 0.1])];

        for remote in [shorter, shifted, extra, Vec::new()] {
            assert!(matches!(
                reconcile(2, &local, &remote, 1e-8, 1e-8),
                Err(TessellationError::InconsistentTopology { domain: 2, .. })
            ));
        }
    }
}
