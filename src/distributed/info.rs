use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::bounds::BoundingBox;
use crate::error::{Result, TessellationError};
use crate::generator::Generator;

/// Which domains a domain exchanges ghosts and faces with.
///
/// Neighbor lists must be symmetric across the world: if domain `i` lists `j`, domain `j`
/// lists `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommunicationInfo {
    rank: usize,
    size: usize,
    neighbors: Vec<usize>,
}

impl CommunicationInfo {
    /// Sorts and deduplicates `neighbors`, rejecting self references and out of range ranks.
    pub fn new(rank: usize, size: usize, neighbors: impl IntoIterator<Item = usize>) -> Result<Self> {
        if rank >= size {
            return Err(TessellationError::InvalidCommunicationInfo(format!(
                "rank {rank} is out of range for {size} domains"
            )));
        }
        let mut neighbors: Vec<usize> = neighbors.into_iter().collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        if let Some(&bad) = neighbors.iter().find(|&&n| n >= size) {
            return Err(TessellationError::InvalidCommunicationInfo(format!(
                "neighbor {bad} is out of range for {size} domains"
            )));
        }
        if neighbors.contains(&rank) {
            return Err(TessellationError::InvalidCommunicationInfo(format!("domain {rank} lists itself")));
        }
        Ok(Self { rank, size, neighbors })
    }

    /// Every other domain is a neighbor.
    pub fn all_to_all(rank: usize, size: usize) -> Result<Self> {
        Self::new(rank, size, (0..size).filter(|&r| r != rank))
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Neighbors derived from the gathered generator bounds and influence halos: two
    /// domains are neighbors when either's halo meets the other's generator bounds.
    pub(crate) fn from_halos<const D: usize>(
        rank: usize,
        bounds: &[Option<BoundingBox<D>>],
        halos: &[Option<BoundingBox<D>>],
    ) -> Result<Self> {
        let meets = |halo: &Option<BoundingBox<D>>, other: &Option<BoundingBox<D>>| match (halo, other) {
            (Some(halo), Some(other)) => halo.intersects(other),
            _ => false,
        };
        let neighbors = (0..bounds.len())
            .filter(|&j| j != rank)
            .filter(|&j| meets(&halos[rank], &bounds[j]) || meets(&halos[j], &bounds[rank]));
        Self::new(rank, bounds.len(), neighbors)
    }
}

/// Checks that the gathered neighbor lists of all domains agree with each other.
pub(crate) fn check_symmetric(lists: &[Vec<usize>]) -> Result<()> {
    for (i, list) in lists.iter().enumerate() {
        for &j in list {
            if !lists.get(j).is_some_and(|other| other.contains(&i)) {
                return Err(TessellationError::InvalidCommunicationInfo(format!(
                    "domain {i} lists domain {j} as a neighbor but not the other way around"
                )));
            }
        }
    }
    Ok(())
}

/// Hash of generator ids and exact positions.
pub(crate) fn fingerprint<const D: usize>(generators: &[Generator<D>]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for g in generators {
        g.id.hash(&mut hasher);
        g.position.iter().for_each(|c| c.to_bits().hash(&mut hasher));
    }
    hasher.finish()
}

/// Hash identifying a whole distributed input: every domain's fingerprint plus the region.
pub(crate) fn world_fingerprint<const D: usize>(fingerprints: &[u64], region: &BoundingBox<D>) -> u64 {
    let mut hasher = DefaultHasher::new();
    fingerprints.hash(&mut hasher);
    region.min.iter().chain(&region.max).for_each(|c| c.to_bits().hash(&mut hasher));
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_and_validates() {
        let info = CommunicationInfo::new(1, 4, [3, 0, 3]).unwrap();
        assert_eq!(info.neighbors(), &[0, 3]);

        assert!(CommunicationInfo::new(1, 4, [1]).is_err());
        assert!(CommunicationInfo::new(1, 4, [4]).is_err());
        assert!(CommunicationInfo::new(4, 4, []).is_err());
        assert_eq!(CommunicationInfo::all_to_all(2, 4).unwrap().neighbors(), &[0, 1, 3]);
    }

    #[test]
    fn test_symmetry() {
        assert!(check_symmetric(&[vec![1], vec![0, 2], vec![1]]).is_ok());
        assert!(check_symmetric(&[vec![1], vec![], vec![]]).is_err());
    }

    #[test]
    fn test_from_halos() {
        let bounds = vec![
            Some(BoundingBox::new([0.0, 0.0], [1.0, 1.0])),
            Some(BoundingBox::new([1.2, 0.0], [2.0, 1.0])),
            Some(BoundingBox::new([5.0, 0.0], [6.0, 1.0])),
            None,
        ];
        let halos = vec![
            Some(BoundingBox::new([-0.5, -0.5], [1.5, 1.5])),
            Some(BoundingBox::new([1.1, -0.1], [2.1, 1.1])),
            Some(BoundingBox::new([4.5, -0.5], [6.5, 1.5])),
            None,
        ];
        // Domain 1's halo misses domain 0, but domain 0's halo reaches domain 1.
        assert_eq!(CommunicationInfo::from_halos(1, &bounds, &halos).unwrap().neighbors(), &[0]);
        assert_eq!(CommunicationInfo::from_halos(0, &bounds, &halos).unwrap().neighbors(), &[1]);
        assert!(CommunicationInfo::from_halos(2, &bounds, &halos).unwrap().neighbors().is_empty());
        assert!(CommunicationInfo::from_halos(3, &bounds, &halos).unwrap().neighbors().is_empty());
    }

    #[test]
    fn test_fingerprints_depend_on_positions() {
        let a = vec![Generator::new(0, [0.0, 0.0]), Generator::new(1, [1.0, 0.0])];
        let mut b = a.clone();
        b[1].position[1] = 1e-12;
        assert_ne!(fingerprint(&a), fingerprint(&b));
        let region = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);
        assert_eq!(world_fingerprint(&[1, 2], &region), world_fingerprint(&[1, 2], &region));
        assert_ne!(world_fingerprint(&[1, 2], &region), world_fingerprint(&[2, 1], &region));
    }
}
