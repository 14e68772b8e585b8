//! Distributed tessellation over domains that each own a subset of the generators.
//!
//! Every domain calls the same operation collectively. Domains first agree on a global
//! region, then compute a tentative tessellation of their own generators to bound how
//! far foreign generators can reach into their cells. Generators inside a neighbor's
//! reach are sent to it as ghosts, after which each domain tessellates its generators
//! together with the ghosts it received and keeps only its own cells.
//!
//! A cell can only shrink when generators are added, so every generator that clips cell
//! `i` in the full tessellation lies within twice the largest vertex distance of the
//! tentative cell `i`. One round of ghost exchange is therefore enough for the owned
//! cells to equal those of a serial tessellation of all generators.
//!
//! Domains fail together: local failures are published in the next collective step and
//! every other domain reports [`TessellationError::RemoteFailure`]. A communication
//! failure aborts the communicator so peers waiting on this domain are released.

mod info;
mod packet;
mod reconcile;

pub use info::CommunicationInfo;
pub use packet::{DomainSummary, Influence, Packet, SharedFace};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Deref;
use std::sync::{Mutex, PoisonError};

use crate::bounds::BoundingBox;
use crate::cell::Cell;
use crate::comm::{self, Communicator, Tag};
use crate::error::{CommunicationError, Result, TessellationError};
use crate::generator::Generator;
use crate::plc::Plc;
use crate::serial::{check_degeneracy, plc_region, validate_bounds, validate_generators};
use crate::tessellator::Tessellator;

/// How the distributed tessellator holds its serial backend.
///
/// An owned backend is dropped together with the distributed tessellator; a borrowed one
/// stays with the caller.
#[derive(Debug)]
pub enum SerialBackend<'a, T> {
    Owned(T),
    Borrowed(&'a T),
}

impl<T> SerialBackend<'_, T> {
    pub fn is_owned(&self) -> bool {
        matches!(self, SerialBackend::Owned(_))
    }
}

impl<T> Deref for SerialBackend<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            SerialBackend::Owned(serial) => serial,
            SerialBackend::Borrowed(serial) => serial,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DistributedOptions {
    /// Derive the neighbor domains from the generators instead of requiring the caller
    /// to supply them with [`DistributedTessellator::set_communication_info`].
    pub build_communication_info: bool,
}

impl DistributedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_communication_info(mut self, build: bool) -> Self {
        self.build_communication_info = build;
        self
    }
}

/// Result of a distributed tessellation on one domain.
#[derive(Clone, Debug)]
pub struct DomainTessellation<const D: usize, C> {
    pub rank: usize,
    /// The global region, `None` when no domain had generators.
    pub region: Option<BoundingBox<D>>,
    /// Cells of the generators owned by this domain.
    pub cells: Vec<C>,
    pub neighbor_domains: Vec<usize>,
    /// Faces between owned cells and cells owned by each neighbor domain.
    pub shared_faces: Vec<(usize, Vec<SharedFace<D>>)>,
}

#[derive(Clone, Copy)]
enum Boundary<'p, const D: usize> {
    Default,
    Box(BoundingBox<D>),
    Plc(&'p Plc<D>),
}

impl<'p, const D: usize> Boundary<'p, D> {
    fn plc(&self) -> Option<&'p Plc<D>> {
        match *self {
            Boundary::Plc(plc) => Some(plc),
            _ => None,
        }
    }
}

struct CachedInfo {
    info: CommunicationInfo,
    // Fingerprint of the input the info was built for, `None` when supplied by the caller.
    fingerprint: Option<u64>,
}

type LocalResult<const D: usize, C> = Result<(Vec<C>, BTreeMap<usize, Vec<SharedFace<D>>>)>;

pub struct DistributedTessellator<'a, const D: usize, T, C> {
    serial: SerialBackend<'a, T>,
    comm: C,
    options: DistributedOptions,
    info: Mutex<Option<CachedInfo>>,
}

impl<'a, const D: usize, T, C> DistributedTessellator<'a, D, T, C>
where
    T: Tessellator<D>,
    C: Communicator<Packet<D>>,
{
    /// Takes ownership of `serial`, with default options.
    pub fn new(serial: T, comm: C) -> Self {
        Self::with_options(SerialBackend::Owned(serial), comm, DistributedOptions::default())
    }

    pub fn with_options(serial: SerialBackend<'a, T>, comm: C, options: DistributedOptions) -> Self {
        Self { serial, comm, options, info: Mutex::new(None) }
    }

    pub fn serial(&self) -> &T {
        &self.serial
    }

    /// Whether the serial backend is dropped together with this tessellator.
    pub fn assumes_control(&self) -> bool {
        self.serial.is_owned()
    }

    pub fn options(&self) -> DistributedOptions {
        self.options
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// Supplies the neighbor domains of this domain. Required unless the options ask for
    /// communication info to be built.
    pub fn set_communication_info(&self, info: CommunicationInfo) -> Result<()> {
        if info.rank() != self.rank() || info.size() != self.size() {
            return Err(TessellationError::InvalidCommunicationInfo(format!(
                "info for rank {} of {} given to rank {} of {}",
                info.rank(),
                info.size(),
                self.rank(),
                self.size()
            )));
        }
        *self.info.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedInfo { info, fingerprint: None });
        Ok(())
    }

    /// The supplied or most recently built communication info.
    pub fn communication_info(&self) -> Option<CommunicationInfo> {
        self.info.lock().unwrap_or_else(PoisonError::into_inner).as_ref().map(|cached| cached.info.clone())
    }

    pub fn clear_communication_info(&self) {
        *self.info.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Tessellates the generators owned by this domain within the default region of all
    /// domains' generators.
    pub fn tessellate_domain(&self, generators: &[Generator<D>]) -> Result<DomainTessellation<D, T::Cell>> {
        self.run(generators, Boundary::Default)
    }

    pub fn tessellate_domain_in_box(
        &self,
        generators: &[Generator<D>],
        bounds: &BoundingBox<D>,
    ) -> Result<DomainTessellation<D, T::Cell>> {
        self.run(generators, Boundary::Box(*bounds))
    }

    /// Every domain must pass the same PLC.
    pub fn tessellate_domain_with_plc(&self, generators: &[Generator<D>], plc: &Plc<D>) -> Result<DomainTessellation<D, T::Cell>> {
        self.run(generators, Boundary::Plc(plc))
    }

    fn run(&self, generators: &[Generator<D>], boundary: Boundary<'_, D>) -> Result<DomainTessellation<D, T::Cell>> {
        if boundary.plc().is_some() && !self.serial.handles_plcs() {
            return Err(TessellationError::UnsupportedPlc { tessellator: self.name() });
        }
        let result = self.coordinate(generators, boundary);
        match &result {
            Err(TessellationError::Communication(err)) => {
                tracing::warn!(rank = self.rank(), "aborting after communication failure: {err}");
                self.comm.abort();
            }
            Err(err) => tracing::debug!(rank = self.rank(), "distributed tessellation failed: {err}"),
            Ok(_) => {}
        }
        result
    }

    fn gather<M>(
        &self,
        tag: Tag,
        packet: Packet<D>,
        unpack: impl Fn(usize, Packet<D>) -> std::result::Result<M, CommunicationError>,
    ) -> Result<Vec<M>> {
        let packets = comm::all_gather(&self.comm, tag, packet)?;
        let unpacked = packets.into_iter().enumerate().map(|(peer, packet)| unpack(peer, packet)).collect::<std::result::Result<_, _>>()?;
        Ok(unpacked)
    }

    fn exchange<M>(
        &self,
        tag: Tag,
        outgoing: Vec<(usize, Packet<D>)>,
        unpack: impl Fn(usize, Packet<D>) -> std::result::Result<M, CommunicationError>,
    ) -> Result<Vec<(usize, M)>> {
        let replies = comm::exchange(&self.comm, tag, outgoing)?;
        let unpacked = replies
            .into_iter()
            .map(|(peer, packet)| unpack(peer, packet).map(|message| (peer, message)))
            .collect::<std::result::Result<_, _>>()?;
        Ok(unpacked)
    }

    fn validate_input(&self, generators: &[Generator<D>], boundary: Boundary<'_, D>) -> Result<()> {
        validate_generators(generators)?;
        match boundary {
            Boundary::Default => Ok(()),
            Boundary::Box(bounds) => validate_bounds(&bounds),
            Boundary::Plc(plc) => plc_region(plc).map(|_| ()),
        }
    }

    fn local_cells(&self, generators: &[Generator<D>], boundary: Boundary<'_, D>, region: &BoundingBox<D>) -> Result<Vec<T::Cell>> {
        match boundary {
            Boundary::Plc(plc) => self.serial.tessellate_with_plc(generators, plc),
            _ => self.serial.tessellate_in_box(generators, region),
        }
    }

    fn coordinate(&self, generators: &[Generator<D>], boundary: Boundary<'_, D>) -> Result<DomainTessellation<D, T::Cell>> {
        let rank = self.rank();
        let size = self.size();

        // 1. Agree on the input.
        let local_check = self.validate_input(generators, boundary);
        let summary = DomainSummary {
            bounds: Generator::bounds(generators),
            count: generators.len(),
            fingerprint: info::fingerprint(generators),
            plc_fingerprint: boundary.plc().map(Plc::fingerprint),
            requested_box: match boundary {
                Boundary::Box(bounds) => Some(bounds),
                _ => None,
            },
            failure: local_check.as_ref().err().map(ToString::to_string),
        };
        let summaries = self.gather(Tag::Summary, Packet::Summary(summary), packet::into_summary)?;
        local_check?;
        first_remote_failure(rank, summaries.iter().map(|s| s.failure.as_deref()))?;

        let own = &summaries[rank];
        if summaries.iter().any(|s| s.plc_fingerprint != own.plc_fingerprint) {
            return Err(TessellationError::InvalidPlc("domains were given different PLCs".into()));
        }
        if summaries.iter().any(|s| s.requested_box != own.requested_box) {
            return Err(TessellationError::InvalidBounds("domains were given different boxes".into()));
        }

        let total: usize = summaries.iter().map(|s| s.count).sum();
        let region = match boundary {
            Boundary::Box(bounds) => Some(bounds),
            Boundary::Plc(plc) => Some(plc_region(plc)?),
            Boundary::Default => summaries.iter().filter_map(|s| s.bounds).reduce(|a, b| a.union(&b)).map(|b| b.padded_region()),
        };
        let region = match region {
            Some(region) if total > 0 => region,
            region => {
                return Ok(DomainTessellation { rank, region, cells: Vec::new(), neighbor_domains: Vec::new(), shared_faces: Vec::new() });
            }
        };
        tracing::debug!(rank, total, "gathered domain summaries");

        // 2. Tentative tessellation of the owned generators bounds their reach.
        let length_tolerance = self.degeneracy() * region.max_extent();
        let halo = self
            .local_cells(generators, boundary, &region)
            .map(|cells| influence_halo(generators, &cells, length_tolerance));
        let supplied = if self.options.build_communication_info {
            Ok(None)
        } else {
            self.communication_info()
                .map(|info| Some(info.neighbors().to_vec()))
                .ok_or(TessellationError::MissingCommunicationInfo)
        };

        // 3. Publish the reach and settle who talks to whom.
        let influence = Influence {
            halo: halo.as_ref().ok().copied().flatten(),
            neighbors: supplied.as_ref().ok().cloned().flatten(),
            failure: halo.as_ref().err().or(supplied.as_ref().err()).map(ToString::to_string),
        };
        let influences = self.gather(Tag::Influence, Packet::Influence(influence), packet::into_influence)?;
        halo?;
        supplied?;
        first_remote_failure(rank, influences.iter().map(|i| i.failure.as_deref()))?;

        let halos: Vec<Option<BoundingBox<D>>> = influences.iter().map(|i| i.halo).collect();
        let info = self.settle_info(rank, size, &summaries, &influences, &halos, &region)?;
        tracing::debug!(rank, neighbors = ?info.neighbors(), "communication info ready");

        // 4. Ghost exchange.
        let outgoing = info
            .neighbors()
            .iter()
            .map(|&peer| {
                let ghosts = match &halos[peer] {
                    Some(halo) => generators.iter().filter(|g| halo.contains(&g.position, 0.0)).copied().collect(),
                    None => Vec::new(),
                };
                (peer, Packet::Ghosts(ghosts))
            })
            .collect();
        let received = self.exchange(Tag::Ghosts, outgoing, packet::into_ghosts)?;
        tracing::debug!(rank, ghosts = received.iter().map(|(_, g)| g.len()).sum::<usize>(), "received ghosts");

        // 5. Tessellate owned generators together with the ghosts.
        let local = self.tessellate_with_ghosts(rank, generators, &received, boundary, &region, info.neighbors());

        // 6. Both sides of every shared face must agree.
        let outgoing = info
            .neighbors()
            .iter()
            .map(|&peer| {
                let faces = match &local {
                    Ok((_, shared)) => Ok(shared.get(&peer).cloned().unwrap_or_default()),
                    Err(err) => Err(err.to_string()),
                };
                (peer, Packet::Faces(faces))
            })
            .collect();
        let replies = self.exchange(Tag::Faces, outgoing, packet::into_faces)?;
        let measure_tolerance = self.degeneracy() * region.max_extent().powi(D as i32 - 1);
        let checked = match &local {
            Ok((_, shared)) => replies.iter().try_for_each(|(peer, faces)| match faces {
                Ok(theirs) => reconcile::reconcile(
                    rank,
                    shared.get(peer).map_or(&[][..], Vec::as_slice),
                    theirs,
                    length_tolerance,
                    measure_tolerance,
                ),
                // The neighbor reports its own failure in the status round.
                Err(_) => Ok(()),
            }),
            Err(_) => Ok(()),
        };

        // 7. Fail together.
        let failure = match (&local, &checked) {
            (Err(err), _) | (_, Err(err)) => Some(err.to_string()),
            _ => None,
        };
        let statuses = self.gather(Tag::Status, Packet::Status(failure), packet::into_status)?;
        let (cells, shared) = local?;
        checked?;
        first_remote_failure(rank, statuses.iter().map(Option::as_deref))?;

        tracing::debug!(rank, cells = cells.len(), "domain tessellation complete");
        Ok(DomainTessellation {
            rank,
            region: Some(region),
            cells,
            neighbor_domains: info.neighbors().to_vec(),
            shared_faces: shared.into_iter().collect(),
        })
    }

    /// Validates supplied neighbor lists, or builds (and caches) them from the halos.
    fn settle_info(
        &self,
        rank: usize,
        size: usize,
        summaries: &[DomainSummary<D>],
        influences: &[Influence<D>],
        halos: &[Option<BoundingBox<D>>],
        region: &BoundingBox<D>,
    ) -> Result<CommunicationInfo> {
        let building = influences.iter().filter(|i| i.neighbors.is_none()).count();
        if building != 0 && building != size {
            return Err(TessellationError::InvalidCommunicationInfo(
                "domains disagree on whether communication info is built".into(),
            ));
        }

        if building == 0 {
            let lists: Vec<Vec<usize>> = influences.iter().map(|i| i.neighbors.clone().unwrap_or_default()).collect();
            info::check_symmetric(&lists)?;
            return CommunicationInfo::new(rank, size, lists[rank].iter().copied());
        }

        let fingerprints: Vec<u64> = summaries.iter().map(|s| s.fingerprint).collect();
        let fingerprint = info::world_fingerprint(&fingerprints, region);
        let mut cache = self.info.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.as_ref().filter(|cached| cached.fingerprint == Some(fingerprint)) {
            tracing::trace!(rank, "reusing communication info");
            return Ok(cached.info.clone());
        }
        let bounds: Vec<Option<BoundingBox<D>>> = summaries.iter().map(|s| s.bounds).collect();
        let info = CommunicationInfo::from_halos(rank, &bounds, halos)?;
        *cache = Some(CachedInfo { info: info.clone(), fingerprint: Some(fingerprint) });
        Ok(info)
    }

    fn tessellate_with_ghosts(
        &self,
        rank: usize,
        generators: &[Generator<D>],
        received: &[(usize, Vec<Generator<D>>)],
        boundary: Boundary<'_, D>,
        region: &BoundingBox<D>,
        neighbors: &[usize],
    ) -> LocalResult<D, T::Cell> {
        let owned: HashSet<usize> = generators.iter().map(|g| g.id).collect();
        let mut owner: HashMap<usize, usize> = HashMap::new();
        let mut combined = generators.to_vec();
        for (peer, ghosts) in received {
            for ghost in ghosts {
                if owned.contains(&ghost.id) {
                    return Err(conflict(ghost.id, rank, *peer));
                }
                if let Some(&other) = owner.get(&ghost.id) {
                    return Err(conflict(ghost.id, other, *peer));
                }
                owner.insert(ghost.id, *peer);
                combined.push(*ghost);
            }
        }
        check_degeneracy(&combined, region, self.degeneracy())?;

        let cells: Vec<T::Cell> = self
            .local_cells(&combined, boundary, region)?
            .into_iter()
            .filter(|cell| owned.contains(&cell.id()))
            .collect();

        let mut shared: BTreeMap<usize, Vec<SharedFace<D>>> = neighbors.iter().map(|&peer| (peer, Vec::new())).collect();
        for cell in &cells {
            for facet in cell.facets() {
                let Some(neighbor) = facet.neighbor_generator() else { continue };
                if let Some(peer) = owner.get(&neighbor) {
                    shared.entry(*peer).or_default().push(SharedFace {
                        cell: cell.id(),
                        neighbor,
                        measure: facet.measure,
                        centroid: facet.centroid,
                    });
                }
            }
        }
        Ok((cells, shared))
    }
}

fn conflict(id: usize, a: usize, b: usize) -> TessellationError {
    TessellationError::OwnershipConflict { id, domains: (a.min(b), a.max(b)) }
}

/// The first failure reported by another domain, in rank order.
fn first_remote_failure<'s>(rank: usize, failures: impl Iterator<Item = Option<&'s str>>) -> Result<()> {
    for (domain, failure) in failures.enumerate() {
        if let (true, Some(reason)) = (domain != rank, failure) {
            return Err(TessellationError::RemoteFailure { domain, reason: reason.to_string() });
        }
    }
    Ok(())
}

/// Box around every ball of radius twice the tentative cell radius, padded by `tolerance`.
fn influence_halo<const D: usize, C: Cell<D>>(generators: &[Generator<D>], cells: &[C], tolerance: f64) -> Option<BoundingBox<D>> {
    let by_id: HashMap<usize, &C> = cells.iter().map(|cell| (cell.id(), cell)).collect();
    generators
        .iter()
        .map(|g| {
            let radius = by_id.get(&g.id).map_or(0.0, |cell| cell.max_radius_sq(&g.position).sqrt());
            BoundingBox::new(g.position, g.position).expanded(2.0 * radius + tolerance)
        })
        .reduce(|a, b| a.union(&b))
}

impl<const D: usize, T, C> Tessellator<D> for DistributedTessellator<'_, D, T, C>
where
    T: Tessellator<D>,
    C: Communicator<Packet<D>>,
{
    type Cell = T::Cell;

    fn handles_plcs(&self) -> bool {
        self.serial.handles_plcs()
    }

    fn name(&self) -> String {
        format!("Distributed{}", self.serial.name())
    }

    fn degeneracy(&self) -> f64 {
        self.serial.degeneracy()
    }

    fn tessellate(&self, generators: &[Generator<D>]) -> Result<Vec<T::Cell>> {
        self.tessellate_domain(generators).map(|domain| domain.cells)
    }

    fn tessellate_in_box(&self, generators: &[Generator<D>], bounds: &BoundingBox<D>) -> Result<Vec<T::Cell>> {
        self.tessellate_domain_in_box(generators, bounds).map(|domain| domain.cells)
    }

    fn tessellate_with_plc(&self, generators: &[Generator<D>], plc: &Plc<D>) -> Result<Vec<T::Cell>> {
        self.tessellate_domain_with_plc(generators, plc).map(|domain| domain.cells)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::comm::{LocalCommunicator, run_domains};
    use crate::serial::{BoxTessellator2d, SerialTessellator2d};

    type Comm = LocalCommunicator<Packet<2>>;

    fn building() -> DistributedOptions {
        DistributedOptions::new().build_communication_info(true)
    }

    fn stripes(generators: &[Generator<2>], size: usize) -> Vec<Vec<Generator<2>>> {
        let mut parts = vec![Vec::new(); size];
        for g in generators {
            let domain = ((g.position[0] * size as f64) as usize).min(size - 1);
            parts[domain].push(*g);
        }
        parts
    }

    fn distributed(comm: Comm, options: DistributedOptions) -> DistributedTessellator<'static, 2, SerialTessellator2d, Comm> {
        DistributedTessellator::with_options(SerialBackend::Owned(SerialTessellator2d::default()), comm, options)
    }

    #[test]
    fn test_matches_serial_tessellation() {
        let generators = Generator::random(&BoundingBox::unit(), 60, 7);
        let serial = SerialTessellator2d::default().tessellate(&generators).unwrap();
        let parts = stripes(&generators, 3);

        let results = run_domains(3, |comm: Comm| {
            let rank = comm.rank();
            distributed(comm, building()).tessellate_domain(&parts[rank])
        });

        let mut measures = HashMap::new();
        for domain in results {
            for cell in domain.unwrap().cells {
                measures.insert(cell.id(), cell.measure());
            }
        }
        assert_eq!(measures.len(), serial.len());
        for cell in &serial {
            assert!((measures[&cell.id()] - cell.measure()).abs() < 1e-9, "cell {}", cell.id());
        }
    }

    #[test]
    fn test_shared_faces_agree() {
        let generators = Generator::lattice(&BoundingBox::unit(), [4, 4]);
        let parts = stripes(&generators, 2);
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            distributed(comm, building()).tessellate_domain_in_box(&parts[rank], &BoundingBox::unit())
        });
        let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

        for domain in &results {
            assert_eq!(domain.neighbor_domains, vec![1 - domain.rank]);
            let (peer, faces) = &domain.shared_faces[0];
            assert_eq!(*peer, 1 - domain.rank);
            assert_eq!(faces.iter().filter(|f| f.measure > 1e-9).count(), 4);
            let total: f64 = faces.iter().map(|f| f.measure).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_supplied_communication_info() {
        let generators = Generator::lattice(&BoundingBox::unit(), [6, 2]);
        let parts = stripes(&generators, 3);
        let results = run_domains(3, |comm: Comm| {
            let rank = comm.rank();
            let tessellator = distributed(comm, DistributedOptions::default());
            let neighbors = [rank.checked_sub(1), Some(rank + 1).filter(|&n| n < 3)];
            tessellator.set_communication_info(CommunicationInfo::new(rank, 3, neighbors.into_iter().flatten())?)?;
            tessellator.tessellate_domain(&parts[rank])
        });
        for domain in results {
            assert_eq!(domain.unwrap().cells.len(), 4);
        }
    }

    #[test]
    fn test_missing_communication_info() {
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            distributed(comm, DistributedOptions::default()).tessellate_domain(&[Generator::new(rank, [rank as f64, 0.0])])
        });
        for result in results {
            assert_eq!(result.unwrap_err(), TessellationError::MissingCommunicationInfo);
        }
    }

    #[test]
    fn test_asymmetric_communication_info() {
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            let tessellator = distributed(comm, DistributedOptions::default());
            let neighbors = if rank == 0 { vec![1] } else { vec![] };
            tessellator.set_communication_info(CommunicationInfo::new(rank, 2, neighbors)?)?;
            tessellator.tessellate_domain(&[Generator::new(rank, [rank as f64, 0.0])])
        });
        for result in results {
            assert!(matches!(result, Err(TessellationError::InvalidCommunicationInfo(_))));
        }
    }

    #[test]
    fn test_mixed_modes_are_rejected() {
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            let tessellator = distributed(comm, DistributedOptions::new().build_communication_info(rank == 0));
            tessellator.set_communication_info(CommunicationInfo::all_to_all(rank, 2)?)?;
            tessellator.tessellate_domain(&[Generator::new(rank, [rank as f64, 0.0])])
        });
        for result in results {
            assert!(matches!(result, Err(TessellationError::InvalidCommunicationInfo(_))));
        }
    }

    #[test]
    fn test_communication_info_for_other_rank_is_rejected() {
        let mut world = Comm::world(2);
        let tessellator = distributed(world.remove(0), building());
        let info = CommunicationInfo::all_to_all(1, 2).unwrap();
        assert!(matches!(
            tessellator.set_communication_info(info),
            Err(TessellationError::InvalidCommunicationInfo(_))
        ));
        assert!(tessellator.communication_info().is_none());
    }

    #[test]
    fn test_built_info_is_cached() {
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            let tessellator = distributed(comm, building());
            let generators = [Generator::new(rank, [rank as f64, 0.0]), Generator::new(rank + 2, [rank as f64, 1.0])];
            tessellator.tessellate_domain(&generators)?;
            let info = tessellator.communication_info();
            tessellator.tessellate_domain(&generators)?;
            Ok::<_, TessellationError>((info, tessellator.communication_info()))
        });
        for (rank, result) in results.into_iter().enumerate() {
            let (first, second) = result.unwrap();
            assert_eq!(first, Some(CommunicationInfo::all_to_all(rank, 2).unwrap()));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_empty_world() {
        let results = run_domains(2, |comm: Comm| distributed(comm, building()).tessellate_domain(&[]));
        for result in results {
            let domain = result.unwrap();
            assert!(domain.cells.is_empty());
            assert!(domain.region.is_none());
        }
    }

    #[test]
    fn test_remote_failure() {
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            let x = if rank == 1 { f64::NAN } else { 0.0 };
            distributed(comm, building()).tessellate_domain(&[Generator::new(rank, [x, 0.0])])
        });
        assert!(matches!(results[0], Err(TessellationError::RemoteFailure { domain: 1, .. })));
        assert!(matches!(results[1], Err(TessellationError::InvalidGenerator { id: 1, .. })));
    }

    #[test]
    fn test_ownership_conflict() {
        let results = run_domains(2, |comm: Comm| {
            let rank = comm.rank();
            let x = rank as f64;
            let generators = [Generator::new(rank, [0.1 + 0.8 * x, 0.5]), Generator::new(5, [0.4 + 0.2 * x, 0.5])];
            distributed(comm, building()).tessellate_domain(&generators)
        });
        for result in results {
            assert_eq!(result.unwrap_err(), TessellationError::OwnershipConflict { id: 5, domains: (0, 1) });
        }
    }

    #[test]
    fn test_plc_support_follows_backend() {
        let results = run_domains(1, |comm: Comm| {
            let boxed = BoxTessellator2d::default();
            let tessellator = DistributedTessellator::with_options(SerialBackend::Borrowed(&boxed), comm, building());
            assert!(!tessellator.handles_plcs());
            assert!(!tessellator.assumes_control());
            assert_eq!(tessellator.name(), "DistributedBoxClipKernel2d");
            tessellator.tessellate_with_plc(&[Generator::new(0, [0.5, 0.5])], &Plc::rectangle(&BoundingBox::unit()))
        });
        assert_eq!(
            results[0].as_ref().unwrap_err(),
            &TessellationError::UnsupportedPlc { tessellator: "DistributedBoxClipKernel2d".into() }
        );
    }

    #[test]
    fn test_influence_halo_covers_twice_the_radius() {
        let generators = [Generator::new(0, [0.5, 0.5])];
        let cells = SerialTessellator2d::default().tessellate_in_box(&generators, &BoundingBox::unit()).unwrap();
        let halo = influence_halo(&generators, &cells, 0.0).unwrap();
        let reach = 2.0 * 0.5f64.sqrt();
        assert!((halo.min[0] - (0.5 - reach)).abs() < 1e-12);
        assert!((halo.max[1] - (0.5 + reach)).abs() < 1e-12);
    }
}
