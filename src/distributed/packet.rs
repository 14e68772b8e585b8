use crate::bounds::BoundingBox;
use crate::comm::Tag;
use crate::error::CommunicationError;
use crate::generator::Generator;

/// What each domain publishes in the opening gather.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainSummary<const D: usize> {
    /// Bounds of the owned generators, `None` for a domain without generators.
    pub bounds: Option<BoundingBox<D>>,
    pub count: usize,
    pub fingerprint: u64,
    pub plc_fingerprint: Option<u64>,
    /// The box passed to a box bounded tessellation.
    pub requested_box: Option<BoundingBox<D>>,
    /// Why the local input was rejected.
    pub failure: Option<String>,
}

/// The region within which a domain's cells can be affected by foreign generators.
#[derive(Clone, Debug, PartialEq)]
pub struct Influence<const D: usize> {
    pub halo: Option<BoundingBox<D>>,
    /// Neighbor ranks supplied by the caller, `None` when the domain builds them.
    pub neighbors: Option<Vec<usize>>,
    pub failure: Option<String>,
}

/// A face between an owned cell and the cell of a generator owned by another domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SharedFace<const D: usize> {
    /// Id of the owned generator.
    pub cell: usize,
    /// Id of the foreign generator.
    pub neighbor: usize,
    pub measure: f64,
    pub centroid: [f64; D],
}

/// Message exchanged between domains of a distributed tessellation.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet<const D: usize> {
    Summary(DomainSummary<D>),
    Influence(Influence<D>),
    Ghosts(Vec<Generator<D>>),
    /// Shared faces seen from the sender, or why the sender could not produce them.
    Faces(Result<Vec<SharedFace<D>>, String>),
    Status(Option<String>),
}

impl<const D: usize> Packet<D> {
    pub fn tag(&self) -> Tag {
        match self {
            Packet::Summary(_) => Tag::Summary,
            Packet::Influence(_) => Tag::Influence,
            Packet::Ghosts(_) => Tag::Ghosts,
            Packet::Faces(_) => Tag::Faces,
            Packet::Status(_) => Tag::Status,
        }
    }
}

fn mismatch<const D: usize>(peer: usize, expected: Tag, packet: &Packet<D>) -> CommunicationError {
    CommunicationError::Protocol { peer, expected, received: packet.tag() }
}

pub(crate) fn into_summary<const D: usize>(peer: usize, packet: Packet<D>) -> Result<DomainSummary<D>, CommunicationError> {
    match packet {
        Packet::Summary(summary) => Ok(summary),
        other => Err(mismatch(peer, Tag::Summary, &other)),
    }
}

pub(crate) fn into_influence<const D: usize>(peer: usize, packet: Packet<D>) -> Result<Influence<D>, CommunicationError> {
    match packet {
        Packet::Influence(influence) => Ok(influence),
        other => Err(mismatch(peer, Tag::Influence, &other)),
    }
}

pub(crate) fn into_ghosts<const D: usize>(peer: usize, packet: Packet<D>) -> Result<Vec<Generator<D>>, CommunicationError> {
    match packet {
        Packet::Ghosts(ghosts) => Ok(ghosts),
        other => Err(mismatch(peer, Tag::Ghosts, &other)),
    }
}

pub(crate) fn into_faces<const D: usize>(
    peer: usize,
    packet: Packet<D>,
) -> Result<Result<Vec<SharedFace<D>>, String>, CommunicationError> {
    match packet {
        Packet::Faces(faces) => Ok(faces),
        other => Err(mismatch(peer, Tag::Faces, &other)),
    }
}

pub(crate) fn into_status<const D: usize>(peer: usize, packet: Packet<D>) -> Result<Option<String>, CommunicationError> {
    match packet {
        Packet::Status(status) => Ok(status),
        other => Err(mismatch(peer, Tag::Status, &other)),
    }
}
