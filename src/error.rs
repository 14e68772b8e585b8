use thiserror::Error;

use crate::comm::Tag;

pub type Result<T> = std::result::Result<T, TessellationError>;

/// Failures of the point to point transport between domains.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommunicationError {
    #[error("domain {peer} disconnected")]
    Disconnected { peer: usize },
    #[error("timed out waiting for domain {peer}")]
    Timeout { peer: usize },
    #[error("communicator was aborted")]
    Aborted,
    #[error("protocol mismatch with domain {peer}: expected {expected:?}, received {received:?}")]
    Protocol {
        peer: usize,
        expected: Tag,
        received: Tag,
    },
    #[error("rank {rank} is not a peer in a world of {size} domains")]
    InvalidRank { rank: usize, size: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TessellationError {
    #[error("{tessellator} does not handle PLC boundaries")]
    UnsupportedPlc { tessellator: String },

    #[error("generators {first} and {second} coincide within the tessellator degeneracy")]
    DegenerateGenerators { first: usize, second: usize },

    #[error("generator id {id} appears more than once")]
    DuplicateGeneratorId { id: usize },

    #[error("generator {id} is invalid: {reason}")]
    InvalidGenerator { id: usize, reason: String },

    #[error("generator {id} lies outside the tessellation region")]
    GeneratorOutsideRegion { id: usize },

    #[error("invalid bounding box: {0}")]
    InvalidBounds(String),

    #[error("invalid PLC: {0}")]
    InvalidPlc(String),

    #[error("generator {id} is owned by both domain {} and domain {}", domains.0, domains.1)]
    OwnershipConflict { id: usize, domains: (usize, usize) },

    #[error("domain {domain}: face between cell {cell} and cell {neighbor} does not match: {reason}")]
    InconsistentTopology {
        domain: usize,
        cell: usize,
        neighbor: usize,
        reason: String,
    },

    #[error("communication info was not supplied and building it is disabled")]
    MissingCommunicationInfo,

    #[error("invalid communication info: {0}")]
    InvalidCommunicationInfo(String),

    #[error("domain {domain} failed: {reason}")]
    RemoteFailure { domain: usize, reason: String },

    #[error(transparent)]
    Communication(#[from] CommunicationError),
}
