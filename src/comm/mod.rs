//! Point to point messaging between the domains of a distributed tessellation.
//!
//! A [`Communicator`] is one domain's endpoint into a world of `size` domains. The
//! distributed tessellator only needs blocking, tagged, ordered point to point messages;
//! the collective helpers here are built on top of them.

mod local;

pub use local::{LocalCommunicator, run_domains};

use crate::error::CommunicationError;

/// Phase of the distributed protocol a message belongs to. Receiving a message with an
/// unexpected tag is a protocol error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Summary,
    Influence,
    Ghosts,
    Faces,
    Status,
}

pub trait Communicator<M>: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn send(&self, to: usize, tag: Tag, message: M) -> Result<(), CommunicationError>;

    /// Blocks until the next message from `from` arrives.
    fn recv(&self, from: usize, tag: Tag) -> Result<M, CommunicationError>;

    /// Tears down this endpoint so that peers blocked on it observe a failure instead of
    /// waiting forever. Later sends and receives fail with [`CommunicationError::Aborted`].
    fn abort(&self);
}

/// Sends `message` to every other domain and returns the message of every domain,
/// indexed by rank.
pub fn all_gather<M, C>(comm: &C, tag: Tag, message: M) -> Result<Vec<M>, CommunicationError>
where
    M: Clone,
    C: Communicator<M> + ?Sized,
{
    let rank = comm.rank();
    for peer in (0..comm.size()).filter(|&peer| peer != rank) {
        comm.send(peer, tag, message.clone())?;
    }
    (0..comm.size())
        .map(|peer| if peer == rank { Ok(message.clone()) } else { comm.recv(peer, tag) })
        .collect()
}

/// Sends one message to each listed peer, then receives one message back from each of
/// them, in the same order.
pub fn exchange<M, C>(comm: &C, tag: Tag, outgoing: Vec<(usize, M)>) -> Result<Vec<(usize, M)>, CommunicationError>
where
    C: Communicator<M> + ?Sized,
{
    let peers: Vec<usize> = outgoing.iter().map(|(peer, _)| *peer).collect();
    for (peer, message) in outgoing {
        comm.send(peer, tag, message)?;
    }
    peers.into_iter().map(|peer| comm.recv(peer, tag).map(|message| (peer, message))).collect()
}
