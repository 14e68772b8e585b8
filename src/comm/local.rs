use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::comm::{Communicator, Tag};
use crate::error::CommunicationError;

type Envelope<M> = (Tag, M);

/// In-process communicator: one channel per ordered pair of domains.
///
/// Dropping or aborting an endpoint closes its outgoing channels, so peers waiting on it
/// fail with [`CommunicationError::Disconnected`] rather than blocking.
pub struct LocalCommunicator<M> {
    rank: usize,
    size: usize,
    senders: RwLock<Vec<Option<Sender<Envelope<M>>>>>,
    receivers: Vec<Option<Mutex<Receiver<Envelope<M>>>>>,
    aborted: AtomicBool,
    timeout: Option<Duration>,
}

impl<M: Send> LocalCommunicator<M> {
    /// A fully connected world of `size` endpoints, indexed by rank.
    pub fn world(size: usize) -> Vec<Self> {
        let mut senders: Vec<Vec<Option<Sender<Envelope<M>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Mutex<Receiver<Envelope<M>>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for from in 0..size {
            for to in (0..size).filter(|&to| to != from) {
                let (tx, rx) = mpsc::channel();
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(Mutex::new(rx));
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| LocalCommunicator {
                rank,
                size,
                senders: RwLock::new(senders),
                receivers,
                aborted: AtomicBool::new(false),
                timeout: None,
            })
            .collect()
    }

    /// Fail receives with [`CommunicationError::Timeout`] after waiting `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommunicationError> {
        if self.aborted.load(Ordering::Acquire) {
            return Err(CommunicationError::Aborted);
        }
        if peer >= self.size || peer == self.rank {
            return Err(CommunicationError::InvalidRank { rank: peer, size: self.size });
        }
        Ok(())
    }
}

impl<M: Send> Communicator<M> for LocalCommunicator<M> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, to: usize, tag: Tag, message: M) -> Result<(), CommunicationError> {
        self.check_peer(to)?;
        let senders = self.senders.read().map_err(|_| CommunicationError::Aborted)?;
        let sender = senders[to].as_ref().ok_or(CommunicationError::Aborted)?;
        sender.send((tag, message)).map_err(|_| CommunicationError::Disconnected { peer: to })
    }

    fn recv(&self, from: usize, tag: Tag) -> Result<M, CommunicationError> {
        self.check_peer(from)?;
        let receiver = self.receivers[from].as_ref().ok_or(CommunicationError::InvalidRank { rank: from, size: self.size })?;
        let receiver = receiver.lock().map_err(|_| CommunicationError::Aborted)?;
        let (received, message) = match self.timeout {
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => CommunicationError::Timeout { peer: from },
                RecvTimeoutError::Disconnected => CommunicationError::Disconnected { peer: from },
            })?,
            None => receiver.recv().map_err(|_| CommunicationError::Disconnected { peer: from })?,
        };
        if received != tag {
            return Err(CommunicationError::Protocol { peer: from, expected: tag, received });
        }
        Ok(message)
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        if let Ok(mut senders) = self.senders.write() {
            senders.iter_mut().for_each(|sender| *sender = None);
        }
    }
}

impl<M> std::fmt::Debug for LocalCommunicator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("aborted", &self.aborted.load(Ordering::Relaxed))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Runs `f` once per domain of a fresh local world, each on its own scoped thread, and
/// returns the results indexed by rank.
///
/// Domains block on each other, so they get dedicated threads rather than pool tasks.
/// A panic in any domain is resumed on the calling thread.
pub fn run_domains<M, R, F>(size: usize, f: F) -> Vec<R>
where
    M: Send,
    R: Send,
    F: Fn(LocalCommunicator<M>) -> R + Sync,
{
    let world = LocalCommunicator::world(size);
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = world.into_iter().map(|comm| scope.spawn(move || f(comm))).collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
            .collect()
    })
}
