//! Gather operations between ranks.
//!
//! The report only needs to collect values on rank 0, so the collective
//! interface is limited to fixed size and variable size gathers to root and a
//! barrier. [LocalComm] is a single rank, [ThreadComm] simulates ranks with
//! threads and channels, and `MpiCollective` runs over MPI with the `mpi` feature.

use std::sync::{
    mpsc::{channel, Receiver, Sender},
    Arc, Barrier,
};

use crate::error::{Error, Result};

/// Collective operations towards rank 0.
///
/// Every rank has to call the same operations in the same order. Gathered
/// sequences are ordered by rank.
pub trait Collective {
    /// Rank of this process.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Gather one value from every rank. `Some` on root, `None` elsewhere.
    fn gather_scalar(&self, value: u64) -> Result<Option<Vec<u64>>>;

    /// Gather a byte buffer of any length from every rank. `Some` on root, `None` elsewhere.
    fn gather_variable(&self, bytes: &[u8]) -> Result<Option<Vec<Vec<u8>>>>;

    /// Block until every rank arrived.
    fn barrier(&self) -> Result<()>;

    /// True on rank 0.
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Compute displacements from a vector of counts.
///
/// This is useful for varcount gather operations. Let
/// count [ 3, 4, 5]. Then the corresponding displacements are
/// [0, 3, 7]. Note that the last element `5` is ignored.
pub fn displacements(counts: &[i32]) -> Vec<i32> {
    counts
        .iter()
        .scan(0, |acc, &x| {
            let tmp = *acc;
            *acc += x;
            Some(tmp)
        })
        .collect()
}

/// A single process.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalComm;

impl Collective for LocalComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather_scalar(&self, value: u64) -> Result<Option<Vec<u64>>> {
        Ok(Some(vec![value]))
    }

    fn gather_variable(&self, bytes: &[u8]) -> Result<Option<Vec<Vec<u8>>>> {
        Ok(Some(vec![bytes.to_vec()]))
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }
}

/// One rank of a group of threads.
///
/// Every non-root rank owns a channel to rank 0, so messages of successive
/// gathers from one rank arrive in order.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    to_root: Option<Sender<Vec<u8>>>,
    from_ranks: Vec<Receiver<Vec<u8>>>,
    barrier: Arc<Barrier>,
}

impl ThreadComm {
    /// Create the communicators of a group of `size` ranks, ordered by rank.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a group needs at least one rank");

        let barrier = Arc::new(Barrier::new(size));
        let (senders, receivers): (Vec<_>, Vec<_>) = (1..size).map(|_| channel()).unzip();

        let mut comms = Vec::with_capacity(size);
        comms.push(ThreadComm {
            rank: 0,
            size,
            to_root: None,
            from_ranks: receivers,
            barrier: barrier.clone(),
        });
        for (index, sender) in senders.into_iter().enumerate() {
            comms.push(ThreadComm {
                rank: index + 1,
                size,
                to_root: Some(sender),
                from_ranks: Vec::new(),
                barrier: barrier.clone(),
            });
        }
        comms
    }

    /// Run `f` on `size` threads, one per rank, and return the results by rank.
    ///
    /// A panic on any rank is propagated.
    pub fn run<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ThreadComm) -> T + Sync,
    {
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = Self::group(size)
                .into_iter()
                .map(|comm| scope.spawn(move || f(comm)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        })
    }

    fn send_to_root(&self, message: Vec<u8>) -> Result<()> {
        match &self.to_root {
            Some(sender) => sender
                .send(message)
                .map_err(|_| Error::Transport(format!("rank {} lost its root", self.rank))),
            None => Err(Error::Transport("root cannot send to itself".to_string())),
        }
    }

    fn collect_at_root(&self, own: Vec<u8>) -> Result<Vec<Vec<u8>>> {
        let mut messages = Vec::with_capacity(self.size);
        messages.push(own);
        for (index, receiver) in self.from_ranks.iter().enumerate() {
            let message = receiver
                .recv()
                .map_err(|_| Error::Transport(format!("rank {} hung up", index + 1)))?;
            messages.push(message);
        }
        Ok(messages)
    }
}

impl Collective for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn gather_scalar(&self, value: u64) -> Result<Option<Vec<u64>>> {
        let bytes = value.to_le_bytes().to_vec();
        if !self.is_root() {
            self.send_to_root(bytes)?;
            return Ok(None);
        }

        self.collect_at_root(bytes)?
            .into_iter()
            .map(|message| {
                <[u8; 8]>::try_from(message.as_slice())
                    .map(u64::from_le_bytes)
                    .map_err(|_| {
                        Error::Transport(format!("scalar of {} bytes", message.len()))
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn gather_variable(&self, bytes: &[u8]) -> Result<Option<Vec<Vec<u8>>>> {
        if !self.is_root() {
            self.send_to_root(bytes.to_vec())?;
            return Ok(None);
        }
        self.collect_at_root(bytes.to_vec()).map(Some)
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }
}

#[cfg(feature = "mpi")]
pub use mpi_backend::MpiCollective;

#[cfg(feature = "mpi")]
mod mpi_backend {
    use mpi::{
        datatype::PartitionMut,
        traits::{Communicator, CommunicatorCollectives, Root},
    };

    use super::{displacements, Collective};
    use crate::error::{Error, Result};

    /// Collective operations over an MPI communicator.
    pub struct MpiCollective<'c, C: CommunicatorCollectives> {
        comm: &'c C,
    }

    impl<'c, C: CommunicatorCollectives> MpiCollective<'c, C> {
        /// Wrap a communicator.
        pub fn new(comm: &'c C) -> Self {
            Self { comm }
        }
    }

    impl<C: CommunicatorCollectives> Collective for MpiCollective<'_, C> {
        fn rank(&self) -> usize {
            self.comm.rank() as usize
        }

        fn size(&self) -> usize {
            self.comm.size() as usize
        }

        fn gather_scalar(&self, value: u64) -> Result<Option<Vec<u64>>> {
            let root_process = self.comm.process_at_rank(0);

            if self.comm.rank() == 0 {
                let mut values = vec![0_u64; self.size()];
                root_process.gather_into_root(&value, &mut values[..]);
                Ok(Some(values))
            } else {
                root_process.gather_into(&value);
                Ok(None)
            }
        }

        fn gather_variable(&self, bytes: &[u8]) -> Result<Option<Vec<Vec<u8>>>> {
            let n = i32::try_from(bytes.len())
                .map_err(|_| Error::Transport(format!("buffer of {} bytes", bytes.len())))?;
            let root_process = self.comm.process_at_rank(0);

            // We first communicate the length of the buffer to root.

            if self.comm.rank() == 0 {
                let mut counts = vec![0_i32; self.size()];
                root_process.gather_into_root(&n, &mut counts[..]);

                let displs = displacements(&counts);
                let total = counts.iter().map(|&c| c as usize).sum::<usize>();
                let mut buffer = vec![0_u8; total];

                {
                    let mut partition = PartitionMut::new(&mut buffer[..], &counts[..], &displs[..]);
                    root_process.gather_varcount_into_root(bytes, &mut partition);
                }

                let mut messages = Vec::with_capacity(counts.len());
                for (&count, &displ) in counts.iter().zip(&displs) {
                    let start = displ as usize;
                    messages.push(buffer[start..start + count as usize].to_vec());
                }
                Ok(Some(messages))
            } else {
                root_process.gather_into(&n);
                root_process.gather_varcount_into(bytes);
                Ok(None)
            }
        }

        fn barrier(&self) -> Result<()> {
            self.comm.barrier();
            Ok(())
        }
    }
}
