//! Batched bulk transfers.
//!
//! The OS accepts at most a fixed number of descriptors per
//! `process_vm_readv` / `process_vm_writev` call. [`BatchedTransfer`] splits
//! parallel descriptor lists into chunks of at most that size, issues one call
//! per chunk in order, and sums the byte counts.
//!
//! Within a chunk the OS fills descriptors in order, so a short chunk moves a
//! prefix of its spans. Reads report the bytes each descriptor received so the
//! caller never treats an unread tail as target memory.
//!
//! A failing chunk ends the transfer. Bytes moved by earlier chunks stay
//! moved; the error reports how many there were.

use tracing::debug;

use crate::config::transfer::BATCH_LIMIT;
use crate::descriptor::{LocalList, MemoryDescriptor, RemoteList};
use crate::error::{Error, Result, TransferErrorKind};
use crate::process::VectoredMemory;

/// Chunked transfers against one target.
///
/// Borrows the target for its lifetime and the descriptor lists only for the
/// duration of one call.
pub struct BatchedTransfer<'a, M: VectoredMemory + ?Sized> {
    memory: &'a M,
    batch_limit: usize,
}

impl<'a, M: VectoredMemory + ?Sized> BatchedTransfer<'a, M> {
    /// Create a transfer with the given per-call descriptor limit (at least 1).
    pub fn new(memory: &'a M, batch_limit: usize) -> Self {
        Self {
            memory,
            batch_limit: batch_limit.max(1),
        }
    }

    /// Create a transfer with the default limit.
    pub fn with_default_limit(memory: &'a M) -> Self {
        Self::new(memory, BATCH_LIMIT)
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Copy every remote span into the parallel local buffer.
    ///
    /// Returns the bytes received by each descriptor, in list order. Only that
    /// prefix of each local buffer holds target memory.
    pub fn read(&self, local: &mut LocalList, remote: &RemoteList) -> Result<Vec<usize>> {
        check_parallel(local, remote)?;

        let chunks = local
            .items_mut()
            .chunks_mut(self.batch_limit)
            .zip(remote.items().chunks(self.batch_limit));
        self.run("read", chunks, |local, remote| {
            self.memory.read_vectored(local, remote)
        })
    }

    /// Copy every local buffer into the parallel remote span.
    ///
    /// Returns the total bytes written.
    pub fn write(&self, local: &LocalList, remote: &RemoteList) -> Result<usize> {
        check_parallel(local, remote)?;

        let chunks = local
            .items()
            .chunks(self.batch_limit)
            .zip(remote.items().chunks(self.batch_limit));
        let filled = self.run("write", chunks, |local, remote| {
            self.memory.write_vectored(local, remote)
        })?;
        Ok(filled.iter().sum())
    }

    fn run<'r, L, I, F>(&self, direction: &str, chunks: I, mut call: F) -> Result<Vec<usize>>
    where
        I: Iterator<Item = (L, &'r [MemoryDescriptor])>,
        F: FnMut(L, &[MemoryDescriptor]) -> std::result::Result<usize, TransferErrorKind>,
    {
        let pid = self.memory.pid();
        let mut filled = Vec::new();
        let mut total = 0;
        let mut calls = 0;

        for (local, remote) in chunks {
            let requested: usize = remote.iter().map(|d| d.length).sum();
            let count = remote.len();

            match call(local, remote) {
                Ok(moved) => {
                    if moved < requested {
                        debug!(
                            "Short {} from PID {}: {} of {} bytes in chunk {} ({} descriptors)",
                            direction, pid, moved, requested, calls, count
                        );
                    }
                    filled.try_reserve(count)?;
                    let mut left = moved;
                    filled.extend(remote.iter().map(|d| {
                        let received = left.min(d.length);
                        left -= received;
                        received
                    }));
                    total += moved;
                    calls += 1;
                }
                Err(kind) => {
                    debug!(
                        "{} chunk {} for PID {} failed: {} ({} bytes moved before it)",
                        direction, calls, pid, kind, total
                    );
                    return Err(Error::transfer(kind, total));
                }
            }
        }

        debug!(
            "Batched {} for PID {}: {} bytes in {} calls",
            direction, pid, total, calls
        );
        Ok(filled)
    }
}

fn check_parallel(local: &LocalList, remote: &RemoteList) -> Result<()> {
    let parallel = local.len() == remote.len()
        && local
            .descriptors()
            .zip(remote.descriptors())
            .all(|(l, r)| l.length == r.length);

    if parallel {
        Ok(())
    } else {
        Err(Error::transfer(TransferErrorKind::InvalidArguments, 0))
    }
}
