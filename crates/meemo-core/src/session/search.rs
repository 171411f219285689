//! Narrowing search step.
//!
//! One step pulls every current candidate into a fresh local buffer, scans the
//! bytes actually read for the value at every byte offset, and collects each
//! hit as a candidate exactly one value wide. The step then either advances to the new
//! candidate set or rolls back to the current one.
//!
//! ```text
//! Idle(n) -> Scanning -> Advanced(n + 1)   hits found
//!                     -> RolledBack(n)     no hits, or an error
//! ```

use tracing::{debug, info, warn};

use crate::descriptor::{LocalBuffer, LocalList, MemoryDescriptor, RemoteList};
use crate::error::Result;
use crate::process::VectoredMemory;
use crate::scalar::{Comparator, ScalarValue};
use crate::transfer::BatchedTransfer;

use super::Session;

/// Result of one search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The candidate set was replaced by `found` narrower candidates.
    Advanced { generation: u32, found: usize },
    /// Nothing matched; the candidate set is unchanged.
    RolledBack { generation: u32 },
}

impl StepOutcome {
    pub fn found(&self) -> usize {
        match self {
            Self::Advanced { found, .. } => *found,
            Self::RolledBack { .. } => 0,
        }
    }

    pub fn generation(&self) -> u32 {
        match self {
            Self::Advanced { generation, .. } | Self::RolledBack { generation } => *generation,
        }
    }
}

impl<M: VectoredMemory> Session<M> {
    /// Run one narrowing step and return the number of candidates found.
    ///
    /// Zero means nothing matched and the session stayed on its generation.
    pub fn search(&mut self, value: ScalarValue) -> Result<usize> {
        Ok(self.step(value)?.found())
    }

    /// Run one narrowing step.
    ///
    /// On error the session rolls back to the current generation and the
    /// error is returned.
    pub fn step(&mut self, value: ScalarValue) -> Result<StepOutcome> {
        self.check_type(&value)?;
        debug!(
            "Generation {}: scanning {} candidates ({} bytes) for {}",
            self.generation,
            self.remote.len(),
            self.remote.total_length(),
            value
        );

        let next = match self.pull().and_then(|filled| self.narrow(&value, &filled)) {
            Ok(next) => next,
            Err(e) => {
                warn!("Search step failed, keeping generation {}: {}", self.generation, e);
                self.rollback();
                return Err(e);
            }
        };

        if next.is_empty() {
            info!(
                "No match for {}, keeping generation {} ({} candidates)",
                value,
                self.generation,
                self.remote.len()
            );
            self.rollback();
            return Ok(StepOutcome::RolledBack {
                generation: self.generation,
            });
        }

        Ok(self.advance(next, value))
    }

    /// Fill the local list with one buffer per candidate and read them in.
    ///
    /// Returns the bytes received by each buffer.
    fn pull(&mut self) -> Result<Vec<usize>> {
        for descriptor in self.remote.iter() {
            self.local.append(LocalBuffer::zeroed(descriptor.length)?)?;
        }

        let filled = BatchedTransfer::new(&self.memory, self.config.batch_limit)
            .read(&mut self.local, &self.remote)?;
        let read: usize = filled.iter().sum();
        debug!("Pulled {} bytes from PID {}", read, self.memory.pid());
        Ok(filled)
    }

    /// Collect every hit in the received bytes as a candidate one value wide.
    ///
    /// Candidates that received nothing drop out of the next generation.
    fn narrow(&self, value: &ScalarValue, filled: &[usize]) -> Result<RemoteList> {
        let comparator = Comparator::new(value);
        let width = comparator.width();
        let mut next = RemoteList::with_capacity(self.config.initial_capacity);

        let spans = self.local.iter().zip(self.remote.iter()).zip(filled);
        for ((buffer, region), &received) in spans {
            if received < region.length {
                debug!(
                    "Only {} of {} bytes read at {:#x}",
                    received, region.length, region.address
                );
            }
            for offset in comparator.scan(&buffer[..received]) {
                next.append(MemoryDescriptor::new(region.address + offset as u64, width))?;
            }
        }
        Ok(next)
    }

    fn rollback(&mut self) {
        self.local = LocalList::with_capacity(self.remote.len());
    }

    fn advance(&mut self, next: RemoteList, value: ScalarValue) -> StepOutcome {
        self.remote = next;
        self.local = LocalList::with_capacity(self.remote.len());
        self.generation += 1;
        self.last_value = Some(value);

        info!(
            "Generation {}: {} candidates match {}",
            self.generation,
            self.remote.len(),
            value
        );
        StepOutcome::Advanced {
            generation: self.generation,
            found: self.remote.len(),
        }
    }
}
