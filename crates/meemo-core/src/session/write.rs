use tracing::{info, warn};

use crate::descriptor::{LocalBuffer, LocalList, MemoryDescriptor, RemoteList};
use crate::error::{Error, Result};
use crate::process::VectoredMemory;
use crate::scalar::ScalarValue;
use crate::transfer::BatchedTransfer;

use super::Session;

impl<M: VectoredMemory> Session<M> {
    /// Store `value` at the candidate with index `position`.
    ///
    /// Writes exactly the value's width at the candidate's address, in the
    /// target's native (little-endian) layout. The candidate set is not
    /// changed; the next search step reads the new value back.
    pub fn write(&self, position: usize, value: ScalarValue) -> Result<()> {
        let target = self.candidate(position)?;
        self.check_type(&value)?;

        let bytes = value.to_le_bytes();
        let width = bytes.len();

        let mut local = LocalList::with_capacity(1);
        local.append(LocalBuffer::from_bytes(&bytes)?)?;
        let mut remote = RemoteList::with_capacity(1);
        remote.append(MemoryDescriptor::new(target.address, width))?;

        let written = BatchedTransfer::new(&self.memory, self.config.batch_limit)
            .write(&local, &remote)?;

        if written != width {
            warn!(
                "Short write to PID {} at {:#x}: {} of {} bytes",
                self.pid(),
                target.address,
                written,
                width
            );
            return Err(Error::ShortWrite {
                address: target.address,
                expected: width,
                written,
            });
        }

        info!(
            "Wrote {} to [{}] at {:#x} in PID {}",
            value,
            position,
            target.address,
            self.pid()
        );
        Ok(())
    }
}
