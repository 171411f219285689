#![cfg_attr(not(target_os = "linux"), allow(dead_code, unused_variables))]

use crate::descriptor::{LocalBuffer, MemoryDescriptor};
use crate::error::{Error, Result, TransferErrorKind};
use crate::process::RegionCatalog;

#[cfg(target_os = "linux")]
use nix::sys::uio::{RemoteIoVec, process_vm_readv, process_vm_writev};
#[cfg(target_os = "linux")]
use nix::unistd::Pid;
#[cfg(target_os = "linux")]
use std::io::{IoSlice, IoSliceMut};

/// Vectored access to another process's memory.
///
/// One call moves bytes between `local[i]` and `remote[i]` pairwise, in order.
/// Callers keep each call within the OS descriptor limit; see
/// [`BatchedTransfer`](crate::transfer::BatchedTransfer).
///
/// Like the kernel primitive, an implementation stops at the first span it
/// cannot access and reports the bytes moved so far. It fails only when
/// nothing could be moved.
pub trait VectoredMemory {
    /// Process ID of the target.
    fn pid(&self) -> i32;

    /// Copy `remote[i]` into `local[i]` for every pair.
    fn read_vectored(
        &self,
        local: &mut [LocalBuffer],
        remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind>;

    /// Copy `local[i]` into `remote[i]` for every pair.
    fn write_vectored(
        &self,
        local: &[LocalBuffer],
        remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind>;

    /// Check if the target is still running.
    fn is_alive(&self) -> bool {
        true
    }

    /// Current scannable regions of the target, read from its memory map.
    fn regions(&self, max_lines: usize) -> Result<RegionCatalog> {
        RegionCatalog::for_pid(self.pid(), max_lines)
    }
}

/// Live process accessed through `process_vm_readv` / `process_vm_writev`.
#[derive(Debug)]
pub struct ProcessMemory {
    pid: i32,
}

#[cfg(target_os = "linux")]
impl ProcessMemory {
    pub fn attach(pid: i32) -> Result<Self> {
        if pid <= 0 {
            return Err(Error::InvalidValue(format!("invalid pid {}", pid)));
        }
        Ok(Self { pid })
    }

    fn remote_iov(remote: &[MemoryDescriptor]) -> Vec<RemoteIoVec> {
        remote
            .iter()
            .map(|d| RemoteIoVec {
                base: d.address as usize,
                len: d.length,
            })
            .collect()
    }
}

#[cfg(target_os = "linux")]
impl VectoredMemory for ProcessMemory {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn read_vectored(
        &self,
        local: &mut [LocalBuffer],
        remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind> {
        let mut local_iov: Vec<IoSliceMut<'_>> = local
            .iter_mut()
            .map(|buffer| IoSliceMut::new(buffer))
            .collect();
        let remote_iov = Self::remote_iov(remote);

        process_vm_readv(Pid::from_raw(self.pid), &mut local_iov, &remote_iov)
            .map_err(TransferErrorKind::from)
    }

    fn write_vectored(
        &self,
        local: &[LocalBuffer],
        remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind> {
        let local_iov: Vec<IoSlice<'_>> = local.iter().map(|buffer| IoSlice::new(buffer)).collect();
        let remote_iov = Self::remote_iov(remote);

        process_vm_writev(Pid::from_raw(self.pid), &local_iov, &remote_iov)
            .map_err(TransferErrorKind::from)
    }

    fn is_alive(&self) -> bool {
        // Signal 0 performs only the existence and permission checks; EPERM still
        // means the process exists.
        !matches!(
            nix::sys::signal::kill(Pid::from_raw(self.pid), None),
            Err(nix::errno::Errno::ESRCH)
        )
    }
}

#[cfg(not(target_os = "linux"))]
impl ProcessMemory {
    pub fn attach(_pid: i32) -> Result<Self> {
        Err(Error::UnsupportedPlatform)
    }
}

#[cfg(not(target_os = "linux"))]
impl VectoredMemory for ProcessMemory {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn read_vectored(
        &self,
        _local: &mut [LocalBuffer],
        _remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind> {
        Err(TransferErrorKind::InvalidArguments)
    }

    fn write_vectored(
        &self,
        _local: &[LocalBuffer],
        _remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind> {
        Err(TransferErrorKind::InvalidArguments)
    }

    fn is_alive(&self) -> bool {
        false
    }
}
