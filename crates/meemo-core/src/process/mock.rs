//! Mock target process for testing
//!
//! Provides an in-memory implementation of the VectoredMemory trait so the
//! catalog, transfer, and search logic can be exercised without attaching to a
//! real process.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::io::Cursor;

use crate::descriptor::{LocalBuffer, MemoryDescriptor};
use crate::error::{Result, TransferErrorKind};
use crate::process::{RegionCatalog, VectoredMemory};

#[derive(Debug, Clone)]
struct MockRegion {
    base: u64,
    data: Vec<u8>,
    permissions: String,
}

impl MockRegion {
    fn contains(&self, address: u64, length: usize) -> bool {
        address >= self.base
            && address
                .checked_add(length as u64)
                .is_some_and(|end| end <= self.base + self.data.len() as u64)
    }
}

/// Mock target process
///
/// Holds a set of regions at fixed base addresses. Transfers follow the
/// kernel's partial-transfer rules: they stop at the first span outside every
/// region and fail only if nothing was moved. Every call's descriptor count is
/// recorded.
#[derive(Debug)]
pub struct MockProcess {
    pid: i32,
    regions: RefCell<Vec<MockRegion>>,
    read_calls: RefCell<Vec<usize>>,
    write_calls: RefCell<Vec<usize>>,
    fail_read_call: Option<(usize, TransferErrorKind)>,
    fail_write_call: Option<(usize, TransferErrorKind)>,
    alive: bool,
}

impl MockProcess {
    /// Descriptor counts of every read call, in order.
    pub fn read_calls(&self) -> Vec<usize> {
        self.read_calls.borrow().clone()
    }

    /// Descriptor counts of every write call, in order.
    pub fn write_calls(&self) -> Vec<usize> {
        self.write_calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.read_calls.borrow_mut().clear();
        self.write_calls.borrow_mut().clear();
    }

    /// Read bytes directly, bypassing the vectored interface.
    pub fn peek(&self, address: u64, length: usize) -> Option<Vec<u8>> {
        let regions = self.regions.borrow();
        let region = regions.iter().find(|r| r.contains(address, length))?;
        let offset = (address - region.base) as usize;
        Some(region.data[offset..offset + length].to_vec())
    }

    /// Write bytes directly, bypassing the vectored interface.
    pub fn poke(&self, address: u64, bytes: &[u8]) -> bool {
        let mut regions = self.regions.borrow_mut();
        match regions.iter_mut().find(|r| r.contains(address, bytes.len())) {
            Some(region) => {
                let offset = (address - region.base) as usize;
                region.data[offset..offset + bytes.len()].copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    pub fn poke_u32(&self, address: u64, value: u32) -> bool {
        self.poke(address, &value.to_le_bytes())
    }

    /// Render the regions as a `/proc/<pid>/maps` listing.
    pub fn maps_listing(&self) -> String {
        let mut listing = String::new();
        for region in self.regions.borrow().iter() {
            let _ = writeln!(
                listing,
                "{:x}-{:x} {} 00000000 00:00 0",
                region.base,
                region.base + region.data.len() as u64,
                region.permissions
            );
        }
        listing
    }

    fn injected_failure(
        &self,
        calls: &RefCell<Vec<usize>>,
        fail: Option<(usize, TransferErrorKind)>,
        count: usize,
    ) -> Option<TransferErrorKind> {
        let mut calls = calls.borrow_mut();
        let index = calls.len();
        calls.push(count);
        match fail {
            Some((fail_index, kind)) if fail_index == index => Some(kind),
            _ => None,
        }
    }
}

impl VectoredMemory for MockProcess {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn read_vectored(
        &self,
        local: &mut [LocalBuffer],
        remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind> {
        if let Some(kind) = self.injected_failure(&self.read_calls, self.fail_read_call, remote.len())
        {
            return Err(kind);
        }
        if !self.alive {
            return Err(TransferErrorKind::NoSuchProcess);
        }

        let mut moved = 0;
        for (buffer, span) in local.iter_mut().zip(remote) {
            let length = buffer.len().min(span.length);
            match self.peek(span.address, length) {
                Some(bytes) => {
                    buffer[..length].copy_from_slice(&bytes);
                    moved += length;
                }
                None if moved == 0 => return Err(TransferErrorKind::AccessDenied),
                None => break,
            }
        }
        Ok(moved)
    }

    fn write_vectored(
        &self,
        local: &[LocalBuffer],
        remote: &[MemoryDescriptor],
    ) -> std::result::Result<usize, TransferErrorKind> {
        if let Some(kind) =
            self.injected_failure(&self.write_calls, self.fail_write_call, remote.len())
        {
            return Err(kind);
        }
        if !self.alive {
            return Err(TransferErrorKind::NoSuchProcess);
        }

        let mut moved = 0;
        for (buffer, span) in local.iter().zip(remote) {
            let length = buffer.len().min(span.length);
            if self.poke(span.address, &buffer[..length]) {
                moved += length;
            } else if moved == 0 {
                return Err(TransferErrorKind::AccessDenied);
            } else {
                break;
            }
        }
        Ok(moved)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn regions(&self, max_lines: usize) -> Result<RegionCatalog> {
        RegionCatalog::parse(Cursor::new(self.maps_listing()), max_lines)
    }
}

/// Builder for creating mock target processes
///
/// Provides a fluent API for laying out regions and seeding values.
#[derive(Debug, Clone)]
pub struct MockProcessBuilder {
    pid: i32,
    regions: Vec<MockRegion>,
    fail_read_call: Option<(usize, TransferErrorKind)>,
    fail_write_call: Option<(usize, TransferErrorKind)>,
    alive: bool,
}

impl Default for MockProcessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessBuilder {
    /// Create a new builder with PID 4242 and no regions
    pub fn new() -> Self {
        Self {
            pid: 4242,
            regions: Vec::new(),
            fail_read_call: None,
            fail_write_call: None,
            alive: true,
        }
    }

    pub fn pid(mut self, pid: i32) -> Self {
        self.pid = pid;
        self
    }

    /// Add a zeroed read-write region
    pub fn region(self, base: u64, size: usize) -> Self {
        self.region_with_permissions(base, size, "rw-p")
    }

    /// Add a zeroed region with the given permission string
    pub fn region_with_permissions(mut self, base: u64, size: usize, permissions: &str) -> Self {
        self.regions.push(MockRegion {
            base,
            data: vec![0; size],
            permissions: permissions.to_string(),
        });
        self
    }

    /// Write raw bytes at an absolute address inside an existing region
    pub fn write_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        if let Some(region) = self
            .regions
            .iter_mut()
            .find(|r| r.contains(address, bytes.len()))
        {
            let offset = (address - region.base) as usize;
            region.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self
    }

    /// Write an unsigned 32-bit integer at an absolute address
    pub fn write_u32(self, address: u64, value: u32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Write a signed 32-bit integer at an absolute address
    pub fn write_i32(self, address: u64, value: i32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Write an unsigned 64-bit integer at an absolute address
    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Fail the read call with the given index (0-based)
    pub fn fail_read_call(mut self, index: usize, kind: TransferErrorKind) -> Self {
        self.fail_read_call = Some((index, kind));
        self
    }

    /// Fail the write call with the given index (0-based)
    pub fn fail_write_call(mut self, index: usize, kind: TransferErrorKind) -> Self {
        self.fail_write_call = Some((index, kind));
        self
    }

    /// Simulate an exited process
    pub fn exited(mut self) -> Self {
        self.alive = false;
        self
    }

    pub fn build(self) -> MockProcess {
        MockProcess {
            pid: self.pid,
            regions: RefCell::new(self.regions),
            read_calls: RefCell::new(Vec::new()),
            write_calls: RefCell::new(Vec::new()),
            fail_read_call: self.fail_read_call,
            fail_write_call: self.fail_write_call,
            alive: self.alive,
        }
    }
}
