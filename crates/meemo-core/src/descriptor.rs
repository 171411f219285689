//! Descriptor lists.
//!
//! A [`DescriptorList`] is an ordered, growable list of memory spans. Whether
//! the list owns the memory it describes is part of its type:
//!
//! - [`RemoteList`] holds [`MemoryDescriptor`]s naming spans inside the target
//!   process. Dropping it releases nothing in the target.
//! - [`LocalList`] holds [`LocalBuffer`]s, scratch allocations owned by the
//!   list. Dropping it releases each buffer exactly once.
//!
//! Capacity grows by doubling from the initial capacity, and growth is
//! fallible so an allocation failure surfaces as [`Error::Allocation`].

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An `(address, length)` span.
///
/// The address is an opaque integer. It is only meaningful to the process
/// whose memory it names and is never dereferenced outside the transfer
/// primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryDescriptor {
    pub address: u64,
    pub length: usize,
}

impl MemoryDescriptor {
    pub fn new(address: u64, length: usize) -> Self {
        Self { address, length }
    }

    /// Exclusive end address.
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.length as u64)
    }
}

impl fmt::Display for MemoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base: {:#x} Len: {}", self.address, self.length)
    }
}

/// A locally allocated scratch buffer.
pub struct LocalBuffer(Box<[u8]>);

impl LocalBuffer {
    /// Allocate `len` zeroed bytes, reporting allocation failure as an error.
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len)?;
        bytes.resize(len, 0);
        Ok(Self(bytes.into_boxed_slice()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buffer = Self::zeroed(bytes.len())?;
        buffer.copy_from_slice(bytes);
        Ok(buffer)
    }

    /// Descriptor of this buffer in the local address space.
    pub fn descriptor(&self) -> MemoryDescriptor {
        MemoryDescriptor::new(self.0.as_ptr() as usize as u64, self.0.len())
    }
}

impl Deref for LocalBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for LocalBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl fmt::Debug for LocalBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBuffer")
            .field("len", &self.0.len())
            .finish()
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Ownership tag of a [`DescriptorList`].
pub trait Ownership: sealed::Sealed {
    type Item;

    fn descriptor(item: &Self::Item) -> MemoryDescriptor;
}

/// Spans borrowed from the target process.
#[derive(Debug)]
pub enum Remote {}

/// Buffers owned by the local process.
#[derive(Debug)]
pub enum LocalOwned {}

impl sealed::Sealed for Remote {}
impl sealed::Sealed for LocalOwned {}

impl Ownership for Remote {
    type Item = MemoryDescriptor;

    fn descriptor(item: &MemoryDescriptor) -> MemoryDescriptor {
        *item
    }
}

impl Ownership for LocalOwned {
    type Item = LocalBuffer;

    fn descriptor(item: &LocalBuffer) -> MemoryDescriptor {
        item.descriptor()
    }
}

pub type RemoteList = DescriptorList<Remote>;
pub type LocalList = DescriptorList<LocalOwned>;

/// Ordered list of spans with doubling growth.
pub struct DescriptorList<K: Ownership> {
    items: Vec<K::Item>,
    capacity: usize,
}

impl<K: Ownership> DescriptorList<K> {
    /// Create an empty list with logical capacity `capacity`.
    ///
    /// Allocates nothing; storage is reserved fallibly by the first `append`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Append an item, doubling the capacity when the list is full.
    ///
    /// Never called while a transfer borrows the list, so existing items are
    /// not moved under an in-flight call.
    pub fn append(&mut self, item: K::Item) -> Result<()> {
        if self.items.len() == self.capacity {
            self.capacity = if self.capacity == 0 {
                1
            } else {
                self.capacity.checked_mul(2).ok_or_else(|| {
                    Error::Allocation("descriptor list capacity overflow".to_string())
                })?
            };
        }
        if self.items.len() == self.items.capacity() {
            self.items.try_reserve_exact(self.capacity - self.items.len())?;
        }
        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Logical capacity under the doubling policy.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&K::Item> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, K::Item> {
        self.items.iter()
    }

    pub fn items(&self) -> &[K::Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [K::Item] {
        &mut self.items
    }

    pub fn descriptors(&self) -> impl Iterator<Item = MemoryDescriptor> + '_ {
        self.items.iter().map(K::descriptor)
    }

    /// Total bytes spanned by all items.
    pub fn total_length(&self) -> usize {
        self.descriptors().map(|d| d.length).sum()
    }
}

impl LocalList {
    /// Allocate one zeroed buffer per remote span, each of matching length.
    pub fn mirror(remote: &RemoteList) -> Result<Self> {
        let mut local = Self::with_capacity(remote.len());
        for descriptor in remote.iter() {
            local.append(LocalBuffer::zeroed(descriptor.length)?)?;
        }
        Ok(local)
    }
}

impl From<Vec<MemoryDescriptor>> for RemoteList {
    fn from(items: Vec<MemoryDescriptor>) -> Self {
        let capacity = items.len();
        Self { items, capacity }
    }
}

impl Clone for RemoteList {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            capacity: self.capacity,
        }
    }
}

impl<K: Ownership> fmt::Debug for DescriptorList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorList")
            .field("len", &self.items.len())
            .field("capacity", &self.capacity)
            .field("items", &self.descriptors().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a, K: Ownership> IntoIterator for &'a DescriptorList<K> {
    type Item = &'a K::Item;
    type IntoIter = std::slice::Iter<'a, K::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_within_capacity() {
        let mut list = RemoteList::with_capacity(4);
        list.append(MemoryDescriptor::new(0x1000, 16)).unwrap();
        list.append(MemoryDescriptor::new(0x2000, 32)).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.capacity(), 4);
        assert_eq!(list.get(1), Some(&MemoryDescriptor::new(0x2000, 32)));
        assert_eq!(list.total_length(), 48);
    }

    #[test]
    fn test_growth_doubles_from_initial_capacity() {
        let mut list = RemoteList::with_capacity(3);
        for i in 0..13u64 {
            list.append(MemoryDescriptor::new(i * 4, 4)).unwrap();
        }

        // 3 -> 6 -> 12 -> 24
        assert_eq!(list.len(), 13);
        assert_eq!(list.capacity(), 24);
    }

    #[test]
    fn test_growth_exact_power_boundary() {
        let mut list = RemoteList::with_capacity(2);
        for i in 0..8u64 {
            list.append(MemoryDescriptor::new(i, 1)).unwrap();
        }
        assert_eq!(list.capacity(), 8);

        list.append(MemoryDescriptor::new(8, 1)).unwrap();
        assert_eq!(list.capacity(), 16);
    }

    #[test]
    fn test_growth_from_zero_capacity() {
        let mut list = RemoteList::with_capacity(0);
        for i in 0..5u64 {
            list.append(MemoryDescriptor::new(i, 1)).unwrap();
        }
        // 0 -> 1 -> 2 -> 4 -> 8
        assert_eq!(list.capacity(), 8);
    }

    #[test]
    fn test_huge_capacity_fails_on_append_instead_of_aborting() {
        let mut list = RemoteList::with_capacity(usize::MAX / 2);
        assert_eq!(list.capacity(), usize::MAX / 2);
        assert!(list.is_empty());

        let err = list.append(MemoryDescriptor::new(0x1000, 4)).unwrap_err();
        assert!(matches!(err, Error::Allocation(_)));
        assert!(list.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let mut list = RemoteList::with_capacity(1);
        for i in 0..100u64 {
            list.append(MemoryDescriptor::new(i * 0x10, 4)).unwrap();
        }
        let addresses: Vec<_> = list.iter().map(|d| d.address).collect();
        let expected: Vec<_> = (0..100u64).map(|i| i * 0x10).collect();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn test_local_buffer_descriptor_tracks_allocation() {
        let buffer = LocalBuffer::zeroed(24).unwrap();
        let descriptor = buffer.descriptor();

        assert_eq!(descriptor.length, 24);
        assert_eq!(descriptor.address, buffer.as_ptr() as usize as u64);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_local_buffer_from_bytes() {
        let buffer = LocalBuffer::from_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(&*buffer, &[1, 2, 3]);
    }

    #[test]
    fn test_mirror_matches_remote_lengths() {
        let remote = RemoteList::from(vec![
            MemoryDescriptor::new(0x1000, 16),
            MemoryDescriptor::new(0x2000, 3),
            MemoryDescriptor::new(0x3000, 0),
        ]);
        let local = LocalList::mirror(&remote).unwrap();

        let lengths: Vec<_> = local.descriptors().map(|d| d.length).collect();
        assert_eq!(lengths, vec![16, 3, 0]);
        assert_eq!(local.capacity(), 3);
    }

    #[test]
    fn test_descriptor_display() {
        let descriptor = MemoryDescriptor::new(0x1004, 4);
        assert_eq!(descriptor.to_string(), "Base: 0x1004 Len: 4");
        assert_eq!(descriptor.end(), 0x1008);
    }
}
