//! Region catalog built from `/proc/<pid>/maps`.
//!
//! Each map line has the form
//!
//! ```text
//! 55d0c6a4e000-55d0c6a6f000 rw-p 00000000 00:00 0          [heap]
//! ```
//!
//! Only regions whose permissions start with `rw` are scannable. Malformed
//! lines are skipped, and parsing stops after a fixed number of lines.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::descriptor::{MemoryDescriptor, RemoteList};
use crate::error::{Error, Result};

/// One parsed map line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapEntry {
    pub start: u64,
    pub end: u64,
    pub permissions: String,
    pub offset: u64,
    pub pathname: Option<String>,
}

impl MapEntry {
    /// Parse a single map line. Returns `None` if the line is malformed.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();

        let (start, end) = fields.next()?.split_once('-')?;
        let start = u64::from_str_radix(start, 16).ok()?;
        let end = u64::from_str_radix(end, 16).ok()?;
        // Also rejects spans that do not fit the address width of this build.
        usize::try_from(end.checked_sub(start)?).ok()?;

        let permissions = fields.next()?;
        if permissions.len() < 2 {
            return None;
        }

        let offset = fields
            .next()
            .and_then(|o| u64::from_str_radix(o, 16).ok())
            .unwrap_or(0);

        // Device and inode, then the optional pathname (which may contain spaces).
        let pathname = fields.nth(2).map(|first| {
            std::iter::once(first)
                .chain(fields)
                .collect::<Vec<_>>()
                .join(" ")
        });

        Some(Self {
            start,
            end,
            permissions: permissions.to_string(),
            offset,
            pathname,
        })
    }

    pub fn is_readable(&self) -> bool {
        self.permissions.as_bytes().first() == Some(&b'r')
    }

    pub fn is_writable(&self) -> bool {
        self.permissions.as_bytes().get(1) == Some(&b'w')
    }

    pub fn is_executable(&self) -> bool {
        self.permissions.as_bytes().get(2) == Some(&b'x')
    }

    /// Readable and writable.
    pub fn is_scannable(&self) -> bool {
        self.is_readable() && self.is_writable()
    }

    /// Span length, saturating where it exceeds `usize`.
    pub fn len(&self) -> usize {
        usize::try_from(self.end.saturating_sub(self.start)).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }

    pub fn descriptor(&self) -> MemoryDescriptor {
        MemoryDescriptor::new(self.start, self.len())
    }

    /// Short label for display, e.g. `[heap]` or the mapped file name.
    pub fn label(&self) -> &str {
        self.pathname.as_deref().unwrap_or("[anonymous]")
    }
}

/// Scannable regions of a process, in map order.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    entries: Vec<MapEntry>,
}

impl RegionCatalog {
    /// Read the memory map of `pid`.
    ///
    /// Fails only if the map cannot be opened, which means the process does not
    /// exist or access is denied.
    pub fn for_pid(pid: i32, max_lines: usize) -> Result<Self> {
        let path = maps_path(pid);
        let file = File::open(&path).map_err(|source| Error::MapsUnavailable { pid, source })?;
        let catalog = Self::parse(BufReader::new(file), max_lines)?;
        debug!(
            "Cataloged {} rw regions ({} bytes) from {}",
            catalog.len(),
            catalog.total_length(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse a maps listing, reading at most `max_lines` lines.
    ///
    /// Pathnames are arbitrary bytes, so lines are decoded lossily rather than
    /// rejected when they are not UTF-8.
    pub fn parse<R: BufRead>(reader: R, max_lines: usize) -> Result<Self> {
        let mut entries = Vec::new();
        let mut lines_read = 0;

        for line in reader.split(b'\n') {
            if lines_read == max_lines {
                debug!("Map listing truncated at {} lines", max_lines);
                break;
            }
            lines_read += 1;

            let bytes = line?;
            let line = String::from_utf8_lossy(&bytes);
            match MapEntry::parse_line(line.trim_end_matches('\r')) {
                Some(entry) if entry.is_scannable() => entries.push(entry),
                Some(_) => {}
                None => debug!("Skipping malformed map line: {:?}", line),
            }
        }

        Ok(Self { entries })
    }

    /// Build a catalog from already parsed entries, keeping only scannable ones.
    pub fn from_entries(entries: impl IntoIterator<Item = MapEntry>) -> Self {
        Self {
            entries: entries.into_iter().filter(MapEntry::is_scannable).collect(),
        }
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.entries.iter().map(MapEntry::len).sum()
    }

    /// Region containing `address`, if any.
    pub fn region_of(&self, address: u64) -> Option<&MapEntry> {
        self.entries.iter().find(|e| e.contains(address))
    }

    /// Initial candidate set: one descriptor per region.
    pub fn to_remote_list(&self, initial_capacity: usize) -> Result<RemoteList> {
        let mut list = RemoteList::with_capacity(initial_capacity);
        for entry in &self.entries {
            list.append(entry.descriptor())?;
        }
        Ok(list)
    }
}

fn maps_path(pid: i32) -> PathBuf {
    PathBuf::from(format!("/proc/{}/maps", pid))
}
