//! Search sessions.
//!
//! A [`Session`] owns the candidate set of one target process and moves it
//! from generation to generation:
//!
//! - `search` runs one narrowing step (see `search.rs`)
//! - `write` stores a value at one candidate (see `write.rs`)
//! - `describe` renders the current candidates for display
//! - `reset` starts over from a fresh region catalog
//!
//! Every operation runs to completion before the next one starts, and a
//! failed operation leaves the current generation exactly as it was.

mod search;
mod write;

pub use search::StepOutcome;

use serde::Serialize;
use tracing::info;

use crate::config::SessionConfig;
use crate::descriptor::{LocalList, MemoryDescriptor, RemoteList};
use crate::error::{Error, Result};
use crate::process::{MapEntry, ProcessMemory, RegionCatalog, VectoredMemory};
use crate::scalar::{ScalarType, ScalarValue};

/// Candidate set of one target process across search generations.
pub struct Session<M: VectoredMemory> {
    memory: M,
    config: SessionConfig,
    catalog: RegionCatalog,
    remote: RemoteList,
    local: LocalList,
    last_value: Option<ScalarValue>,
    generation: u32,
}

impl Session<ProcessMemory> {
    /// Attach to a live process and seed the candidate set with its rw regions.
    pub fn start(pid: i32, config: &SessionConfig) -> Result<Self> {
        let memory = ProcessMemory::attach(pid)?;
        let catalog = memory.regions(config.max_map_lines)?;
        Self::with_memory(memory, catalog, config)
    }
}

impl<M: VectoredMemory> Session<M> {
    /// Create a session over any memory back-end.
    pub fn with_memory(memory: M, catalog: RegionCatalog, config: &SessionConfig) -> Result<Self> {
        let remote = catalog.to_remote_list(config.initial_capacity)?;
        let local = LocalList::with_capacity(remote.len());

        info!(
            "Session started for PID {}: {} regions, {} bytes, scanning {}",
            memory.pid(),
            remote.len(),
            remote.total_length(),
            config.scalar_type
        );

        Ok(Self {
            memory,
            config: config.clone(),
            catalog,
            remote,
            local,
            last_value: None,
            generation: 0,
        })
    }

    /// Re-read the target's memory map and start over at generation 0.
    pub fn reset(&mut self) -> Result<usize> {
        let catalog = self.memory.regions(self.config.max_map_lines)?;
        self.reset_with(catalog)
    }

    /// Replace the candidate set with the regions of `catalog`.
    ///
    /// On error the session is left unchanged.
    pub fn reset_with(&mut self, catalog: RegionCatalog) -> Result<usize> {
        let remote = catalog.to_remote_list(self.config.initial_capacity)?;

        self.local = LocalList::with_capacity(remote.len());
        self.remote = remote;
        self.catalog = catalog;
        self.last_value = None;
        self.generation = 0;

        info!(
            "Session for PID {} reset: {} regions",
            self.pid(),
            self.remote.len()
        );
        Ok(self.remote.len())
    }

    pub fn pid(&self) -> i32 {
        self.memory.pid()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn candidate_count(&self) -> usize {
        self.remote.len()
    }

    pub fn candidates(&self) -> &RemoteList {
        &self.remote
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.config.scalar_type
    }

    pub fn last_value(&self) -> Option<ScalarValue> {
        self.last_value
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn is_target_alive(&self) -> bool {
        self.memory.is_alive()
    }

    /// Parse `text` as a value of the session's scalar type.
    pub fn parse_value(&self, text: &str) -> Result<ScalarValue> {
        self.config.scalar_type.parse_value(text)
    }

    /// Render up to `max_entries` candidates, one per line.
    pub fn describe(&self, max_entries: usize) -> String {
        let shown = max_entries.min(self.remote.len());
        let mut lines: Vec<String> = self
            .remote
            .iter()
            .take(shown)
            .enumerate()
            .map(|(index, descriptor)| format!("[{}] = {}", index, descriptor))
            .collect();

        if shown < self.remote.len() {
            lines.push(format!(
                "... and {} more, refine the search",
                self.remote.len() - shown
            ));
        }
        lines.join("\n")
    }

    /// Mapping that contains the candidate at `position`.
    pub fn locate(&self, position: usize) -> Result<Option<&MapEntry>> {
        let descriptor = self.candidate(position)?;
        Ok(self.catalog.region_of(descriptor.address))
    }

    /// Serializable summary with up to `max_entries` candidates.
    pub fn snapshot(&self, max_entries: usize) -> SessionSnapshot {
        SessionSnapshot {
            pid: self.pid(),
            scalar_type: self.config.scalar_type,
            generation: self.generation,
            candidate_count: self.remote.len(),
            last_value: self.last_value,
            candidates: self.remote.iter().take(max_entries).copied().collect(),
        }
    }

    /// End the session, releasing every owned buffer.
    pub fn teardown(self) {
        info!(
            "Session for PID {} ended at generation {} with {} candidates",
            self.pid(),
            self.generation,
            self.remote.len()
        );
    }

    fn candidate(&self, position: usize) -> Result<MemoryDescriptor> {
        self.remote.get(position).copied().ok_or(Error::OutOfRange {
            position,
            len: self.remote.len(),
        })
    }

    fn check_type(&self, value: &ScalarValue) -> Result<()> {
        let expected = self.config.scalar_type;
        let actual = value.scalar_type();
        if expected == actual {
            Ok(())
        } else {
            Err(Error::TypeMismatch { expected, actual })
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub pid: i32,
    pub scalar_type: ScalarType,
    pub generation: u32,
    pub candidate_count: usize,
    pub last_value: Option<ScalarValue>,
    pub candidates: Vec<MemoryDescriptor>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
