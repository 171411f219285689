//! Engine configuration.
//!
//! This module contains:
//! - Limits and defaults for map parsing, descriptor lists, and transfers
//! - `SessionConfig` and its builder

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scalar::ScalarType;

/// Memory map parsing limits.
pub mod maps {
    /// Maximum number of map lines read per catalog build.
    pub const MAX_LINES: usize = 2048;
}

/// Descriptor list sizing.
pub mod descriptors {
    /// Initial capacity of a freshly created candidate list.
    pub const INITIAL_CAPACITY: usize = 64;
}

/// Bulk transfer limits.
pub mod transfer {
    /// Maximum number of descriptors accepted by one `process_vm_readv` /
    /// `process_vm_writev` call (`IOV_MAX` on Linux).
    pub const BATCH_LIMIT: usize = 1024;
}

/// Candidate listing defaults.
pub mod display {
    /// Entries listed when the terminal height is unknown.
    pub const DEFAULT_MAX_ENTRIES: usize = 20;

    /// Terminal rows kept free for prompts and status lines.
    pub const RESERVED_ROWS: usize = 8;
}

/// Settings for one search session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub scalar_type: ScalarType,
    pub batch_limit: usize,
    pub initial_capacity: usize,
    pub max_map_lines: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scalar_type: ScalarType::default(),
            batch_limit: transfer::BATCH_LIMIT,
            initial_capacity: descriptors::INITIAL_CAPACITY,
            max_map_lines: maps::MAX_LINES,
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn scalar_type(mut self, scalar_type: ScalarType) -> Self {
        self.config.scalar_type = scalar_type;
        self
    }

    /// Set the per-call descriptor limit. Zero is clamped to 1.
    pub fn batch_limit(mut self, limit: usize) -> Self {
        if limit == 0 {
            warn!("Batch limit of 0 is not usable, using 1");
        }
        self.config.batch_limit = limit.max(1);
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    pub fn max_map_lines(mut self, lines: usize) -> Self {
        self.config.max_map_lines = lines;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}
