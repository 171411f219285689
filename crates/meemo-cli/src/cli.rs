//! CLI argument definitions for meemo.

use clap::Parser;
use meemo_core::config::transfer::BATCH_LIMIT;
use meemo_core::{ScalarType, SessionConfig};

#[derive(Parser)]
#[command(name = "meemo")]
#[command(about = "Find and edit values in the memory of a running process", version)]
pub struct Args {
    /// Process ID of the target
    pub pid: i32,

    /// Scalar type to scan for (i32, i64, u32, u64, char)
    #[arg(short = 't', long = "type", env = "MEEMO_TYPE", default_value = "u32")]
    pub scalar_type: ScalarType,

    /// Maximum memory descriptors per transfer call
    #[arg(long, env = "MEEMO_BATCH_LIMIT", default_value_t = BATCH_LIMIT)]
    pub batch_limit: usize,

    /// Number of candidates to list (default: fit the terminal)
    #[arg(short = 'n', long)]
    pub max_entries: Option<usize>,
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::builder()
            .scalar_type(self.scalar_type)
            .batch_limit(self.batch_limit)
            .build()
    }
}
