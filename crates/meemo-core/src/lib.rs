//! Remote memory scanning for Linux processes.
//!
//! Catalogs the read-write regions of a target process, narrows them down to
//! the locations holding a scalar value across repeated searches, and writes
//! new values into the locations that remain.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod process;
pub mod scalar;
pub mod session;
pub mod transfer;

pub use config::SessionConfig;
pub use descriptor::{LocalBuffer, LocalList, MemoryDescriptor, RemoteList};
pub use error::{Error, Result, TransferErrorKind};
pub use process::{MapEntry, ProcessMemory, RegionCatalog, VectoredMemory};
pub use scalar::{Comparator, ScalarType, ScalarValue};
pub use session::{Session, SessionSnapshot, StepOutcome};
pub use transfer::BatchedTransfer;
