pub mod maps;
mod vectored;

// Mock target process for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use maps::{MapEntry, RegionCatalog};
pub use vectored::{ProcessMemory, VectoredMemory};

// Re-export mock for convenient access in tests
#[doc(hidden)]
pub use mock::{MockProcess, MockProcessBuilder};
