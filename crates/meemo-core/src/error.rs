use thiserror::Error;

use crate::scalar::ScalarType;

/// Classified reason a bulk remote-memory transfer failed.
///
/// The OS error codes behind these are platform details; anything not listed
/// is kept verbatim in `Unknown` so new codes never become unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TransferErrorKind {
    #[error("invalid arguments")]
    InvalidArguments,

    #[error("unable to access target memory")]
    AccessDenied,

    #[error("memory allocation failed")]
    OutOfMemory,

    #[error("insufficient privileges")]
    PermissionDenied,

    #[error("process does not exist")]
    NoSuchProcess,

    #[error("unknown error (os code {0})")]
    Unknown(i32),
}

impl TransferErrorKind {
    /// Map a raw `errno` value to a transfer error kind.
    #[cfg(target_os = "linux")]
    pub fn from_raw_os_error(code: i32) -> Self {
        use nix::errno::Errno;

        match Errno::from_raw(code) {
            Errno::EINVAL => Self::InvalidArguments,
            Errno::EFAULT => Self::AccessDenied,
            Errno::ENOMEM => Self::OutOfMemory,
            Errno::EPERM => Self::PermissionDenied,
            Errno::ESRCH => Self::NoSuchProcess,
            _ => Self::Unknown(code),
        }
    }

    /// Map a raw `errno` value to a transfer error kind.
    ///
    /// Uses the Linux numbering; no other platform issues transfers.
    #[cfg(not(target_os = "linux"))]
    pub fn from_raw_os_error(code: i32) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::NoSuchProcess,
            12 => Self::OutOfMemory,
            14 => Self::AccessDenied,
            22 => Self::InvalidArguments,
            other => Self::Unknown(other),
        }
    }
}

#[cfg(target_os = "linux")]
impl From<nix::errno::Errno> for TransferErrorKind {
    fn from(errno: nix::errno::Errno) -> Self {
        Self::from_raw_os_error(errno as i32)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot open memory map of process {pid}: {source}")]
    MapsUnavailable {
        pid: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Memory transfer failed after {transferred} bytes: {kind}")]
    Transfer {
        kind: TransferErrorKind,
        transferred: usize,
    },

    #[error("Short write at {address:#x}: expected {expected} bytes, wrote {written}")]
    ShortWrite {
        address: u64,
        expected: usize,
        written: usize,
    },

    #[error("Position {position} is out of range ({len} candidates)")]
    OutOfRange { position: usize, len: usize },

    #[error("Value type mismatch: session scans {expected}, got {actual}")]
    TypeMismatch {
        expected: ScalarType,
        actual: ScalarType,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Remote memory access is not supported on this platform")]
    UnsupportedPlatform,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn transfer(kind: TransferErrorKind, transferred: usize) -> Self {
        Self::Transfer { kind, transferred }
    }

    /// The classified transfer failure, if this error came from a transfer.
    pub fn transfer_kind(&self) -> Option<TransferErrorKind> {
        match self {
            Self::Transfer { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Error::Allocation(e.to_string())
    }
}
