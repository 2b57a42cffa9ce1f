//! Store error kinds and their error numbers.

use crate::store::Whence;
use hal::CopyFault;
use services_device_manager::{errno, FileError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScullError {
    #[error("cannot allocate a {capacity} byte store")]
    AllocationError { capacity: usize },

    #[error("transfer fault: {0}")]
    TransferFault(#[from] CopyFault),

    #[error("no space left at position {position} of {capacity}")]
    CapacityExceeded { position: usize, capacity: usize },

    #[error("offset {offset} from {whence} is outside [0, {capacity}]")]
    InvalidOffset {
        offset: i64,
        whence: Whence,
        capacity: usize,
    },

    #[error("invalid whence {0}")]
    InvalidWhence(i32),

    #[error("store still referenced by {open_sessions} session(s)")]
    StoreBusy { open_sessions: usize },
}

impl ScullError {
    /// Error number reported to file clients
    pub fn errno(&self) -> i32 {
        match self {
            Self::AllocationError { .. } | Self::CapacityExceeded { .. } => errno::ENOMEM,
            Self::TransferFault(_) => errno::EFAULT,
            Self::InvalidOffset { .. } | Self::InvalidWhence(_) => errno::EINVAL,
            Self::StoreBusy { .. } => errno::EBUSY,
        }
    }
}

impl From<ScullError> for FileError {
    fn from(err: ScullError) -> Self {
        FileError::new(err.errno(), err.to_string())
    }
}
