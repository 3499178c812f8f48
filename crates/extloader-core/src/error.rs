//! Error types for extloader-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::profile::ProfileError;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bus transaction failed (controller fault or device NACK)
    Bus,
    /// Status poll or erase exceeded its deadline
    Timeout,
    /// Address range lies outside the device
    InvalidRange {
        /// First address of the rejected range
        address: u32,
        /// Length of the rejected range in bytes
        len: u32,
    },
    /// Command attempted while the controller is in memory-mapped mode
    ModeConflict,
    /// Operation requires a device that has been reset and configured
    NotInitialized,
    /// A polling loop was cancelled through its cancellation token
    Cancelled,
    /// The device profile does not provide the requested operation
    Unsupported,
    /// The device profile is internally inconsistent
    InvalidProfile(ProfileError),
}

impl Error {
    /// Returns true if repeating the whole high-level operation may succeed
    ///
    /// Poll timeouts are worth a retry (re-erasing an erased sector or
    /// re-programming a programmed page is harmless); bus faults are fatal
    /// for the current session.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus transaction failed"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::InvalidRange { address, len } => write!(
                f,
                "range 0x{:08X}+0x{:X} is outside the device",
                address, len
            ),
            Self::ModeConflict => write!(f, "controller is in memory-mapped mode"),
            Self::NotInitialized => write!(f, "device not initialized"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Unsupported => write!(f, "operation not supported by device profile"),
            Self::InvalidProfile(e) => write!(f, "invalid device profile: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_retryable() {
        assert!(Error::Timeout.is_retryable());
        assert!(!Error::Bus.is_retryable());
        assert!(!Error::ModeConflict.is_retryable());
        assert!(!Error::InvalidRange { address: 0, len: 1 }.is_retryable());
        assert!(!Error::InvalidProfile(ProfileError::AddressWidth).is_retryable());
    }
}
