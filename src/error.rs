//! CLI error type

use std::io;

use extloader_sim::SimError;
use thiserror::Error;

/// Errors surfaced by the CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    /// No profile with this name is loaded
    #[error("Unknown device profile: {0} (see `extloader profiles`)")]
    UnknownProfile(String),

    /// Reading an input file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A flash operation failed
    #[error("Flash operation failed: {0}")]
    Flash(#[from] extloader_core::Error),

    /// The emulated chip could not be loaded or saved
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Only one end of an erase range was given
    #[error("Both --start and --end must be specified for a partial erase")]
    PartialRange,

    /// The image does not fit in the address space
    #[error("Image of {len} bytes at 0x{address:08X} overflows the address space")]
    ImageRange { address: u32, len: usize },

    /// Flash contents differ from the image
    #[error("Verify failed: first mismatch at 0x{address:08X}")]
    VerifyMismatch { address: u32 },
}
