//! Error types for the flash emulator

use thiserror::Error;

/// Emulator setup errors
#[derive(Debug, Error)]
pub enum SimError {
    /// Failed to read or write a backing file
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Initial image does not fit the emulated chip
    #[error("Image of {image} bytes does not fit a {flash} byte flash")]
    ImageTooLarge { image: usize, flash: usize },
}

/// Result type for emulator setup
pub type Result<T> = std::result::Result<T, SimError>;
