//! Bus driver abstraction
//!
//! This module defines the collaborator every board supplies: a driver for
//! the QSPI/OSPI controller that can issue a flash command, move the data
//! phase, auto-poll a status register and switch to memory-mapped mode.

mod cancel;
mod traits;

pub use cancel::CancelToken;
pub use traits::*;
