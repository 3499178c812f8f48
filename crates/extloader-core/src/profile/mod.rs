//! Device profiles
//!
//! A [`DeviceProfile`] holds every per-chip constant the drivers need:
//! geometry, opcodes, dummy cycles, poll timeouts and the protocol the chip
//! is configured into. Profiles come from the compiled-in [`builtin`] table
//! or, with the `std` feature, from RON files loaded into a
//! [`ProfileDatabase`].

pub mod builtin;
#[cfg(feature = "std")]
mod database;
mod types;

#[cfg(feature = "std")]
pub use database::{ProfileDatabase, ProfileDbError, ProfileRecord};
pub use types::*;
