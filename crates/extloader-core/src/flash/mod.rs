//! High-level flash operations
//!
//! This module provides the [`FlashDevice`] handle and the engines built on
//! it: page-aligned writes, sector-range erase, and the checksum/verify
//! pass.

mod checksum;
mod device;
mod erase;
mod verify;
mod write;

pub use checksum::{checksum, ChecksumAccumulator, MemoryWindow, SliceWindow};
pub use device::{DeviceState, FlashDevice};
pub use erase::EraseRange;
pub use verify::{verify, VerifyOutcome};
pub use write::{NoProgress, PageChunk, PageChunks, WriteProgress};
