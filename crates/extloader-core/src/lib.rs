//! extloader-core - Core library for external flash loaders
//!
//! This crate drives SPI-class NOR flash memories (QSPI/OSPI) through a
//! memory-interface controller: reset and mode configuration, write-enable
//! and status polling, sector/chip erase, page-split programming,
//! memory-mapped reads, and the checksum/verify pass a host programming tool
//! runs after writing. It is designed to be `no_std` compatible so the same
//! code can run inside the loader firmware.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), the RON
//!   profile database and `std::error::Error` impls
//! - `alloc` - Enable heap allocation (shared cancellation tokens)
//!
//! # Example
//!
//! ```ignore
//! use extloader_core::{flash::FlashDevice, profile};
//!
//! fn program<B: extloader_core::bus::BusDriver>(bus: B, image: &[u8]) {
//!     let profile = profile::builtin::MX25LM51245G_STR.profile;
//!     let mut flash = FlashDevice::new(bus, profile);
//!     flash.init().unwrap();
//!     flash.erase_range(0x9000_0000, 0x9000_0000 + image.len() as u32 - 1).unwrap();
//!     flash.write(0x9000_0000, image).unwrap();
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod error;
pub mod flash;
pub mod loader;
pub mod profile;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result};
