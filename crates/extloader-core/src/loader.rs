//! Host-tool loader entry points
//!
//! [`Loader`] exposes the calls a programming tool makes into an external
//! loader with their historical return conventions: `1`/`0` for success
//! and failure, a bare 32-bit checksum, and a packed 64-bit verify result.
//! Errors are logged and collapsed here and nowhere else; the typed
//! [`FlashDevice`] methods behind each call return [`Error`](crate::Error).

use crate::bus::BusDriver;
use crate::error::{Error, Result};
use crate::flash::FlashDevice;
use crate::profile::DeviceProfile;

/// Legacy success value
pub const SUCCESS: u32 = 1;
/// Legacy failure value
pub const FAILURE: u32 = 0;
/// Verify result returned when the verify pass itself fails
pub const VERIFY_FAILED: u64 = u64::MAX;

fn collapse(op: &str, result: Result<()>) -> u32 {
    match result {
        Ok(()) => SUCCESS,
        Err(e) => {
            log::error!("{} failed: {}", op, e);
            FAILURE
        }
    }
}

/// External loader bound to one flash chip
#[derive(Debug)]
pub struct Loader<B> {
    device: FlashDevice<B>,
}

impl<B: BusDriver> Loader<B> {
    /// Create a loader; call [`init`](Self::init) before anything else
    pub fn new(bus: B, profile: DeviceProfile) -> Self {
        Self::from_device(FlashDevice::new(bus, profile))
    }

    /// Wrap an existing device handle
    pub fn from_device(device: FlashDevice<B>) -> Self {
        Self { device }
    }

    /// The typed device handle
    pub fn device(&mut self) -> &mut FlashDevice<B> {
        &mut self.device
    }

    /// Release the device handle
    pub fn into_device(self) -> FlashDevice<B> {
        self.device
    }

    /// Reset and configure the chip, then enable memory-mapped mode
    pub fn init(&mut self) -> u32 {
        collapse("Init", self.device.init())
    }

    /// Program `size` bytes of `buffer` at `address`
    pub fn write(&mut self, address: u32, size: u32, buffer: &[u8]) -> u32 {
        let result = buffer
            .get(..size as usize)
            .ok_or(Error::InvalidRange { address, len: size })
            .and_then(|data| self.device.write(address, data));
        collapse("Write", result)
    }

    /// Erase every sector touching `[start, end]`
    pub fn sector_erase(&mut self, start: u32, end: u32) -> u32 {
        collapse("SectorErase", self.device.erase_range(start, end).map(|_| ()))
    }

    /// Erase the whole chip
    ///
    /// `parallelism` selects stacked dies on parts that have them; every
    /// supported chip is a single die and ignores it.
    pub fn mass_erase(&mut self, parallelism: u32) -> u32 {
        if parallelism != 0 {
            log::debug!("MassErase parallelism {} ignored", parallelism);
        }
        collapse("MassErase", self.device.mass_erase())
    }

    /// Checksum of `size_words` 32-bit words at `start`, seeded with `init`
    ///
    /// Returns 0 if the range cannot be read.
    pub fn check_sum(&mut self, start: u32, size_words: u32, init: u32) -> u32 {
        let result = size_words
            .checked_mul(4)
            .ok_or(Error::InvalidRange {
                address: start,
                len: u32::MAX,
            })
            .and_then(|size| self.device.checksum(start, size, init));
        match result {
            Ok(sum) => sum,
            Err(e) => {
                log::error!("CheckSum failed: {}", e);
                0
            }
        }
    }

    /// Verify `size_words` words at `flash` against `ram`
    ///
    /// Returns `(checksum << 32) | first_mismatch_address`, with a zero
    /// address when everything matches, or [`VERIFY_FAILED`] if the flash
    /// could not be read.
    pub fn verify(&mut self, flash: u32, ram: &[u8], size_words: u32, misalignment: u32) -> u64 {
        match self.device.verify(flash, ram, size_words, misalignment) {
            Ok(outcome) => {
                if outcome.mismatch == Some(0) {
                    log::warn!("Verify mismatch at address 0 packs the same as a match");
                }
                outcome.to_legacy()
            }
            Err(e) => {
                log::error!("Verify failed: {}", e);
                VERIFY_FAILED
            }
        }
    }
}
