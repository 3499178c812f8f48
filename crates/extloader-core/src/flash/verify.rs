//! Flash-against-RAM verification

use crate::bus::BusDriver;
use crate::error::{Error, Result};

use super::checksum::{checksum, MemoryWindow};
use super::FlashDevice;

/// Result of a verify pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// Checksum of the flash range
    pub checksum: u32,
    /// Flash address of the first byte that differs from the reference
    pub mismatch: Option<u32>,
}

impl VerifyOutcome {
    /// Returns true if flash equals the reference
    pub const fn is_match(&self) -> bool {
        self.mismatch.is_none()
    }

    /// Pack as `(checksum << 32) | mismatch_address`
    ///
    /// A match packs a zero address, the same as a mismatch at address 0.
    pub const fn to_legacy(&self) -> u64 {
        let address = match self.mismatch {
            Some(address) => address,
            None => 0,
        };
        ((self.checksum as u64) << 32) | address as u64
    }
}

/// Bytes compared per window access
const COMPARE_BLOCK: usize = 256;

/// Checksum `word_count` words at `flash` and compare them with `reference`
///
/// `misalignment` carries extra head bytes in its low nibble and extra tail
/// bytes in bits 16-19; they narrow the checksummed range only, the
/// compare always covers `word_count * 4` bytes.
pub fn verify<W: MemoryWindow + ?Sized>(
    window: &mut W,
    flash: u32,
    reference: &[u8],
    word_count: u32,
    misalignment: u32,
) -> Result<VerifyOutcome> {
    let size = word_count.checked_mul(4).ok_or(Error::InvalidRange {
        address: flash,
        len: u32::MAX,
    })?;
    let reference = reference
        .get(..size as usize)
        .ok_or(Error::InvalidRange {
            address: flash,
            len: size,
        })?;

    let head = misalignment & 0xF;
    let tail = (misalignment >> 16) & 0xF;
    let checksum = checksum(
        window,
        flash.wrapping_add(head),
        size.saturating_sub(tail),
        0,
    )?;

    let mut block = [0u8; COMPARE_BLOCK];
    let mut mismatch = None;
    for (i, expected) in reference.chunks(COMPARE_BLOCK).enumerate() {
        let address = flash.wrapping_add((i * COMPARE_BLOCK) as u32);
        let actual = &mut block[..expected.len()];
        window.read_bytes(address, actual)?;
        if let Some(k) = actual.iter().zip(expected).position(|(a, e)| a != e) {
            mismatch = Some(address.wrapping_add(k as u32));
            break;
        }
    }

    match mismatch {
        Some(address) => log::debug!("Verify mismatch at {:#010x}", address),
        None => log::debug!("Verify of {} bytes at {:#010x} passed", size, flash),
    }
    Ok(VerifyOutcome { checksum, mismatch })
}

impl<B: BusDriver> FlashDevice<B> {
    /// Verify flash at `flash` against `reference` through the mapped window
    ///
    /// Enables memory-mapped mode if needed.
    pub fn verify(
        &mut self,
        flash: u32,
        reference: &[u8],
        word_count: u32,
        misalignment: u32,
    ) -> Result<VerifyOutcome> {
        verify(self, flash, reference, word_count, misalignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::SliceWindow;
    use std::vec::Vec;

    fn image() -> Vec<u8> {
        (0..64u8).collect()
    }

    #[test]
    fn test_mismatch_reports_flash_address_and_checksum() {
        let reference = image();
        let mut flash = image();
        flash[37] ^= 0xFF;
        let mut window = SliceWindow::new(0x9000_0000, &flash);

        let outcome = verify(&mut window, 0x9000_0000, &reference, 16, 0).unwrap();
        let expected_sum = checksum(&mut window, 0x9000_0000, 64, 0).unwrap();
        assert_eq!(outcome.mismatch, Some(0x9000_0025));
        assert_eq!(outcome.checksum, expected_sum);
        assert_eq!(
            outcome.to_legacy(),
            ((expected_sum as u64) << 32) | 0x9000_0025
        );
    }

    #[test]
    fn test_equal_ranges_pack_checksum_only() {
        let data = image();
        let mut window = SliceWindow::new(0x100, &data);
        let outcome = verify(&mut window, 0x100, &data, 16, 0).unwrap();
        assert!(outcome.is_match());
        let sum: u32 = data.iter().map(|&b| b as u32).sum();
        assert_eq!(outcome.to_legacy(), (sum as u64) << 32);
    }

    #[test]
    fn test_misalignment_narrows_checksum() {
        let data = image();
        let mut window = SliceWindow::new(0, &data);
        // two extra head bytes, three extra tail bytes
        let outcome = verify(&mut window, 0, &data, 4, 0x0003_0002).unwrap();
        let sum: u32 = (2..15u32).sum();
        assert_eq!(outcome.checksum, sum);
        assert!(outcome.is_match());
    }

    #[test]
    fn test_mismatch_in_later_block() {
        let reference = std::vec![0xA5u8; 1024];
        let mut flash = reference.clone();
        flash[700] = 0;
        let mut window = SliceWindow::new(0, &flash);
        let outcome = verify(&mut window, 0, &reference, 256, 0).unwrap();
        assert_eq!(outcome.mismatch, Some(700));
    }

    #[test]
    fn test_short_reference_is_rejected() {
        let data = image();
        let mut window = SliceWindow::new(0, &data);
        assert_eq!(
            verify(&mut window, 0, &data[..10], 4, 0),
            Err(Error::InvalidRange { address: 0, len: 16 })
        );
    }
}
