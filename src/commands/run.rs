//! Full loader session: init, erase, write, verify

use std::fs;
use std::path::Path;

use extloader_core::bus::BusDriver;
use extloader_core::flash::{FlashDevice, VerifyOutcome};
use extloader_core::profile::ProfileDatabase;

use super::progress::IndicatifProgress;
use super::{open_device, save_device};
use crate::cli::TargetArgs;
use crate::error::CliError;

/// Program `input` at `address` and verify it
pub fn run_session(
    db: &ProfileDatabase,
    target: &TargetArgs,
    input: &Path,
    address: Option<u32>,
    erase: bool,
    verify: bool,
) -> Result<(), CliError> {
    let image = fs::read(input).map_err(|source| CliError::Read {
        path: input.display().to_string(),
        source,
    })?;
    let mut device = open_device(db, target)?;
    let address = address.unwrap_or(device.profile().mapped_base);
    if image.is_empty() {
        println!("Image is empty, nothing to do");
        return Ok(());
    }
    let last = u32::try_from(image.len() - 1)
        .ok()
        .and_then(|n| address.checked_add(n))
        .ok_or(CliError::ImageRange {
            address,
            len: image.len(),
        })?;

    let mut progress = IndicatifProgress::new();
    if erase {
        let sectors = device.erase_range_with_progress(address, last, &mut progress)?;
        log::debug!("Erased {} sector(s)", sectors);
    }
    device.write_with_progress(address, &image, &mut progress)?;
    progress.finish("Write complete");
    save_device(&device, target)?;
    println!("Wrote {} bytes at 0x{:08X}", image.len(), address);

    if !verify {
        return Ok(());
    }

    let outcome = verify_image(&mut device, address, &image)?;
    log::debug!("Verify result 0x{:016X}", outcome.to_legacy());

    match outcome.mismatch {
        Some(address) => Err(CliError::VerifyMismatch { address }),
        None => {
            println!("Verified, checksum 0x{:08X}", outcome.checksum);
            Ok(())
        }
    }
}

/// Verify `image` at `address` in whole words
///
/// The reference is padded to a word multiple with the flash bytes next to
/// the image, after it when they exist and before it when the image ends on
/// the last flash byte. The misalignment argument keeps the padding out of
/// the checksum.
fn verify_image<B: BusDriver>(
    device: &mut FlashDevice<B>,
    address: u32,
    image: &[u8],
) -> Result<VerifyOutcome, CliError> {
    let pad = (4 - image.len() % 4) % 4;
    let len = image.len() as u32;
    let fits_after = address
        .checked_add(len)
        .is_some_and(|end| device.profile().to_offset(end, pad as u32).is_ok());

    let (start, reference, misalignment) = if pad == 0 {
        (address, image.to_vec(), 0)
    } else if fits_after {
        let mut reference = image.to_vec();
        let mut tail = vec![0xFF; pad];
        device.read_mapped(address + len, &mut tail)?;
        reference.extend_from_slice(&tail);
        (address, reference, (pad as u32) << 16)
    } else {
        let start = address.checked_sub(pad as u32).ok_or(CliError::ImageRange {
            address,
            len: image.len(),
        })?;
        let mut reference = vec![0xFF; pad];
        device.read_mapped(start, &mut reference)?;
        reference.extend_from_slice(image);
        // skip the head padding, then drop the same count from the end
        (start, reference, pad as u32 | (pad as u32) << 16)
    };

    let words = (reference.len() / 4) as u32;
    Ok(device.verify(start, &reference, words, misalignment)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use extloader_core::profile::builtin;
    use extloader_sim::SimBus;

    fn device() -> FlashDevice<SimBus> {
        let entry = &builtin::N25Q512A;
        let mut device = FlashDevice::new(SimBus::new(entry.profile), entry.profile);
        device.init().unwrap();
        device
    }

    fn byte_sum(data: &[u8]) -> u32 {
        data.iter().map(|&b| b as u32).sum()
    }

    #[test]
    fn test_verify_image_ending_on_last_byte() {
        let mut device = device();
        let image = [0x11, 0x22, 0x33, 0x44, 0x55];
        let address = device.profile().to_address(device.profile().flash_size - 5);
        device.write(address, &image).unwrap();

        let outcome = verify_image(&mut device, address, &image).unwrap();
        assert_eq!(outcome.mismatch, None);
        assert_eq!(outcome.checksum, byte_sum(&image));
    }

    #[test]
    fn test_verify_image_pads_after_unaligned_length() {
        let mut device = device();
        let image = [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5];
        let address = device.profile().to_address(0x2000);
        device.write(address, &image).unwrap();

        let outcome = verify_image(&mut device, address, &image).unwrap();
        assert!(outcome.is_match());
        assert_eq!(outcome.checksum, byte_sum(&image));
    }

    #[test]
    fn test_verify_image_reports_mismatch() {
        let mut device = device();
        let address = device.profile().to_address(device.profile().flash_size - 7);
        device.write(address, &[0, 1, 2, 3, 4, 5, 6]).unwrap();

        let outcome = verify_image(&mut device, address, &[0, 1, 2, 9, 4, 5, 6]).unwrap();
        assert_eq!(outcome.mismatch, Some(address + 3));
    }
}
