//! Erase command

use extloader_core::profile::ProfileDatabase;

use super::progress::IndicatifProgress;
use super::{open_device, save_device};
use crate::cli::TargetArgs;
use crate::error::CliError;

/// Erase the sectors touching `[start, end]`, or the whole chip
pub fn run_erase(
    db: &ProfileDatabase,
    target: &TargetArgs,
    start: Option<u32>,
    end: Option<u32>,
) -> Result<(), CliError> {
    if start.is_some() != end.is_some() {
        return Err(CliError::PartialRange);
    }
    let mut device = open_device(db, target)?;
    let mut progress = IndicatifProgress::new();

    match (start, end) {
        (Some(start), Some(end)) => {
            let sectors = device.erase_range_with_progress(start, end, &mut progress)?;
            progress.finish("Erase complete");
            println!(
                "Erased {} sector(s) from 0x{:08X} to 0x{:08X}",
                sectors, start, end
            );
        }
        _ => {
            progress.spinner(format!(
                "Erasing {} bytes (this may take a while)...",
                device.profile().flash_size
            ));
            device.mass_erase()?;
            progress.finish("Chip erase complete");
        }
    }

    save_device(&device, target)
}
