//! Checksum command

use extloader_core::profile::ProfileDatabase;

use super::open_device;
use crate::cli::TargetArgs;
use crate::error::CliError;

/// Print the checksum of `[start, start + size)`
pub fn run_checksum(
    db: &ProfileDatabase,
    target: &TargetArgs,
    start: u32,
    size: u32,
    init: u32,
) -> Result<(), CliError> {
    let mut device = open_device(db, target)?;
    let sum = device.checksum(start, size, init)?;
    println!("Checksum of {} bytes at 0x{:08X}: 0x{:08X}", size, start, sum);
    Ok(())
}
