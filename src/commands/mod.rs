//! CLI command implementations
//!
//! Every command except `profiles` runs against an emulated chip whose
//! contents persist in a backing file between invocations.

mod checksum;
mod erase;
mod profiles;
mod progress;
mod run;

pub use checksum::run_checksum;
pub use erase::run_erase;
pub use profiles::list_profiles;
pub use run::run_session;

use extloader_core::flash::FlashDevice;
use extloader_core::profile::ProfileDatabase;
use extloader_sim::SimBus;

use crate::cli::TargetArgs;
use crate::error::CliError;

/// Open the emulated chip named by `target` and initialize it
fn open_device(db: &ProfileDatabase, target: &TargetArgs) -> Result<FlashDevice<SimBus>, CliError> {
    let record = db
        .find(&target.chip)
        .ok_or_else(|| CliError::UnknownProfile(target.chip.clone()))?;
    println!(
        "Using {} {} ({} bytes at 0x{:08X})",
        record.vendor, record.name, record.profile.flash_size, record.profile.mapped_base
    );

    let sim = SimBus::open(record.profile, &target.flash)?;
    let mut device = FlashDevice::new(sim, record.profile);
    device.init()?;
    log::debug!("Device ready: {:?}", device);
    Ok(device)
}

/// Persist the emulated chip contents
fn save_device(device: &FlashDevice<SimBus>, target: &TargetArgs) -> Result<(), CliError> {
    device.bus().save(&target.flash)?;
    log::info!("Saved flash contents to {}", target.flash.display());
    Ok(())
}
