//! Profile listing

use extloader_core::profile::{DeviceProfile, ProfileDatabase, TargetMode};

/// List all loaded profiles, optionally filtered by vendor
pub fn list_profiles(db: &ProfileDatabase, vendor_filter: Option<&str>) {
    println!(
        "{:<10} {:<18} {:<18} {:>8} {:>9}  {}",
        "Vendor", "Name", "Board", "Size", "JEDEC ID", "Mode"
    );
    println!("{}", "-".repeat(80));

    for record in db.records() {
        if let Some(vendor) = vendor_filter {
            if !record.vendor.to_lowercase().contains(&vendor.to_lowercase()) {
                continue;
            }
        }

        let jedec = record
            .profile
            .jedec_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<18} {:<18} {:>8} {:>9}  {}",
            record.vendor,
            record.name,
            record.board,
            format_size(record.profile.flash_size),
            jedec,
            mode_name(&record.profile)
        );
    }
}

fn mode_name(profile: &DeviceProfile) -> &'static str {
    match profile.target_mode {
        TargetMode::Spi => "1-1-1",
        TargetMode::SpiQuadIo => "1-4-4",
        TargetMode::Qpi { .. } => "4-4-4",
        TargetMode::Opi { dtr: false, .. } => "8-8-8 STR",
        TargetMode::Opi { dtr: true, .. } => "8-8-8 DTR",
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
