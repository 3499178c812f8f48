//! extloader - External QSPI/OSPI flash loader toolkit
//!
//! Drives the loader operations (init, sector erase, mass erase, write,
//! checksum, verify) against an emulated flash chip described by a device
//! profile. The emulated contents live in a backing file, so a sequence of
//! invocations behaves like a programming session on a real board.
//!
//! # Architecture
//!
//! - `extloader-core` holds the protocol, the engines and the profiles; it
//!   is `no_std` and runs unchanged inside a loader binary on the target
//! - `extloader-sim` emulates the chip behind a QSPI/OSPI controller
//! - this binary wires both together and adds progress reporting

mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use extloader_core::profile::ProfileDatabase;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let db = match load_profile_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load profile database: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Loaded {} device profiles", db.len());

    match cli.command {
        Commands::Profiles { vendor } => {
            commands::list_profiles(&db, vendor.as_deref());
        }
        Commands::Run {
            target,
            input,
            address,
            no_erase,
            no_verify,
        } => commands::run_session(&db, &target, &input, address, !no_erase, !no_verify)?,
        Commands::Checksum {
            target,
            start,
            size,
            init,
        } => commands::run_checksum(&db, &target, start, size, init)?,
        Commands::Erase { target, start, end } => commands::run_erase(&db, &target, start, end)?,
    }

    Ok(())
}

/// Load profile files on top of the built-in profiles
fn load_profile_database(path: Option<&Path>) -> Result<ProfileDatabase, Box<dyn std::error::Error>> {
    let mut db = ProfileDatabase::with_builtin();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Profile database path not found: {}", path.display()).into());
        }
    } else {
        // Try default locations
        let default_paths = [
            PathBuf::from("chips/vendors"),
            PathBuf::from("/usr/share/extloader/chips"),
            PathBuf::from("/usr/local/share/extloader/chips"),
        ];

        for dir in &default_paths {
            if dir.is_dir() {
                match db.load_dir(dir) {
                    Ok(count) => {
                        log::debug!("Loaded {} profiles from {}", count, dir.display());
                    }
                    Err(e) => {
                        log::warn!("Failed to load profiles from {}: {}", dir.display(), e);
                    }
                }
            }
        }
    }

    Ok(db)
}
