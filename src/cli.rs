//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "extloader")]
#[command(author, version, about = "External QSPI/OSPI flash loader toolkit", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to profile database directory or file (.ron)
    /// Defaults to ./chips/vendors/ and /usr/share/extloader/chips/ on top
    /// of the built-in profiles
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Emulated chip selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Device profile name (see `extloader profiles`)
    #[arg(short, long)]
    pub chip: String,

    /// Backing file holding the emulated flash contents
    ///
    /// Created on first use; a missing file starts with an erased chip.
    #[arg(short, long)]
    pub flash: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List device profiles
    Profiles {
        /// Filter by vendor name
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Run a complete loader session: init, erase, write, verify
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Image to program
        #[arg(short, long)]
        input: PathBuf,

        /// Load address (memory-mapped or device offset)
        #[arg(long, value_parser = parse_hex_u32)]
        address: Option<u32>,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,

        /// Skip the verify pass
        #[arg(long)]
        no_verify: bool,
    },

    /// Compute the additive checksum of a flash range
    Checksum {
        #[command(flatten)]
        target: TargetArgs,

        /// Start address
        #[arg(long, value_parser = parse_hex_u32)]
        start: u32,

        /// Size in bytes
        #[arg(long, value_parser = parse_hex_u32)]
        size: u32,

        /// Checksum seed
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        init: u32,
    },

    /// Erase sectors or the whole chip
    Erase {
        #[command(flatten)]
        target: TargetArgs,

        /// First address to erase (rounded down to a sector)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Last address to erase (inclusive)
        #[arg(long, value_parser = parse_hex_u32)]
        end: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_hex_and_decimal() {
        assert_eq!(parse_hex_u32("0x90000000"), Ok(0x9000_0000));
        assert_eq!(parse_hex_u32("0X10"), Ok(16));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
