//! Profile database for runtime loading and lookup
//!
//! This module provides the `ProfileDatabase` type for loading device
//! profiles from RON files at runtime, on top of the built-in table.

use std::fs;
use std::io;
use std::path::Path;
use std::string::{String, ToString};
use std::vec::Vec;

use super::builtin;
use super::types::*;
use crate::spi::AddressWidth;

/// Error type for profile database operations
#[derive(Debug)]
pub enum ProfileDbError {
    /// I/O error reading files
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// A profile failed its consistency check
    Validation {
        /// Name of the offending profile
        name: String,
        /// What is wrong with it
        error: ProfileError,
    },
}

impl From<io::Error> for ProfileDbError {
    fn from(e: io::Error) -> Self {
        ProfileDbError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ProfileDbError {
    fn from(e: ron::error::SpannedError) -> Self {
        ProfileDbError::Parse(e)
    }
}

impl std::fmt::Display for ProfileDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileDbError::Io(e) => write!(f, "I/O error: {}", e),
            ProfileDbError::Parse(e) => write!(f, "Parse error: {}", e),
            ProfileDbError::Validation { name, error } => {
                write!(f, "Validation error in {}: {}", name, error)
            }
        }
    }
}

impl std::error::Error for ProfileDbError {}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum Size {
    B(u32),
    KiB(u32),
    MiB(u32),
}

impl Size {
    fn to_bytes(self) -> u32 {
        match self {
            Size::B(n) => n,
            Size::KiB(n) => n * 1024,
            Size::MiB(n) => n * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum ResetModeDef {
    Single,
    Quad,
    OctalStr,
    OctalDtr,
}

impl From<ResetModeDef> for ResetModes {
    fn from(def: ResetModeDef) -> Self {
        match def {
            ResetModeDef::Single => ResetModes::SINGLE,
            ResetModeDef::Quad => ResetModes::QUAD,
            ResetModeDef::OctalStr => ResetModes::OCTAL_STR,
            ResetModeDef::OctalDtr => ResetModes::OCTAL_DTR,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ProfileDef {
    name: String,
    #[serde(default)]
    board: String,
    device_id: Option<u16>,
    flash_size: Size,
    #[serde(default = "default_page_size")]
    page_size: u32,
    sector_size: Size,
    #[serde(default)]
    block_size: Option<Size>,
    #[serde(default)]
    address_width: AddressWidth,
    #[serde(default)]
    four_byte: FourByteMode,
    #[serde(default = "default_mapped_base")]
    mapped_base: u32,
    #[serde(default)]
    opcodes: Opcodes,
    #[serde(default)]
    dummy: DummyCycles,
    #[serde(default)]
    timeouts: Timeouts,
    #[serde(default)]
    quad_enable: QuadEnable,
    #[serde(default)]
    config_register: Option<ConfigRegister>,
    #[serde(default)]
    target_mode: TargetMode,
    #[serde(default)]
    wrap_disable: Option<WrapDisable>,
    #[serde(default = "default_reset_modes")]
    reset_modes: Vec<ResetModeDef>,
    #[serde(default = "default_reset_recovery")]
    reset_recovery_ms: u32,
}

fn default_page_size() -> u32 {
    256
}

fn default_mapped_base() -> u32 {
    0x9000_0000
}

fn default_reset_modes() -> Vec<ResetModeDef> {
    std::vec![ResetModeDef::Single]
}

fn default_reset_recovery() -> u32 {
    1
}

#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    manufacturer_id: u8,
    profiles: Vec<ProfileDef>,
}

// ============================================================================
// Profile database
// ============================================================================

/// A named profile owned by the database
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    /// Vendor name
    pub vendor: String,
    /// Profile name, used for lookup
    pub name: String,
    /// Board the profile was tuned for (may be empty)
    pub board: String,
    /// The profile itself
    pub profile: DeviceProfile,
}

impl From<&ProfileEntry> for ProfileRecord {
    fn from(entry: &ProfileEntry) -> Self {
        Self {
            vendor: entry.vendor.to_string(),
            name: entry.name.to_string(),
            board: entry.board.to_string(),
            profile: entry.profile,
        }
    }
}

/// Collection of device profiles
///
/// Lookup is by name, case-insensitive. Profiles loaded later shadow
/// earlier ones of the same name, so files can override built-in entries.
#[derive(Debug, Clone, Default)]
pub struct ProfileDatabase {
    records: Vec<ProfileRecord>,
}

impl ProfileDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Create a database holding the built-in profiles
    pub fn with_builtin() -> Self {
        Self {
            records: builtin::ALL.iter().map(ProfileRecord::from).collect(),
        }
    }

    /// Load one vendor file
    ///
    /// Returns the number of profiles added.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ProfileDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load profiles from a RON string
    ///
    /// Every profile is validated before any is added; a file with one bad
    /// profile adds nothing.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ProfileDbError> {
        // `device_id: 0x853A` instead of `device_id: Some(0x853A)`
        let vendor_def: VendorDef = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(content)?;
        let mut loaded = Vec::with_capacity(vendor_def.profiles.len());

        for def in vendor_def.profiles {
            let profile = DeviceProfile {
                flash_size: def.flash_size.to_bytes(),
                page_size: def.page_size,
                sector_size: def.sector_size.to_bytes(),
                block_size: def.block_size.map(Size::to_bytes),
                address_width: def.address_width,
                four_byte: def.four_byte,
                mapped_base: def.mapped_base,
                jedec_id: def
                    .device_id
                    .map(|device| JedecId::new(vendor_def.manufacturer_id, device)),
                opcodes: def.opcodes,
                dummy: def.dummy,
                timeouts: def.timeouts,
                quad_enable: def.quad_enable,
                config_register: def.config_register,
                target_mode: def.target_mode,
                wrap_disable: def.wrap_disable,
                reset_modes: def
                    .reset_modes
                    .iter()
                    .fold(ResetModes::empty(), |acc, m| acc | ResetModes::from(*m)),
                reset_recovery_ms: def.reset_recovery_ms,
            };
            profile
                .validate()
                .map_err(|error| ProfileDbError::Validation {
                    name: def.name.clone(),
                    error,
                })?;
            loaded.push(ProfileRecord {
                vendor: vendor_def.vendor.clone(),
                name: def.name,
                board: def.board,
                profile,
            });
        }

        let count = loaded.len();
        self.records.extend(loaded);
        Ok(count)
    }

    /// Load every `.ron` file in a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ProfileDbError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();

        let mut total = 0;
        for path in paths {
            if path.extension().is_some_and(|ext| ext == "ron") {
                log::debug!("Loading profiles from {}", path.display());
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// All profiles, in load order
    pub fn records(&self) -> &[ProfileRecord] {
        &self.records
    }

    /// Look up a profile by name
    pub fn find(&self, name: &str) -> Option<&ProfileRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| record.name.eq_ignore_ascii_case(name))
    }

    /// Look up the profiles matching a JEDEC ID
    pub fn find_by_id(&self, id: JedecId) -> impl Iterator<Item = &ProfileRecord> {
        self.records
            .iter()
            .filter(move |record| record.profile.jedec_id == Some(id))
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the database holds no profiles
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    const SAMPLE: &str = r#"
(
    vendor: "Macronix",
    manufacturer_id: 0xC2,
    profiles: [
        (
            name: "MX25LM51245G-DTR",
            board: "custom",
            device_id: 0x853A,
            flash_size: MiB(64),
            sector_size: KiB(4),
            block_size: Some(KiB(64)),
            address_width: FourByte,
            four_byte: Native,
            opcodes: (
                sector_erase: (three_byte: 0x20, four_byte: 0x21),
                page_program: (three_byte: 0x02, four_byte: 0x12),
                octal_read: 0xEE,
            ),
            timeouts: (max_erase_ms: 460000),
            target_mode: Opi(dtr: true, write_config2: 0x72, dummy_value: 0x00),
            reset_modes: [Single, OctalStr, OctalDtr],
        ),
    ],
)
"#;

    #[test]
    fn test_load_sample_profile() {
        let mut db = ProfileDatabase::new();
        assert_eq!(db.load_ron(SAMPLE).unwrap(), 1);

        let record = db.find("mx25lm51245g-dtr").unwrap();
        let profile = &record.profile;
        assert_eq!(record.vendor, "Macronix");
        assert_eq!(profile.flash_size, 64 * 1024 * 1024);
        assert_eq!(profile.page_size, 256);
        assert_eq!(profile.mapped_base, 0x9000_0000);
        assert_eq!(profile.jedec_id, Some(JedecId::new(0xC2, 0x853A)));
        assert_eq!(profile.opcodes.octal_read, opcodes::OCTAL_READ_DTR);
        assert_eq!(profile.opcodes.write_enable, opcodes::WREN);
        assert_eq!(profile.timeouts.max_erase_ms, 460_000);
        assert_eq!(profile.timeouts.sector_erase_ms, 1_000);
        assert_eq!(
            profile.reset_modes,
            ResetModes::SINGLE | ResetModes::OCTAL_STR | ResetModes::OCTAL_DTR
        );
    }

    #[test]
    fn test_loaded_profiles_shadow_builtin() {
        let mut db = ProfileDatabase::with_builtin();
        let builtin_count = db.len();
        db.load_ron(SAMPLE).unwrap();
        assert_eq!(db.len(), builtin_count + 1);
        assert_eq!(db.find("MX25LM51245G-DTR").unwrap().board, "custom");
    }

    #[test]
    fn test_inconsistent_profile_is_rejected() {
        let bad = r#"
(
    vendor: "Test",
    manufacturer_id: 0x00,
    profiles: [
        (
            name: "TOO-BIG",
            flash_size: MiB(32),
            sector_size: KiB(4),
        ),
    ],
)
"#;
        let mut db = ProfileDatabase::new();
        match db.load_ron(bad) {
            Err(ProfileDbError::Validation { name, error }) => {
                assert_eq!(name, "TOO-BIG");
                assert_eq!(error, ProfileError::AddressWidth);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(db.is_empty());
    }

    #[test]
    fn test_find_by_jedec_id() {
        let db = ProfileDatabase::with_builtin();
        let names: Vec<_> = db
            .find_by_id(JedecId::new(0xC2, 0x853A))
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["MX25LM51245G-STR", "MX25LM51245G-DTR"]);
    }

    #[test]
    fn test_shipped_files_agree_with_builtin() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../chips/vendors");
        let mut db = ProfileDatabase::new();
        assert!(db.load_dir(&dir).unwrap() > builtin::ALL.len());
        for entry in builtin::ALL {
            let record = db
                .find(entry.name)
                .unwrap_or_else(|| panic!("{} missing from chips/vendors", entry.name));
            assert_eq!(record.profile, entry.profile, "{}", entry.name);
            assert_eq!(record.board, entry.board, "{}", entry.name);
            assert_eq!(record.vendor, entry.vendor, "{}", entry.name);
        }
    }
}
