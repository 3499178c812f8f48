//! Device profile type definitions

use core::fmt;

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::spi::{opcodes, AddressWidth, InterfaceMode, TransferRate};

/// Opcode with its 3-byte and 4-byte address variants
///
/// Chips that reach 4-byte addressing through EN4B use the same opcode for
/// both; chips with native 4-byte commands list the dedicated opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub struct OpcodePair {
    /// Opcode used with 24-bit addresses
    pub three_byte: u8,
    /// Opcode used with 32-bit addresses
    pub four_byte: u8,
}

impl OpcodePair {
    /// Create a pair from distinct 3-byte and 4-byte opcodes
    pub const fn new(three_byte: u8, four_byte: u8) -> Self {
        Self {
            three_byte,
            four_byte,
        }
    }

    /// Create a pair that uses the same opcode for both widths
    pub const fn same(opcode: u8) -> Self {
        Self::new(opcode, opcode)
    }

    /// Pick the opcode for the given address width
    pub const fn select(&self, width: AddressWidth) -> u8 {
        match width {
            AddressWidth::FourByte => self.four_byte,
            _ => self.three_byte,
        }
    }

    /// Returns true if `opcode` is either variant
    pub const fn contains(&self, opcode: u8) -> bool {
        self.three_byte == opcode || self.four_byte == opcode
    }
}

/// Opcode table of a flash chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct Opcodes {
    /// Write enable
    pub write_enable: u8,
    /// Read status register
    pub read_status: u8,
    /// Write status register
    pub write_status: u8,
    /// Read JEDEC ID
    pub read_id: u8,
    /// Reset enable
    pub reset_enable: u8,
    /// Reset
    pub reset: u8,
    /// Enter 4-byte address mode
    pub enter_4byte: u8,
    /// Smallest erase unit
    pub sector_erase: OpcodePair,
    /// Larger erase unit, if the chip has one
    pub block_erase: Option<OpcodePair>,
    /// Whole-chip erase
    pub chip_erase: u8,
    /// Page program (single line, QPI and OPI)
    pub page_program: OpcodePair,
    /// Quad input page program (1-1-4), if used in SPI mode
    pub quad_program: Option<OpcodePair>,
    /// Fast read in single-line mode
    pub fast_read: OpcodePair,
    /// Quad I/O read (1-4-4 or QPI)
    pub quad_read: OpcodePair,
    /// Octal read (always 4-byte addressed)
    pub octal_read: u8,
}

impl Opcodes {
    /// Standard JEDEC opcode set with 3-byte addressing
    pub const JEDEC: Self = Self {
        write_enable: opcodes::WREN,
        read_status: opcodes::RDSR,
        write_status: opcodes::WRSR,
        read_id: opcodes::RDID,
        reset_enable: opcodes::RSTEN,
        reset: opcodes::RST,
        enter_4byte: opcodes::EN4B,
        sector_erase: OpcodePair::same(opcodes::SE_20),
        block_erase: Some(OpcodePair::same(opcodes::BE_D8)),
        chip_erase: opcodes::CE_C7,
        page_program: OpcodePair::same(opcodes::PP),
        quad_program: None,
        fast_read: OpcodePair::same(opcodes::FAST_READ),
        quad_read: OpcodePair::same(opcodes::QIOR),
        octal_read: opcodes::OCTAL_READ_STR,
    };
}

impl Default for Opcodes {
    fn default() -> Self {
        Self::JEDEC
    }
}

/// Dummy cycles of the read commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct DummyCycles {
    /// Single-line fast read
    pub fast_read: u8,
    /// Quad read
    pub quad_read: u8,
    /// Octal read
    pub octal_read: u8,
    /// Status register read in octal mode
    pub octal_status: u8,
}

impl Default for DummyCycles {
    fn default() -> Self {
        Self {
            fast_read: 8,
            quad_read: 6,
            octal_read: 20,
            octal_status: 4,
        }
    }
}

/// Poll timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct Timeouts {
    /// Write enable, page program and register writes
    pub default_ms: u32,
    /// Sector erase
    pub sector_erase_ms: u32,
    /// Block erase
    pub block_erase_ms: u32,
    /// Chip erase
    pub max_erase_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: 5_000,
            sector_erase_ms: 1_000,
            block_erase_ms: 3_000,
            max_erase_ms: 460_000,
        }
    }
}

/// Location of the Quad Enable bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum QuadEnable {
    /// Device has no QE bit
    #[default]
    None,
    /// QE is this bit mask of the status register (Macronix: 0x40)
    Status(u8),
    /// QE is this bit mask of the configuration register (Winbond: 0x02)
    Config(u8),
}

/// How the configuration register is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum ConfigWrite {
    /// Write status register with two bytes: status then configuration
    WithStatus,
    /// Dedicated one-byte write opcode (Micron volatile configuration)
    Dedicated(u8),
}

/// Bit field inside a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub struct RegisterField {
    /// Bits covered by the field
    pub mask: u8,
    /// Value of the covered bits
    pub value: u8,
}

impl RegisterField {
    /// Replace the field bits of `reg` with the field value
    pub const fn apply(&self, reg: u8) -> u8 {
        (reg & !self.mask) | (self.value & self.mask)
    }

    /// Returns true if `reg` already holds the field value
    pub const fn is_set(&self, reg: u8) -> bool {
        reg & self.mask == self.value & self.mask
    }
}

/// Second register written together with the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub struct ConfigRegister {
    /// Opcode reading the register
    pub read_opcode: u8,
    /// How the register is written
    pub write: ConfigWrite,
    /// Dummy-cycle field programmed at configure time
    pub dummy: Option<RegisterField>,
}

/// Command disabling wrap-around burst reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub struct WrapDisable {
    /// Opcode
    pub opcode: u8,
    /// Data byte selecting linear bursts
    pub value: u8,
}

/// How addresses above 16 MiB are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum FourByteMode {
    /// Dedicated 4-byte opcodes, no mode change
    #[default]
    Native,
    /// EN4B switches the chip to 32-bit addresses for every opcode
    Enter,
}

/// Protocol the chip is driven in once configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum TargetMode {
    /// Single line for everything
    #[default]
    Spi,
    /// Single-line opcodes, quad address/data for reads (1-4-4)
    SpiQuadIo,
    /// QPI (4-4-4), entered with the given opcode
    Qpi {
        /// Enter-QPI opcode
        enter_opcode: u8,
    },
    /// OPI (8-8-8), entered by writing configuration register 2
    Opi {
        /// Use double transfer rate
        dtr: bool,
        /// Write configuration register 2 opcode
        write_config2: u8,
        /// CR2 dummy-cycle value matching `DummyCycles::octal_read`
        dummy_value: u8,
    },
}

impl TargetMode {
    /// Interface mode and transfer rate after configuration
    pub const fn interface(&self) -> (InterfaceMode, TransferRate) {
        match self {
            Self::Spi | Self::SpiQuadIo => (InterfaceMode::Single, TransferRate::Str),
            Self::Qpi { .. } => (InterfaceMode::Quad, TransferRate::Str),
            Self::Opi { dtr: false, .. } => (InterfaceMode::Octal, TransferRate::Str),
            Self::Opi { dtr: true, .. } => (InterfaceMode::Octal, TransferRate::Dtr),
        }
    }
}

bitflags! {
    /// Line modes the reset sequence is sent in
    ///
    /// The sequence always goes from the narrowest to the widest mode so a
    /// chip left in any protocol by a previous session sees one reset it
    /// can decode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResetModes: u8 {
        /// 1-line
        const SINGLE    = 1 << 0;
        /// QPI
        const QUAD      = 1 << 1;
        /// OPI, single transfer rate
        const OCTAL_STR = 1 << 2;
        /// OPI, double transfer rate
        const OCTAL_DTR = 1 << 3;
    }
}

impl ResetModes {
    /// Interface settings of each selected mode, narrowest first
    pub fn sequence(&self) -> impl Iterator<Item = (InterfaceMode, TransferRate)> {
        let modes = *self;
        [
            (Self::SINGLE, InterfaceMode::Single, TransferRate::Str),
            (Self::QUAD, InterfaceMode::Quad, TransferRate::Str),
            (Self::OCTAL_STR, InterfaceMode::Octal, TransferRate::Str),
            (Self::OCTAL_DTR, InterfaceMode::Octal, TransferRate::Dtr),
        ]
        .into_iter()
        .filter(move |(flag, _, _)| modes.contains(*flag))
        .map(|(_, mode, rate)| (mode, rate))
    }
}

impl Default for ResetModes {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// JEDEC identification of a chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Manufacturer ID (first byte of RDID)
    pub manufacturer: u8,
    /// Device ID (second and third bytes of RDID)
    pub device: u16,
}

impl JedecId {
    /// Create an ID from its parts
    pub const fn new(manufacturer: u8, device: u16) -> Self {
        Self {
            manufacturer,
            device,
        }
    }

    /// Decode the three RDID bytes
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], ((bytes[1] as u16) << 8) | bytes[2] as u16)
    }

    /// Encode as the three RDID bytes
    pub const fn to_bytes(&self) -> [u8; 3] {
        [
            self.manufacturer,
            (self.device >> 8) as u8,
            self.device as u8,
        ]
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:04X}", self.manufacturer, self.device)
    }
}

/// Immutable per-chip constants
///
/// A profile is created once, handed to a [`FlashDevice`](crate::flash::FlashDevice)
/// and never mutated by any operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Total flash size in bytes
    pub flash_size: u32,
    /// Page size for programming
    pub page_size: u32,
    /// Smallest erase unit
    pub sector_size: u32,
    /// Larger erase unit, if any
    pub block_size: Option<u32>,
    /// Address width used once configured
    pub address_width: AddressWidth,
    /// How 4-byte addressing is reached
    pub four_byte: FourByteMode,
    /// Host-visible base address of the memory-mapped window
    pub mapped_base: u32,
    /// Expected JEDEC ID, checked (not enforced) at init
    pub jedec_id: Option<JedecId>,
    /// Opcode table
    pub opcodes: Opcodes,
    /// Read dummy cycles
    pub dummy: DummyCycles,
    /// Poll timeouts
    pub timeouts: Timeouts,
    /// Quad Enable bit location
    pub quad_enable: QuadEnable,
    /// Configuration register written at configure time
    pub config_register: Option<ConfigRegister>,
    /// Protocol used once configured
    pub target_mode: TargetMode,
    /// Wrap-around disable command, sent after mode entry
    pub wrap_disable: Option<WrapDisable>,
    /// Line modes the reset sequence is sent in
    pub reset_modes: ResetModes,
    /// Delay after the reset sequence
    pub reset_recovery_ms: u32,
}

impl DeviceProfile {
    /// Translate a host address to a device offset and range-check it
    ///
    /// Addresses at or above `mapped_base` are taken as addresses in the
    /// memory-mapped window; lower addresses as raw device offsets.
    pub fn to_offset(&self, address: u32, len: u32) -> Result<u32> {
        let offset = if address >= self.mapped_base {
            address - self.mapped_base
        } else {
            address
        };
        if offset as u64 + len as u64 > self.flash_size as u64 {
            return Err(Error::InvalidRange { address, len });
        }
        Ok(offset)
    }

    /// Host address of a device offset
    pub const fn to_address(&self, offset: u32) -> u32 {
        self.mapped_base.wrapping_add(offset)
    }

    /// Address width the chip powers up with
    pub const fn power_on_address_width(&self) -> AddressWidth {
        match (self.four_byte, self.address_width) {
            (FourByteMode::Native, AddressWidth::FourByte) => AddressWidth::FourByte,
            _ => AddressWidth::ThreeByte,
        }
    }

    /// Check the internal consistency of the profile
    pub fn validate(&self) -> core::result::Result<(), ProfileError> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(ProfileError::PageSize(self.page_size));
        }
        if self.sector_size == 0 || self.sector_size % self.page_size != 0 {
            return Err(ProfileError::SectorSize(self.sector_size));
        }
        if let Some(block) = self.block_size {
            if block == 0 || block % self.sector_size != 0 {
                return Err(ProfileError::BlockSize(block));
            }
            if self.opcodes.block_erase.is_none() {
                return Err(ProfileError::MissingBlockErase);
            }
        }
        if self.flash_size == 0 || self.flash_size % self.sector_size != 0 {
            return Err(ProfileError::FlashSize(self.flash_size));
        }
        if self.address_width == AddressWidth::None
            || (self.flash_size as u64) > self.address_width.max_size()
        {
            return Err(ProfileError::AddressWidth);
        }
        if matches!(self.quad_enable, QuadEnable::Config(_)) && self.config_register.is_none() {
            return Err(ProfileError::MissingConfigRegister);
        }
        if matches!(self.target_mode, TargetMode::Opi { .. })
            && (self.address_width != AddressWidth::FourByte
                || self.four_byte != FourByteMode::Native)
        {
            return Err(ProfileError::OctalAddressing);
        }
        if !self.reset_modes.contains(ResetModes::SINGLE) {
            return Err(ProfileError::ResetModes);
        }
        // raw offsets and window addresses must not overlap
        if self.mapped_base != 0 && self.mapped_base < self.flash_size {
            return Err(ProfileError::MappedBase(self.mapped_base));
        }
        Ok(())
    }
}

/// Inconsistency found by [`DeviceProfile::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// Page size is zero or not a power of two
    PageSize(u32),
    /// Sector size is zero or not a multiple of the page size
    SectorSize(u32),
    /// Block size is zero or not a multiple of the sector size
    BlockSize(u32),
    /// Block size given without a block erase opcode
    MissingBlockErase,
    /// Flash size is zero or not a multiple of the sector size
    FlashSize(u32),
    /// Address width cannot reach the whole flash
    AddressWidth,
    /// Quad Enable lives in a configuration register the profile lacks
    MissingConfigRegister,
    /// Octal mode needs native 4-byte addressing
    OctalAddressing,
    /// Reset sequence must include single-line mode
    ResetModes,
    /// Mapped window starts inside the device offset range
    MappedBase(u32),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageSize(size) => write!(f, "invalid page size {}", size),
            Self::SectorSize(size) => {
                write!(f, "sector size {} is not a multiple of the page size", size)
            }
            Self::BlockSize(size) => {
                write!(f, "block size {} is not a multiple of the sector size", size)
            }
            Self::MissingBlockErase => write!(f, "block size given without block erase opcode"),
            Self::FlashSize(size) => {
                write!(f, "flash size {} is not a multiple of the sector size", size)
            }
            Self::AddressWidth => write!(f, "address width cannot reach the whole flash"),
            Self::MissingConfigRegister => {
                write!(f, "quad enable bit needs a configuration register")
            }
            Self::OctalAddressing => write!(f, "octal mode needs native 4-byte addressing"),
            Self::ResetModes => write!(f, "reset sequence must include single-line mode"),
            Self::MappedBase(base) => {
                write!(f, "mapped base 0x{:08X} overlaps the device offsets", base)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProfileError {}

/// A named profile
#[derive(Debug, Clone, Copy)]
pub struct ProfileEntry {
    /// Vendor name (e.g., "Macronix")
    pub vendor: &'static str,
    /// Chip model name (e.g., "MX25LM51245G")
    pub name: &'static str,
    /// Board this profile was tuned for
    pub board: &'static str,
    /// The profile itself
    pub profile: DeviceProfile,
}
