//! Standard SPI NOR flash opcodes
//!
//! JEDEC opcodes plus the vendor-specific ones used by the built-in device
//! profiles. Device profiles reference these constants; a profile is free
//! to use any other opcode its chip documents.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status / configuration registers
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2 (Winbond)
pub const RDSR2: u8 = 0x35;
/// Write Status Register (1 byte, or SR + CR on chips with a config register)
pub const WRSR: u8 = 0x01;
/// Read Configuration Register (Macronix)
pub const RDCR: u8 = 0x15;
/// Write Configuration Register 2 (Macronix octal parts, addressed)
pub const WRCR2: u8 = 0x72;
/// Read Volatile Configuration Register (Micron)
pub const RDVCR: u8 = 0x85;
/// Write Volatile Configuration Register (Micron)
pub const WRVCR: u8 = 0x81;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read commands
// ============================================================================

/// Fast Read (with dummy byte, up to max frequency)
pub const FAST_READ: u8 = 0x0B;
/// Fast Read with 4-byte address
pub const FAST_READ_4B: u8 = 0x0C;
/// Quad I/O Read (1-4-4, also used in QPI mode)
pub const QIOR: u8 = 0xEB;
/// Quad I/O Read with 4-byte address
pub const QIOR_4B: u8 = 0xEC;
/// Octal read, single transfer rate (Macronix OPI)
pub const OCTAL_READ_STR: u8 = 0xEC;
/// Octal read, double transfer rate (Macronix OPI)
pub const OCTAL_READ_DTR: u8 = 0xEE;

// ============================================================================
// Page Program
// ============================================================================

/// Page Program with 3-byte address
pub const PP: u8 = 0x02;
/// Page Program with 4-byte address
pub const PP_4B: u8 = 0x12;
/// Quad Input Page Program with 3-byte address (1-1-4)
pub const QPP: u8 = 0x32;
/// Quad Input Page Program with 4-byte address (1-1-4)
pub const QPP_4B: u8 = 0x34;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4KB with 3-byte address
pub const SE_20: u8 = 0x20;
/// Sector Erase 4KB with 4-byte address
pub const SE_21: u8 = 0x21;
/// Block Erase 64KB with 3-byte address
pub const BE_D8: u8 = 0xD8;
/// Block Erase 64KB with 4-byte address
pub const BE_DC: u8 = 0xDC;
/// Chip Erase (entire chip)
pub const CE_60: u8 = 0x60;
/// Chip Erase (alternate opcode)
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Address and protocol mode control
// ============================================================================

/// Enter 4-Byte Address Mode
pub const EN4B: u8 = 0xB7;
/// Enter QPI mode (Macronix)
pub const EQIO_35: u8 = 0x35;
/// Enter QPI mode (Winbond)
pub const EQIO_38: u8 = 0x38;
/// Set Burst Length (Macronix), disables wrap-around with 0x10
pub const SBL: u8 = 0xC0;
/// Set Burst with Wrap (Winbond), disables wrap-around with 0x10
pub const SET_BURST_WRAP: u8 = 0x77;

// ============================================================================
// Software Reset
// ============================================================================

/// Reset Enable
pub const RSTEN: u8 = 0x66;
/// Reset Device
pub const RST: u8 = 0x99;

// ============================================================================
// Status register bit definitions
// ============================================================================

/// Status Register 1: Write In Progress / Busy
pub const SR1_WIP: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
/// Status Register 1: Quad Enable (Macronix)
pub const SR1_QE: u8 = 0x40;
/// Status Register 2: Quad Enable (Winbond)
pub const SR2_QE: u8 = 0x02;

// ============================================================================
// Macronix configuration register 2 (octal parts)
// ============================================================================

/// CR2 address holding the protocol mode
pub const CR2_MODE_ADDR: u32 = 0x0000_0000;
/// CR2 address holding the dummy-cycle count
pub const CR2_DUMMY_ADDR: u32 = 0x0000_0300;
/// CR2 mode value: STR OPI
pub const CR2_SOPI: u8 = 0x01;
/// CR2 mode value: DTR OPI
pub const CR2_DOPI: u8 = 0x02;
/// CR2 dummy value selecting 20 cycles
pub const CR2_DC_20: u8 = 0x00;
