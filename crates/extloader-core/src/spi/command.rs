//! Flash command descriptor

use super::{AddressWidth, BusWidth, TransferRate};

/// A single flash command as handed to the bus driver
///
/// The descriptor covers the instruction, address and dummy phases. When
/// `data_len` is non-zero the command is followed by exactly one
/// [`BusDriver::transmit`](crate::bus::BusDriver::transmit) or
/// [`BusDriver::receive`](crate::bus::BusDriver::receive) of that many bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashCommand {
    /// The opcode byte
    pub opcode: u8,

    /// Second instruction byte (octal mode sends the inverted opcode)
    pub opcode_ext: Option<u8>,

    /// Lines used by the instruction phase
    pub instruction_lines: BusWidth,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Lines used by the address phase
    pub address_lines: BusWidth,

    /// Lines used by the data phase
    pub data_lines: BusWidth,

    /// Transfer rate of every phase
    pub rate: TransferRate,

    /// Number of dummy cycles after address
    pub dummy_cycles: u8,

    /// Length of the data phase in bytes
    pub data_len: usize,
}

impl FlashCommand {
    /// Create a single-line command with no address or data (e.g., WREN)
    pub const fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            opcode_ext: None,
            instruction_lines: BusWidth::Single,
            address: None,
            address_width: AddressWidth::None,
            address_lines: BusWidth::None,
            data_lines: BusWidth::None,
            rate: TransferRate::Str,
            dummy_cycles: 0,
            data_len: 0,
        }
    }

    /// Set the address phase, using the instruction lines for it
    pub const fn with_address(mut self, address: u32, width: AddressWidth) -> Self {
        self.address = Some(address);
        self.address_width = width;
        self.address_lines = self.instruction_lines;
        self
    }

    /// Set the data phase, using the instruction lines for it
    pub const fn with_data(mut self, len: usize) -> Self {
        self.data_len = len;
        self.data_lines = self.instruction_lines;
        self
    }

    /// Set the number of dummy cycles
    pub const fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Override the lines used by the address and data phases (e.g. 1-4-4)
    ///
    /// Phases that were never set stay skipped.
    pub const fn with_lines(mut self, address: BusWidth, data: BusWidth) -> Self {
        if self.address.is_some() {
            self.address_lines = address;
        }
        if !matches!(self.data_lines, BusWidth::None) {
            self.data_lines = data;
        }
        self
    }

    /// Returns true if this command has an address phase
    pub const fn has_address(&self) -> bool {
        self.address.is_some()
    }

    /// Returns true if this command has a data phase
    pub const fn has_data(&self) -> bool {
        self.data_len > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_inherit_instruction_lines() {
        let mut cmd = FlashCommand::simple(0x02);
        cmd.instruction_lines = BusWidth::Quad;
        let cmd = cmd
            .with_address(0x100, AddressWidth::ThreeByte)
            .with_data(16);
        assert_eq!(cmd.address_lines, BusWidth::Quad);
        assert_eq!(cmd.data_lines, BusWidth::Quad);
    }

    #[test]
    fn test_line_override_skips_absent_phases() {
        let cmd = FlashCommand::simple(0x06).with_lines(BusWidth::Quad, BusWidth::Quad);
        assert_eq!(cmd.address_lines, BusWidth::None);
        assert_eq!(cmd.data_lines, BusWidth::None);
        assert!(!cmd.has_address());
        assert!(!cmd.has_data());
    }
}
