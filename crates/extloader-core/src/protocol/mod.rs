//! Protocol implementations
//!
//! This module contains the command sequences of QSPI/OSPI NOR flash: the
//! interface state the chip is in, how each command is encoded for that
//! state, and the primitive sequences (write enable, ready polling, reset,
//! register and data transfers) built from them.

mod xspi;

pub use xspi::*;

use bitflags::bitflags;

use crate::profile::DeviceProfile;
use crate::spi::{AddressWidth, FlashCommand, InterfaceMode, TransferRate};

bitflags! {
    /// Status register 1 bits shared by every supported chip
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Write in progress
        const WIP = 0x01;
        /// Write enable latch
        const WEL = 0x02;
    }
}

/// Protocol and addressing the chip is currently decoding
///
/// The driver keeps this in sync with the chip: every transition (reset,
/// EN4B, QPI/OPI entry) updates it right after the command that causes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceState {
    /// Line count of the instruction phase
    pub mode: InterfaceMode,
    /// Transfer rate
    pub rate: TransferRate,
    /// Address width the chip expects
    pub address_width: AddressWidth,
}

impl InterfaceState {
    /// Single-line, single-rate state with the given address width
    pub const fn single(address_width: AddressWidth) -> Self {
        Self {
            mode: InterfaceMode::Single,
            rate: TransferRate::Str,
            address_width,
        }
    }

    /// State of the chip right after a software reset
    pub const fn power_on(profile: &DeviceProfile) -> Self {
        Self::single(profile.power_on_address_width())
    }

    /// State of the chip once configured
    pub const fn configured(profile: &DeviceProfile) -> Self {
        let (mode, rate) = profile.target_mode.interface();
        Self {
            mode,
            rate,
            address_width: profile.address_width,
        }
    }

    /// Bare instruction encoded for this state
    ///
    /// Octal mode sends the inverted opcode as second instruction byte.
    pub const fn instruction(&self, opcode: u8) -> FlashCommand {
        let mut cmd = FlashCommand::simple(opcode);
        cmd.instruction_lines = self.mode.width();
        cmd.rate = self.rate;
        if matches!(self.mode, InterfaceMode::Octal) {
            cmd.opcode_ext = Some(!opcode);
        }
        cmd
    }

    /// Address width used by commands in this state
    ///
    /// Octal commands always carry 32-bit addresses.
    pub const fn command_address_width(&self) -> AddressWidth {
        match self.mode {
            InterfaceMode::Octal => AddressWidth::FourByte,
            _ => self.address_width,
        }
    }

    /// Returns true for the single-line, single-rate state
    pub const fn is_single(&self) -> bool {
        matches!(self.mode, InterfaceMode::Single) && matches!(self.rate, TransferRate::Str)
    }
}

impl Default for InterfaceState {
    fn default() -> Self {
        Self::single(AddressWidth::ThreeByte)
    }
}
