//! QSPI/OSPI NOR command sequences
//!
//! Free functions that encode one flash operation for the current
//! [`InterfaceState`] and run it on a [`BusDriver`]. They do not track any
//! state themselves; [`FlashDevice`](crate::flash::FlashDevice) sequences
//! them and keeps the interface state current.
//!
//! ## Line modes
//!
//! - **SPI (1-1-1)**: fast read, page program, every register access
//! - **Quad I/O (1-4-4)**: reads from SPI mode on chips configured for it,
//!   with quad input program (1-1-4) where the profile lists one
//! - **QPI (4-4-4)**: everything on four lines
//! - **OPI (8-8-8)**: everything on eight lines, STR or DTR, two-byte
//!   instructions and 32-bit addresses

use crate::bus::{AutoPoll, BusDriver, CancelToken};
use crate::error::Result;
use crate::profile::{DeviceProfile, JedecId, TargetMode};
use crate::spi::{BusWidth, FlashCommand, InterfaceMode};

use super::{InterfaceState, Status};

/// Controller cycles between two automatic status reads
pub const POLL_INTERVAL_CYCLES: u16 = 0x10;

/// Status register read for the current state
///
/// In octal mode the read carries a dummy address and the profile's
/// status dummy cycles.
pub fn status_command(profile: &DeviceProfile, iface: &InterfaceState) -> FlashCommand {
    register_read_command(profile, iface, profile.opcodes.read_status).with_data(1)
}

fn register_read_command(
    profile: &DeviceProfile,
    iface: &InterfaceState,
    opcode: u8,
) -> FlashCommand {
    let cmd = iface.instruction(opcode);
    match iface.mode {
        InterfaceMode::Octal => cmd
            .with_address(0, iface.command_address_width())
            .with_dummy_cycles(profile.dummy.octal_status),
        _ => cmd,
    }
}

/// Read command for the current state, used both for discrete reads and as
/// the memory-mapped read template
pub fn read_command(
    profile: &DeviceProfile,
    iface: &InterfaceState,
    offset: u32,
    len: usize,
) -> FlashCommand {
    let width = iface.command_address_width();
    let ops = &profile.opcodes;
    match iface.mode {
        InterfaceMode::Octal => iface
            .instruction(ops.octal_read)
            .with_address(offset, width)
            .with_dummy_cycles(profile.dummy.octal_read)
            .with_data(len),
        InterfaceMode::Quad => iface
            .instruction(ops.quad_read.select(width))
            .with_address(offset, width)
            .with_dummy_cycles(profile.dummy.quad_read)
            .with_data(len),
        InterfaceMode::Single if profile.target_mode == TargetMode::SpiQuadIo => iface
            .instruction(ops.quad_read.select(width))
            .with_address(offset, width)
            .with_dummy_cycles(profile.dummy.quad_read)
            .with_data(len)
            .with_lines(BusWidth::Quad, BusWidth::Quad),
        InterfaceMode::Single => iface
            .instruction(ops.fast_read.select(width))
            .with_address(offset, width)
            .with_dummy_cycles(profile.dummy.fast_read)
            .with_data(len),
    }
}

/// Page program command for the current state
pub fn program_command(
    profile: &DeviceProfile,
    iface: &InterfaceState,
    offset: u32,
    len: usize,
) -> FlashCommand {
    let width = iface.command_address_width();
    let ops = &profile.opcodes;
    match (iface.mode, ops.quad_program) {
        (InterfaceMode::Single, Some(quad))
            if profile.target_mode == TargetMode::SpiQuadIo =>
        {
            iface
                .instruction(quad.select(width))
                .with_address(offset, width)
                .with_data(len)
                .with_lines(BusWidth::Single, BusWidth::Quad)
        }
        _ => iface
            .instruction(ops.page_program.select(width))
            .with_address(offset, width)
            .with_data(len),
    }
}

/// Send Write Enable and wait until the latch reads back set
pub fn write_enable<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
    cancel: Option<&CancelToken>,
) -> Result<()> {
    bus.command(&iface.instruction(profile.opcodes.write_enable))?;
    let poll = AutoPoll {
        mask: Status::WEL.bits(),
        match_value: Status::WEL.bits(),
        interval_cycles: POLL_INTERVAL_CYCLES,
        timeout_ms: profile.timeouts.default_ms,
        cancel,
    };
    bus.auto_poll(&status_command(profile, iface), &poll)
}

/// Wait for the WIP (Write In Progress) bit to clear
///
/// Typical timeouts come from the profile:
/// * Page program, register writes: `default_ms`
/// * Sector erase: `sector_erase_ms`
/// * Chip erase: `max_erase_ms`
pub fn wait_ready<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
    timeout_ms: u32,
    cancel: Option<&CancelToken>,
) -> Result<()> {
    let poll = AutoPoll {
        mask: Status::WIP.bits(),
        match_value: 0,
        interval_cycles: POLL_INTERVAL_CYCLES,
        timeout_ms,
        cancel,
    };
    bus.auto_poll(&status_command(profile, iface), &poll)
}

/// Read status register 1
pub fn read_status<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
) -> Result<Status> {
    let mut buf = [0u8; 1];
    bus.command(&status_command(profile, iface))?;
    bus.receive(&mut buf)?;
    Ok(Status::from_bits_retain(buf[0]))
}

/// Read a one-byte register with the given opcode
pub fn read_register<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
    opcode: u8,
) -> Result<u8> {
    let mut buf = [0u8; 1];
    bus.command(&register_read_command(profile, iface, opcode).with_data(1))?;
    bus.receive(&mut buf)?;
    Ok(buf[0])
}

/// Write register bytes with the given opcode
///
/// `address` selects the register on chips with addressed configuration
/// registers (CR2). The caller sends Write Enable first.
pub fn write_register<B: BusDriver + ?Sized>(
    bus: &mut B,
    iface: &InterfaceState,
    opcode: u8,
    address: Option<u32>,
    data: &[u8],
) -> Result<()> {
    let mut cmd = iface.instruction(opcode);
    if let Some(address) = address {
        cmd = cmd.with_address(address, iface.command_address_width());
    }
    bus.command(&cmd.with_data(data.len()))?;
    bus.transmit(data)
}

/// Read the JEDEC ID
pub fn read_jedec_id<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
) -> Result<JedecId> {
    let mut buf = [0u8; 3];
    let cmd = register_read_command(profile, iface, profile.opcodes.read_id).with_data(3);
    bus.command(&cmd)?;
    bus.receive(&mut buf)?;
    Ok(JedecId::from_bytes(buf))
}

/// Send a bare instruction (WREN, EN4B, EQIO, chip erase, ...)
pub fn send_instruction<B: BusDriver + ?Sized>(
    bus: &mut B,
    iface: &InterfaceState,
    opcode: u8,
) -> Result<()> {
    bus.command(&iface.instruction(opcode))
}

/// Send the reset-enable/reset pair encoded for `iface`
///
/// A chip in a different mode ignores both instructions.
pub fn software_reset<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
) -> Result<()> {
    bus.command(&iface.instruction(profile.opcodes.reset_enable))?;
    bus.command(&iface.instruction(profile.opcodes.reset))
}

/// Issue an erase instruction with its address
///
/// The caller sends Write Enable first and polls for completion after.
pub fn erase_command<B: BusDriver + ?Sized>(
    bus: &mut B,
    iface: &InterfaceState,
    opcode: u8,
    offset: u32,
) -> Result<()> {
    bus.command(&iface.instruction(opcode).with_address(offset, iface.command_address_width()))
}

/// Program up to one page
///
/// The caller guarantees `data` does not cross a page boundary and sends
/// Write Enable first.
pub fn program_page<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
    offset: u32,
    data: &[u8],
) -> Result<()> {
    bus.command(&program_command(profile, iface, offset, data.len()))?;
    bus.transmit(data)
}

/// Read through discrete read commands
pub fn read<B: BusDriver + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    iface: &InterfaceState,
    offset: u32,
    buf: &mut [u8],
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    bus.command(&read_command(profile, iface, offset, buf.len()))?;
    bus.receive(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::builtin;
    use crate::spi::{opcodes, AddressWidth, TransferRate};

    #[test]
    fn test_octal_status_read_carries_address_and_dummy() {
        let profile = &builtin::MX25LM51245G_DTR.profile;
        let iface = InterfaceState::configured(profile);
        let cmd = status_command(profile, &iface);
        assert_eq!(cmd.opcode, opcodes::RDSR);
        assert_eq!(cmd.opcode_ext, Some(!opcodes::RDSR));
        assert_eq!(cmd.instruction_lines, BusWidth::Octal);
        assert_eq!(cmd.rate, TransferRate::Dtr);
        assert_eq!(cmd.address, Some(0));
        assert_eq!(cmd.address_width, AddressWidth::FourByte);
        assert_eq!(cmd.dummy_cycles, 4);
        assert_eq!(cmd.data_len, 1);
    }

    #[test]
    fn test_single_status_read_is_bare() {
        let profile = &builtin::MX25LM51245G_STR.profile;
        let iface = InterfaceState::power_on(profile);
        let cmd = status_command(profile, &iface);
        assert_eq!(cmd.opcode_ext, None);
        assert_eq!(cmd.address, None);
        assert_eq!(cmd.dummy_cycles, 0);
    }

    #[test]
    fn test_read_command_follows_mode() {
        let profile = &builtin::W25Q128JV.profile;
        let cmd = read_command(profile, &InterfaceState::configured(profile), 0x100, 16);
        assert_eq!(cmd.opcode, opcodes::QIOR);
        assert_eq!(cmd.instruction_lines, BusWidth::Single);
        assert_eq!(cmd.address_lines, BusWidth::Quad);
        assert_eq!(cmd.data_lines, BusWidth::Quad);
        assert_eq!(cmd.dummy_cycles, 6);

        let profile = &builtin::MX25L51245G.profile;
        let cmd = read_command(profile, &InterfaceState::configured(profile), 0x100, 16);
        assert_eq!(cmd.instruction_lines, BusWidth::Quad);
        assert_eq!(cmd.address_width, AddressWidth::FourByte);
        assert_eq!(cmd.dummy_cycles, 8);

        let profile = &builtin::MX25LM51245G_STR.profile;
        let cmd = read_command(profile, &InterfaceState::power_on(profile), 0x100, 16);
        assert_eq!(cmd.opcode, opcodes::FAST_READ_4B);
        assert_eq!(cmd.data_lines, BusWidth::Single);
    }

    #[test]
    fn test_program_command_selects_width_and_lines() {
        let profile = &builtin::MX25LM51245G_STR.profile;
        let cmd = program_command(profile, &InterfaceState::configured(profile), 0, 256);
        assert_eq!(cmd.opcode, opcodes::PP_4B);
        assert_eq!(cmd.opcode_ext, Some(!opcodes::PP_4B));
        assert_eq!(cmd.data_lines, BusWidth::Octal);

        let profile = &builtin::N25Q128A.profile;
        let cmd = program_command(profile, &InterfaceState::configured(profile), 0, 256);
        assert_eq!(cmd.opcode, opcodes::QPP);
        assert_eq!(cmd.address_lines, BusWidth::Single);
        assert_eq!(cmd.data_lines, BusWidth::Quad);
    }
}
